use crate::auth::ActingUser;
use crate::db_storage::MpStorage;
use crate::errors::AppError;
use crate::forms::{FormErrors, MpForm, ScreenForm};
use crate::handlers::{
    confirm_screen, form_screen, invalid_form, list_screen, AppState, RecordId,
};
use crate::models::MpFields;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

const MP_LIST: &str = "/mps";

/// GET /mps
///
/// All MPs, alphabetical by name.
pub async fn list_mps(
    _user: ActingUser,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    tracing::info!("GET /mps");

    let mps = MpStorage::new(state.db.clone()).list_mps().await?;
    Ok(list_screen(&mps))
}

/// GET /mps/new
pub async fn new_mp_form(_user: ActingUser) -> Response {
    form_screen(
        StatusCode::OK,
        &MpFields::default(),
        &FormErrors::default(),
        MpForm::choices(),
    )
}

/// POST /mps/new
pub async fn create_mp(
    _user: ActingUser,
    State(state): State<Arc<AppState>>,
    Form(form): Form<MpForm>,
) -> Result<Response, AppError> {
    tracing::info!("POST /mps/new");

    let base = MpFields::default();
    let fields = match form.clean(base.clone()) {
        Ok(fields) => fields,
        Err(errors) => return Ok(invalid_form(&form, &base, &errors)),
    };

    MpStorage::new(state.db.clone()).create_mp(&fields).await?;
    Ok(Redirect::to(MP_LIST).into_response())
}

/// GET /mps/:mp_id/edit
pub async fn edit_mp_form(
    _user: ActingUser,
    State(state): State<Arc<AppState>>,
    RecordId(mp_id): RecordId<Uuid>,
) -> Result<Response, AppError> {
    tracing::info!("GET /mps/{}/edit", mp_id);

    let mp = MpStorage::new(state.db.clone()).get_mp(mp_id).await?;
    Ok(form_screen(
        StatusCode::OK,
        &mp.fields,
        &FormErrors::default(),
        MpForm::choices(),
    ))
}

/// POST /mps/:mp_id/edit
pub async fn update_mp(
    _user: ActingUser,
    State(state): State<Arc<AppState>>,
    RecordId(mp_id): RecordId<Uuid>,
    Form(form): Form<MpForm>,
) -> Result<Response, AppError> {
    tracing::info!("POST /mps/{}/edit", mp_id);

    let storage = MpStorage::new(state.db.clone());
    let mp = storage.get_mp(mp_id).await?;

    let fields = match form.clean(mp.fields.clone()) {
        Ok(fields) => fields,
        Err(errors) => return Ok(invalid_form(&form, &mp.fields, &errors)),
    };

    storage.update_mp(mp_id, &fields).await?;
    Ok(Redirect::to(MP_LIST).into_response())
}

/// GET /mps/:mp_id/delete
///
/// Only asks for confirmation. Nothing is removed until the POST.
pub async fn confirm_delete_mp(
    _user: ActingUser,
    State(state): State<Arc<AppState>>,
    RecordId(mp_id): RecordId<Uuid>,
) -> Result<Json<Value>, AppError> {
    tracing::info!("GET /mps/{}/delete", mp_id);

    let mp = MpStorage::new(state.db.clone()).get_mp(mp_id).await?;
    let prompt = format!("Delete MP \"{}\"?", mp.fields.name);
    Ok(confirm_screen(&mp, prompt))
}

/// POST /mps/:mp_id/delete
pub async fn delete_mp(
    user: ActingUser,
    State(state): State<Arc<AppState>>,
    RecordId(mp_id): RecordId<Uuid>,
) -> Result<Response, AppError> {
    tracing::info!("POST /mps/{}/delete - user: {}", mp_id, user.username);

    MpStorage::new(state.db.clone()).delete_mp(mp_id).await?;
    Ok(Redirect::to(MP_LIST).into_response())
}
