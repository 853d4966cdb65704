use crate::auth::ActingUser;
use crate::config::Config;
use crate::db_storage::{CaseRecordStorage, CaseStorage, CommentStorage};
use crate::errors::AppError;
use crate::forms::{CaseForm, CommentForm, FormErrors, ScreenForm};
use crate::models::{
    AdministrativeAppealsTribunal, Assessment, CaseDetail, CaseFields, CommentFields,
    InformationCommissionerAppeal, InternalReview, Outcome,
};
use axum::{
    async_trait,
    extract::{rejection::PathRejection, FromRequestParts, Path, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: PgPool,
    /// Application configuration.
    pub config: Config,
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "foi-tracker",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Record identifiers taken from the URL path.
///
/// An id that does not parse cannot name any record, so it is reported as
/// not found rather than as a malformed request.
#[derive(Debug, Clone, Copy)]
pub struct RecordId<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for RecordId<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(id)) => Ok(RecordId(id)),
            Err(PathRejection::FailedToDeserializePathParams(e)) => {
                tracing::debug!("Unresolvable record id: {}", e.body_text());
                Err(AppError::NotFound(format!("No record at {}", parts.uri.path())))
            }
            Err(e) => Err(AppError::InternalError(e.body_text())),
        }
    }
}

// ============ Screen payloads ============

/// A create or edit form: current values, field errors and choice lists.
pub fn form_screen(
    status: StatusCode,
    form: &impl Serialize,
    errors: &FormErrors,
    choices: Value,
) -> Response {
    (
        status,
        Json(json!({
            "form": form,
            "errors": errors,
            "choices": choices,
        })),
    )
        .into_response()
}

/// Re-renders a rejected submission with its errors. Fields left out of the
/// submission show their `base` value, so an edit screen keeps the stored data.
pub fn invalid_form<F>(form: &F, base: &F::Fields, errors: &FormErrors) -> Response
where
    F: ScreenForm + Serialize,
    F::Fields: Serialize,
{
    tracing::debug!(
        "Form rejected: {:?}",
        errors.fields().collect::<Vec<_>>()
    );
    let shown = overlay_submission(base, form);
    form_screen(StatusCode::UNPROCESSABLE_ENTITY, &shown, errors, F::choices())
}

/// Submitted values laid over the base field set. Absent fields are `null` in
/// the raw form and leave the base value in place.
pub fn overlay_submission(base: &impl Serialize, form: &impl Serialize) -> Value {
    let mut shown = serde_json::to_value(base).unwrap_or_default();
    if let (Value::Object(shown), Ok(Value::Object(submitted))) =
        (&mut shown, serde_json::to_value(form))
    {
        for (key, value) in submitted {
            if !value.is_null() {
                shown.insert(key, value);
            }
        }
    }
    shown
}

pub fn list_screen<T: Serialize>(items: &[T]) -> Json<Value> {
    Json(json!({ "items": items }))
}

pub fn confirm_screen<T: Serialize>(record: &T, prompt: String) -> Json<Value> {
    Json(json!({
        "record": record,
        "confirm": prompt,
    }))
}

fn comments_url(case_id: Uuid) -> String {
    format!("/cases/{}/comments", case_id)
}

// ============ Cases ============

/// GET /cases
pub async fn list_cases(
    _user: ActingUser,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    tracing::info!("GET /cases");

    let cases = CaseStorage::new(state.db.clone()).list_cases().await?;
    Ok(list_screen(&cases))
}

/// GET /cases/new
pub async fn new_case_form(_user: ActingUser) -> Response {
    form_screen(
        StatusCode::OK,
        &CaseFields::default(),
        &FormErrors::default(),
        CaseForm::choices(),
    )
}

/// POST /cases/new
///
/// `created_date` and `created_by` are stamped by the factory; the form has no
/// such fields.
pub async fn create_case(
    user: ActingUser,
    State(state): State<Arc<AppState>>,
    Form(form): Form<CaseForm>,
) -> Result<Response, AppError> {
    tracing::info!("POST /cases/new - user: {}", user.username);

    let base = CaseFields::default();
    let fields = match form.clean(base.clone()) {
        Ok(fields) => fields,
        Err(errors) => return Ok(invalid_form(&form, &base, &errors)),
    };

    CaseStorage::new(state.db.clone())
        .create_case(&fields, &user)
        .await?;

    Ok(Redirect::to("/cases").into_response())
}

/// GET /cases/:case_id
pub async fn case_detail(
    _user: ActingUser,
    State(state): State<Arc<AppState>>,
    RecordId(case_id): RecordId<Uuid>,
) -> Result<Json<CaseDetail>, AppError> {
    tracing::info!("GET /cases/{}", case_id);

    let case = CaseStorage::new(state.db.clone()).get_case(case_id).await?;
    let comments = CommentStorage::new(state.db.clone())
        .list_for_case(case_id)
        .await?;

    let records = CaseRecordStorage::new(state.db.clone());
    let assessment = records.find::<Assessment>(case_id).await?;
    let outcome = records.find::<Outcome>(case_id).await?;
    let internal_review = records.find::<InternalReview>(case_id).await?;
    let commissioner_appeal = records.find::<InformationCommissionerAppeal>(case_id).await?;
    let tribunal_appeal = records
        .find::<AdministrativeAppealsTribunal>(case_id)
        .await?;

    Ok(Json(CaseDetail {
        case,
        comments,
        assessment,
        outcome,
        internal_review,
        commissioner_appeal,
        tribunal_appeal,
    }))
}

/// GET /cases/:case_id/edit
pub async fn edit_case_form(
    _user: ActingUser,
    State(state): State<Arc<AppState>>,
    RecordId(case_id): RecordId<Uuid>,
) -> Result<Response, AppError> {
    tracing::info!("GET /cases/{}/edit", case_id);

    let case = CaseStorage::new(state.db.clone()).get_case(case_id).await?;
    Ok(form_screen(
        StatusCode::OK,
        &case.fields,
        &FormErrors::default(),
        CaseForm::choices(),
    ))
}

/// POST /cases/:case_id/edit
pub async fn update_case(
    _user: ActingUser,
    State(state): State<Arc<AppState>>,
    RecordId(case_id): RecordId<Uuid>,
    Form(form): Form<CaseForm>,
) -> Result<Response, AppError> {
    tracing::info!("POST /cases/{}/edit", case_id);

    let storage = CaseStorage::new(state.db.clone());
    let case = storage.get_case(case_id).await?;

    let fields = match form.clean(case.fields.clone()) {
        Ok(fields) => fields,
        Err(errors) => return Ok(invalid_form(&form, &case.fields, &errors)),
    };

    storage.update_case(case_id, &fields).await?;
    Ok(Redirect::to("/cases").into_response())
}

/// GET /cases/:case_id/delete
pub async fn confirm_delete_case(
    _user: ActingUser,
    State(state): State<Arc<AppState>>,
    RecordId(case_id): RecordId<Uuid>,
) -> Result<Json<Value>, AppError> {
    tracing::info!("GET /cases/{}/delete", case_id);

    let case = CaseStorage::new(state.db.clone()).get_case(case_id).await?;
    let prompt = format!(
        "Delete case \"{}\" together with its comments and records?",
        case.fields.title
    );
    Ok(confirm_screen(&case, prompt))
}

/// POST /cases/:case_id/delete
pub async fn delete_case(
    user: ActingUser,
    State(state): State<Arc<AppState>>,
    RecordId(case_id): RecordId<Uuid>,
) -> Result<Response, AppError> {
    tracing::info!("POST /cases/{}/delete - user: {}", case_id, user.username);

    CaseStorage::new(state.db.clone())
        .delete_case(case_id)
        .await?;
    Ok(Redirect::to("/cases").into_response())
}

// ============ Comments ============

/// GET /cases/:case_id/comments
pub async fn list_comments(
    _user: ActingUser,
    State(state): State<Arc<AppState>>,
    RecordId(case_id): RecordId<Uuid>,
) -> Result<Json<Value>, AppError> {
    tracing::info!("GET /cases/{}/comments", case_id);

    CaseStorage::new(state.db.clone()).get_case(case_id).await?;
    let comments = CommentStorage::new(state.db.clone())
        .list_for_case(case_id)
        .await?;
    Ok(list_screen(&comments))
}

/// GET /cases/:case_id/comments/new
pub async fn new_comment_form(
    _user: ActingUser,
    State(state): State<Arc<AppState>>,
    RecordId(case_id): RecordId<Uuid>,
) -> Result<Response, AppError> {
    CaseStorage::new(state.db.clone()).get_case(case_id).await?;
    Ok(form_screen(
        StatusCode::OK,
        &CommentFields::default(),
        &FormErrors::default(),
        CommentForm::choices(),
    ))
}

/// POST /cases/:case_id/comments/new
pub async fn create_comment(
    user: ActingUser,
    State(state): State<Arc<AppState>>,
    RecordId(case_id): RecordId<Uuid>,
    Form(form): Form<CommentForm>,
) -> Result<Response, AppError> {
    tracing::info!(
        "POST /cases/{}/comments/new - user: {}",
        case_id,
        user.username
    );

    CaseStorage::new(state.db.clone()).get_case(case_id).await?;

    let base = CommentFields::default();
    let fields = match form.clean(base.clone()) {
        Ok(fields) => fields,
        Err(errors) => return Ok(invalid_form(&form, &base, &errors)),
    };

    CommentStorage::new(state.db.clone())
        .create_comment(case_id, &fields, &user)
        .await?;

    Ok(Redirect::to(&comments_url(case_id)).into_response())
}

/// GET /cases/:case_id/comments/:comment_id/edit
pub async fn edit_comment_form(
    _user: ActingUser,
    State(state): State<Arc<AppState>>,
    RecordId((case_id, comment_id)): RecordId<(Uuid, Uuid)>,
) -> Result<Response, AppError> {
    let comment = CommentStorage::new(state.db.clone())
        .get_comment(case_id, comment_id)
        .await?;
    Ok(form_screen(
        StatusCode::OK,
        &comment.fields,
        &FormErrors::default(),
        CommentForm::choices(),
    ))
}

/// POST /cases/:case_id/comments/:comment_id/edit
pub async fn update_comment(
    _user: ActingUser,
    State(state): State<Arc<AppState>>,
    RecordId((case_id, comment_id)): RecordId<(Uuid, Uuid)>,
    Form(form): Form<CommentForm>,
) -> Result<Response, AppError> {
    tracing::info!("POST /cases/{}/comments/{}/edit", case_id, comment_id);

    let storage = CommentStorage::new(state.db.clone());
    let comment = storage.get_comment(case_id, comment_id).await?;

    let fields = match form.clean(comment.fields.clone()) {
        Ok(fields) => fields,
        Err(errors) => return Ok(invalid_form(&form, &comment.fields, &errors)),
    };

    storage.update_comment(case_id, comment_id, &fields).await?;
    Ok(Redirect::to(&comments_url(case_id)).into_response())
}

/// GET /cases/:case_id/comments/:comment_id/delete
pub async fn confirm_delete_comment(
    _user: ActingUser,
    State(state): State<Arc<AppState>>,
    RecordId((case_id, comment_id)): RecordId<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    let comment = CommentStorage::new(state.db.clone())
        .get_comment(case_id, comment_id)
        .await?;
    let prompt = format!("Delete comment \"{}\"?", comment.fields.subject);
    Ok(confirm_screen(&comment, prompt))
}

/// POST /cases/:case_id/comments/:comment_id/delete
pub async fn delete_comment(
    user: ActingUser,
    State(state): State<Arc<AppState>>,
    RecordId((case_id, comment_id)): RecordId<(Uuid, Uuid)>,
) -> Result<Response, AppError> {
    tracing::info!(
        "POST /cases/{}/comments/{}/delete - user: {}",
        case_id,
        comment_id,
        user.username
    );

    CommentStorage::new(state.db.clone())
        .delete_comment(case_id, comment_id)
        .await?;
    Ok(Redirect::to(&comments_url(case_id)).into_response())
}
