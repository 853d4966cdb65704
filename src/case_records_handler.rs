//! Screens for the records a case holds at most one of.
//!
//! Visiting a record screen creates the record on first use, so every case can
//! be worked through its stages without a separate "add" step.

use crate::auth::ActingUser;
use crate::db_storage::{CaseRecord, CaseRecordStorage, CaseStorage};
use crate::errors::AppError;
use crate::forms::{AppealForm, AssessmentForm, FormErrors, InternalReviewForm, OutcomeForm, ScreenForm};
use crate::handlers::{form_screen, invalid_form, AppState, RecordId};
use crate::models::{
    AdministrativeAppealsTribunal, Assessment, InformationCommissionerAppeal, InternalReview,
    Outcome,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

async fn show_record<R, F>(state: &AppState, case_id: Uuid) -> Result<Response, AppError>
where
    R: CaseRecord,
    R::Fields: Serialize,
    F: ScreenForm<Fields = R::Fields>,
{
    CaseStorage::new(state.db.clone()).get_case(case_id).await?;

    let record = CaseRecordStorage::new(state.db.clone())
        .get_or_create::<R>(case_id)
        .await?;

    Ok(form_screen(
        StatusCode::OK,
        record.fields(),
        &FormErrors::default(),
        F::choices(),
    ))
}

async fn save_record<R, F>(state: &AppState, case_id: Uuid, form: F) -> Result<Response, AppError>
where
    R: CaseRecord,
    R::Fields: Serialize,
    F: ScreenForm<Fields = R::Fields> + Serialize,
{
    CaseStorage::new(state.db.clone()).get_case(case_id).await?;

    let storage = CaseRecordStorage::new(state.db.clone());
    let record = storage.get_or_create::<R>(case_id).await?;

    let fields = match form.clean(record.fields().clone()) {
        Ok(fields) => fields,
        Err(errors) => return Ok(invalid_form(&form, record.fields(), &errors)),
    };

    storage.update::<R>(case_id, &fields).await?;
    Ok(Redirect::to(&format!("/cases/{}", case_id)).into_response())
}

/// GET /cases/:case_id/assessment
pub async fn edit_assessment(
    _user: ActingUser,
    State(state): State<Arc<AppState>>,
    RecordId(case_id): RecordId<Uuid>,
) -> Result<Response, AppError> {
    tracing::info!("GET /cases/{}/assessment", case_id);
    show_record::<Assessment, AssessmentForm>(&state, case_id).await
}

/// POST /cases/:case_id/assessment
pub async fn save_assessment(
    _user: ActingUser,
    State(state): State<Arc<AppState>>,
    RecordId(case_id): RecordId<Uuid>,
    Form(form): Form<AssessmentForm>,
) -> Result<Response, AppError> {
    tracing::info!("POST /cases/{}/assessment", case_id);
    save_record::<Assessment, _>(&state, case_id, form).await
}

/// GET /cases/:case_id/outcome
pub async fn edit_outcome(
    _user: ActingUser,
    State(state): State<Arc<AppState>>,
    RecordId(case_id): RecordId<Uuid>,
) -> Result<Response, AppError> {
    tracing::info!("GET /cases/{}/outcome", case_id);
    show_record::<Outcome, OutcomeForm>(&state, case_id).await
}

/// POST /cases/:case_id/outcome
pub async fn save_outcome(
    _user: ActingUser,
    State(state): State<Arc<AppState>>,
    RecordId(case_id): RecordId<Uuid>,
    Form(form): Form<OutcomeForm>,
) -> Result<Response, AppError> {
    tracing::info!("POST /cases/{}/outcome", case_id);
    save_record::<Outcome, _>(&state, case_id, form).await
}

/// GET /cases/:case_id/internal-review
pub async fn edit_internal_review(
    _user: ActingUser,
    State(state): State<Arc<AppState>>,
    RecordId(case_id): RecordId<Uuid>,
) -> Result<Response, AppError> {
    tracing::info!("GET /cases/{}/internal-review", case_id);
    show_record::<InternalReview, InternalReviewForm>(&state, case_id).await
}

/// POST /cases/:case_id/internal-review
pub async fn save_internal_review(
    _user: ActingUser,
    State(state): State<Arc<AppState>>,
    RecordId(case_id): RecordId<Uuid>,
    Form(form): Form<InternalReviewForm>,
) -> Result<Response, AppError> {
    tracing::info!("POST /cases/{}/internal-review", case_id);
    save_record::<InternalReview, _>(&state, case_id, form).await
}

/// GET /cases/:case_id/commissioner-appeal
pub async fn edit_commissioner_appeal(
    _user: ActingUser,
    State(state): State<Arc<AppState>>,
    RecordId(case_id): RecordId<Uuid>,
) -> Result<Response, AppError> {
    tracing::info!("GET /cases/{}/commissioner-appeal", case_id);
    show_record::<InformationCommissionerAppeal, AppealForm>(&state, case_id).await
}

/// POST /cases/:case_id/commissioner-appeal
pub async fn save_commissioner_appeal(
    _user: ActingUser,
    State(state): State<Arc<AppState>>,
    RecordId(case_id): RecordId<Uuid>,
    Form(form): Form<AppealForm>,
) -> Result<Response, AppError> {
    tracing::info!("POST /cases/{}/commissioner-appeal", case_id);
    save_record::<InformationCommissionerAppeal, _>(&state, case_id, form).await
}

/// GET /cases/:case_id/tribunal-appeal
pub async fn edit_tribunal_appeal(
    _user: ActingUser,
    State(state): State<Arc<AppState>>,
    RecordId(case_id): RecordId<Uuid>,
) -> Result<Response, AppError> {
    tracing::info!("GET /cases/{}/tribunal-appeal", case_id);
    show_record::<AdministrativeAppealsTribunal, AppealForm>(&state, case_id).await
}

/// POST /cases/:case_id/tribunal-appeal
pub async fn save_tribunal_appeal(
    _user: ActingUser,
    State(state): State<Arc<AppState>>,
    RecordId(case_id): RecordId<Uuid>,
    Form(form): Form<AppealForm>,
) -> Result<Response, AppError> {
    tracing::info!("POST /cases/{}/tribunal-appeal", case_id);
    save_record::<AdministrativeAppealsTribunal, _>(&state, case_id, form).await
}
