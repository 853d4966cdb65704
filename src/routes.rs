use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::case_records_handler as records;
use crate::handlers::{self, AppState};
use crate::mp_handler;

/// Form posts are small; anything larger is refused before it reaches a handler.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Every screen that needs an acting user.
pub fn screen_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Cases
        .route("/cases", get(handlers::list_cases))
        .route(
            "/cases/new",
            get(handlers::new_case_form).post(handlers::create_case),
        )
        .route("/cases/:case_id", get(handlers::case_detail))
        .route(
            "/cases/:case_id/edit",
            get(handlers::edit_case_form).post(handlers::update_case),
        )
        .route(
            "/cases/:case_id/delete",
            get(handlers::confirm_delete_case).post(handlers::delete_case),
        )
        // Comments
        .route("/cases/:case_id/comments", get(handlers::list_comments))
        .route(
            "/cases/:case_id/comments/new",
            get(handlers::new_comment_form).post(handlers::create_comment),
        )
        .route(
            "/cases/:case_id/comments/:comment_id/edit",
            get(handlers::edit_comment_form).post(handlers::update_comment),
        )
        .route(
            "/cases/:case_id/comments/:comment_id/delete",
            get(handlers::confirm_delete_comment).post(handlers::delete_comment),
        )
        // One-per-case records
        .route(
            "/cases/:case_id/assessment",
            get(records::edit_assessment).post(records::save_assessment),
        )
        .route(
            "/cases/:case_id/outcome",
            get(records::edit_outcome).post(records::save_outcome),
        )
        .route(
            "/cases/:case_id/internal-review",
            get(records::edit_internal_review).post(records::save_internal_review),
        )
        .route(
            "/cases/:case_id/commissioner-appeal",
            get(records::edit_commissioner_appeal).post(records::save_commissioner_appeal),
        )
        .route(
            "/cases/:case_id/tribunal-appeal",
            get(records::edit_tribunal_appeal).post(records::save_tribunal_appeal),
        )
        // MPs
        .route("/mps", get(mp_handler::list_mps))
        .route(
            "/mps/new",
            get(mp_handler::new_mp_form).post(mp_handler::create_mp),
        )
        .route(
            "/mps/:mp_id/edit",
            get(mp_handler::edit_mp_form).post(mp_handler::update_mp),
        )
        .route(
            "/mps/:mp_id/delete",
            get(mp_handler::confirm_delete_mp).post(mp_handler::delete_mp),
        )
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
}

/// Full application: health check plus the given screens.
///
/// `main` passes the screens wrapped in its rate limiter, tests pass them bare.
pub fn build_router_with(state: Arc<AppState>, screens: Router<Arc<AppState>>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .merge(screens)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub fn build_router(state: Arc<AppState>) -> Router {
    build_router_with(state, screen_routes())
}
