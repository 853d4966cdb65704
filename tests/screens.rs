//! Router-level tests for the paths that never reach the database:
//! health, authentication and form validation. The pool is created lazily and
//! points at nothing.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower::ServiceExt;

use foi_tracker::auth::PROXY_TOKEN_HEADER;
use foi_tracker::config::Config;
use foi_tracker::handlers::AppState;
use foi_tracker::routes::build_router;

fn test_config(secret: Option<&str>) -> Config {
    Config {
        database_url: "postgres://localhost:1/unused".to_string(),
        port: 0,
        db_max_connections: 1,
        auth_user_header: "x-remote-user".to_string(),
        auth_proxy_secret: secret.map(str::to_string),
        rate_limit_per_second: 10,
        rate_limit_burst: 20,
    }
}

fn app_with(config: Config) -> Router {
    let db = PgPoolOptions::new()
        .max_connections(1)
        .connect_lazy(&config.database_url)
        .unwrap();
    build_router(Arc::new(AppState { db, config }))
}

fn app() -> Router {
    app_with(test_config(None))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-remote-user", "jsmith")
        .body(Body::empty())
        .unwrap()
}

fn post_form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-remote-user", "jsmith")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_needs_no_user() {
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn screens_require_acting_user() {
    for uri in ["/cases", "/cases/new", "/mps", "/mps/new"] {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Unauthorized");
    }
}

#[tokio::test]
async fn proxy_token_checked_when_configured() {
    let app = app_with(test_config(Some("s3cret")));

    let response = app.clone().oneshot(get("/mps/new")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/mps/new")
        .header("x-remote-user", "jsmith")
        .header(PROXY_TOKEN_HEADER, "s3cret")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn new_case_form_renders_defaults_and_choices() {
    let response = app().oneshot(get("/cases/new")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["form"]["title"], "");
    assert_eq!(body["form"]["urgent_flag"], false);
    assert!(body["form"].get("created_by").is_none());
    assert_eq!(body["errors"], serde_json::json!({}));
    assert_eq!(body["choices"]["enquiry_method"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn new_mp_with_overlong_name_is_rejected() {
    let name = "x".repeat(101);
    let form = format!(
        "title=Hon&name={}&party=Independent&constituency=Canberra&address=Parliament+House&postcode=2600",
        name
    );
    let response = app().oneshot(post_form("/mps/new", &form)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(
        body["errors"]["name"][0],
        "Ensure this value has at most 100 characters (it has 101)."
    );
    assert!(body["errors"].get("postcode").is_none());
    assert_eq!(body["form"]["name"], name.as_str());
}

#[tokio::test]
async fn new_case_without_title_is_rejected() {
    let response = app()
        .oneshot(post_form(
            "/cases/new",
            "subject=Briefing&created_by=mallory&enquiry_method=PIGEON",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["errors"]["title"][0], "This field is required.");
    assert_eq!(
        body["errors"]["enquiry_method"][0],
        "Select a valid choice. PIGEON is not one of the available choices."
    );
    assert!(body["form"].get("created_by").is_none());
}

#[tokio::test]
async fn malformed_id_is_not_found() {
    for uri in [
        "/mps/42/edit",
        "/mps/not-a-uuid/delete",
        "/cases/abc",
        "/cases/abc/assessment",
        "/cases/abc/comments/xyz/edit",
    ] {
        let response = app().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains(uri), "{}", uri);
    }

    let response = app()
        .oneshot(post_form("/mps/42/edit", "name=Jane"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn oversized_body_is_refused() {
    let body = "a".repeat(2 * 1024 * 1024);
    let request = Request::builder()
        .method("POST")
        .uri("/mps/new")
        .header("x-remote-user", "jsmith")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap();
    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
