use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::Utc;
use serde_json::Value;
use std::env;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use foi_tracker::auth::ActingUser;
use foi_tracker::choices::FoiOutcome;
use foi_tracker::config::Config;
use foi_tracker::db::Database;
use foi_tracker::db_storage::{CaseRecordStorage, CaseStorage, CommentStorage, MpStorage};
use foi_tracker::errors::AppError;
use foi_tracker::handlers::AppState;
use foi_tracker::models::{Assessment, CaseFields, CommentFields, MpFields, Outcome};
use foi_tracker::routes::build_router;

// Integration tests against a real PostgreSQL database.
// Marked ignored to avoid running against production by accident; set TEST_DATABASE_URL to run.

struct TestApp {
    db: Database,
    router: Router,
}

async fn setup() -> anyhow::Result<TestApp> {
    let db_url = env::var("TEST_DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("Set TEST_DATABASE_URL to run this test"))?;

    let db = Database::new(&db_url, 5).await?;
    db.ensure_schema().await?;

    let config = Config {
        database_url: db_url,
        port: 0,
        db_max_connections: 5,
        auth_user_header: "x-remote-user".to_string(),
        auth_proxy_secret: None,
        rate_limit_per_second: 10,
        rate_limit_burst: 20,
    };
    let router = build_router(Arc::new(AppState {
        db: db.pool.clone(),
        config,
    }));

    Ok(TestApp { db, router })
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> anyhow::Result<Response> {
        Ok(self.router.clone().oneshot(request).await?)
    }

    async fn get(&self, uri: &str) -> anyhow::Result<Response> {
        self.send(
            Request::builder()
                .uri(uri)
                .header("x-remote-user", "jsmith")
                .body(Body::empty())?,
        )
        .await
    }

    async fn post(&self, uri: &str, form: &str) -> anyhow::Result<Response> {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("x-remote-user", "jsmith")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form.to_string()))?,
        )
        .await
    }
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

async fn json_body(response: Response) -> anyhow::Result<Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn unique(prefix: &str) -> String {
    format!("{} {}", prefix, Uuid::new_v4().simple())
}

fn mp_fields(name: &str) -> MpFields {
    MpFields {
        title: "Hon".to_string(),
        name: name.to_string(),
        party: "Independent".to_string(),
        constituency: "Canberra".to_string(),
        address: "Parliament House".to_string(),
        postcode: "2600".to_string(),
    }
}

#[tokio::test]
#[ignore]
async fn mp_create_appears_in_list_sorted_by_name() -> anyhow::Result<()> {
    let app = setup().await?;
    let suffix = Uuid::new_v4().simple().to_string();

    for name in [format!("Zed {}", suffix), format!("Abe {}", suffix)] {
        let form = format!(
            "title=Hon&name={}&party=Independent&constituency=Canberra&address=Parliament+House&postcode=2600",
            name.replace(' ', "+")
        );
        let response = app.post("/mps/new", &form).await?;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/mps");
    }

    let mps = MpStorage::new(app.db.pool.clone()).list_mps().await?;
    let position = |name: String| mps.iter().position(|mp| mp.fields.name == name);
    let abe = position(format!("Abe {}", suffix)).expect("Abe listed");
    let zed = position(format!("Zed {}", suffix)).expect("Zed listed");
    assert!(abe < zed);

    Ok(())
}

#[tokio::test]
#[ignore]
async fn rejected_mp_is_not_stored() -> anyhow::Result<()> {
    let app = setup().await?;
    let storage = MpStorage::new(app.db.pool.clone());
    let before = storage.list_mps().await?.len();

    let form = format!(
        "title=Hon&name={}&party=Independent&constituency=Canberra&address=Parliament+House&postcode=2600",
        "x".repeat(101)
    );
    let response = app.post("/mps/new", &form).await?;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    assert_eq!(storage.list_mps().await?.len(), before);
    Ok(())
}

#[tokio::test]
#[ignore]
async fn mp_postcode_edit_keeps_other_fields() -> anyhow::Result<()> {
    let app = setup().await?;
    let storage = MpStorage::new(app.db.pool.clone());
    let mp = storage.create_mp(&mp_fields(&unique("Edit"))).await?;

    let response = app
        .post(&format!("/mps/{}/edit", mp.id), "postcode=2601")
        .await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let updated = storage.get_mp(mp.id).await?;
    assert_eq!(updated.fields.postcode, "2601");
    assert_eq!(
        updated.fields,
        MpFields {
            postcode: "2601".to_string(),
            ..mp.fields
        }
    );
    Ok(())
}

#[tokio::test]
#[ignore]
async fn unknown_ids_are_not_found() -> anyhow::Result<()> {
    let app = setup().await?;
    let missing = Uuid::new_v4();

    for response in [
        app.get(&format!("/mps/{}/edit", missing)).await?,
        app.post(&format!("/mps/{}/edit", missing), "postcode=2601")
            .await?,
        app.get(&format!("/mps/{}/delete", missing)).await?,
        app.post(&format!("/mps/{}/delete", missing), "").await?,
        app.get(&format!("/cases/{}", missing)).await?,
        app.get(&format!("/cases/{}/outcome", missing)).await?,
        app.post(&format!("/cases/{}/delete", missing), "").await?,
    ] {
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
    Ok(())
}

#[tokio::test]
#[ignore]
async fn delete_needs_confirmation() -> anyhow::Result<()> {
    let app = setup().await?;
    let storage = MpStorage::new(app.db.pool.clone());
    let mp = storage.create_mp(&mp_fields(&unique("Delete"))).await?;

    let response = app.get(&format!("/mps/{}/delete", mp.id)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(storage.get_mp(mp.id).await.is_ok());

    let response = app.post(&format!("/mps/{}/delete", mp.id), "").await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let err = storage.get_mp(mp.id).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(storage.list_mps().await?.iter().all(|m| m.id != mp.id));
    Ok(())
}

#[tokio::test]
#[ignore]
async fn case_creation_stamps_server_values() -> anyhow::Result<()> {
    let app = setup().await?;
    let title = unique("Briefing notes");

    let before = Utc::now();
    let form = format!(
        "title={}&created_by=mallory&created_date=2000-01-01",
        title.replace(' ', "+")
    );
    let response = app.post("/cases/new", &form).await?;
    let after = Utc::now();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/cases");

    let cases = CaseStorage::new(app.db.pool.clone()).list_cases().await?;
    let case = cases
        .iter()
        .find(|c| c.fields.title == title)
        .expect("case listed");
    assert_eq!(case.created_by, "jsmith");
    assert!(case.created_date >= before - chrono::Duration::seconds(1));
    assert!(case.created_date <= after + chrono::Duration::seconds(1));
    Ok(())
}

#[tokio::test]
#[ignore]
async fn cases_newest_first_and_comments_oldest_first() -> anyhow::Result<()> {
    let app = setup().await?;
    let user = ActingUser::new("jsmith");
    let cases = CaseStorage::new(app.db.pool.clone());
    let comments = CommentStorage::new(app.db.pool.clone());

    let first = cases
        .create_case(
            &CaseFields {
                title: unique("First"),
                ..CaseFields::default()
            },
            &user,
        )
        .await?;
    let second = cases
        .create_case(
            &CaseFields {
                title: unique("Second"),
                ..CaseFields::default()
            },
            &user,
        )
        .await?;

    let listed = cases.list_cases().await?;
    let pos = |id: Uuid| listed.iter().position(|c| c.id == id);
    assert!(pos(second.id) < pos(first.id));

    for subject in ["Called applicant", "Sent acknowledgement"] {
        comments
            .create_comment(
                first.id,
                &CommentFields {
                    subject: subject.to_string(),
                    body: "Done.".to_string(),
                },
                &user,
            )
            .await?;
    }
    let thread = comments.list_for_case(first.id).await?;
    let subjects: Vec<_> = thread.iter().map(|c| c.fields.subject.as_str()).collect();
    assert_eq!(subjects, ["Called applicant", "Sent acknowledgement"]);
    Ok(())
}

#[tokio::test]
#[ignore]
async fn one_record_per_case() -> anyhow::Result<()> {
    let app = setup().await?;
    let case = CaseStorage::new(app.db.pool.clone())
        .create_case(
            &CaseFields {
                title: unique("One-to-one"),
                ..CaseFields::default()
            },
            &ActingUser::new("jsmith"),
        )
        .await?;
    let records = CaseRecordStorage::new(app.db.pool.clone());

    let first: Outcome = records.get_or_create(case.id).await?;
    let again: Outcome = records.get_or_create(case.id).await?;
    assert_eq!(first.id, again.id);

    let err = records.create::<Outcome>(case.id).await.unwrap_err();
    assert!(matches!(err.root(), AppError::Conflict(_)));
    Ok(())
}

#[tokio::test]
#[ignore]
async fn record_screen_creates_then_updates() -> anyhow::Result<()> {
    let app = setup().await?;
    let case = CaseStorage::new(app.db.pool.clone())
        .create_case(
            &CaseFields {
                title: unique("Outcome"),
                ..CaseFields::default()
            },
            &ActingUser::new("jsmith"),
        )
        .await?;
    let records = CaseRecordStorage::new(app.db.pool.clone());
    assert!(records.find::<Outcome>(case.id).await?.is_none());

    let response = app.get(&format!("/cases/{}/outcome", case.id)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(records.find::<Outcome>(case.id).await?.is_some());

    let response = app
        .post(&format!("/cases/{}/outcome", case.id), "foi_outcome=DNE")
        .await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/cases/{}", case.id));

    let outcome = records
        .find::<Outcome>(case.id)
        .await?
        .expect("outcome exists");
    assert_eq!(
        outcome.fields.foi_outcome,
        Some(FoiOutcome::DocumentsDoNotExist)
    );
    Ok(())
}

#[tokio::test]
#[ignore]
async fn deleting_case_removes_dependents() -> anyhow::Result<()> {
    let app = setup().await?;
    let user = ActingUser::new("jsmith");
    let cases = CaseStorage::new(app.db.pool.clone());
    let case = cases
        .create_case(
            &CaseFields {
                title: unique("Cascade"),
                ..CaseFields::default()
            },
            &user,
        )
        .await?;
    let comments = CommentStorage::new(app.db.pool.clone());
    comments
        .create_comment(
            case.id,
            &CommentFields {
                subject: "Note".to_string(),
                body: "Body".to_string(),
            },
            &user,
        )
        .await?;
    let records = CaseRecordStorage::new(app.db.pool.clone());
    records.create::<Assessment>(case.id).await?;

    let response = app.post(&format!("/cases/{}/delete", case.id), "").await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    assert!(cases.get_case(case.id).await.unwrap_err().is_not_found());
    assert!(comments.list_for_case(case.id).await?.is_empty());
    assert!(records.find::<Assessment>(case.id).await?.is_none());
    Ok(())
}

#[tokio::test]
#[ignore]
async fn rejected_mp_edit_redisplays_stored_values() -> anyhow::Result<()> {
    let app = setup().await?;
    let storage = MpStorage::new(app.db.pool.clone());
    let mp = storage.create_mp(&mp_fields(&unique("Redisplay"))).await?;

    let response = app
        .post(&format!("/mps/{}/edit", mp.id), "name=&postcode=2601")
        .await?;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = json_body(response).await?;
    assert_eq!(body["errors"]["name"][0], "This field is required.");
    assert_eq!(body["form"]["name"], "");
    assert_eq!(body["form"]["postcode"], "2601");
    assert_eq!(body["form"]["address"], "Parliament House");
    assert_eq!(body["form"]["party"], "Independent");

    assert_eq!(storage.get_mp(mp.id).await?.fields, mp.fields);
    Ok(())
}

#[tokio::test]
#[ignore]
async fn comment_on_missing_case_is_not_found() -> anyhow::Result<()> {
    let app = setup().await?;
    let missing = Uuid::new_v4();

    let uri = format!("/cases/{}/comments/new", missing);
    assert_eq!(app.get(&uri).await?.status(), StatusCode::NOT_FOUND);
    for form in ["subject=Called+applicant&body=", "subject=Called+applicant&body=Voicemail"] {
        assert_eq!(app.post(&uri, form).await?.status(), StatusCode::NOT_FOUND);
    }
    Ok(())
}

#[tokio::test]
#[ignore]
async fn comment_body_is_required() -> anyhow::Result<()> {
    let app = setup().await?;
    let case = CaseStorage::new(app.db.pool.clone())
        .create_case(
            &CaseFields {
                title: unique("Comments"),
                ..CaseFields::default()
            },
            &ActingUser::new("jsmith"),
        )
        .await?;

    let response = app
        .post(
            &format!("/cases/{}/comments/new", case.id),
            "subject=Called+applicant&body=",
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await?;
    assert_eq!(body["errors"]["body"][0], "This field is required.");

    let comments = CommentStorage::new(app.db.pool.clone());
    assert!(comments.list_for_case(case.id).await?.is_empty());
    Ok(())
}

#[tokio::test]
#[ignore]
async fn null_characters_are_a_form_error() -> anyhow::Result<()> {
    let app = setup().await?;
    let storage = MpStorage::new(app.db.pool.clone());

    let response = app
        .post(
            "/mps/new",
            "title=Hon&name=a%00b&party=Independent&constituency=Canberra&address=Parliament+House&postcode=2600",
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await?;
    assert_eq!(body["errors"]["name"][0], "Null characters are not allowed.");

    assert!(storage.list_mps().await?.iter().all(|m| m.fields.name != "a\0b"));
    Ok(())
}
