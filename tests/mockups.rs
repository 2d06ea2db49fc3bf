mod common;

use axum::http::{Method, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::json;

use common::TestApp;
use project_tracker::models::Role;

#[tokio::test]
async fn review_then_revise() {
    let app = TestApp::new().await;
    let project_id = app.seed_project().await;
    let (_, client_token) = app.user("buyer@acme.test", Role::Client).await;

    let (status, mockup) = app
        .post(
            "/api/mockups",
            json!({
                "project_id": project_id,
                "title": "Home page",
                "url": "https://designs.test/home-v1.png"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{mockup}");
    assert_eq!(mockup["version"], 1);
    assert_eq!(mockup["status"], "draft");
    let id = mockup["id"].as_i64().unwrap();

    let (status, reviewed) = app
        .request(
            Method::PATCH,
            &format!("/api/mockups/{id}/review"),
            Some(&client_token),
            json!({ "status": "rejected", "feedback": "Logo too small" }).into(),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{reviewed}");
    assert_eq!(reviewed["status"], "rejected");
    assert_eq!(reviewed["feedback"], "Logo too small");

    // Renaming keeps the revision; a new image starts a fresh one.
    let (_, renamed) = app
        .put(&format!("/api/mockups/{id}"), json!({ "title": "Landing page" }))
        .await;
    assert_eq!(renamed["version"], 1);
    assert_eq!(renamed["status"], "rejected");

    let (_, revised) = app
        .put(
            &format!("/api/mockups/{id}"),
            json!({ "url": "https://designs.test/home-v2.png" }),
        )
        .await;
    assert_eq!(revised["version"], 2);
    assert_eq!(revised["status"], "draft");
    assert!(revised["feedback"].is_null());
}

#[tokio::test]
async fn clients_cannot_upload_mockups() {
    let app = TestApp::new().await;
    let project_id = app.seed_project().await;
    let (_, token) = app.user("buyer@acme.test", Role::Client).await;
    let (status, _) = app
        .request(
            Method::POST,
            "/api/mockups",
            Some(&token),
            json!({ "project_id": project_id, "title": "x", "url": "https://x.test" }).into(),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
