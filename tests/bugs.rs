mod common;

use axum::http::{Method, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::json;

use common::TestApp;
use project_tracker::models::Role;

#[tokio::test]
async fn any_user_can_report_a_bug() {
    let app = TestApp::new().await;
    let project_id = app.seed_project().await;
    let (client_user, token) = app.user("buyer@acme.test", Role::Client).await;

    let (status, bug) = app
        .request(
            Method::POST,
            "/api/bugs",
            Some(&token),
            json!({ "project_id": project_id, "title": "Checkout button missing" }).into(),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{bug}");
    assert_eq!(bug["status"], "open");
    assert_eq!(bug["severity"], "medium");
    assert_eq!(bug["reported_by"], client_user);

    // Triage is staff only.
    let (status, _) = app
        .request(
            Method::PATCH,
            &format!("/api/bugs/{}/status", bug["id"]),
            Some(&token),
            json!({ "status": "closed" }).into(),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn resolving_stamps_and_reopening_clears() {
    let app = TestApp::new().await;
    let project_id = app.seed_project().await;
    let (_, bug) = app
        .post(
            "/api/bugs",
            json!({ "project_id": project_id, "title": "Crash", "severity": "critical" }),
        )
        .await;
    let status_url = format!("/api/bugs/{}/status", bug["id"]);
    assert!(bug["resolved_at"].is_null());

    let (status, resolved) = app.patch(&status_url, json!({ "status": "resolved" })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(resolved["resolved_at"].is_string());

    let (_, closed) = app.patch(&status_url, json!({ "status": "closed" })).await;
    assert_eq!(closed["resolved_at"], resolved["resolved_at"]);

    let (_, reopened) = app.patch(&status_url, json!({ "status": "reopened" })).await;
    assert!(reopened["resolved_at"].is_null());
}

#[tokio::test]
async fn update_and_filter_bugs() {
    let app = TestApp::new().await;
    let project_id = app.seed_project().await;
    let (dev_id, _) = app.user("dev@example.com", Role::Developer).await;
    let (_, bug) = app
        .post("/api/bugs", json!({ "project_id": project_id, "title": "Typo" }))
        .await;
    app.post("/api/bugs", json!({ "project_id": project_id, "title": "Other" }))
        .await;

    let (status, updated) = app
        .put(
            &format!("/api/bugs/{}", bug["id"]),
            json!({ "assigned_to": dev_id, "severity": "low" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{updated}");
    assert_eq!(updated["assigned_to"], dev_id);

    let (_, page) = app.get(&format!("/api/bugs?assigned_to={dev_id}")).await;
    assert_eq!(page["total"], 1);
    let (_, page) = app.get(&format!("/api/bugs?project_id={project_id}")).await;
    assert_eq!(page["total"], 2);

    let (status, _) = app
        .put(&format!("/api/bugs/{}", bug["id"]), json!({ "assigned_to": 4040 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bug_on_missing_project_is_rejected() {
    let app = TestApp::new().await;
    let (status, _) = app
        .post("/api/bugs", json!({ "project_id": 77, "title": "Ghost" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
