mod common;

use axum::http::{Method, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::json;

use common::TestApp;
use project_tracker::models::Role;

#[tokio::test]
async fn log_time_and_summarise() {
    let app = TestApp::new().await;
    let project_id = app.seed_project().await;
    let (dev_id, dev_token) = app.user("dev@example.com", Role::Developer).await;

    for (date, hours, billable) in [
        ("2024-05-01", 6.0, true),
        ("2024-05-02", 2.5, false),
        ("2024-06-01", 4.0, true),
    ] {
        let (status, body) = app
            .request(
                Method::POST,
                "/api/time-entries",
                Some(&dev_token),
                json!({
                    "project_id": project_id,
                    "work_date": date,
                    "hours": hours,
                    "description": "build checkout",
                    "billable": billable
                })
                .into(),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["user_id"], dev_id);
    }

    let (status, summary) = app
        .get("/api/time-entries/summary?from=2024-05-01&to=2024-05-31")
        .await;
    assert_eq!(status, StatusCode::OK, "{summary}");
    assert_eq!(summary["total_hours"], 8.5);
    assert_eq!(summary["billable_hours"], 6.0);
    assert_eq!(summary["by_project"][0]["project_name"], "Storefront");
    assert_eq!(summary["by_user"][0]["user_id"], dev_id);

    let (_, page) = app.get(&format!("/api/time-entries?user_id={dev_id}")).await;
    assert_eq!(page["total"], 3);
    assert_eq!(page["data"][0]["work_date"], "2024-06-01");
}

#[tokio::test]
async fn hours_are_bounded() {
    let app = TestApp::new().await;
    let project_id = app.seed_project().await;
    for hours in [0.0, -1.0, 25.0] {
        let (status, _) = app
            .post(
                "/api/time-entries",
                json!({
                    "project_id": project_id,
                    "work_date": "2024-05-01",
                    "hours": hours,
                    "description": "x"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "hours {hours}");
    }
}

#[tokio::test]
async fn inverted_date_range_is_rejected() {
    let app = TestApp::new().await;
    let (status, _) = app
        .get("/api/time-entries?from=2024-06-01&to=2024-05-01")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn only_owner_or_manager_edits_entries() {
    let app = TestApp::new().await;
    let project_id = app.seed_project().await;
    let (_, dev_token) = app.user("dev@example.com", Role::Developer).await;
    let (_, other_token) = app.user("other@example.com", Role::Developer).await;

    let (_, entry) = app
        .request(
            Method::POST,
            "/api/time-entries",
            Some(&dev_token),
            json!({
                "project_id": project_id,
                "work_date": "2024-05-01",
                "hours": 3.0,
                "description": "review"
            })
            .into(),
        )
        .await;
    let url = format!("/api/time-entries/{}", entry["id"]);

    let (status, _) = app
        .request(Method::PUT, &url, Some(&other_token), json!({ "hours": 1.0 }).into())
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = app
        .request(Method::PUT, &url, Some(&dev_token), json!({ "hours": 3.5 }).into())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["hours"], 3.5);

    let (status, _) = app.delete(&url).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
