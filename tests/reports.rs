mod common;

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn empty_dashboard_is_zero_filled() {
    let app = TestApp::new().await;
    let (status, dashboard) = app.get("/api/reports/dashboard").await;
    assert_eq!(status, StatusCode::OK, "{dashboard}");
    assert_eq!(dashboard["total_projects"], 0);
    assert_eq!(
        dashboard["projects_by_stage"],
        json!({ "deployment": 0, "design": 0, "development": 0, "testing": 0 })
    );
    assert_eq!(dashboard["bugs_by_status"]["reopened"], 0);
    assert!(dashboard["uat"]["pass_rate"].is_null());
    assert_eq!(dashboard["recent_deployments"], json!([]));
}

#[tokio::test]
async fn dashboard_counts_live_projects_only() {
    let app = TestApp::new().await;
    let client_id = app.create_client("c@clients.test").await;
    let kept = app.create_project(client_id, "Kept").await;
    let dropped = app.create_project(client_id, "Dropped").await;
    app.post("/api/bugs", json!({ "project_id": kept, "title": "a" })).await;
    app.post("/api/bugs", json!({ "project_id": dropped, "title": "b" }))
        .await;
    app.delete(&format!("/api/projects/{dropped}")).await;

    let (_, dashboard) = app.get("/api/reports/dashboard").await;
    assert_eq!(dashboard["total_projects"], 1);
    assert_eq!(dashboard["projects_by_stage"]["design"], 1);
    assert_eq!(dashboard["bugs_by_status"]["open"], 1);
    assert_eq!(dashboard["open_bugs_by_severity"]["medium"], 1);
    assert_eq!(dashboard["active_clients"], 1);
}

#[tokio::test]
async fn project_report_rolls_up_everything() {
    let app = TestApp::new().await;
    let project_id = app.seed_project().await;
    app.put(
        &format!("/api/projects/{project_id}"),
        json!({ "budget_hours": 100.0 }),
    )
    .await;
    app.post(
        "/api/time-entries",
        json!({
            "project_id": project_id,
            "work_date": "2024-05-01",
            "hours": 10.0,
            "description": "setup",
            "billable": false
        }),
    )
    .await;
    let (_, case) = app
        .post(
            "/api/test-cases",
            json!({ "project_id": project_id, "title": "Login", "expected_result": "ok" }),
        )
        .await;
    app.post(
        &format!("/api/test-cases/{}/result", case["id"]),
        json!({ "status": "passed" }),
    )
    .await;
    app.post(
        "/api/deployments",
        json!({ "project_id": project_id, "environment": "production", "version": "1.0" }),
    )
    .await;
    app.post(&format!("/api/projects/{project_id}/stage/advance"), json!({}))
        .await;

    let (status, report) = app.get(&format!("/api/projects/{project_id}/report")).await;
    assert_eq!(status, StatusCode::OK, "{report}");
    assert_eq!(report["project"]["stage"], "development");
    assert_eq!(report["client"]["email"], "owner@acme.test");
    assert_eq!(report["total_hours"], 10.0);
    assert_eq!(report["billable_hours"], 0.0);
    assert_eq!(report["remaining_budget_hours"], 90.0);
    assert_eq!(report["uat"]["pass_rate"], 1.0);
    assert_eq!(report["stage_history"].as_array().unwrap().len(), 1);

    let latest = report["latest_deployments"].as_array().unwrap();
    assert_eq!(latest.len(), 3);
    let production = latest
        .iter()
        .find(|d| d["environment"] == "production")
        .unwrap();
    assert_eq!(production["deployment"]["version"], "1.0");
    let staging = latest.iter().find(|d| d["environment"] == "staging").unwrap();
    assert!(staging["deployment"].is_null());
}

#[tokio::test]
async fn report_for_missing_project_is_404() {
    let app = TestApp::new().await;
    let (status, _) = app.get("/api/projects/404/report").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
