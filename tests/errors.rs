mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::Value;
use tower::ServiceExt;

use common::{error_code, TestApp};
use project_tracker::config::Config;

#[tokio::test]
async fn malformed_json_gets_the_error_envelope() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/clients")
        .header(header::AUTHORIZATION, format!("Bearer {}", app.admin_token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(error_code(&body), "validation_failed");
}

#[tokio::test]
async fn non_numeric_id_is_a_bad_request() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/api/projects/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "validation_failed");
}

#[tokio::test]
async fn pagination_bounds_are_enforced() {
    let app = TestApp::new().await;
    for query in ["page=0", "per_page=0", "per_page=101"] {
        let (status, _) = app.get(&format!("/api/projects?{query}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{query}");
    }
    let (_, page) = app.get("/api/projects").await;
    assert_eq!(page["per_page"], 20);
    assert_eq!(page["page"], 1);
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .uri("/healthz")
        .header("x-request-id", "trace-me")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "trace-me");

    let request = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

async fn break_database(app: &TestApp) {
    sqlx::query("DROP TABLE mockups")
        .execute(app.db.get_pool())
        .await
        .unwrap();
}

#[tokio::test]
async fn internal_errors_hide_details_by_default() {
    let app = TestApp::new().await;
    break_database(&app).await;

    let (status, body) = app.get("/api/mockups").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_code(&body), "internal_error");
    assert_eq!(body["error"]["message"], "internal server error");
    assert!(body["error"].get("detail").is_none());
}

#[tokio::test]
async fn internal_errors_show_details_when_enabled() {
    let config = Config {
        expose_error_details: true,
        ..Config::in_memory()
    };
    let app = TestApp::with_config(config).await;
    break_database(&app).await;

    let (status, body) = app.get("/api/mockups").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["message"], "internal server error");
    let detail = body["error"]["detail"].as_str().unwrap();
    assert!(detail.contains("mockups"), "{detail}");
}
