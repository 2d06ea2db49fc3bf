mod common;

use axum::http::{Method, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::json;

use common::TestApp;
use project_tracker::models::Role;

#[tokio::test]
async fn direct_messages_stay_between_two_people() {
    let app = TestApp::new().await;
    let (dev_id, dev_token) = app.user("dev@example.com", Role::Developer).await;
    let (_, qa_token) = app.user("qa@example.com", Role::Tester).await;

    let (status, message) = app
        .post(
            "/api/messages",
            json!({ "recipient_id": dev_id, "subject": "Hotfix", "body": "Please look at #12" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{message}");
    let url = format!("/api/messages/{}", message["id"]);

    let (status, _) = app
        .request(Method::GET, &url, Some(&dev_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.request(Method::GET, &url, Some(&qa_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, page) = app
        .request(Method::GET, "/api/messages", Some(&qa_token), None)
        .await;
    assert_eq!(page["total"], 0);
}

#[tokio::test]
async fn unread_count_and_mark_read() {
    let app = TestApp::new().await;
    let (dev_id, dev_token) = app.user("dev@example.com", Role::Developer).await;
    for n in 0..2 {
        app.post(
            "/api/messages",
            json!({ "recipient_id": dev_id, "body": format!("note {n}") }),
        )
        .await;
    }

    let (_, count) = app
        .request(Method::GET, "/api/messages/unread-count", Some(&dev_token), None)
        .await;
    assert_eq!(count, json!({ "count": 2 }));

    let (_, inbox) = app
        .request(
            Method::GET,
            "/api/messages?box=inbox&unread=true",
            Some(&dev_token),
            None,
        )
        .await;
    let first = inbox["data"][0]["id"].as_i64().unwrap();

    // The sender cannot mark the recipient's copy as read.
    let (status, _) = app
        .patch(&format!("/api/messages/{first}/read"), json!({}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, read) = app
        .request(
            Method::PATCH,
            &format!("/api/messages/{first}/read"),
            Some(&dev_token),
            json!({}).into(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(read["read_at"].is_string());

    let (_, again) = app
        .request(
            Method::PATCH,
            &format!("/api/messages/{first}/read"),
            Some(&dev_token),
            json!({}).into(),
        )
        .await;
    assert_eq!(again["read_at"], read["read_at"]);

    let (_, count) = app
        .request(Method::GET, "/api/messages/unread-count", Some(&dev_token), None)
        .await;
    assert_eq!(count["count"], 1);
}

#[tokio::test]
async fn mailbox_splits_inbox_from_sent() {
    let app = TestApp::new().await;
    let (dev_id, dev_token) = app.user("dev@example.com", Role::Developer).await;

    let (status, _) = app
        .post("/api/messages", json!({ "recipient_id": dev_id, "body": "ping" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app
        .request(
            Method::POST,
            "/api/messages",
            Some(&dev_token),
            Some(json!({ "recipient_id": app.admin_id, "body": "pong" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, all) = app
        .request(Method::GET, "/api/messages", Some(&dev_token), None)
        .await;
    assert_eq!(all["total"], 2);

    let (_, inbox) = app
        .request(Method::GET, "/api/messages?box=inbox", Some(&dev_token), None)
        .await;
    assert_eq!(inbox["total"], 1);
    assert_eq!(inbox["data"][0]["body"], "ping");
    assert_eq!(inbox["data"][0]["recipient_id"], dev_id);

    let (_, sent) = app
        .request(Method::GET, "/api/messages?box=sent", Some(&dev_token), None)
        .await;
    assert_eq!(sent["total"], 1);
    assert_eq!(sent["data"][0]["body"], "pong");
    assert_eq!(sent["data"][0]["sender_id"], dev_id);
}

#[tokio::test]
async fn project_threads_are_shared() {
    let app = TestApp::new().await;
    let project_id = app.seed_project().await;
    let (_, dev_token) = app.user("dev@example.com", Role::Developer).await;

    app.post(
        "/api/messages",
        json!({ "project_id": project_id, "body": "Kickoff on Monday" }),
    )
    .await;

    let (_, page) = app
        .request(
            Method::GET,
            &format!("/api/messages?project_id={project_id}"),
            Some(&dev_token),
            None,
        )
        .await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["data"][0]["body"], "Kickoff on Monday");
}

#[tokio::test]
async fn message_needs_a_destination() {
    let app = TestApp::new().await;
    let (status, _) = app.post("/api/messages", json!({ "body": "into the void" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn only_the_sender_deletes() {
    let app = TestApp::new().await;
    let (dev_id, dev_token) = app.user("dev@example.com", Role::Developer).await;
    let (_, message) = app
        .post("/api/messages", json!({ "recipient_id": dev_id, "body": "hi" }))
        .await;
    let url = format!("/api/messages/{}", message["id"]);

    let (status, _) = app
        .request(Method::DELETE, &url, Some(&dev_token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&url).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
