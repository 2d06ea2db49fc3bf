mod common;

use axum::http::{Method, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::task::JoinSet;

use common::{error_code, TestApp};
use project_tracker::models::Role;

#[tokio::test]
async fn create_then_fetch_client() {
    let app = TestApp::new().await;
    let (status, created) = app
        .post(
            "/api/clients",
            json!({ "name": "Globex", "email": "Hank@Globex.com", "company": "Globex Corp" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["email"], "hank@globex.com");

    let id = created["id"].as_i64().unwrap();
    let (status, fetched) = app.get(&format!("/api/clients/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let app = TestApp::new().await;
    app.create_client("ops@initech.com").await;
    let (status, body) = app
        .post(
            "/api/clients",
            json!({ "name": "Initech again", "email": "OPS@initech.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "conflict");
}

#[tokio::test]
async fn updating_to_a_taken_email_conflicts() {
    let app = TestApp::new().await;
    app.create_client("a@clients.test").await;
    let b = app.create_client("b@clients.test").await;

    let (status, _) = app
        .put(&format!("/api/clients/{b}"), json!({ "email": "a@clients.test" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Keeping your own address is fine.
    let (status, body) = app
        .put(
            &format!("/api/clients/{b}"),
            json!({ "email": "b@clients.test", "phone": "555-0100" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["phone"], "555-0100");
}

#[tokio::test]
async fn soft_deleted_client_frees_its_email_and_hides_projects() {
    let app = TestApp::new().await;
    let client_id = app.create_client("gone@clients.test").await;
    let project_id = app.create_project(client_id, "Legacy").await;

    let (status, _) = app.delete(&format!("/api/clients/{client_id}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&format!("/api/clients/{client_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get(&format!("/api/projects/{project_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, page) = app.get("/api/clients").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 0);

    app.create_client("gone@clients.test").await;
}

#[tokio::test]
async fn search_matches_name_and_email() {
    let app = TestApp::new().await;
    app.create_client("first@alpha.test").await;
    app.post(
        "/api/clients",
        json!({ "name": "Beta Works", "email": "hello@beta.test" }),
    )
    .await;

    let (_, page) = app.get("/api/clients?q=beta").await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["data"][0]["name"], "Beta Works");
}

#[tokio::test]
async fn developers_cannot_manage_clients() {
    let app = TestApp::new().await;
    let (_, token) = app.user("dev@example.com", Role::Developer).await;
    let (status, body) = app
        .request(
            Method::POST,
            "/api/clients",
            Some(&token),
            json!({ "name": "Nope", "email": "nope@clients.test" }).into(),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "forbidden");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_duplicate_emails_conflict_instead_of_failing() {
    let (config, _file) = common::file_config(8);
    let app = TestApp::with_config(config).await;

    for round in 0..10 {
        let email = format!("race{round}@clients.test");
        let mut requests = JoinSet::new();
        for n in 0..4 {
            let router = app.router.clone();
            let token = app.admin_token.clone();
            let body = json!({ "name": format!("Racer {n}"), "email": email });
            requests.spawn(async move {
                common::send(router, Method::POST, "/api/clients", Some(&token), Some(body))
                    .await
            });
        }

        let mut created = 0;
        while let Some(joined) = requests.join_next().await {
            let (status, body) = joined.unwrap();
            match status {
                StatusCode::CREATED => created += 1,
                StatusCode::CONFLICT => assert_eq!(error_code(&body), "conflict"),
                other => panic!("round {round}: unexpected {other}: {body}"),
            }
        }
        assert_eq!(created, 1, "round {round}");
    }

    let (_, page) = app.get("/api/clients?per_page=100").await;
    assert_eq!(page["total"], 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_email_changes_conflict() {
    let (config, _file) = common::file_config(8);
    let app = TestApp::with_config(config).await;
    let mut ids = Vec::new();
    for n in 0..4 {
        ids.push(app.create_client(&format!("c{n}@clients.test")).await);
    }

    let mut requests = JoinSet::new();
    for id in ids {
        let router = app.router.clone();
        let token = app.admin_token.clone();
        requests.spawn(async move {
            common::send(
                router,
                Method::PUT,
                &format!("/api/clients/{id}"),
                Some(&token),
                Some(json!({ "email": "shared@clients.test" })),
            )
            .await
            .0
        });
    }

    let mut updated = 0;
    while let Some(joined) = requests.join_next().await {
        match joined.unwrap() {
            StatusCode::OK => updated += 1,
            StatusCode::CONFLICT => {}
            other => panic!("unexpected {other}"),
        }
    }
    assert_eq!(updated, 1);
}
