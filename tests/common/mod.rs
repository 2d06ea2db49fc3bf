#![allow(dead_code)]

use std::path::PathBuf;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use project_tracker::config::Config;
use project_tracker::db::{self, Database};
use project_tracker::http::{self, AppState};
use project_tracker::models::{NewUser, Role};

pub const PASSWORD: &str = "correct horse battery";

pub struct TestApp {
    pub router: Router,
    pub db: Database,
    pub admin_id: i64,
    pub admin_token: String,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(Config::in_memory()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let db = db::init(&config).await.unwrap();
        let router = http::router(AppState::new(db.clone(), config)).unwrap();
        let mut app = Self {
            router,
            db,
            admin_id: 0,
            admin_token: String::new(),
        };
        let (admin_id, admin_token) = app.user("admin@example.com", Role::Admin).await;
        app.admin_id = admin_id;
        app.admin_token = admin_token;
        app
    }

    /// Create an account straight in the database and return its id and a token.
    pub async fn user(&self, email: &str, role: Role) -> (i64, String) {
        let user = self
            .db
            .create_user(&NewUser {
                name: email.split('@').next().unwrap_or(email).to_string(),
                email: email.to_string(),
                password: PASSWORD.to_string(),
                role,
                title: None,
            })
            .await
            .unwrap();
        let login = self
            .db
            .login(email, PASSWORD, chrono::Duration::hours(1))
            .await
            .unwrap();
        (user.id, login.token)
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        send(self.router.clone(), method, uri, token, body).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(&self.admin_token), None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(&self.admin_token), Some(body))
            .await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(&self.admin_token), Some(body))
            .await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, Some(&self.admin_token), Some(body))
            .await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(&self.admin_token), None)
            .await
    }

    pub async fn create_client(&self, email: &str) -> i64 {
        let (status, body) = self
            .post("/api/clients", json!({ "name": "Acme", "email": email }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }

    pub async fn create_project(&self, client_id: i64, name: &str) -> i64 {
        let (status, body) = self
            .post(
                "/api/projects",
                json!({ "client_id": client_id, "name": name }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }

    /// A client plus one project under it.
    pub async fn seed_project(&self) -> i64 {
        let client_id = self.create_client("owner@acme.test").await;
        self.create_project(client_id, "Storefront").await
    }
}

/// Drive one request through a router, for callers that run requests concurrently.
pub async fn send(
    router: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// SQLite file in the temp directory, removed with its WAL files on drop.
pub struct DbFile(PathBuf);

impl Drop for DbFile {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut path = self.0.clone().into_os_string();
            path.push(suffix);
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Configuration backed by a fresh database file with a real connection pool.
pub fn file_config(max_connections: u32) -> (Config, DbFile) {
    let path = std::env::temp_dir().join(format!("project-tracker-{}.db", uuid::Uuid::new_v4()));
    let mut config = Config::in_memory();
    config.database_url = format!("sqlite://{}", path.display());
    config.db_max_connections = max_connections;
    (config, DbFile(path))
}

pub fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}
