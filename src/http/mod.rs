//! REST surface: router, shared state, and middleware wiring.
//!
//! Every route under `/api` except login resolves the caller through the
//! [`auth::AuthUser`] extractor. Handlers stay thin and delegate to
//! [`Database`]; role checks happen in the handler before any write.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::HeaderValue;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::db::Database;
use crate::error::AppResult;
use crate::models::Dashboard;

pub mod auth;
mod bugs;
mod clients;
mod deployments;
pub mod extract;
mod messages;
mod middleware;
mod mockups;
mod projects;
mod test_cases;
mod time_entries;
mod users;

use self::auth::AuthUser;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.config.token_ttl_hours)
    }
}

fn cors_layer(config: &Config) -> Result<CorsLayer> {
    match &config.cors_origin {
        Some(origin) => {
            let origin = HeaderValue::from_str(origin)
                .with_context(|| format!("invalid CORS_ORIGIN {origin:?}"))?;
            Ok(CorsLayer::new()
                .allow_origin(origin)
                .allow_methods(Any)
                .allow_headers(Any))
        }
        None => Ok(CorsLayer::permissive()),
    }
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route(
            "/clients",
            get(clients::list_clients).post(clients::create_client),
        )
        .route(
            "/clients/:id",
            get(clients::get_client)
                .put(clients::update_client)
                .delete(clients::delete_client),
        )
        .route(
            "/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/projects/:id",
            get(projects::get_project)
                .put(projects::update_project)
                .delete(projects::delete_project),
        )
        .route("/projects/:id/stage", put(projects::set_stage))
        .route("/projects/:id/stage/advance", post(projects::advance_stage))
        .route("/projects/:id/stages", get(projects::stage_history))
        .route(
            "/projects/:id/team",
            get(projects::list_team).post(projects::add_team_member),
        )
        .route(
            "/projects/:id/team/:user_id",
            axum::routing::delete(projects::remove_team_member),
        )
        .route("/projects/:id/report", get(projects::project_report))
        .route("/bugs", get(bugs::list_bugs).post(bugs::create_bug))
        .route(
            "/bugs/:id",
            get(bugs::get_bug)
                .put(bugs::update_bug)
                .delete(bugs::delete_bug),
        )
        .route("/bugs/:id/status", patch(bugs::set_bug_status))
        .route(
            "/test-cases",
            get(test_cases::list_test_cases).post(test_cases::create_test_case),
        )
        .route(
            "/test-cases/:id",
            get(test_cases::get_test_case)
                .put(test_cases::update_test_case)
                .delete(test_cases::delete_test_case),
        )
        .route("/test-cases/:id/result", post(test_cases::record_result))
        .route(
            "/messages",
            get(messages::list_messages).post(messages::send_message),
        )
        .route("/messages/unread-count", get(messages::unread_count))
        .route(
            "/messages/:id",
            get(messages::get_message).delete(messages::delete_message),
        )
        .route("/messages/:id/read", patch(messages::mark_read))
        .route(
            "/time-entries",
            get(time_entries::list_time_entries).post(time_entries::create_time_entry),
        )
        .route("/time-entries/summary", get(time_entries::time_summary))
        .route(
            "/time-entries/:id",
            get(time_entries::get_time_entry)
                .put(time_entries::update_time_entry)
                .delete(time_entries::delete_time_entry),
        )
        .route(
            "/deployments",
            get(deployments::list_deployments).post(deployments::create_deployment),
        )
        .route(
            "/deployments/:id",
            get(deployments::get_deployment).delete(deployments::delete_deployment),
        )
        .route(
            "/deployments/:id/status",
            patch(deployments::set_deployment_status),
        )
        .route(
            "/mockups",
            get(mockups::list_mockups).post(mockups::create_mockup),
        )
        .route(
            "/mockups/:id",
            get(mockups::get_mockup)
                .put(mockups::update_mockup)
                .delete(mockups::delete_mockup),
        )
        .route("/mockups/:id/review", patch(mockups::review_mockup))
        .route("/reports/dashboard", get(dashboard))
}

/// Build the application router with its middleware stack.
pub fn router(state: AppState) -> Result<Router> {
    let cors = cors_layer(&state.config)?;
    let router = Router::new()
        .route("/healthz", get(healthz))
        .nest("/api", api_routes())
        .layer(from_fn_with_state(state.clone(), middleware::error_details))
        .layer(from_fn(middleware::request_tracing))
        .layer(cors)
        .with_state(state);
    Ok(router)
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(state: AppState, listener: TcpListener, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state)?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;
    tracing::info!("server stopped");
    Ok(())
}

async fn healthz(State(state): State<AppState>) -> AppResult<Json<Value>> {
    state.db.ping().await?;
    Ok(Json(json!({ "status": "ok" })))
}

async fn dashboard(State(state): State<AppState>, _caller: AuthUser) -> AppResult<Json<Dashboard>> {
    Ok(Json(state.db.dashboard().await?))
}
