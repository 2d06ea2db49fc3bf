use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::auth::AuthUser;
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::AppState;
use crate::error::AppResult;
use crate::models::{Bug, BugFilter, BugStatusChange, BugUpdate, NewBug, Page};

pub async fn list_bugs(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiQuery(filter): ApiQuery<BugFilter>,
) -> AppResult<Json<Page<Bug>>> {
    Ok(Json(state.db.list_bugs(&filter).await?))
}

// Any role may report a bug, clients included.
pub async fn create_bug(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(bug): ApiJson<NewBug>,
) -> AppResult<(StatusCode, Json<Bug>)> {
    let bug = state.db.create_bug(&bug, caller.id()).await?;
    Ok((StatusCode::CREATED, Json(bug)))
}

pub async fn get_bug(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<Bug>> {
    Ok(Json(state.db.get_bug(id).await?))
}

pub async fn update_bug(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(update): ApiJson<BugUpdate>,
) -> AppResult<Json<Bug>> {
    caller.require_staff()?;
    Ok(Json(state.db.update_bug(id, update).await?))
}

pub async fn set_bug_status(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(change): ApiJson<BugStatusChange>,
) -> AppResult<Json<Bug>> {
    caller.require_staff()?;
    Ok(Json(state.db.set_bug_status(id, change.status).await?))
}

pub async fn delete_bug(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    caller.require_staff()?;
    state.db.delete_bug(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
