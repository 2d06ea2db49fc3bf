use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::auth::AuthUser;
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{
    NewTimeEntry, Page, TimeEntry, TimeEntryFilter, TimeEntryUpdate, TimeSummary,
};

/// Entries belong to whoever logged them; managers may correct anyone's.
fn require_owner_or_manager(caller: &AuthUser, entry: &TimeEntry) -> AppResult<()> {
    if entry.user_id == caller.id() || caller.user.role.is_manager() {
        Ok(())
    } else {
        Err(AppError::forbidden(
            "only the owner or a manager can change this time entry",
        ))
    }
}

pub async fn list_time_entries(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiQuery(filter): ApiQuery<TimeEntryFilter>,
) -> AppResult<Json<Page<TimeEntry>>> {
    Ok(Json(state.db.list_time_entries(&filter).await?))
}

pub async fn create_time_entry(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(entry): ApiJson<NewTimeEntry>,
) -> AppResult<(StatusCode, Json<TimeEntry>)> {
    caller.require_staff()?;
    let entry = state.db.create_time_entry(&entry, caller.id()).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn get_time_entry(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<TimeEntry>> {
    Ok(Json(state.db.get_time_entry(id).await?))
}

pub async fn update_time_entry(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(update): ApiJson<TimeEntryUpdate>,
) -> AppResult<Json<TimeEntry>> {
    caller.require_staff()?;
    let entry = state.db.get_time_entry(id).await?;
    require_owner_or_manager(&caller, &entry)?;
    Ok(Json(state.db.update_time_entry(id, update).await?))
}

pub async fn delete_time_entry(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    caller.require_staff()?;
    let entry = state.db.get_time_entry(id).await?;
    require_owner_or_manager(&caller, &entry)?;
    state.db.delete_time_entry(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn time_summary(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiQuery(filter): ApiQuery<TimeEntryFilter>,
) -> AppResult<Json<TimeSummary>> {
    Ok(Json(state.db.time_summary(&filter).await?))
}
