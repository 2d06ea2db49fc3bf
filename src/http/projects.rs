use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::auth::AuthUser;
use super::extract::{ApiJson, ApiPath, ApiQuery, OptionalJson};
use super::AppState;
use crate::error::AppResult;
use crate::models::{
    NewMember, NewProject, Page, Project, ProjectFilter, ProjectMember, ProjectReport,
    ProjectUpdate, StageAdvance, StageChange, StageWrite,
};

pub async fn list_projects(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiQuery(filter): ApiQuery<ProjectFilter>,
) -> AppResult<Json<Page<Project>>> {
    Ok(Json(state.db.list_projects(&filter).await?))
}

pub async fn create_project(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(project): ApiJson<NewProject>,
) -> AppResult<(StatusCode, Json<Project>)> {
    caller.require_manager()?;
    let project = state.db.create_project(&project).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<Project>> {
    Ok(Json(state.db.get_project(id).await?))
}

pub async fn update_project(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(update): ApiJson<ProjectUpdate>,
) -> AppResult<Json<Project>> {
    caller.require_manager()?;
    Ok(Json(state.db.update_project(id, update).await?))
}

pub async fn delete_project(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    caller.require_manager()?;
    state.db.delete_project(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_stage(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(write): ApiJson<StageWrite>,
) -> AppResult<Json<Project>> {
    caller.require_manager()?;
    let project = state
        .db
        .set_stage(id, write.stage, caller.id(), write.note)
        .await?;
    Ok(Json(project))
}

pub async fn advance_stage(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
    OptionalJson(body): OptionalJson<StageAdvance>,
) -> AppResult<Json<Project>> {
    caller.require_manager()?;
    let note = body.and_then(|advance| advance.note);
    Ok(Json(state.db.advance_stage(id, caller.id(), note).await?))
}

pub async fn stage_history(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<Vec<StageChange>>> {
    Ok(Json(state.db.stage_history(id).await?))
}

pub async fn list_team(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<Vec<ProjectMember>>> {
    Ok(Json(state.db.list_members(id).await?))
}

pub async fn add_team_member(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(member): ApiJson<NewMember>,
) -> AppResult<(StatusCode, Json<ProjectMember>)> {
    caller.require_manager()?;
    let member = state.db.add_member(id, &member).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn remove_team_member(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath((id, user_id)): ApiPath<(i64, i64)>,
) -> AppResult<StatusCode> {
    caller.require_manager()?;
    state.db.remove_member(id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn project_report(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ProjectReport>> {
    Ok(Json(state.db.project_report(id).await?))
}
