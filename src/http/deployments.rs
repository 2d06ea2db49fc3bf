use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::auth::AuthUser;
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::AppState;
use crate::error::AppResult;
use crate::models::{
    Deployment, DeploymentFilter, DeploymentStatusChange, NewDeployment, Page,
};

pub async fn list_deployments(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiQuery(filter): ApiQuery<DeploymentFilter>,
) -> AppResult<Json<Page<Deployment>>> {
    Ok(Json(state.db.list_deployments(&filter).await?))
}

pub async fn create_deployment(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(deployment): ApiJson<NewDeployment>,
) -> AppResult<(StatusCode, Json<Deployment>)> {
    caller.require_manager()?;
    let deployment = state.db.create_deployment(&deployment, caller.id()).await?;
    Ok((StatusCode::CREATED, Json(deployment)))
}

pub async fn get_deployment(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<Deployment>> {
    Ok(Json(state.db.get_deployment(id).await?))
}

pub async fn set_deployment_status(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(change): ApiJson<DeploymentStatusChange>,
) -> AppResult<Json<Deployment>> {
    caller.require_manager()?;
    Ok(Json(state.db.set_deployment_status(id, &change).await?))
}

pub async fn delete_deployment(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    caller.require_manager()?;
    state.db.delete_deployment(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
