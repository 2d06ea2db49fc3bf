use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::auth::AuthUser;
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::AppState;
use crate::error::AppResult;
use crate::models::{Client, ClientFilter, ClientUpdate, NewClient, Page};

pub async fn list_clients(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiQuery(filter): ApiQuery<ClientFilter>,
) -> AppResult<Json<Page<Client>>> {
    Ok(Json(state.db.list_clients(&filter).await?))
}

pub async fn create_client(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(client): ApiJson<NewClient>,
) -> AppResult<(StatusCode, Json<Client>)> {
    caller.require_manager()?;
    let client = state.db.create_client(&client).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn get_client(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<Client>> {
    Ok(Json(state.db.get_client(id).await?))
}

pub async fn update_client(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(update): ApiJson<ClientUpdate>,
) -> AppResult<Json<Client>> {
    caller.require_manager()?;
    Ok(Json(state.db.update_client(id, update).await?))
}

pub async fn delete_client(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    caller.require_manager()?;
    state.db.delete_client(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
