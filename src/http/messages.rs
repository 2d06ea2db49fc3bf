use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::auth::AuthUser;
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::AppState;
use crate::error::AppResult;
use crate::models::{Message, MessageFilter, NewMessage, Page, UnreadCount};

pub async fn list_messages(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiQuery(filter): ApiQuery<MessageFilter>,
) -> AppResult<Json<Page<Message>>> {
    Ok(Json(state.db.list_messages(&filter, caller.id()).await?))
}

pub async fn send_message(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(message): ApiJson<NewMessage>,
) -> AppResult<(StatusCode, Json<Message>)> {
    let message = state.db.create_message(&message, caller.id()).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn get_message(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<Message>> {
    Ok(Json(state.db.get_message(id, caller.id()).await?))
}

pub async fn mark_read(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<Message>> {
    Ok(Json(state.db.mark_message_read(id, caller.id()).await?))
}

pub async fn delete_message(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    state.db.delete_message(id, caller.id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unread_count(
    State(state): State<AppState>,
    caller: AuthUser,
) -> AppResult<Json<UnreadCount>> {
    Ok(Json(state.db.unread_count(caller.id()).await?))
}
