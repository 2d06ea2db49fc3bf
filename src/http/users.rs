use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::auth::AuthUser;
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{NewUser, Page, User, UserFilter, UserUpdate};

pub async fn list_users(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiQuery(filter): ApiQuery<UserFilter>,
) -> AppResult<Json<Page<User>>> {
    Ok(Json(state.db.list_users(&filter).await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(new_user): ApiJson<NewUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    caller.require_admin()?;
    let user = state.db.create_user(&new_user).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    State(state): State<AppState>,
    _caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<User>> {
    Ok(Json(state.db.get_user(id).await?))
}

/// Admins edit anyone; everyone else only their own name, title, and password.
pub async fn update_user(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(update): ApiJson<UserUpdate>,
) -> AppResult<Json<User>> {
    if caller.require_admin().is_err() {
        if caller.id() != id {
            return Err(AppError::forbidden("you can only edit your own account"));
        }
        if !update.is_self_service() {
            return Err(AppError::forbidden(
                "changing email or role requires an admin",
            ));
        }
    }
    Ok(Json(state.db.update_user(id, update).await?))
}

pub async fn delete_user(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    caller.require_admin()?;
    if caller.id() == id {
        return Err(AppError::validation("you cannot delete your own account"));
    }
    state.db.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
