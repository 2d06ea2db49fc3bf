use axum::extract::{FromRequestParts, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;

use super::extract::ApiJson;
use super::AppState;
use crate::auth::parse_bearer;
use crate::error::{AppError, AppResult};
use crate::models::{LoginRequest, LoginResponse, Role, User};

/// The authenticated caller, resolved from the bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    token: String,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_bearer)
            .ok_or(AppError::Unauthorized)?;

        let user = state
            .db
            .user_for_token(token)
            .await?
            .ok_or(AppError::Unauthorized)?;

        tracing::Span::current().record("user_id", user.id);
        Ok(Self {
            user,
            token: token.to_string(),
        })
    }
}

impl AuthUser {
    pub fn id(&self) -> i64 {
        self.user.id
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.user.role == Role::Admin {
            Ok(())
        } else {
            Err(AppError::forbidden("admin role required"))
        }
    }

    pub fn require_manager(&self) -> AppResult<()> {
        if self.user.role.is_manager() {
            Ok(())
        } else {
            Err(AppError::forbidden("admin or manager role required"))
        }
    }

    pub fn require_staff(&self) -> AppResult<()> {
        if self.user.role.is_staff() {
            Ok(())
        } else {
            Err(AppError::forbidden("client accounts cannot do this"))
        }
    }
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let response = state
        .db
        .login(&request.email, &request.password, state.token_ttl())
        .await?;
    Ok(Json(response))
}

pub async fn logout(State(state): State<AppState>, caller: AuthUser) -> AppResult<StatusCode> {
    state.db.delete_session(&caller.token).await?;
    tracing::info!(user_id = caller.id(), "session closed");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(caller: AuthUser) -> Json<User> {
    Json(caller.user)
}
