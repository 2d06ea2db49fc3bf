use chrono::{DateTime, Duration, Utc};

use super::{now, Database};
use crate::auth::{generate_token, hash_token, verify_password};
use crate::error::{AppError, AppResult};
use crate::models::{LoginResponse, User};

impl Database {
    /// Check credentials and open a session. Unknown email and wrong
    /// password are indistinguishable to the caller.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        ttl: Duration,
    ) -> AppResult<LoginResponse> {
        let Some(user) = self.find_user_by_email(email).await? else {
            tracing::info!("login rejected: unknown email");
            return Err(AppError::Unauthorized);
        };
        if !verify_password(password, &user.password_hash) {
            tracing::info!(user_id = user.id, "login rejected: bad password");
            return Err(AppError::Unauthorized);
        }

        let (token, expires_at) = self.create_session(user.id, ttl).await?;
        tracing::info!(user_id = user.id, "session opened");
        Ok(LoginResponse {
            token,
            expires_at,
            user,
        })
    }

    pub async fn create_session(
        &self,
        user_id: i64,
        ttl: Duration,
    ) -> AppResult<(String, DateTime<Utc>)> {
        let token = generate_token();
        let created_at = now();
        let expires_at = created_at + ttl;

        sqlx::query(
            "INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(hash_token(&token))
        .bind(user_id)
        .bind(created_at)
        .bind(expires_at)
        .execute(self.get_pool())
        .await?;

        Ok((token, expires_at))
    }

    /// Resolve a bearer token to its live user. Expired sessions are purged.
    pub async fn user_for_token(&self, token: &str) -> AppResult<Option<User>> {
        let token_hash = hash_token(token);
        let session: Option<(i64, DateTime<Utc>)> =
            sqlx::query_as("SELECT user_id, expires_at FROM sessions WHERE token_hash = ?")
                .bind(&token_hash)
                .fetch_optional(self.get_pool())
                .await?;

        let Some((user_id, expires_at)) = session else {
            return Ok(None);
        };
        if expires_at <= now() {
            sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
                .bind(&token_hash)
                .execute(self.get_pool())
                .await?;
            return Ok(None);
        }

        match self.get_user(user_id).await {
            Ok(user) => Ok(Some(user)),
            Err(AppError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn delete_session(&self, token: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(hash_token(token))
            .execute(self.get_pool())
            .await?;
        Ok(())
    }
}
