use sqlx::{QueryBuilder, Sqlite};

use super::{clean_optional, like_pattern, normalize_email, now, push_page, Database};
use crate::auth::hash_password;
use crate::error::{AppError, AppResult};
use crate::models::{NewUser, Page, PageRequest, User, UserFilter, UserUpdate};

const USER_COLUMNS: &str = "id, name, email, role, title, password_hash, created_at, updated_at";

fn push_user_filters(builder: &mut QueryBuilder<'_, Sqlite>, filter: &UserFilter) {
    builder.push(" WHERE deleted_at IS NULL");
    if let Some(pattern) = like_pattern(filter.q.as_deref()) {
        builder
            .push(" AND (name LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR email LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
    if let Some(role) = filter.role {
        builder.push(" AND role = ").push_bind(role);
    }
}

fn email_taken(email: &str) -> AppError {
    AppError::Conflict(format!("a user with email {email} already exists"))
}

impl Database {
    pub async fn create_user(&self, new_user: &NewUser) -> AppResult<User> {
        new_user.validate()?;
        let email = normalize_email(&new_user.email);
        if self.find_user_by_email(&email).await?.is_some() {
            return Err(email_taken(&email));
        }

        let password_hash = hash_password(&new_user.password)?;
        let now = now();
        // Hashing is slow, so the email may have been claimed since the check above.
        let result = sqlx::query(
            r#"
            INSERT INTO users (name, email, role, title, password_hash, created_at, updated_at)
            SELECT ?, ?, ?, ?, ?, ?, ?
            WHERE NOT EXISTS (SELECT 1 FROM users WHERE email = ? AND deleted_at IS NULL)
            "#,
        )
        .bind(new_user.name.trim())
        .bind(&email)
        .bind(new_user.role)
        .bind(clean_optional(new_user.title.clone()))
        .bind(&password_hash)
        .bind(now)
        .bind(now)
        .bind(&email)
        .execute(self.get_pool())
        .await?;
        if result.rows_affected() == 0 {
            return Err(email_taken(&email));
        }
        let id = result.last_insert_rowid();

        tracing::info!(user_id = id, role = new_user.role.as_str(), "user created");
        self.get_user(id).await
    }

    pub async fn get_user(&self, id: i64) -> AppResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ? AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(self.get_pool())
        .await?
        .ok_or(AppError::NotFound("user"))
    }

    pub async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ? AND deleted_at IS NULL"
        ))
        .bind(normalize_email(email))
        .fetch_optional(self.get_pool())
        .await?;

        Ok(user)
    }

    pub async fn list_users(&self, filter: &UserFilter) -> AppResult<Page<User>> {
        let page = PageRequest::new(filter.page, filter.per_page)?;

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM users");
        push_user_filters(&mut count, filter);
        let total = self.count(count).await?;

        let mut select = QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users"));
        push_user_filters(&mut select, filter);
        select.push(" ORDER BY name ASC, id ASC");
        push_page(&mut select, page);
        let users = select
            .build_query_as::<User>()
            .fetch_all(self.get_pool())
            .await?;

        Ok(Page::new(users, page, total))
    }

    pub async fn update_user(&self, id: i64, update: UserUpdate) -> AppResult<User> {
        update.validate()?;
        let mut user = self.get_user(id).await?;

        if let Some(email) = &update.email {
            let email = normalize_email(email);
            if let Some(other) = self.find_user_by_email(&email).await? {
                if other.id != id {
                    return Err(email_taken(&email));
                }
            }
            user.email = email;
        }
        if let Some(name) = update.name {
            user.name = name.trim().to_string();
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        if let Some(title) = update.title {
            user.title = clean_optional(title);
        }
        if let Some(password) = &update.password {
            user.password_hash = hash_password(password)?;
        }

        let affected = sqlx::query(
            r#"
            UPDATE users
            SET name = ?, email = ?, role = ?, title = ?, password_hash = ?, updated_at = ?
            WHERE id = ? AND deleted_at IS NULL
              AND NOT EXISTS (
                  SELECT 1 FROM users WHERE email = ? AND deleted_at IS NULL AND id != ?
              )
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role)
        .bind(&user.title)
        .bind(&user.password_hash)
        .bind(now())
        .bind(id)
        .bind(&user.email)
        .bind(id)
        .execute(self.get_pool())
        .await?
        .rows_affected();
        if affected == 0 {
            return match self.find_user_by_email(&user.email).await? {
                Some(other) if other.id != id => Err(email_taken(&user.email)),
                _ => Err(AppError::NotFound("user")),
            };
        }

        self.get_user(id).await
    }

    /// Soft-delete the user and revoke every session they hold.
    pub async fn delete_user(&self, id: i64) -> AppResult<()> {
        let mut tx = self.get_pool().begin().await?;

        let affected = sqlx::query(
            "UPDATE users SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(now())
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if affected == 0 {
            return Err(AppError::NotFound("user"));
        }

        sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM project_members WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(user_id = id, "user deleted");
        Ok(())
    }
}
