use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::PageRequest;

mod bugs;
mod clients;
mod deployments;
mod messages;
mod mockups;
mod projects;
mod reports;
mod sessions;
mod test_cases;
mod time_entries;
mod users;

/// Database connection pool
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new Database instance with a connection pool
    pub async fn new(config: &Config) -> AppResult<Self> {
        let mut options = SqliteConnectOptions::from_str(config.database_url())?
            .create_if_missing(true)
            .foreign_keys(true);
        if !config.is_in_memory() {
            // Writers queue on the lock instead of failing with SQLITE_BUSY.
            options = options
                .journal_mode(SqliteJournalMode::Wal)
                .busy_timeout(Duration::from_secs(5));
        }

        // Every connection to `sqlite::memory:` opens a separate database, so
        // in-memory pools are pinned to a single connection that never expires.
        let pool = if config.is_in_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(config.db_max_connections)
                .connect_with(options)
                .await?
        };

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Fail with a 400 unless the project exists and is not deleted.
    pub(crate) async fn ensure_project(&self, id: i64) -> AppResult<()> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT id FROM projects WHERE id = ? AND deleted_at IS NULL")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        found
            .map(|_| ())
            .ok_or_else(|| AppError::validation(format!("project {id} does not exist")))
    }

    pub(crate) async fn ensure_user(&self, id: i64) -> AppResult<()> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT id FROM users WHERE id = ? AND deleted_at IS NULL")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        found
            .map(|_| ())
            .ok_or_else(|| AppError::validation(format!("user {id} does not exist")))
    }

    pub(crate) async fn ensure_bug(&self, id: i64) -> AppResult<()> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM bugs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        found
            .map(|_| ())
            .ok_or_else(|| AppError::validation(format!("bug {id} does not exist")))
    }

    /// Run a `SELECT COUNT(*) ...` built by the caller.
    async fn count(&self, mut builder: QueryBuilder<'_, Sqlite>) -> AppResult<i64> {
        let total = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    /// `(key, count)` rows from a grouped count, used by the reports.
    async fn grouped_counts(&self, sql: &str, bind: Option<i64>) -> AppResult<Vec<(String, i64)>> {
        let mut query = sqlx::query_as::<_, (String, i64)>(sql);
        if let Some(value) = bind {
            query = query.bind(value);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }
}

pub(crate) fn now() -> DateTime<Utc> {
    Utc::now()
}

pub(crate) fn push_page(builder: &mut QueryBuilder<'_, Sqlite>, page: PageRequest) {
    builder
        .push(" LIMIT ")
        .push_bind(page.per_page)
        .push(" OFFSET ")
        .push_bind(page.offset());
}

/// `%term%` for a LIKE search, or `None` for a blank term.
pub(crate) fn like_pattern(term: Option<&str>) -> Option<String> {
    let term = term?.trim();
    if term.is_empty() {
        return None;
    }
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Some(format!("%{escaped}%"))
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trimmed copy of optional text, with blanks collapsed to `None`.
pub(crate) fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Initialize the database connection pool and bring the schema up to date
pub async fn init(config: &Config) -> AppResult<Database> {
    let db = Database::new(config).await?;
    db.migrate().await?;
    Ok(db)
}
