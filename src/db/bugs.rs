use sqlx::{QueryBuilder, Sqlite};

use super::{now, push_page, Database};
use crate::error::{AppError, AppResult};
use crate::models::{Bug, BugFilter, BugStatus, BugUpdate, NewBug, Page, PageRequest};

const BUG_COLUMNS: &str = "id, project_id, title, description, severity, status, reported_by, \
     assigned_to, resolved_at, created_at, updated_at";

fn push_bug_filters(builder: &mut QueryBuilder<'_, Sqlite>, filter: &BugFilter) {
    builder.push(" WHERE 1 = 1");
    if let Some(project_id) = filter.project_id {
        builder.push(" AND project_id = ").push_bind(project_id);
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(severity) = filter.severity {
        builder.push(" AND severity = ").push_bind(severity);
    }
    if let Some(assigned_to) = filter.assigned_to {
        builder.push(" AND assigned_to = ").push_bind(assigned_to);
    }
}

impl Database {
    pub async fn create_bug(&self, bug: &NewBug, reported_by: i64) -> AppResult<Bug> {
        bug.validate()?;
        self.ensure_project(bug.project_id).await?;
        if let Some(assignee) = bug.assigned_to {
            self.ensure_user(assignee).await?;
        }
        let now = now();

        let id = sqlx::query(
            r#"
            INSERT INTO bugs (project_id, title, description, severity, status, reported_by,
                              assigned_to, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(bug.project_id)
        .bind(bug.title.trim())
        .bind(&bug.description)
        .bind(bug.severity)
        .bind(BugStatus::Open)
        .bind(reported_by)
        .bind(bug.assigned_to)
        .bind(now)
        .bind(now)
        .execute(self.get_pool())
        .await?
        .last_insert_rowid();

        tracing::info!(bug_id = id, project_id = bug.project_id, "bug reported");
        self.get_bug(id).await
    }

    pub async fn get_bug(&self, id: i64) -> AppResult<Bug> {
        sqlx::query_as::<_, Bug>(&format!("SELECT {BUG_COLUMNS} FROM bugs WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.get_pool())
            .await?
            .ok_or(AppError::NotFound("bug"))
    }

    pub async fn list_bugs(&self, filter: &BugFilter) -> AppResult<Page<Bug>> {
        let page = PageRequest::new(filter.page, filter.per_page)?;

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM bugs");
        push_bug_filters(&mut count, filter);
        let total = self.count(count).await?;

        let mut select = QueryBuilder::new(format!("SELECT {BUG_COLUMNS} FROM bugs"));
        push_bug_filters(&mut select, filter);
        select.push(" ORDER BY created_at DESC, id DESC");
        push_page(&mut select, page);
        let bugs = select
            .build_query_as::<Bug>()
            .fetch_all(self.get_pool())
            .await?;

        Ok(Page::new(bugs, page, total))
    }

    pub async fn update_bug(&self, id: i64, update: BugUpdate) -> AppResult<Bug> {
        let mut bug = self.get_bug(id).await?;
        if let Some(Some(assignee)) = update.assigned_to {
            if bug.assigned_to != Some(assignee) {
                self.ensure_user(assignee).await?;
            }
        }
        update.apply(&mut bug);
        bug.title = bug.title.trim().to_string();
        bug.validate()?;

        sqlx::query(
            r#"
            UPDATE bugs
            SET title = ?, description = ?, severity = ?, assigned_to = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&bug.title)
        .bind(&bug.description)
        .bind(bug.severity)
        .bind(bug.assigned_to)
        .bind(now())
        .bind(id)
        .execute(self.get_pool())
        .await?;

        self.get_bug(id).await
    }

    /// Unconditional status write. `resolved_at` follows the new status.
    pub async fn set_bug_status(&self, id: i64, status: BugStatus) -> AppResult<Bug> {
        let bug = self.get_bug(id).await?;
        let now = now();
        let resolved_at = status.resolution_stamp(bug.resolved_at, now);

        sqlx::query("UPDATE bugs SET status = ?, resolved_at = ?, updated_at = ? WHERE id = ?")
            .bind(status)
            .bind(resolved_at)
            .bind(now)
            .bind(id)
            .execute(self.get_pool())
            .await?;

        tracing::info!(
            bug_id = id,
            from = bug.status.as_str(),
            to = status.as_str(),
            "bug status changed"
        );
        self.get_bug(id).await
    }

    pub async fn delete_bug(&self, id: i64) -> AppResult<()> {
        let affected = sqlx::query("DELETE FROM bugs WHERE id = ?")
            .bind(id)
            .execute(self.get_pool())
            .await?
            .rows_affected();
        if affected == 0 {
            return Err(AppError::NotFound("bug"));
        }
        Ok(())
    }
}
