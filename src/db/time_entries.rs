use sqlx::{QueryBuilder, Sqlite};

use super::{now, push_page, Database};
use crate::error::{AppError, AppResult};
use crate::models::{
    HoursByProject, HoursByUser, NewTimeEntry, Page, PageRequest, TimeEntry, TimeEntryFilter,
    TimeEntryUpdate, TimeSummary,
};

const TIME_ENTRY_COLUMNS: &str = "t.id, t.user_id, t.project_id, t.bug_id, t.work_date, t.hours, \
     t.description, t.billable, t.created_at, t.updated_at";

// Callers alias time_entries as `t`
fn push_time_entry_filters(builder: &mut QueryBuilder<'_, Sqlite>, filter: &TimeEntryFilter) {
    builder.push(" WHERE 1 = 1");
    if let Some(user_id) = filter.user_id {
        builder.push(" AND t.user_id = ").push_bind(user_id);
    }
    if let Some(project_id) = filter.project_id {
        builder.push(" AND t.project_id = ").push_bind(project_id);
    }
    if let Some(from) = filter.from {
        builder.push(" AND t.work_date >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        builder.push(" AND t.work_date <= ").push_bind(to);
    }
}

impl Database {
    pub async fn create_time_entry(&self, entry: &NewTimeEntry, user_id: i64) -> AppResult<TimeEntry> {
        entry.validate()?;
        self.ensure_project(entry.project_id).await?;
        if let Some(bug_id) = entry.bug_id {
            self.ensure_bug(bug_id).await?;
        }
        let now = now();

        let id = sqlx::query(
            r#"
            INSERT INTO time_entries (user_id, project_id, bug_id, work_date, hours, description,
                                      billable, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(entry.project_id)
        .bind(entry.bug_id)
        .bind(entry.work_date)
        .bind(entry.hours)
        .bind(entry.description.trim())
        .bind(entry.billable)
        .bind(now)
        .bind(now)
        .execute(self.get_pool())
        .await?
        .last_insert_rowid();

        tracing::info!(time_entry_id = id, user_id, hours = entry.hours, "time logged");
        self.get_time_entry(id).await
    }

    pub async fn get_time_entry(&self, id: i64) -> AppResult<TimeEntry> {
        sqlx::query_as::<_, TimeEntry>(&format!(
            "SELECT {TIME_ENTRY_COLUMNS} FROM time_entries t WHERE t.id = ?"
        ))
        .bind(id)
        .fetch_optional(self.get_pool())
        .await?
        .ok_or(AppError::NotFound("time entry"))
    }

    pub async fn list_time_entries(&self, filter: &TimeEntryFilter) -> AppResult<Page<TimeEntry>> {
        filter.validate()?;
        let page = PageRequest::new(filter.page, filter.per_page)?;

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM time_entries t");
        push_time_entry_filters(&mut count, filter);
        let total = self.count(count).await?;

        let mut select =
            QueryBuilder::new(format!("SELECT {TIME_ENTRY_COLUMNS} FROM time_entries t"));
        push_time_entry_filters(&mut select, filter);
        select.push(" ORDER BY t.work_date DESC, t.id DESC");
        push_page(&mut select, page);
        let entries = select
            .build_query_as::<TimeEntry>()
            .fetch_all(self.get_pool())
            .await?;

        Ok(Page::new(entries, page, total))
    }

    pub async fn update_time_entry(&self, id: i64, update: TimeEntryUpdate) -> AppResult<TimeEntry> {
        let mut entry = self.get_time_entry(id).await?;
        if let Some(project_id) = update.project_id {
            if project_id != entry.project_id {
                self.ensure_project(project_id).await?;
            }
        }
        if let Some(Some(bug_id)) = update.bug_id {
            self.ensure_bug(bug_id).await?;
        }
        update.apply(&mut entry);
        entry.description = entry.description.trim().to_string();
        entry.validate()?;

        sqlx::query(
            r#"
            UPDATE time_entries
            SET project_id = ?, bug_id = ?, work_date = ?, hours = ?, description = ?,
                billable = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(entry.project_id)
        .bind(entry.bug_id)
        .bind(entry.work_date)
        .bind(entry.hours)
        .bind(&entry.description)
        .bind(entry.billable)
        .bind(now())
        .bind(id)
        .execute(self.get_pool())
        .await?;

        self.get_time_entry(id).await
    }

    pub async fn delete_time_entry(&self, id: i64) -> AppResult<()> {
        let affected = sqlx::query("DELETE FROM time_entries WHERE id = ?")
            .bind(id)
            .execute(self.get_pool())
            .await?
            .rows_affected();
        if affected == 0 {
            return Err(AppError::NotFound("time entry"));
        }
        Ok(())
    }

    /// Totals over every entry matching the filter; pagination is ignored.
    pub async fn time_summary(&self, filter: &TimeEntryFilter) -> AppResult<TimeSummary> {
        filter.validate()?;

        let mut totals = QueryBuilder::new(
            "SELECT COALESCE(SUM(t.hours), 0.0), \
             COALESCE(SUM(CASE WHEN t.billable THEN t.hours ELSE 0.0 END), 0.0) \
             FROM time_entries t",
        );
        push_time_entry_filters(&mut totals, filter);
        let (total_hours, billable_hours) = totals
            .build_query_as::<(f64, f64)>()
            .fetch_one(self.get_pool())
            .await?;

        let mut by_project = QueryBuilder::new(
            "SELECT t.project_id, p.name AS project_name, SUM(t.hours) AS hours \
             FROM time_entries t JOIN projects p ON p.id = t.project_id",
        );
        push_time_entry_filters(&mut by_project, filter);
        by_project.push(" GROUP BY t.project_id, p.name ORDER BY hours DESC, t.project_id ASC");
        let by_project = by_project
            .build_query_as::<HoursByProject>()
            .fetch_all(self.get_pool())
            .await?;

        let mut by_user = QueryBuilder::new(
            "SELECT t.user_id, u.name AS user_name, SUM(t.hours) AS hours \
             FROM time_entries t JOIN users u ON u.id = t.user_id",
        );
        push_time_entry_filters(&mut by_user, filter);
        by_user.push(" GROUP BY t.user_id, u.name ORDER BY hours DESC, t.user_id ASC");
        let by_user = by_user
            .build_query_as::<HoursByUser>()
            .fetch_all(self.get_pool())
            .await?;

        Ok(TimeSummary {
            total_hours,
            billable_hours,
            by_project,
            by_user,
        })
    }
}
