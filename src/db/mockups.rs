use sqlx::{QueryBuilder, Sqlite};

use super::{clean_optional, now, push_page, Database};
use crate::error::{AppError, AppResult};
use crate::models::{
    Mockup, MockupFilter, MockupReview, MockupStatus, MockupUpdate, NewMockup, Page, PageRequest,
};

const MOCKUP_COLUMNS: &str =
    "id, project_id, title, url, version, status, feedback, created_by, created_at, updated_at";

fn push_mockup_filters(builder: &mut QueryBuilder<'_, Sqlite>, filter: &MockupFilter) {
    builder.push(" WHERE 1 = 1");
    if let Some(project_id) = filter.project_id {
        builder.push(" AND project_id = ").push_bind(project_id);
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }
}

impl Database {
    pub async fn create_mockup(&self, mockup: &NewMockup, created_by: i64) -> AppResult<Mockup> {
        mockup.validate()?;
        self.ensure_project(mockup.project_id).await?;
        let now = now();

        let id = sqlx::query(
            r#"
            INSERT INTO mockups (project_id, title, url, version, status, created_by,
                                 created_at, updated_at)
            VALUES (?, ?, ?, 1, ?, ?, ?, ?)
            "#,
        )
        .bind(mockup.project_id)
        .bind(mockup.title.trim())
        .bind(mockup.url.trim())
        .bind(MockupStatus::Draft)
        .bind(created_by)
        .bind(now)
        .bind(now)
        .execute(self.get_pool())
        .await?
        .last_insert_rowid();

        self.get_mockup(id).await
    }

    pub async fn get_mockup(&self, id: i64) -> AppResult<Mockup> {
        sqlx::query_as::<_, Mockup>(&format!("SELECT {MOCKUP_COLUMNS} FROM mockups WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.get_pool())
            .await?
            .ok_or(AppError::NotFound("mockup"))
    }

    pub async fn list_mockups(&self, filter: &MockupFilter) -> AppResult<Page<Mockup>> {
        let page = PageRequest::new(filter.page, filter.per_page)?;

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM mockups");
        push_mockup_filters(&mut count, filter);
        let total = self.count(count).await?;

        let mut select = QueryBuilder::new(format!("SELECT {MOCKUP_COLUMNS} FROM mockups"));
        push_mockup_filters(&mut select, filter);
        select.push(" ORDER BY id ASC");
        push_page(&mut select, page);
        let mockups = select
            .build_query_as::<Mockup>()
            .fetch_all(self.get_pool())
            .await?;

        Ok(Page::new(mockups, page, total))
    }

    pub async fn update_mockup(&self, id: i64, update: MockupUpdate) -> AppResult<Mockup> {
        let mut mockup = self.get_mockup(id).await?;
        let update = MockupUpdate {
            title: update.title.map(|t| t.trim().to_string()),
            url: update.url.map(|u| u.trim().to_string()),
        };
        update.apply(&mut mockup);
        NewMockup {
            project_id: mockup.project_id,
            title: mockup.title.clone(),
            url: mockup.url.clone(),
        }
        .validate()?;

        sqlx::query(
            r#"
            UPDATE mockups
            SET title = ?, url = ?, version = ?, status = ?, feedback = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&mockup.title)
        .bind(&mockup.url)
        .bind(mockup.version)
        .bind(mockup.status)
        .bind(&mockup.feedback)
        .bind(now())
        .bind(id)
        .execute(self.get_pool())
        .await?;

        self.get_mockup(id).await
    }

    /// Record a review decision. Feedback is kept unless the review sets or clears it.
    pub async fn review_mockup(&self, id: i64, review: &MockupReview) -> AppResult<Mockup> {
        let mockup = self.get_mockup(id).await?;
        let feedback = match &review.feedback {
            Some(feedback) => clean_optional(feedback.clone()),
            None => mockup.feedback,
        };

        sqlx::query("UPDATE mockups SET status = ?, feedback = ?, updated_at = ? WHERE id = ?")
            .bind(review.status)
            .bind(&feedback)
            .bind(now())
            .bind(id)
            .execute(self.get_pool())
            .await?;

        tracing::info!(mockup_id = id, status = review.status.as_str(), "mockup reviewed");
        self.get_mockup(id).await
    }

    pub async fn delete_mockup(&self, id: i64) -> AppResult<()> {
        let affected = sqlx::query("DELETE FROM mockups WHERE id = ?")
            .bind(id)
            .execute(self.get_pool())
            .await?
            .rows_affected();
        if affected == 0 {
            return Err(AppError::NotFound("mockup"));
        }
        Ok(())
    }
}
