use sqlx::{QueryBuilder, Sqlite};

use super::{clean_optional, now, push_page, Database};
use crate::error::{AppError, AppResult};
use crate::models::{
    Deployment, DeploymentFilter, DeploymentStatus, DeploymentStatusChange, NewDeployment, Page,
    PageRequest,
};

pub(crate) const DEPLOYMENT_COLUMNS: &str = "id, project_id, environment, version, status, notes, \
     deployed_by, deployed_at, created_at, updated_at";

fn push_deployment_filters(builder: &mut QueryBuilder<'_, Sqlite>, filter: &DeploymentFilter) {
    builder.push(" WHERE 1 = 1");
    if let Some(project_id) = filter.project_id {
        builder.push(" AND project_id = ").push_bind(project_id);
    }
    if let Some(environment) = filter.environment {
        builder.push(" AND environment = ").push_bind(environment);
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }
}

impl Database {
    pub async fn create_deployment(
        &self,
        deployment: &NewDeployment,
        deployed_by: i64,
    ) -> AppResult<Deployment> {
        deployment.validate()?;
        self.ensure_project(deployment.project_id).await?;
        let now = now();

        let id = sqlx::query(
            r#"
            INSERT INTO deployments (project_id, environment, version, status, notes, deployed_by,
                                     created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(deployment.project_id)
        .bind(deployment.environment)
        .bind(deployment.version.trim())
        .bind(DeploymentStatus::Pending)
        .bind(clean_optional(deployment.notes.clone()))
        .bind(deployed_by)
        .bind(now)
        .bind(now)
        .execute(self.get_pool())
        .await?
        .last_insert_rowid();

        tracing::info!(
            deployment_id = id,
            project_id = deployment.project_id,
            environment = deployment.environment.as_str(),
            version = %deployment.version.trim(),
            "deployment scheduled"
        );
        self.get_deployment(id).await
    }

    pub async fn get_deployment(&self, id: i64) -> AppResult<Deployment> {
        sqlx::query_as::<_, Deployment>(&format!(
            "SELECT {DEPLOYMENT_COLUMNS} FROM deployments WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.get_pool())
        .await?
        .ok_or(AppError::NotFound("deployment"))
    }

    pub async fn list_deployments(&self, filter: &DeploymentFilter) -> AppResult<Page<Deployment>> {
        let page = PageRequest::new(filter.page, filter.per_page)?;

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM deployments");
        push_deployment_filters(&mut count, filter);
        let total = self.count(count).await?;

        let mut select = QueryBuilder::new(format!("SELECT {DEPLOYMENT_COLUMNS} FROM deployments"));
        push_deployment_filters(&mut select, filter);
        select.push(" ORDER BY created_at DESC, id DESC");
        push_page(&mut select, page);
        let deployments = select
            .build_query_as::<Deployment>()
            .fetch_all(self.get_pool())
            .await?;

        Ok(Page::new(deployments, page, total))
    }

    /// Unconditional status write. Success stamps `deployed_at`; notes are
    /// replaced only when given.
    pub async fn set_deployment_status(
        &self,
        id: i64,
        change: &DeploymentStatusChange,
    ) -> AppResult<Deployment> {
        let deployment = self.get_deployment(id).await?;
        let now = now();
        let deployed_at = if change.status == DeploymentStatus::Succeeded {
            Some(now)
        } else {
            deployment.deployed_at
        };
        let notes = match &change.notes {
            Some(notes) => clean_optional(Some(notes.clone())),
            None => deployment.notes.clone(),
        };

        sqlx::query(
            "UPDATE deployments SET status = ?, notes = ?, deployed_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(change.status)
        .bind(&notes)
        .bind(deployed_at)
        .bind(now)
        .bind(id)
        .execute(self.get_pool())
        .await?;

        tracing::info!(
            deployment_id = id,
            from = deployment.status.as_str(),
            to = change.status.as_str(),
            "deployment status changed"
        );
        self.get_deployment(id).await
    }

    pub async fn delete_deployment(&self, id: i64) -> AppResult<()> {
        let affected = sqlx::query("DELETE FROM deployments WHERE id = ?")
            .bind(id)
            .execute(self.get_pool())
            .await?
            .rows_affected();
        if affected == 0 {
            return Err(AppError::NotFound("deployment"));
        }
        Ok(())
    }
}
