use sqlx::{QueryBuilder, Sqlite};

use super::{clean_optional, like_pattern, now, push_page, Database};
use crate::error::{AppError, AppResult};
use crate::models::{
    NewMember, NewProject, Page, PageRequest, Project, ProjectFilter, ProjectMember,
    ProjectUpdate, Stage, StageChange,
};

const PROJECT_COLUMNS: &str = "id, client_id, name, description, stage, status, start_date, \
     due_date, budget_hours, created_at, updated_at";

const STAGE_CHANGE_COLUMNS: &str =
    "id, project_id, from_stage, to_stage, changed_by, note, changed_at";

fn push_project_filters(builder: &mut QueryBuilder<'_, Sqlite>, filter: &ProjectFilter) {
    builder.push(" WHERE deleted_at IS NULL");
    if let Some(client_id) = filter.client_id {
        builder.push(" AND client_id = ").push_bind(client_id);
    }
    if let Some(stage) = filter.stage {
        builder.push(" AND stage = ").push_bind(stage);
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(pattern) = like_pattern(filter.q.as_deref()) {
        builder
            .push(" AND name LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\'");
    }
}

impl Database {
    // Project operations
    pub async fn create_project(&self, project: &NewProject) -> AppResult<Project> {
        project.validate()?;
        self.ensure_client(project.client_id).await?;
        let now = now();

        let id = sqlx::query(
            r#"
            INSERT INTO projects (client_id, name, description, stage, status, start_date,
                                  due_date, budget_hours, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(project.client_id)
        .bind(project.name.trim())
        .bind(clean_optional(project.description.clone()))
        .bind(project.stage)
        .bind(project.status)
        .bind(project.start_date)
        .bind(project.due_date)
        .bind(project.budget_hours)
        .bind(now)
        .bind(now)
        .execute(self.get_pool())
        .await?
        .last_insert_rowid();

        tracing::info!(project_id = id, client_id = project.client_id, "project created");
        self.get_project(id).await
    }

    pub async fn get_project(&self, id: i64) -> AppResult<Project> {
        sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ? AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(self.get_pool())
        .await?
        .ok_or(AppError::NotFound("project"))
    }

    pub async fn list_projects(&self, filter: &ProjectFilter) -> AppResult<Page<Project>> {
        let page = PageRequest::new(filter.page, filter.per_page)?;

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM projects");
        push_project_filters(&mut count, filter);
        let total = self.count(count).await?;

        let mut select = QueryBuilder::new(format!("SELECT {PROJECT_COLUMNS} FROM projects"));
        push_project_filters(&mut select, filter);
        select.push(" ORDER BY name ASC, id ASC");
        push_page(&mut select, page);
        let projects = select
            .build_query_as::<Project>()
            .fetch_all(self.get_pool())
            .await?;

        Ok(Page::new(projects, page, total))
    }

    pub async fn update_project(&self, id: i64, update: ProjectUpdate) -> AppResult<Project> {
        let mut project = self.get_project(id).await?;
        let client_changed = update.client_id.is_some_and(|c| c != project.client_id);
        update.apply(&mut project);
        project.name = project.name.trim().to_string();
        project.description = clean_optional(project.description);
        project.validate()?;
        if client_changed {
            self.ensure_client(project.client_id).await?;
        }

        sqlx::query(
            r#"
            UPDATE projects
            SET client_id = ?, name = ?, description = ?, status = ?, start_date = ?,
                due_date = ?, budget_hours = ?, updated_at = ?
            WHERE id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(project.client_id)
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.status)
        .bind(project.start_date)
        .bind(project.due_date)
        .bind(project.budget_hours)
        .bind(now())
        .bind(id)
        .execute(self.get_pool())
        .await?;

        self.get_project(id).await
    }

    pub async fn delete_project(&self, id: i64) -> AppResult<()> {
        let affected = sqlx::query(
            "UPDATE projects SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(now())
        .bind(id)
        .execute(self.get_pool())
        .await?
        .rows_affected();
        if affected == 0 {
            return Err(AppError::NotFound("project"));
        }

        tracing::info!(project_id = id, "project deleted");
        Ok(())
    }

    /// Write the stage unconditionally and record the move in the history.
    pub async fn set_stage(
        &self,
        id: i64,
        stage: Stage,
        changed_by: i64,
        note: Option<String>,
    ) -> AppResult<Project> {
        self.write_stage(id, None, stage, changed_by, note).await
    }

    /// Move to the next stage; a project already in deployment cannot advance.
    pub async fn advance_stage(
        &self,
        id: i64,
        changed_by: i64,
        note: Option<String>,
    ) -> AppResult<Project> {
        let project = self.get_project(id).await?;
        let next = project.stage.next().ok_or_else(|| {
            AppError::validation(format!(
                "project is already in the final stage ({})",
                project.stage.as_str()
            ))
        })?;
        self.write_stage(id, Some(project.stage), next, changed_by, note)
            .await
    }

    /// Record the move and update the project in one write transaction.
    ///
    /// The history row takes `from_stage` from the row as it stands when the
    /// write lock is held. With `expected` set, the move only happens while
    /// the project is still in that stage.
    async fn write_stage(
        &self,
        id: i64,
        expected: Option<Stage>,
        stage: Stage,
        changed_by: i64,
        note: Option<String>,
    ) -> AppResult<Project> {
        let changed_at = now();
        let mut tx = self.get_pool().begin().await?;

        let mut insert = QueryBuilder::<Sqlite>::new(
            "INSERT INTO project_stage_changes \
             (project_id, from_stage, to_stage, changed_by, note, changed_at) SELECT id, stage, ",
        );
        insert
            .push_bind(stage)
            .push(", ")
            .push_bind(changed_by)
            .push(", ")
            .push_bind(clean_optional(note))
            .push(", ")
            .push_bind(changed_at)
            .push(" FROM projects WHERE id = ")
            .push_bind(id)
            .push(" AND deleted_at IS NULL");
        if let Some(expected) = expected {
            insert.push(" AND stage = ").push_bind(expected);
        }
        insert.push(" RETURNING from_stage");

        let from = insert
            .build_query_scalar::<Stage>()
            .fetch_optional(&mut *tx)
            .await?;
        let Some(from) = from else {
            drop(tx);
            // Missing project, or another writer moved it first.
            self.get_project(id).await?;
            return Err(AppError::Conflict(
                "project stage changed while advancing; reload and retry".to_string(),
            ));
        };

        sqlx::query("UPDATE projects SET stage = ?, updated_at = ? WHERE id = ?")
            .bind(stage)
            .bind(changed_at)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(
            project_id = id,
            from = from.as_str(),
            to = stage.as_str(),
            "project stage changed"
        );
        self.get_project(id).await
    }

    pub async fn stage_history(&self, id: i64) -> AppResult<Vec<StageChange>> {
        self.get_project(id).await?;
        let history = sqlx::query_as::<_, StageChange>(&format!(
            "SELECT {STAGE_CHANGE_COLUMNS} FROM project_stage_changes \
             WHERE project_id = ? ORDER BY id ASC"
        ))
        .bind(id)
        .fetch_all(self.get_pool())
        .await?;

        Ok(history)
    }

    // Team operations
    pub async fn list_members(&self, project_id: i64) -> AppResult<Vec<ProjectMember>> {
        self.get_project(project_id).await?;
        let members = sqlx::query_as::<_, ProjectMember>(
            r#"
            SELECT m.project_id, m.user_id, u.name AS user_name, u.email AS user_email,
                   m.role, m.added_at
            FROM project_members m
            JOIN users u ON u.id = m.user_id AND u.deleted_at IS NULL
            WHERE m.project_id = ?
            ORDER BY u.name ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(self.get_pool())
        .await?;

        Ok(members)
    }

    /// Add a member, or relabel one already on the team.
    pub async fn add_member(&self, project_id: i64, member: &NewMember) -> AppResult<ProjectMember> {
        self.get_project(project_id).await?;
        self.ensure_user(member.user_id).await?;

        sqlx::query(
            r#"
            INSERT INTO project_members (project_id, user_id, role, added_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (project_id, user_id) DO UPDATE SET role = excluded.role
            "#,
        )
        .bind(project_id)
        .bind(member.user_id)
        .bind(member.role_label())
        .bind(now())
        .execute(self.get_pool())
        .await?;

        self.list_members(project_id)
            .await?
            .into_iter()
            .find(|m| m.user_id == member.user_id)
            .ok_or(AppError::NotFound("team member"))
    }

    pub async fn remove_member(&self, project_id: i64, user_id: i64) -> AppResult<()> {
        let affected =
            sqlx::query("DELETE FROM project_members WHERE project_id = ? AND user_id = ?")
                .bind(project_id)
                .bind(user_id)
                .execute(self.get_pool())
                .await?
                .rows_affected();
        if affected == 0 {
            return Err(AppError::NotFound("team member"));
        }
        Ok(())
    }
}
