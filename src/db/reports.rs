use std::collections::BTreeMap;

use chrono::{Duration, Utc};

use super::deployments::DEPLOYMENT_COLUMNS;
use super::Database;
use crate::error::AppResult;
use crate::models::{
    BugSeverity, BugStatus, Dashboard, Deployment, DeploymentSummary, Environment, ProjectHours,
    ProjectReport, ProjectStatus, Stage, TestStatus, UatSummary,
};

const TOP_PROJECTS: i64 = 10;
const RECENT_DEPLOYMENTS: i64 = 5;

/// Zero-filled count map over `keys`, overlaid with the grouped rows.
fn fill_counts<I>(keys: I, rows: Vec<(String, i64)>) -> BTreeMap<String, i64>
where
    I: IntoIterator<Item = &'static str>,
{
    let mut counts: BTreeMap<String, i64> = keys.into_iter().map(|k| (k.to_string(), 0)).collect();
    for (key, count) in rows {
        counts.insert(key, count);
    }
    counts
}

impl Database {
    pub async fn dashboard(&self) -> AppResult<Dashboard> {
        let total_projects: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM projects WHERE deleted_at IS NULL")
                .fetch_one(self.get_pool())
                .await?;

        let projects_by_stage = fill_counts(
            Stage::ALL.map(Stage::as_str),
            self.grouped_counts(
                "SELECT stage, COUNT(*) FROM projects WHERE deleted_at IS NULL GROUP BY stage",
                None,
            )
            .await?,
        );
        let projects_by_status = fill_counts(
            ProjectStatus::ALL.map(ProjectStatus::as_str),
            self.grouped_counts(
                "SELECT status, COUNT(*) FROM projects WHERE deleted_at IS NULL GROUP BY status",
                None,
            )
            .await?,
        );

        let active_clients: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM clients WHERE deleted_at IS NULL")
                .fetch_one(self.get_pool())
                .await?;

        let bugs_by_status = fill_counts(
            BugStatus::ALL.map(BugStatus::as_str),
            self.grouped_counts(
                "SELECT b.status, COUNT(*) FROM bugs b \
                 JOIN projects p ON p.id = b.project_id AND p.deleted_at IS NULL \
                 GROUP BY b.status",
                None,
            )
            .await?,
        );
        let open_bugs_by_severity = fill_counts(
            BugSeverity::ALL.map(BugSeverity::as_str),
            self.grouped_counts(
                "SELECT b.severity, COUNT(*) FROM bugs b \
                 JOIN projects p ON p.id = b.project_id AND p.deleted_at IS NULL \
                 WHERE b.status IN ('open', 'in_progress', 'reopened') \
                 GROUP BY b.severity",
                None,
            )
            .await?,
        );

        let uat = UatSummary::from_counts(fill_counts(
            TestStatus::ALL.map(TestStatus::as_str),
            self.grouped_counts(
                "SELECT t.status, COUNT(*) FROM test_cases t \
                 JOIN projects p ON p.id = t.project_id AND p.deleted_at IS NULL \
                 GROUP BY t.status",
                None,
            )
            .await?,
        ));

        let since = (Utc::now() - Duration::days(30)).date_naive();
        let hours_last_30_days: f64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(hours), 0.0) FROM time_entries WHERE work_date >= ?",
        )
        .bind(since)
        .fetch_one(self.get_pool())
        .await?;

        let hours_by_project = sqlx::query_as::<_, ProjectHours>(
            r#"
            SELECT t.project_id, p.name AS project_name, SUM(t.hours) AS hours
            FROM time_entries t
            JOIN projects p ON p.id = t.project_id AND p.deleted_at IS NULL
            GROUP BY t.project_id, p.name
            ORDER BY hours DESC, t.project_id ASC
            LIMIT ?
            "#,
        )
        .bind(TOP_PROJECTS)
        .fetch_all(self.get_pool())
        .await?;

        let recent_deployments = sqlx::query_as::<_, Deployment>(&format!(
            "SELECT {DEPLOYMENT_COLUMNS} FROM deployments ORDER BY created_at DESC, id DESC LIMIT ?"
        ))
        .bind(RECENT_DEPLOYMENTS)
        .fetch_all(self.get_pool())
        .await?;

        Ok(Dashboard {
            total_projects,
            projects_by_stage,
            projects_by_status,
            active_clients,
            bugs_by_status,
            open_bugs_by_severity,
            uat,
            hours_last_30_days,
            hours_by_project,
            recent_deployments,
        })
    }

    pub async fn project_report(&self, id: i64) -> AppResult<ProjectReport> {
        let project = self.get_project(id).await?;
        let client = self.get_client(project.client_id).await?;

        let team_size: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM project_members m \
             JOIN users u ON u.id = m.user_id AND u.deleted_at IS NULL \
             WHERE m.project_id = ?",
        )
        .bind(id)
        .fetch_one(self.get_pool())
        .await?;

        let bugs_by_status = fill_counts(
            BugStatus::ALL.map(BugStatus::as_str),
            self.grouped_counts(
                "SELECT status, COUNT(*) FROM bugs WHERE project_id = ? GROUP BY status",
                Some(id),
            )
            .await?,
        );
        let uat = UatSummary::from_counts(fill_counts(
            TestStatus::ALL.map(TestStatus::as_str),
            self.grouped_counts(
                "SELECT status, COUNT(*) FROM test_cases WHERE project_id = ? GROUP BY status",
                Some(id),
            )
            .await?,
        ));

        let (total_hours, billable_hours): (f64, f64) = sqlx::query_as(
            "SELECT COALESCE(SUM(hours), 0.0), \
             COALESCE(SUM(CASE WHEN billable THEN hours ELSE 0.0 END), 0.0) \
             FROM time_entries WHERE project_id = ?",
        )
        .bind(id)
        .fetch_one(self.get_pool())
        .await?;

        let mut latest_deployments = Vec::with_capacity(Environment::ALL.len());
        for environment in Environment::ALL {
            let deployment = sqlx::query_as::<_, Deployment>(&format!(
                "SELECT {DEPLOYMENT_COLUMNS} FROM deployments \
                 WHERE project_id = ? AND environment = ? \
                 ORDER BY created_at DESC, id DESC LIMIT 1"
            ))
            .bind(id)
            .bind(environment)
            .fetch_optional(self.get_pool())
            .await?;
            latest_deployments.push(DeploymentSummary {
                environment: environment.as_str().to_string(),
                deployment,
            });
        }

        let stage_history = self.stage_history(id).await?;
        let budget_hours = project.budget_hours;

        Ok(ProjectReport {
            project,
            client,
            team_size,
            bugs_by_status,
            uat,
            total_hours,
            billable_hours,
            budget_hours,
            remaining_budget_hours: budget_hours.map(|budget| budget - total_hours),
            latest_deployments,
            stage_history,
        })
    }
}
