use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{nullable, require_text};
use crate::error::{AppError, AppResult};

/// Delivery phase of a project. Phases run in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
pub enum Stage {
    Design,
    Development,
    Testing,
    Deployment,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Design,
        Stage::Development,
        Stage::Testing,
        Stage::Deployment,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Design => "design",
            Stage::Development => "development",
            Stage::Testing => "testing",
            Stage::Deployment => "deployment",
        }
    }

    /// The following phase, or `None` once a project is in deployment.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Design => Some(Stage::Development),
            Stage::Development => Some(Stage::Testing),
            Stage::Testing => Some(Stage::Deployment),
            Stage::Deployment => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    OnHold,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 4] = [
        ProjectStatus::Active,
        ProjectStatus::OnHold,
        ProjectStatus::Completed,
        ProjectStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::OnHold => "on_hold",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub client_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub stage: Stage,
    pub status: ProjectStatus,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub budget_hours: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn validate(&self) -> AppResult<()> {
        require_text("name", &self.name)?;
        check_schedule(self.start_date, self.due_date)?;
        check_budget(self.budget_hours)
    }
}

fn check_schedule(start: Option<NaiveDate>, due: Option<NaiveDate>) -> AppResult<()> {
    if let (Some(start), Some(due)) = (start, due) {
        if due < start {
            return Err(AppError::validation("due_date must not precede start_date"));
        }
    }
    Ok(())
}

fn check_budget(budget: Option<f64>) -> AppResult<()> {
    match budget {
        Some(hours) if !hours.is_finite() || hours < 0.0 => {
            Err(AppError::validation("budget_hours must be a non-negative number"))
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProject {
    pub client_id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_stage")]
    pub stage: Stage,
    #[serde(default = "default_status")]
    pub status: ProjectStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_hours: Option<f64>,
}

fn default_stage() -> Stage {
    Stage::Design
}

fn default_status() -> ProjectStatus {
    ProjectStatus::Active
}

impl NewProject {
    pub fn new(client_id: i64, name: impl Into<String>) -> Self {
        Self {
            client_id,
            name: name.into(),
            description: None,
            stage: default_stage(),
            status: default_status(),
            start_date: None,
            due_date: None,
            budget_hours: None,
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        require_text("name", &self.name)?;
        check_schedule(self.start_date, self.due_date)?;
        check_budget(self.budget_hours)
    }
}

/// Partial project update. Stage changes go through the stage endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub budget_hours: Option<Option<f64>>,
}

impl ProjectUpdate {
    pub fn apply(self, project: &mut Project) {
        if let Some(client_id) = self.client_id {
            project.client_id = client_id;
        }
        if let Some(name) = self.name {
            project.name = name;
        }
        if let Some(description) = self.description {
            project.description = description;
        }
        if let Some(status) = self.status {
            project.status = status;
        }
        if let Some(start_date) = self.start_date {
            project.start_date = start_date;
        }
        if let Some(due_date) = self.due_date {
            project.due_date = due_date;
        }
        if let Some(budget_hours) = self.budget_hours {
            project.budget_hours = budget_hours;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<i64>,
}

/// One row of a project's stage history.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageChange {
    pub id: i64,
    pub project_id: i64,
    pub from_stage: Stage,
    pub to_stage: Stage,
    pub changed_by: i64,
    pub note: Option<String>,
    pub changed_at: DateTime<Utc>,
}

/// Body of `PUT /projects/{id}/stage`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageWrite {
    pub stage: Stage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageAdvance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMember {
    pub project_id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub user_email: String,
    pub role: String,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMember {
    pub user_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl NewMember {
    pub fn role_label(&self) -> String {
        match self.role.as_deref().map(str::trim) {
            Some(role) if !role.is_empty() => role.to_string(),
            _ => "member".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_advance_linearly() {
        let mut stage = Stage::Design;
        let mut walked = vec![stage];
        while let Some(next) = stage.next() {
            walked.push(next);
            stage = next;
        }
        assert_eq!(walked, Stage::ALL.to_vec());
        assert_eq!(Stage::Deployment.next(), None);
    }

    #[test]
    fn due_date_before_start_is_rejected() {
        let mut project = NewProject::new(1, "Portal");
        project.start_date = NaiveDate::from_ymd_opt(2024, 5, 1);
        project.due_date = NaiveDate::from_ymd_opt(2024, 4, 1);
        assert!(project.validate().is_err());
        project.due_date = NaiveDate::from_ymd_opt(2024, 6, 1);
        assert!(project.validate().is_ok());
    }

    #[test]
    fn negative_budget_is_rejected() {
        let mut project = NewProject::new(1, "Portal");
        project.budget_hours = Some(-1.0);
        assert!(project.validate().is_err());
    }

    #[test]
    fn unknown_stage_fails_to_deserialize() {
        let result: Result<StageWrite, _> = serde_json::from_str(r#"{"stage":"shipping"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn member_role_defaults_to_member() {
        let member = NewMember {
            user_id: 3,
            role: Some("  ".into()),
        };
        assert_eq!(member.role_label(), "member");
    }
}
