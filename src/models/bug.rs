use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{nullable, require_text};
use crate::error::AppResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
pub enum BugSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BugSeverity {
    pub const ALL: [BugSeverity; 4] = [
        BugSeverity::Low,
        BugSeverity::Medium,
        BugSeverity::High,
        BugSeverity::Critical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BugSeverity::Low => "low",
            BugSeverity::Medium => "medium",
            BugSeverity::High => "high",
            BugSeverity::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
pub enum BugStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
    Reopened,
}

impl BugStatus {
    pub const ALL: [BugStatus; 5] = [
        BugStatus::Open,
        BugStatus::InProgress,
        BugStatus::Resolved,
        BugStatus::Closed,
        BugStatus::Reopened,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BugStatus::Open => "open",
            BugStatus::InProgress => "in_progress",
            BugStatus::Resolved => "resolved",
            BugStatus::Closed => "closed",
            BugStatus::Reopened => "reopened",
        }
    }

    /// Whether a bug in this status still needs work.
    pub fn is_open(self) -> bool {
        matches!(self, BugStatus::Open | BugStatus::InProgress | BugStatus::Reopened)
    }

    /// Next status in the usual triage cycle, used by the terminal front end.
    pub fn cycle(self) -> BugStatus {
        match self {
            BugStatus::Open => BugStatus::InProgress,
            BugStatus::InProgress => BugStatus::Resolved,
            BugStatus::Resolved => BugStatus::Closed,
            BugStatus::Closed => BugStatus::Reopened,
            BugStatus::Reopened => BugStatus::InProgress,
        }
    }

    /// `resolved_at` after moving into this status.
    pub fn resolution_stamp(
        self,
        current: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        if self.is_open() {
            None
        } else {
            current.or(Some(now))
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bug {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub description: String,
    pub severity: BugSeverity,
    pub status: BugStatus,
    pub reported_by: i64,
    pub assigned_to: Option<i64>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bug {
    pub fn validate(&self) -> AppResult<()> {
        require_text("title", &self.title)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBug {
    pub project_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_severity")]
    pub severity: BugSeverity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<i64>,
}

fn default_severity() -> BugSeverity {
    BugSeverity::Medium
}

impl NewBug {
    pub fn new(project_id: i64, title: impl Into<String>) -> Self {
        Self {
            project_id,
            title: title.into(),
            description: String::new(),
            severity: default_severity(),
            assigned_to: None,
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        require_text("title", &self.title)
    }
}

/// Partial bug update. Status goes through `PATCH /bugs/{id}/status`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BugUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<BugSeverity>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Option<i64>>,
}

impl BugUpdate {
    pub fn apply(self, bug: &mut Bug) {
        if let Some(title) = self.title {
            bug.title = title;
        }
        if let Some(description) = self.description {
            bug.description = description;
        }
        if let Some(severity) = self.severity {
            bug.severity = severity;
        }
        if let Some(assigned_to) = self.assigned_to {
            bug.assigned_to = assigned_to;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BugStatusChange {
    pub status: BugStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BugFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BugStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<BugSeverity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<i64>,
}
