use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{nullable, require_text};
use crate::error::{AppError, AppResult};

pub const MAX_HOURS_PER_ENTRY: f64 = 24.0;

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: i64,
    pub user_id: i64,
    pub project_id: i64,
    pub bug_id: Option<i64>,
    pub work_date: NaiveDate,
    pub hours: f64,
    pub description: String,
    pub billable: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TimeEntry {
    pub fn validate(&self) -> AppResult<()> {
        check_hours(self.hours)?;
        require_text("description", &self.description)
    }
}

fn check_hours(hours: f64) -> AppResult<()> {
    if !hours.is_finite() || hours <= 0.0 || hours > MAX_HOURS_PER_ENTRY {
        return Err(AppError::validation(format!(
            "hours must be greater than 0 and at most {MAX_HOURS_PER_ENTRY}"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTimeEntry {
    pub project_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bug_id: Option<i64>,
    pub work_date: NaiveDate,
    pub hours: f64,
    pub description: String,
    #[serde(default = "default_billable")]
    pub billable: bool,
}

fn default_billable() -> bool {
    true
}

impl NewTimeEntry {
    pub fn validate(&self) -> AppResult<()> {
        check_hours(self.hours)?;
        require_text("description", &self.description)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeEntryUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub bug_id: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billable: Option<bool>,
}

impl TimeEntryUpdate {
    pub fn apply(self, entry: &mut TimeEntry) {
        if let Some(project_id) = self.project_id {
            entry.project_id = project_id;
        }
        if let Some(bug_id) = self.bug_id {
            entry.bug_id = bug_id;
        }
        if let Some(work_date) = self.work_date {
            entry.work_date = work_date;
        }
        if let Some(hours) = self.hours {
            entry.hours = hours;
        }
        if let Some(description) = self.description {
            entry.description = description;
        }
        if let Some(billable) = self.billable {
            entry.billable = billable;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeEntryFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<i64>,
}

impl TimeEntryFilter {
    pub fn validate(&self) -> AppResult<()> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if to < from {
                return Err(AppError::validation("to must not precede from"));
            }
        }
        Ok(())
    }
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoursByProject {
    pub project_id: i64,
    pub project_name: String,
    pub hours: f64,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoursByUser {
    pub user_id: i64,
    pub user_name: String,
    pub hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSummary {
    pub total_hours: f64,
    pub billable_hours: f64,
    pub by_project: Vec<HoursByProject>,
    pub by_user: Vec<HoursByUser>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(hours: f64) -> NewTimeEntry {
        NewTimeEntry {
            project_id: 1,
            bug_id: None,
            work_date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            hours,
            description: "pairing".into(),
            billable: true,
        }
    }

    #[test]
    fn hours_must_fit_in_a_day() {
        assert!(entry(7.5).validate().is_ok());
        assert!(entry(24.0).validate().is_ok());
        assert!(entry(0.0).validate().is_err());
        assert!(entry(24.5).validate().is_err());
        assert!(entry(f64::NAN).validate().is_err());
    }

    #[test]
    fn inverted_date_range_is_rejected() {
        let filter = TimeEntryFilter {
            from: NaiveDate::from_ymd_opt(2024, 3, 5),
            to: NaiveDate::from_ymd_opt(2024, 3, 4),
            ..Default::default()
        };
        assert!(filter.validate().is_err());
    }

    #[test]
    fn billable_defaults_to_true() {
        let entry: NewTimeEntry = serde_json::from_str(
            r#"{"project_id":1,"work_date":"2024-03-04","hours":2,"description":"review"}"#,
        )
        .unwrap();
        assert!(entry.billable);
    }
}
