use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{nullable, require_text};
use crate::error::AppResult;

/// Outcome of the latest UAT run of a test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
pub enum TestStatus {
    Pending,
    Passed,
    Failed,
    Blocked,
}

impl TestStatus {
    pub const ALL: [TestStatus; 4] = [
        TestStatus::Pending,
        TestStatus::Passed,
        TestStatus::Failed,
        TestStatus::Blocked,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TestStatus::Pending => "pending",
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
            TestStatus::Blocked => "blocked",
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub description: String,
    pub steps: String,
    pub expected_result: String,
    pub actual_result: Option<String>,
    pub status: TestStatus,
    pub executed_by: Option<i64>,
    pub executed_at: Option<DateTime<Utc>>,
    pub bug_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTestCase {
    pub project_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub steps: String,
    pub expected_result: String,
}

impl NewTestCase {
    pub fn validate(&self) -> AppResult<()> {
        require_text("title", &self.title)?;
        require_text("expected_result", &self.expected_result)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestCaseUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_result: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub bug_id: Option<Option<i64>>,
}

impl TestCaseUpdate {
    pub fn apply(self, case: &mut TestCase) {
        if let Some(title) = self.title {
            case.title = title;
        }
        if let Some(description) = self.description {
            case.description = description;
        }
        if let Some(steps) = self.steps {
            case.steps = steps;
        }
        if let Some(expected_result) = self.expected_result {
            case.expected_result = expected_result;
        }
        if let Some(bug_id) = self.bug_id {
            case.bug_id = bug_id;
        }
    }
}

/// Body of `POST /test-cases/{id}/result`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub status: TestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_result: Option<String>,
    /// Open a linked bug when the run failed.
    #[serde(default)]
    pub open_bug: bool,
}

impl TestResult {
    pub fn opens_bug(&self) -> bool {
        self.open_bug && self.status == TestStatus::Failed
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestCaseFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TestStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_failures_open_bugs() {
        let mut result = TestResult {
            status: TestStatus::Failed,
            actual_result: None,
            open_bug: true,
        };
        assert!(result.opens_bug());
        result.status = TestStatus::Blocked;
        assert!(!result.opens_bug());
        result.status = TestStatus::Failed;
        result.open_bug = false;
        assert!(!result.opens_bug());
    }

    #[test]
    fn expected_result_is_required() {
        let case = NewTestCase {
            project_id: 1,
            title: "Checkout".into(),
            description: String::new(),
            steps: "1. add to cart".into(),
            expected_result: " ".into(),
        };
        assert!(case.validate().is_err());
    }
}
