use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Client, Deployment, Project, StageChange};

/// UAT execution totals. `pass_rate` is `None` until something has run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UatSummary {
    pub total: i64,
    pub by_status: BTreeMap<String, i64>,
    pub pass_rate: Option<f64>,
}

impl UatSummary {
    pub fn from_counts(by_status: BTreeMap<String, i64>) -> Self {
        let count = |key: &str| by_status.get(key).copied().unwrap_or(0);
        let total = by_status.values().sum();
        let passed = count("passed");
        let executed = passed + count("failed") + count("blocked");
        let pass_rate = (executed > 0).then(|| passed as f64 / executed as f64);
        Self {
            total,
            by_status,
            pass_rate,
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectHours {
    pub project_id: i64,
    pub project_name: String,
    pub hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub total_projects: i64,
    pub projects_by_stage: BTreeMap<String, i64>,
    pub projects_by_status: BTreeMap<String, i64>,
    pub active_clients: i64,
    pub bugs_by_status: BTreeMap<String, i64>,
    pub open_bugs_by_severity: BTreeMap<String, i64>,
    pub uat: UatSummary,
    pub hours_last_30_days: f64,
    pub hours_by_project: Vec<ProjectHours>,
    pub recent_deployments: Vec<Deployment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentSummary {
    pub environment: String,
    pub deployment: Option<Deployment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectReport {
    pub project: Project,
    pub client: Client,
    pub team_size: i64,
    pub bugs_by_status: BTreeMap<String, i64>,
    pub uat: UatSummary,
    pub total_hours: f64,
    pub billable_hours: f64,
    pub budget_hours: Option<f64>,
    pub remaining_budget_hours: Option<f64>,
    pub latest_deployments: Vec<DeploymentSummary>,
    pub stage_history: Vec<StageChange>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(&str, i64)]) -> BTreeMap<String, i64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn pass_rate_ignores_pending_cases() {
        let summary = UatSummary::from_counts(counts(&[
            ("pending", 5),
            ("passed", 3),
            ("failed", 1),
            ("blocked", 0),
        ]));
        assert_eq!(summary.total, 9);
        assert_eq!(summary.pass_rate, Some(0.75));
    }

    #[test]
    fn pass_rate_is_absent_before_any_run() {
        let summary = UatSummary::from_counts(counts(&[("pending", 2), ("passed", 0)]));
        assert_eq!(summary.pass_rate, None);
    }
}
