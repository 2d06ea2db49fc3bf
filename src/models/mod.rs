mod bug;
mod client;
mod deployment;
mod message;
mod mockup;
mod page;
mod project;
mod report;
mod test_case;
mod time_entry;
mod user;

pub use bug::{Bug, BugFilter, BugSeverity, BugStatus, BugStatusChange, BugUpdate, NewBug};
pub use client::{Client, ClientFilter, ClientUpdate, NewClient};
pub use deployment::{
    Deployment, DeploymentFilter, DeploymentStatus, DeploymentStatusChange, Environment,
    NewDeployment,
};
pub use message::{Mailbox, Message, MessageFilter, NewMessage, UnreadCount};
pub use mockup::{Mockup, MockupFilter, MockupReview, MockupStatus, MockupUpdate, NewMockup};
pub use page::{Page, PageRequest, MAX_PER_PAGE};
pub use project::{
    NewMember, NewProject, Project, ProjectFilter, ProjectMember, ProjectStatus, ProjectUpdate,
    Stage, StageAdvance, StageChange, StageWrite,
};
pub use report::{
    Dashboard, DeploymentSummary, ProjectHours, ProjectReport, UatSummary,
};
pub use test_case::{NewTestCase, TestCase, TestCaseFilter, TestCaseUpdate, TestResult, TestStatus};
pub use time_entry::{
    HoursByProject, HoursByUser, NewTimeEntry, TimeEntry, TimeEntryFilter, TimeEntryUpdate,
    TimeSummary,
};
pub use user::{LoginRequest, LoginResponse, NewUser, Role, User, UserFilter, UserUpdate};

use serde::{Deserialize, Deserializer};

use crate::error::{AppError, AppResult};

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
pub(crate) fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Reject blank strings for required fields.
pub(crate) fn require_text(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Ok(())
}

pub(crate) fn require_email(value: &str) -> AppResult<()> {
    if !is_valid_email(value) {
        return Err(AppError::validation(format!("{value:?} is not a valid email address")));
    }
    Ok(())
}

pub fn is_valid_email(value: &str) -> bool {
    let value = value.trim();
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.contains(char::is_whitespace)
}
