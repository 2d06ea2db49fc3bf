use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{nullable, require_text};
use crate::error::AppResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
pub enum MockupStatus {
    Draft,
    InReview,
    Approved,
    Rejected,
}

impl MockupStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MockupStatus::Draft => "draft",
            MockupStatus::InReview => "in_review",
            MockupStatus::Approved => "approved",
            MockupStatus::Rejected => "rejected",
        }
    }
}

/// A design mockup attached to a project, versioned by its URL.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mockup {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub url: String,
    pub version: i64,
    pub status: MockupStatus,
    pub feedback: Option<String>,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMockup {
    pub project_id: i64,
    pub title: String,
    pub url: String,
}

impl NewMockup {
    pub fn validate(&self) -> AppResult<()> {
        require_text("title", &self.title)?;
        require_text("url", &self.url)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MockupUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl MockupUpdate {
    /// A new URL is a new revision: the version goes up and review restarts.
    pub fn apply(self, mockup: &mut Mockup) {
        if let Some(title) = self.title {
            mockup.title = title;
        }
        if let Some(url) = self.url {
            if url != mockup.url {
                mockup.url = url;
                mockup.version += 1;
                mockup.status = MockupStatus::Draft;
                mockup.feedback = None;
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockupReview {
    pub status: MockupStatus,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MockupFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MockupStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mockup() -> Mockup {
        Mockup {
            id: 1,
            project_id: 1,
            title: "Landing".into(),
            url: "https://design.test/landing-v1".into(),
            version: 1,
            status: MockupStatus::Approved,
            feedback: Some("ship it".into()),
            created_by: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn new_url_bumps_version_and_restarts_review() {
        let mut m = mockup();
        MockupUpdate {
            url: Some("https://design.test/landing-v2".into()),
            ..Default::default()
        }
        .apply(&mut m);
        assert_eq!(m.version, 2);
        assert_eq!(m.status, MockupStatus::Draft);
        assert_eq!(m.feedback, None);
    }

    #[test]
    fn same_url_is_not_a_revision() {
        let mut m = mockup();
        MockupUpdate {
            url: Some(m.url.clone()),
            title: Some("Landing page".into()),
        }
        .apply(&mut m);
        assert_eq!(m.version, 1);
        assert_eq!(m.status, MockupStatus::Approved);
        assert_eq!(m.title, "Landing page");
    }
}
