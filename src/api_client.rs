//! Typed HTTP client for the REST API.
//!
//! Used by the `login` subcommand and the terminal front end. Non-2xx
//! responses are decoded from the `{"error": {...}}` body into
//! [`ClientError::Api`].

use std::future::Future;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::models::{
    Bug, BugFilter, BugStatus, BugStatusChange, BugUpdate, Client, ClientFilter, ClientUpdate,
    Dashboard, Deployment, DeploymentFilter, DeploymentStatusChange, LoginRequest, LoginResponse,
    MAX_PER_PAGE, Message, MessageFilter, Mockup, MockupFilter, MockupReview, MockupUpdate, NewBug,
    NewClient, NewDeployment, NewMember, NewMessage, NewMockup, NewProject, NewTestCase,
    NewTimeEntry, NewUser, Page, Project, ProjectFilter, ProjectMember, ProjectReport,
    ProjectUpdate, Stage, StageAdvance, StageChange, StageWrite, TestCase, TestCaseFilter,
    TestCaseUpdate, TestResult, TimeEntry, TimeEntryFilter, TimeEntryUpdate, TimeSummary,
    UnreadCount, User, UserFilter, UserUpdate,
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{status}: {message} ({code})")]
    Api {
        status: StatusCode,
        code: String,
        message: String,
    },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status(),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Fetch pages from the first on until every row counted by `total` is in hand.
async fn collect_pages<T, F, Fut>(mut fetch: F) -> ClientResult<Vec<T>>
where
    F: FnMut(i64) -> Fut,
    Fut: Future<Output = ClientResult<Page<T>>>,
{
    let mut rows = Vec::new();
    let mut page = 1;
    loop {
        let batch = fetch(page).await?;
        let total = usize::try_from(batch.total).unwrap_or(0);
        let exhausted = batch.data.is_empty();
        rows.extend(batch.data);
        if exhausted || rows.len() >= total {
            return Ok(rows);
        }
        page += 1;
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorPayload,
}

#[derive(Deserialize)]
struct ErrorPayload {
    code: String,
    message: String,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}/api{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn check(response: Response) -> ClientResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let (code, message) = match serde_json::from_str::<ErrorEnvelope>(&text) {
            Ok(envelope) => (envelope.error.code, envelope.error.message),
            Err(_) => ("unknown".to_string(), text),
        };
        Err(ClientError::Api {
            status,
            code,
            message,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let response = self.request(Method::GET, path).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn get_query<T, Q>(&self, path: &str, query: &Q) -> ClientResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let response = self.request(Method::GET, path).query(query).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn send<T, B>(&self, method: Method, path: &str, body: &B) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.request(method, path).json(body).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn delete(&self, path: &str) -> ClientResult<()> {
        let response = self.request(Method::DELETE, path).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    // Auth

    /// Log in and keep the issued token for later calls.
    pub async fn login(&mut self, email: &str, password: &str) -> ClientResult<LoginResponse> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response: LoginResponse = self.send(Method::POST, "/auth/login", &request).await?;
        self.token = Some(response.token.clone());
        Ok(response)
    }

    pub async fn logout(&mut self) -> ClientResult<()> {
        let response = self.request(Method::POST, "/auth/logout").send().await?;
        Self::check(response).await?;
        self.token = None;
        Ok(())
    }

    pub async fn me(&self) -> ClientResult<User> {
        self.get("/auth/me").await
    }

    // Users

    pub async fn list_users(&self, filter: &UserFilter) -> ClientResult<Page<User>> {
        self.get_query("/users", filter).await
    }

    pub async fn create_user(&self, user: &NewUser) -> ClientResult<User> {
        self.send(Method::POST, "/users", user).await
    }

    pub async fn get_user(&self, id: i64) -> ClientResult<User> {
        self.get(&format!("/users/{id}")).await
    }

    pub async fn update_user(&self, id: i64, update: &UserUpdate) -> ClientResult<User> {
        self.send(Method::PUT, &format!("/users/{id}"), update).await
    }

    pub async fn delete_user(&self, id: i64) -> ClientResult<()> {
        self.delete(&format!("/users/{id}")).await
    }

    // Clients

    pub async fn list_clients(&self, filter: &ClientFilter) -> ClientResult<Page<Client>> {
        self.get_query("/clients", filter).await
    }

    pub async fn create_client(&self, client: &NewClient) -> ClientResult<Client> {
        self.send(Method::POST, "/clients", client).await
    }

    pub async fn get_client(&self, id: i64) -> ClientResult<Client> {
        self.get(&format!("/clients/{id}")).await
    }

    pub async fn update_client(&self, id: i64, update: &ClientUpdate) -> ClientResult<Client> {
        self.send(Method::PUT, &format!("/clients/{id}"), update).await
    }

    pub async fn delete_client(&self, id: i64) -> ClientResult<()> {
        self.delete(&format!("/clients/{id}")).await
    }

    // Projects

    pub async fn list_projects(&self, filter: &ProjectFilter) -> ClientResult<Page<Project>> {
        self.get_query("/projects", filter).await
    }

    /// Every project matching `filter`, across as many pages as it takes.
    pub async fn all_projects(&self, filter: &ProjectFilter) -> ClientResult<Vec<Project>> {
        collect_pages(|page| {
            let filter = ProjectFilter {
                page: Some(page),
                per_page: Some(MAX_PER_PAGE),
                ..filter.clone()
            };
            async move { self.list_projects(&filter).await }
        })
        .await
    }

    pub async fn create_project(&self, project: &NewProject) -> ClientResult<Project> {
        self.send(Method::POST, "/projects", project).await
    }

    pub async fn get_project(&self, id: i64) -> ClientResult<Project> {
        self.get(&format!("/projects/{id}")).await
    }

    pub async fn update_project(&self, id: i64, update: &ProjectUpdate) -> ClientResult<Project> {
        self.send(Method::PUT, &format!("/projects/{id}"), update).await
    }

    pub async fn delete_project(&self, id: i64) -> ClientResult<()> {
        self.delete(&format!("/projects/{id}")).await
    }

    pub async fn set_stage(
        &self,
        id: i64,
        stage: Stage,
        note: Option<String>,
    ) -> ClientResult<Project> {
        let write = StageWrite { stage, note };
        self.send(Method::PUT, &format!("/projects/{id}/stage"), &write)
            .await
    }

    pub async fn advance_stage(&self, id: i64, note: Option<String>) -> ClientResult<Project> {
        let advance = StageAdvance { note };
        self.send(Method::POST, &format!("/projects/{id}/stage/advance"), &advance)
            .await
    }

    pub async fn stage_history(&self, id: i64) -> ClientResult<Vec<StageChange>> {
        self.get(&format!("/projects/{id}/stages")).await
    }

    pub async fn list_team(&self, id: i64) -> ClientResult<Vec<ProjectMember>> {
        self.get(&format!("/projects/{id}/team")).await
    }

    pub async fn add_team_member(&self, id: i64, member: &NewMember) -> ClientResult<ProjectMember> {
        self.send(Method::POST, &format!("/projects/{id}/team"), member)
            .await
    }

    pub async fn remove_team_member(&self, id: i64, user_id: i64) -> ClientResult<()> {
        self.delete(&format!("/projects/{id}/team/{user_id}")).await
    }

    pub async fn project_report(&self, id: i64) -> ClientResult<ProjectReport> {
        self.get(&format!("/projects/{id}/report")).await
    }

    // Bugs

    pub async fn list_bugs(&self, filter: &BugFilter) -> ClientResult<Page<Bug>> {
        self.get_query("/bugs", filter).await
    }

    pub async fn all_bugs(&self, filter: &BugFilter) -> ClientResult<Vec<Bug>> {
        collect_pages(|page| {
            let filter = BugFilter {
                page: Some(page),
                per_page: Some(MAX_PER_PAGE),
                ..filter.clone()
            };
            async move { self.list_bugs(&filter).await }
        })
        .await
    }

    pub async fn create_bug(&self, bug: &NewBug) -> ClientResult<Bug> {
        self.send(Method::POST, "/bugs", bug).await
    }

    pub async fn get_bug(&self, id: i64) -> ClientResult<Bug> {
        self.get(&format!("/bugs/{id}")).await
    }

    pub async fn update_bug(&self, id: i64, update: &BugUpdate) -> ClientResult<Bug> {
        self.send(Method::PUT, &format!("/bugs/{id}"), update).await
    }

    pub async fn set_bug_status(&self, id: i64, status: BugStatus) -> ClientResult<Bug> {
        let change = BugStatusChange { status };
        self.send(Method::PATCH, &format!("/bugs/{id}/status"), &change)
            .await
    }

    pub async fn delete_bug(&self, id: i64) -> ClientResult<()> {
        self.delete(&format!("/bugs/{id}")).await
    }

    // Test cases

    pub async fn list_test_cases(&self, filter: &TestCaseFilter) -> ClientResult<Page<TestCase>> {
        self.get_query("/test-cases", filter).await
    }

    pub async fn create_test_case(&self, case: &NewTestCase) -> ClientResult<TestCase> {
        self.send(Method::POST, "/test-cases", case).await
    }

    pub async fn get_test_case(&self, id: i64) -> ClientResult<TestCase> {
        self.get(&format!("/test-cases/{id}")).await
    }

    pub async fn update_test_case(
        &self,
        id: i64,
        update: &TestCaseUpdate,
    ) -> ClientResult<TestCase> {
        self.send(Method::PUT, &format!("/test-cases/{id}"), update)
            .await
    }

    pub async fn record_result(&self, id: i64, result: &TestResult) -> ClientResult<TestCase> {
        self.send(Method::POST, &format!("/test-cases/{id}/result"), result)
            .await
    }

    pub async fn delete_test_case(&self, id: i64) -> ClientResult<()> {
        self.delete(&format!("/test-cases/{id}")).await
    }

    // Messages

    pub async fn list_messages(&self, filter: &MessageFilter) -> ClientResult<Page<Message>> {
        self.get_query("/messages", filter).await
    }

    pub async fn send_message(&self, message: &NewMessage) -> ClientResult<Message> {
        self.send(Method::POST, "/messages", message).await
    }

    pub async fn get_message(&self, id: i64) -> ClientResult<Message> {
        self.get(&format!("/messages/{id}")).await
    }

    pub async fn mark_read(&self, id: i64) -> ClientResult<Message> {
        self.send(Method::PATCH, &format!("/messages/{id}/read"), &json!({}))
            .await
    }

    pub async fn delete_message(&self, id: i64) -> ClientResult<()> {
        self.delete(&format!("/messages/{id}")).await
    }

    pub async fn unread_count(&self) -> ClientResult<UnreadCount> {
        self.get("/messages/unread-count").await
    }

    // Time entries

    pub async fn list_time_entries(
        &self,
        filter: &TimeEntryFilter,
    ) -> ClientResult<Page<TimeEntry>> {
        self.get_query("/time-entries", filter).await
    }

    pub async fn create_time_entry(&self, entry: &NewTimeEntry) -> ClientResult<TimeEntry> {
        self.send(Method::POST, "/time-entries", entry).await
    }

    pub async fn get_time_entry(&self, id: i64) -> ClientResult<TimeEntry> {
        self.get(&format!("/time-entries/{id}")).await
    }

    pub async fn update_time_entry(
        &self,
        id: i64,
        update: &TimeEntryUpdate,
    ) -> ClientResult<TimeEntry> {
        self.send(Method::PUT, &format!("/time-entries/{id}"), update)
            .await
    }

    pub async fn delete_time_entry(&self, id: i64) -> ClientResult<()> {
        self.delete(&format!("/time-entries/{id}")).await
    }

    pub async fn time_summary(&self, filter: &TimeEntryFilter) -> ClientResult<TimeSummary> {
        self.get_query("/time-entries/summary", filter).await
    }

    // Deployments

    pub async fn list_deployments(
        &self,
        filter: &DeploymentFilter,
    ) -> ClientResult<Page<Deployment>> {
        self.get_query("/deployments", filter).await
    }

    pub async fn create_deployment(&self, deployment: &NewDeployment) -> ClientResult<Deployment> {
        self.send(Method::POST, "/deployments", deployment).await
    }

    pub async fn get_deployment(&self, id: i64) -> ClientResult<Deployment> {
        self.get(&format!("/deployments/{id}")).await
    }

    pub async fn set_deployment_status(
        &self,
        id: i64,
        change: &DeploymentStatusChange,
    ) -> ClientResult<Deployment> {
        self.send(Method::PATCH, &format!("/deployments/{id}/status"), change)
            .await
    }

    pub async fn delete_deployment(&self, id: i64) -> ClientResult<()> {
        self.delete(&format!("/deployments/{id}")).await
    }

    // Mockups

    pub async fn list_mockups(&self, filter: &MockupFilter) -> ClientResult<Page<Mockup>> {
        self.get_query("/mockups", filter).await
    }

    pub async fn create_mockup(&self, mockup: &NewMockup) -> ClientResult<Mockup> {
        self.send(Method::POST, "/mockups", mockup).await
    }

    pub async fn get_mockup(&self, id: i64) -> ClientResult<Mockup> {
        self.get(&format!("/mockups/{id}")).await
    }

    pub async fn update_mockup(&self, id: i64, update: &MockupUpdate) -> ClientResult<Mockup> {
        self.send(Method::PUT, &format!("/mockups/{id}"), update).await
    }

    pub async fn review_mockup(&self, id: i64, review: &MockupReview) -> ClientResult<Mockup> {
        self.send(Method::PATCH, &format!("/mockups/{id}/review"), review)
            .await
    }

    pub async fn delete_mockup(&self, id: i64) -> ClientResult<()> {
        self.delete(&format!("/mockups/{id}")).await
    }

    // Reports

    pub async fn dashboard(&self) -> ClientResult<Dashboard> {
        self.get("/reports/dashboard").await
    }

    pub async fn health(&self) -> ClientResult<()> {
        let response = self
            .http
            .get(format!("{}/healthz", self.base_url))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
