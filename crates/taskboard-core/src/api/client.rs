//! API client for communicating with the taskboard REST backend.
//!
//! This module provides the `ApiClient` struct for the auth, project, task
//! and subtask endpoints. The session credential is a cookie set by the
//! backend on login/signup; the client's cookie jar carries it implicitly.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Method, Response};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::auth::AuthBackend;
use crate::config::Config;
use crate::models::task::clamp_per_page;
use crate::models::{
    AuthResponse, Deleted, NewProject, NewSubtask, NewTask, Page, Project, ProjectPatch,
    SessionCheck, Subtask, SubtaskPatch, Task, TaskDetail, TaskPatch, TaskQuery, TaskStatus, User,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// API client for the taskboard backend.
/// Clone is cheap - reqwest::Client uses Arc internally, and clones share
/// both the connection pool and the cookie jar (and therefore the session).
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client for `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> ApiResult<Self> {
        Self::new(config.api_base_url(), config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(response: Response) -> ApiResult<Option<Response>> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Send a request, backing off and retrying while the server rate limits.
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> ApiResult<Response> {
        let url = self.url(path);
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let mut request = self
                .client
                .request(method.clone(), &url)
                .header(header::ACCEPT, "application/json");
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            debug!(method = %method, url = %url, "Sending request");
            let response = request.send().await?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => return Ok(response),
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited);
                    }
                    warn!(url = %url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2; // Exponential backoff
                }
            }
        }
    }

    async fn parse<T: DeserializeOwned>(response: Response, path: &str) -> ApiResult<T> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", path, e))
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> ApiResult<T> {
        let response = self.send::<()>(Method::GET, path, query, None).await?;
        Self::parse(response, path).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ApiResult<T> {
        let response = self.send(Method::POST, path, &[], Some(body)).await?;
        Self::parse(response, path).await
    }

    async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ApiResult<T> {
        let response = self.send(Method::PATCH, path, &[], Some(body)).await?;
        Self::parse(response, path).await
    }

    async fn delete(&self, path: &str) -> ApiResult<Deleted> {
        let response = self.send::<()>(Method::DELETE, path, &[], None).await?;
        Self::parse(response, path).await
    }

    // ===== Auth =====

    /// Ask the backend who the session cookie belongs to
    pub async fn me(&self) -> ApiResult<SessionCheck> {
        self.get("/auth/me", &[]).await
    }

    pub async fn login(&self, email: &str, password: &str) -> ApiResult<User> {
        let body = serde_json::json!({
            "email": email.trim(),
            "password": password,
        });
        let response: AuthResponse = self.post("/auth/login", &body).await?;
        Ok(response.user)
    }

    pub async fn signup(&self, username: &str, email: &str, password: &str) -> ApiResult<User> {
        let body = serde_json::json!({
            "username": username.trim(),
            "email": email.trim(),
            "password": password,
        });
        let response: AuthResponse = self.post("/auth/signup", &body).await?;
        Ok(response.user)
    }

    /// End the server-side session. The backend answers 204 with no body.
    pub async fn logout(&self) -> ApiResult<()> {
        self.send::<()>(Method::POST, "/auth/logout", &[], None).await?;
        Ok(())
    }

    // ===== Projects =====

    /// List the current user's projects, newest first
    pub async fn list_projects(&self, page: u32, per_page: u32, search: Option<&str>) -> ApiResult<Page<Project>> {
        let mut query = vec![
            ("page", page.max(1).to_string()),
            ("per_page", clamp_per_page(per_page).to_string()),
        ];
        if let Some(q) = search.map(str::trim).filter(|q| !q.is_empty()) {
            query.push(("q", q.to_string()));
        }
        self.get("/projects", &query).await
    }

    pub async fn create_project(&self, project: &NewProject) -> ApiResult<Project> {
        self.post("/projects", project).await
    }

    pub async fn update_project(&self, project_id: i64, patch: &ProjectPatch) -> ApiResult<Project> {
        self.patch(&format!("/projects/{}", project_id), patch).await
    }

    /// Delete a project along with its tasks and subtasks
    pub async fn delete_project(&self, project_id: i64) -> ApiResult<Deleted> {
        self.delete(&format!("/projects/{}", project_id)).await
    }

    // ===== Tasks =====

    pub async fn list_tasks(&self, query: &TaskQuery) -> ApiResult<Page<Task>> {
        self.get("/tasks", &query.to_query_pairs()).await
    }

    /// Fetch one task with its subtasks inlined
    pub async fn get_task(&self, task_id: i64) -> ApiResult<TaskDetail> {
        self.get(&format!("/tasks/{}", task_id), &[]).await
    }

    pub async fn create_task(&self, task: &NewTask) -> ApiResult<Task> {
        self.post("/tasks", task).await
    }

    pub async fn update_task(&self, task_id: i64, patch: &TaskPatch) -> ApiResult<Task> {
        self.patch(&format!("/tasks/{}", task_id), patch).await
    }

    pub async fn delete_task(&self, task_id: i64) -> ApiResult<Deleted> {
        self.delete(&format!("/tasks/{}", task_id)).await
    }

    // ===== Subtasks =====

    /// List subtasks of a task. Unlike tasks, this endpoint is not paginated.
    pub async fn list_subtasks(&self, task_id: i64, status: Option<TaskStatus>) -> ApiResult<Vec<Subtask>> {
        let mut query = vec![("task_id", task_id.to_string())];
        if let Some(status) = status {
            query.push(("status", status.as_str().to_string()));
        }
        self.get("/subtasks", &query).await
    }

    pub async fn create_subtask(&self, subtask: &NewSubtask) -> ApiResult<Subtask> {
        self.post("/subtasks", subtask).await
    }

    pub async fn update_subtask(&self, subtask_id: i64, patch: &SubtaskPatch) -> ApiResult<Subtask> {
        self.patch(&format!("/subtasks/{}", subtask_id), patch).await
    }

    pub async fn delete_subtask(&self, subtask_id: i64) -> ApiResult<Deleted> {
        self.delete(&format!("/subtasks/{}", subtask_id)).await
    }
}

#[async_trait]
impl AuthBackend for ApiClient {
    async fn check_session(&self) -> ApiResult<SessionCheck> {
        self.me().await
    }

    async fn login(&self, email: &str, password: &str) -> ApiResult<User> {
        ApiClient::login(self, email, password).await
    }

    async fn signup(&self, username: &str, email: &str, password: &str) -> ApiResult<User> {
        ApiClient::signup(self, username, email, password).await
    }

    async fn logout(&self) -> ApiResult<()> {
        ApiClient::logout(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::new("http://127.0.0.1:5005/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:5005");
        assert_eq!(client.url("/auth/me"), "http://127.0.0.1:5005/auth/me");
    }

    #[test]
    fn test_client_from_default_config() {
        let client = ApiClient::from_config(&Config::default()).unwrap();
        assert_eq!(client.url("/projects/3"), "http://127.0.0.1:5005/projects/3");
    }
}
