//! [`BoardApi`] over HTTP.
//!
//! The session lives in cookies set by the server, so the client keeps a
//! cookie jar for its whole lifetime. When the server has handed out an
//! `XSRF-TOKEN` cookie it is echoed back in the `X-XSRF-TOKEN` header.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, trace, warn};

use crate::api::{
    ApiResult, Assignment, BoardApi, NewComment, NewTask, StatusChange, TaskPatch,
};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::model::{
    Comment, ProjectRef, RawComment, RawProject, RawRef, RawTask, RawUser, Task, User, UserRef,
};

const XSRF_COOKIE: &str = "XSRF-TOKEN";
const XSRF_HEADER: &str = "X-XSRF-TOKEN";

#[derive(Debug, Deserialize)]
struct AssignResponse {
    #[serde(default)]
    assignee: Option<RawRef>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    config: ClientConfig,
    cookies: Arc<Jar>,
}

impl HttpApi {
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        let cookies = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&cookies))
            .timeout(config.timeout)
            .build()?;
        Ok(HttpApi {
            client,
            config,
            cookies,
        })
    }

    pub fn from_env() -> ApiResult<Self> {
        Self::new(ClientConfig::from_env())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Seeds the jar, e.g. with a session obtained by a separate login flow.
    pub fn add_cookie(&self, cookie: &str) -> ApiResult<()> {
        let url = self.url("")?;
        self.cookies.add_cookie_str(cookie, &url);
        Ok(())
    }

    fn url(&self, path: &str) -> ApiResult<Url> {
        Url::parse(&self.config.endpoint(path))
            .map_err(|err| ApiError::Transport(format!("invalid url for {}: {}", path, err)))
    }

    fn xsrf_token(&self, url: &Url) -> Option<String> {
        let header = self.cookies.cookies(url)?;
        let header = header.to_str().ok()?;
        header.split(';').find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == XSRF_COOKIE).then(|| value.to_string())
        })
    }

    /// `/tasks/<id>/<tail..>` with the id escaped as a single path segment.
    fn task_url(&self, task_id: &str, tail: &[&str]) -> ApiResult<Url> {
        let mut url = self.url("/tasks")?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Transport("base url cannot hold a path".to_string()))?
            .pop_if_empty()
            .push(task_id)
            .extend(tail);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> ApiResult<RequestBuilder> {
        debug!(%method, %url, "api request");
        let token = self.xsrf_token(&url);
        let mut builder = self.client.request(method, url);
        if let Some(token) = token {
            builder = builder.header(XSRF_HEADER, token);
        }
        Ok(builder)
    }

    async fn execute(&self, builder: RequestBuilder) -> ApiResult<Vec<u8>> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message.or(b.error))
                .or_else(|| {
                    let text = String::from_utf8_lossy(&body).trim().to_string();
                    (!text.is_empty()).then_some(text)
                })
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
            warn!(status = status.as_u16(), %message, "api request failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }
        trace!(bytes = body.len(), "api response");
        Ok(body.to_vec())
    }

    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ApiResult<T> {
        let body = self.execute(builder).await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl BoardApi for HttpApi {
    async fn list_tasks(&self) -> ApiResult<Vec<Task>> {
        let builder = self.request(Method::GET, self.url("/tasks")?)?;
        let raw: Vec<RawTask> = self.fetch(builder).await?;
        Ok(raw.into_iter().map(RawTask::normalize).collect())
    }

    async fn list_users(&self) -> ApiResult<Vec<User>> {
        let builder = self.request(Method::GET, self.url("/users")?)?;
        let raw: Vec<RawUser> = self.fetch(builder).await?;
        Ok(raw.into_iter().map(RawUser::normalize).collect())
    }

    async fn list_projects(&self) -> ApiResult<Vec<ProjectRef>> {
        let builder = self.request(Method::GET, self.url("/projects")?)?;
        let raw: Vec<RawProject> = self.fetch(builder).await?;
        Ok(raw.into_iter().map(RawProject::normalize).collect())
    }

    async fn create_task(&self, task: &NewTask) -> ApiResult<Task> {
        let builder = self.request(Method::POST, self.url("/tasks")?)?.json(task);
        let raw: RawTask = self.fetch(builder).await?;
        Ok(raw.normalize())
    }

    async fn update_task(&self, task_id: &str, patch: &TaskPatch) -> ApiResult<()> {
        let builder = self
            .request(Method::PATCH, self.task_url(task_id, &[])?)?
            .json(patch);
        self.execute(builder).await?;
        Ok(())
    }

    async fn set_status(&self, task_id: &str, change: &StatusChange) -> ApiResult<()> {
        let builder = self
            .request(Method::POST, self.task_url(task_id, &["status"])?)?
            .json(change);
        self.execute(builder).await?;
        Ok(())
    }

    async fn delete_task(&self, task_id: &str) -> ApiResult<()> {
        let builder = self.request(Method::DELETE, self.task_url(task_id, &[])?)?;
        self.execute(builder).await?;
        Ok(())
    }

    async fn assign_task(
        &self,
        task_id: &str,
        assignment: &Assignment,
    ) -> ApiResult<Option<UserRef>> {
        let builder = self
            .request(Method::PUT, self.task_url(task_id, &["assign"])?)?
            .json(assignment);
        let response: AssignResponse = self.fetch(builder).await?;
        Ok(response.assignee.map(RawRef::into_user))
    }

    async fn list_comments(&self, task_id: &str) -> ApiResult<Vec<Comment>> {
        let builder = self.request(Method::GET, self.task_url(task_id, &["comments"])?)?;
        let raw: Vec<RawComment> = self.fetch(builder).await?;
        Ok(raw.into_iter().map(|c| c.normalize(task_id)).collect())
    }

    async fn add_comment(&self, task_id: &str, comment: &NewComment) -> ApiResult<Comment> {
        let builder = self
            .request(Method::POST, self.task_url(task_id, &["comments"])?)?
            .json(comment);
        let raw: RawComment = self.fetch(builder).await?;
        Ok(raw.normalize(task_id))
    }
}
