//! Repository host client.
//!
//! Calls:
//!   GET  /repos/{owner}/{name}          → existence + URLs
//!   POST /user/repos                    → create (public, auto-initialized)
//!   POST /repos/{owner}/{name}/pages    → serve `main` at `/` as a static site

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

/// Failure talking to the repository host. Carries the upstream status and body verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("{status} {body}")]
    Status { status: u16, body: String },
    #[error("could not decode response: {0}")]
    Decode(String),
}

/// URLs the host reports for a repository.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepoInfo {
    pub html_url: String,
    pub clone_url: String,
}

/// Result of a static-hosting request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostingStatus {
    Enabled,
    /// The host reports the site is already configured.
    AlreadyEnabled,
    Failed(String),
}

/// Repository host collaborator.
#[async_trait]
pub trait RepoHost: Send + Sync {
    /// Account the repositories live under.
    fn owner(&self) -> &str;

    /// `Ok(None)` when the repository does not exist.
    async fn get_repo(&self, name: &str) -> Result<Option<RepoInfo>, HostError>;

    async fn create_repo(&self, name: &str) -> Result<RepoInfo, HostError>;

    async fn enable_pages(&self, name: &str) -> HostingStatus;
}

pub struct GitHubClient {
    api_url: String,
    owner: String,
    token: String,
    http: reqwest::Client,
}

impl GitHubClient {
    pub fn new(
        api_url: &str,
        owner: &str,
        token: &str,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pageforge/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            owner: owner.to_string(),
            token: token.to_string(),
            http,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.api_url))
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }
}

async fn status_error(resp: reqwest::Response) -> HostError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    HostError::Status { status, body }
}

async fn decode_repo(resp: reqwest::Response) -> Result<RepoInfo, HostError> {
    resp.json::<RepoInfo>()
        .await
        .map_err(|e| HostError::Decode(e.to_string()))
}

#[async_trait]
impl RepoHost for GitHubClient {
    fn owner(&self) -> &str {
        &self.owner
    }

    async fn get_repo(&self, name: &str) -> Result<Option<RepoInfo>, HostError> {
        let resp = self
            .request(reqwest::Method::GET, &format!("/repos/{}/{name}", self.owner))
            .send()
            .await
            .map_err(|e| HostError::Transport(e.to_string()))?;

        match resp.status() {
            StatusCode::OK => decode_repo(resp).await.map(Some),
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(status_error(resp).await),
        }
    }

    async fn create_repo(&self, name: &str) -> Result<RepoInfo, HostError> {
        let body = serde_json::json!({
            "name": name,
            "private": false,
            "auto_init": true,
        });
        let resp = self
            .request(reqwest::Method::POST, "/user/repos")
            .json(&body)
            .send()
            .await
            .map_err(|e| HostError::Transport(e.to_string()))?;

        if resp.status() != StatusCode::CREATED {
            return Err(status_error(resp).await);
        }
        decode_repo(resp).await
    }

    async fn enable_pages(&self, name: &str) -> HostingStatus {
        let body = serde_json::json!({ "source": { "branch": "main", "path": "/" } });
        let resp = match self
            .request(
                reqwest::Method::POST,
                &format!("/repos/{}/{name}/pages", self.owner),
            )
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return HostingStatus::Failed(e.to_string()),
        };

        match resp.status() {
            StatusCode::CREATED | StatusCode::NO_CONTENT => HostingStatus::Enabled,
            StatusCode::CONFLICT => HostingStatus::AlreadyEnabled,
            _ => HostingStatus::Failed(status_error(resp).await.to_string()),
        }
    }
}
