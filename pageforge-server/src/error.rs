//! Request-level failure taxonomy.
//!
//! A [`BuildError`] is what a failed pipeline stage hands back to the
//! orchestrator. Only these reach the caller; advisory outcomes (hosting,
//! notification) are modelled as plain enums in their own modules.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("Invalid secret")]
    InvalidSecret,
    #[error("{0}")]
    Validation(String),
    #[error("Content generation failed: {0}")]
    Generation(String),
    #[error("Repository lookup failed: {0}")]
    RepoLookup(String),
    #[error("GitHub repo creation failed: {0}")]
    RepoCreate(String),
    #[error("Publishing failed: {0}")]
    Publish(String),
}

impl BuildError {
    /// Stable tag used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            BuildError::InvalidSecret => "auth",
            BuildError::Validation(_) => "validation",
            BuildError::Generation(_) => "generation",
            BuildError::RepoLookup(_) => "repo_lookup",
            BuildError::RepoCreate(_) => "repo_create",
            BuildError::Publish(_) => "publish",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            BuildError::InvalidSecret => StatusCode::FORBIDDEN,
            BuildError::Validation(_) => StatusCode::BAD_REQUEST,
            BuildError::Generation(_)
            | BuildError::RepoLookup(_)
            | BuildError::RepoCreate(_)
            | BuildError::Publish(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BuildError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}
