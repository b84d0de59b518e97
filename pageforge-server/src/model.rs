//! Request, target and payload types that flow through the build pipeline.

use serde::{Deserialize, Serialize};

use crate::error::BuildError;

/// Brief used when the caller sends an empty one.
pub const DEFAULT_BRIEF: &str =
    "Create a simple single-page web app that displays a friendly Hello World message.";

/// Build request as sent by the harness.
///
/// Every field defaults so that a missing field surfaces as a validation
/// error instead of a deserialization failure. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildRequest {
    pub email: String,
    pub secret: String,
    pub task: String,
    pub round: i64,
    pub nonce: String,
    pub brief: String,
    #[serde(alias = "evaluationUrl")]
    pub evaluation_url: Option<String>,
}

/// A request that passed authentication and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub email: String,
    pub task: String,
    pub round: u32,
    pub nonce: String,
    pub brief: String,
    pub evaluation_url: String,
}

/// Check a presented secret. An unconfigured secret rejects everything.
pub fn check_secret(presented: &str, expected: &str) -> Result<(), BuildError> {
    if expected.is_empty() || presented != expected {
        return Err(BuildError::InvalidSecret);
    }
    Ok(())
}

impl BuildRequest {
    /// Authenticate a raw request body, looking at nothing but `secret`.
    ///
    /// A missing or non-string secret is treated as empty.
    pub fn authenticate_body(body: &serde_json::Value, expected_secret: &str) -> Result<(), BuildError> {
        let presented = body
            .get("secret")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        check_secret(presented, expected_secret)
    }

    /// Decode an already authenticated body. Type mismatches are validation errors.
    pub fn from_body(body: serde_json::Value) -> Result<Self, BuildError> {
        serde_json::from_value(body)
            .map_err(|e| BuildError::Validation(format!("Invalid request body: {e}")))
    }

    /// Validate and normalize the remaining fields.
    ///
    /// `allowed_email` empty means any email is accepted.
    pub fn validate(
        self,
        allowed_email: &str,
        default_evaluation_url: &str,
    ) -> Result<ValidatedRequest, BuildError> {
        let email = self.email.trim();
        if !allowed_email.is_empty() && !email.eq_ignore_ascii_case(allowed_email.trim()) {
            return Err(BuildError::Validation("Email not allowed".into()));
        }

        let task = self.task.trim();
        if task.is_empty() {
            return Err(BuildError::Validation("Task must not be empty".into()));
        }
        if let Some(bad) = task
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(BuildError::Validation(format!(
                "Task contains invalid character {bad:?}"
            )));
        }

        if self.round < 1 {
            return Err(BuildError::Validation(format!(
                "Round must be >= 1, got {}",
                self.round
            )));
        }
        let round = u32::try_from(self.round)
            .map_err(|_| BuildError::Validation(format!("Round {} out of range", self.round)))?;

        let brief = match self.brief.trim() {
            "" => DEFAULT_BRIEF.to_string(),
            b => b.to_string(),
        };

        let evaluation_url = self
            .evaluation_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| default_evaluation_url.to_string());

        Ok(ValidatedRequest {
            email: email.to_string(),
            task: task.to_string(),
            round,
            nonce: self.nonce,
            brief,
            evaluation_url,
        })
    }
}

/// Repository a request publishes to. Computed fresh per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryTarget {
    pub name: String,
    pub html_url: String,
    pub clone_url: String,
    pub pages_url: String,
    /// Whether the repository existed before this request.
    pub exists: bool,
}

/// How the working copy is updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishMode {
    /// Files are written from scratch.
    Initial,
    /// Existing files are annotated, never replaced.
    Update,
}

impl PublishMode {
    /// Update only when the repository already existed and this is a later round.
    pub fn for_target(exists: bool, round: u32) -> Self {
        if exists && round >= 2 {
            PublishMode::Update
        } else {
            PublishMode::Initial
        }
    }

    pub fn commit_message(self, round: u32) -> String {
        match self {
            PublishMode::Initial => "initial commit".to_string(),
            PublishMode::Update => format!("round {round} update"),
        }
    }
}

/// Outcome of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishResult {
    pub repo_url: String,
    pub clone_url: String,
    pub mode: PublishMode,
    pub commit_message: String,
    pub commit_sha: String,
}

impl PublishResult {
    pub fn is_update(&self) -> bool {
        self.mode == PublishMode::Update
    }
}

/// One synthesized check in the evaluator payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub check: String,
    pub score: f64,
    pub reason: String,
}

/// Record delivered to the evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub email: String,
    pub task: String,
    pub round: u32,
    pub nonce: String,
    pub repo_url: String,
    pub pages_url: String,
    pub commit_sha: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<CheckResult>>,
}

/// Success body of `POST /api-endpoint`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResponse {
    pub status: String,
    pub repo_url: String,
    pub pages_url: String,
}
