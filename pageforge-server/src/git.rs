//! Version-control seam.
//!
//! [`GitCli`] shells out to `git`. Each step is a blocking, out-of-process
//! command bounded by a timeout; a step that times out is killed. Output is
//! scrubbed of credentials before it is logged or returned.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GitError {
    #[error("could not run git {step}: {detail}")]
    Spawn { step: &'static str, detail: String },
    #[error("git {step} timed out after {secs}s")]
    Timeout { step: &'static str, secs: u64 },
    #[error("git {step} failed: {stderr}")]
    Failed { step: &'static str, stderr: String },
    #[error("invalid clone URL: {0}")]
    BadUrl(String),
}

/// Working-copy operations the publisher needs.
#[async_trait]
pub trait Vcs: Send + Sync {
    /// Clone `url` into `dest`, which must not exist or be empty.
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), GitError>;

    async fn set_identity(&self, dir: &Path, name: &str, email: &str) -> Result<(), GitError>;

    /// Stage everything and commit, even when nothing changed. Returns the new commit id.
    async fn commit_all(&self, dir: &Path, message: &str) -> Result<String, GitError>;

    /// Push the checked-out branch to its upstream.
    async fn push(&self, dir: &Path) -> Result<(), GitError>;
}

/// Insert `user:token` credentials into an https clone URL.
pub fn authenticated_url(clone_url: &str, user: &str, token: &str) -> Result<String, GitError> {
    let mut url = url::Url::parse(clone_url).map_err(|e| GitError::BadUrl(e.to_string()))?;
    if token.is_empty() || url.scheme() == "file" {
        return Ok(url.to_string());
    }
    url.set_username(user)
        .map_err(|_| GitError::BadUrl(format!("cannot set user on {clone_url}")))?;
    url.set_password(Some(token))
        .map_err(|_| GitError::BadUrl(format!("cannot set credentials on {clone_url}")))?;
    Ok(url.to_string())
}

/// What a failed step reported. Some diagnostics ("nothing to commit") only
/// go to stdout.
fn failure_detail(stderr: &str, stdout: &str, code: Option<i32>) -> String {
    match (stderr.trim(), stdout.trim()) {
        ("", "") => match code {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        },
        ("", out) => out.to_string(),
        (err, _) => err.to_string(),
    }
}

pub struct GitCli {
    timeout: Duration,
    secrets: Vec<String>,
}

impl GitCli {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            secrets: Vec::new(),
        }
    }

    /// Strings that must never appear in logs or errors.
    pub fn with_secret(mut self, secret: &str) -> Self {
        if !secret.is_empty() {
            self.secrets.push(secret.to_string());
        }
        self
    }

    fn redact(&self, text: &str) -> String {
        self.secrets
            .iter()
            .fold(text.to_string(), |acc, s| acc.replace(s.as_str(), "***"))
    }

    async fn run(&self, step: &'static str, dir: Option<&Path>, args: &[&str]) -> Result<String, GitError> {
        let mut cmd = Command::new("git");
        cmd.args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true);
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| GitError::Timeout {
                step,
                secs: self.timeout.as_secs(),
            })?
            .map_err(|e| GitError::Spawn {
                step,
                detail: e.to_string(),
            })?;

        let stdout = self.redact(&String::from_utf8_lossy(&output.stdout));
        if !output.status.success() {
            let stderr = self.redact(&String::from_utf8_lossy(&output.stderr));
            let stderr = failure_detail(&stderr, &stdout, output.status.code());
            tracing::debug!(step, %stderr, "git step failed");
            return Err(GitError::Failed { step, stderr });
        }
        Ok(stdout)
    }
}

#[async_trait]
impl Vcs for GitCli {
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), GitError> {
        let dest = dest.to_string_lossy();
        self.run("clone", None, &["clone", "--quiet", url, &dest]).await?;
        Ok(())
    }

    async fn set_identity(&self, dir: &Path, name: &str, email: &str) -> Result<(), GitError> {
        self.run("config", Some(dir), &["config", "user.name", name]).await?;
        self.run("config", Some(dir), &["config", "user.email", email]).await?;
        Ok(())
    }

    async fn commit_all(&self, dir: &Path, message: &str) -> Result<String, GitError> {
        self.run("add", Some(dir), &["add", "--all"]).await?;
        // An unchanged tree still records the round's commit.
        self.run("commit", Some(dir), &["commit", "--quiet", "--allow-empty", "-m", message])
            .await?;
        let sha = self.run("rev-parse", Some(dir), &["rev-parse", "HEAD"]).await?;
        Ok(sha.trim().to_string())
    }

    async fn push(&self, dir: &Path) -> Result<(), GitError> {
        self.run("push", Some(dir), &["push", "--quiet", "origin", "HEAD"]).await?;
        Ok(())
    }
}
