//! Request Orchestrator.
//!
//! Drives one build through a linear pipeline:
//!
//! ```text
//! Authenticating → Validating → Generating → Resolving → Publishing
//!     → Activating → Notifying → Responding
//! ```
//!
//! Any stage up to and including Publishing can short-circuit to Responding
//! with a [`BuildError`]. Activating and Notifying are advisory: once the
//! content is pushed the build has succeeded, whatever they report.

use std::sync::Arc;

use tracing::Instrument;

use crate::config::Config;
use crate::error::BuildError;
use crate::generator::PageGenerator;
use crate::git::Vcs;
use crate::github::{HostingStatus, RepoHost};
use crate::hosting::HostingActivator;
use crate::llm::Generator;
use crate::model::{
    BuildRequest, BuildResponse, CheckResult, NotificationPayload, PublishResult, ValidatedRequest,
};
use crate::notifier::{Delivery, Evaluator, Notifier, RetryPolicy};
use crate::publisher::{Publisher, PublisherSettings};
use crate::resolver::RepositoryResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Authenticating,
    Validating,
    Generating,
    Resolving,
    Publishing,
    Activating,
    Notifying,
    Responding,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Authenticating => write!(f, "authenticating"),
            Stage::Validating => write!(f, "validating"),
            Stage::Generating => write!(f, "generating"),
            Stage::Resolving => write!(f, "resolving"),
            Stage::Publishing => write!(f, "publishing"),
            Stage::Activating => write!(f, "activating"),
            Stage::Notifying => write!(f, "notifying"),
            Stage::Responding => write!(f, "responding"),
        }
    }
}

/// Everything a successful build produced.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub response: BuildResponse,
    pub publish: PublishResult,
    pub hosting: HostingStatus,
    pub delivery: Delivery,
}

/// Collaborators the orchestrator is wired with.
pub struct Collaborators {
    pub generator: Arc<dyn Generator>,
    pub host: Arc<dyn RepoHost>,
    pub vcs: Arc<dyn Vcs>,
    pub evaluator: Arc<dyn Evaluator>,
}

pub struct Orchestrator {
    secret: String,
    allowed_email: String,
    default_evaluation_url: String,
    generator: PageGenerator,
    resolver: RepositoryResolver,
    publisher: Publisher,
    hosting: HostingActivator,
    notifier: Notifier,
}

impl Orchestrator {
    pub fn new(config: &Config, collaborators: Collaborators) -> Self {
        let Collaborators {
            generator,
            host,
            vcs,
            evaluator,
        } = collaborators;

        let publisher = Publisher::new(
            vcs,
            PublisherSettings {
                owner: config.github_owner.clone(),
                token: config.github_token.clone(),
                committer_name: config.committer_name.clone(),
                committer_email: config.committer_email.clone(),
            },
        );
        let policy = RetryPolicy {
            attempts: config.notify_attempts,
            base_delay: config.notify_base_delay(),
        };

        Self {
            secret: config.student_secret.clone(),
            allowed_email: config.allowed_email.clone(),
            default_evaluation_url: config.evaluation_url.clone(),
            generator: PageGenerator::new(generator),
            resolver: RepositoryResolver::new(host.clone()),
            publisher,
            hosting: HostingActivator::new(host),
            notifier: Notifier::new(evaluator, policy),
        }
    }

    /// Run one build request to completion.
    ///
    /// Nothing but the secret is looked at until authentication passes, so a
    /// wrong secret wins over any malformed field.
    pub async fn run(&self, body: serde_json::Value) -> Result<BuildOutcome, BuildError> {
        enter(Stage::Authenticating);
        BuildRequest::authenticate_body(&body, &self.secret)
            .map_err(|e| fail(Stage::Authenticating, e))?;

        enter(Stage::Validating);
        let request = BuildRequest::from_body(body)
            .and_then(|r| r.validate(&self.allowed_email, &self.default_evaluation_url))
            .map_err(|e| fail(Stage::Validating, e))?;

        let span = tracing::info_span!("build", task = %request.task, round = request.round);
        self.pipeline(request).instrument(span).await
    }

    async fn pipeline(&self, request: ValidatedRequest) -> Result<BuildOutcome, BuildError> {
        enter(Stage::Generating);
        let page = self
            .generator
            .generate_page(&request)
            .await
            .map_err(|e| fail(Stage::Generating, e))?;

        enter(Stage::Resolving);
        let target = self
            .resolver
            .resolve(&request.task, request.round)
            .await
            .map_err(|e| fail(Stage::Resolving, e))?;

        enter(Stage::Publishing);
        let publish = self
            .publisher
            .publish(&target, &page, &request)
            .await
            .map_err(|e| fail(Stage::Publishing, e))?;

        enter(Stage::Activating);
        let hosting = self.hosting.activate(&target.name).await;

        enter(Stage::Notifying);
        let payload = NotificationPayload {
            email: request.email.clone(),
            task: request.task.clone(),
            round: request.round,
            nonce: request.nonce.clone(),
            repo_url: publish.repo_url.clone(),
            pages_url: target.pages_url.clone(),
            commit_sha: publish.commit_sha.clone(),
            status: "success".to_string(),
            results: Some(synthesize_checks(&publish, &hosting)),
        };
        let delivery = self.notifier.notify(&payload, &request.evaluation_url).await;

        enter(Stage::Responding);
        tracing::info!(
            repo = %publish.repo_url,
            pages = %target.pages_url,
            delivered = delivery.is_delivered(),
            "build complete"
        );

        Ok(BuildOutcome {
            response: BuildResponse {
                status: "success".to_string(),
                repo_url: publish.repo_url.clone(),
                pages_url: target.pages_url,
            },
            publish,
            hosting,
            delivery,
        })
    }
}

fn enter(stage: Stage) {
    tracing::debug!(%stage, "stage");
}

fn fail(stage: Stage, err: BuildError) -> BuildError {
    tracing::warn!(%stage, kind = err.kind(), error = %err, "build failed");
    err
}

/// Checks reported to the evaluator, derived from what the pipeline itself did.
pub fn synthesize_checks(publish: &PublishResult, hosting: &HostingStatus) -> Vec<CheckResult> {
    let short_sha: String = publish.commit_sha.chars().take(7).collect();
    let (pages_score, pages_reason) = match hosting {
        HostingStatus::Enabled => (1.0, "static hosting enabled on main".to_string()),
        HostingStatus::AlreadyEnabled => (1.0, "static hosting already enabled".to_string()),
        HostingStatus::Failed(reason) => (0.0, format!("static hosting request failed: {reason}")),
    };
    vec![
        CheckResult {
            check: "repo_published".to_string(),
            score: 1.0,
            reason: format!("pushed \"{}\" at {short_sha}", publish.commit_message),
        },
        CheckResult {
            check: "license_present".to_string(),
            score: 1.0,
            reason: "MIT LICENSE committed".to_string(),
        },
        CheckResult {
            check: "pages_requested".to_string(),
            score: pages_score,
            reason: pages_reason,
        },
    ]
}
