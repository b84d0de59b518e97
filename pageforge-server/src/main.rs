use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pageforge_server::config::Config;
use pageforge_server::git::GitCli;
use pageforge_server::github::GitHubClient;
use pageforge_server::llm::LlmClient;
use pageforge_server::notifier::HttpEvaluator;
use pageforge_server::orchestrator::{Collaborators, Orchestrator};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    // JSON logs in production (--log-json), human-readable otherwise
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pageforge_server=info,tower_http=info"));
    if config.log_json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let missing = config.missing_required();
    if !missing.is_empty() {
        tracing::warn!(?missing, "required settings are not set; builds will fail until they are");
    }

    let generator = LlmClient::new(config.openai_api_key.clone(), config.llm_timeout())
        .context("failed to build generation client")?
        .with_base_url(&config.openai_base_url)
        .with_model(&config.model)
        .with_temperature(config.temperature);
    let host = GitHubClient::new(
        &config.github_api_url,
        &config.github_owner,
        &config.github_token,
        config.http_timeout(),
    )
    .context("failed to build repository host client")?;
    let evaluator =
        HttpEvaluator::new(config.http_timeout()).context("failed to build evaluator client")?;

    let collaborators = Collaborators {
        generator: Arc::new(generator),
        host: Arc::new(host),
        vcs: Arc::new(GitCli::new(config.git_timeout()).with_secret(&config.github_token)),
        evaluator: Arc::new(evaluator),
    };
    let orchestrator = Arc::new(Orchestrator::new(&config, collaborators));
    let app = pageforge_server::web::router(orchestrator);

    let port = std::env::var("PORT").ok();
    let addr = config.resolved_listen_addr(port.as_deref());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, owner = %config.github_owner, model = %config.model, "pageforge listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}
