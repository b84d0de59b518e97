//! Hosting Activator. Advisory: the outcome is logged and never fails a build.

use std::sync::Arc;

use crate::github::{HostingStatus, RepoHost};

pub struct HostingActivator {
    host: Arc<dyn RepoHost>,
}

impl HostingActivator {
    pub fn new(host: Arc<dyn RepoHost>) -> Self {
        Self { host }
    }

    pub async fn activate(&self, repo: &str) -> HostingStatus {
        let status = self.host.enable_pages(repo).await;
        match &status {
            HostingStatus::Enabled => tracing::info!(%repo, "static hosting enabled"),
            HostingStatus::AlreadyEnabled => tracing::info!(%repo, "static hosting already enabled"),
            HostingStatus::Failed(reason) => {
                tracing::warn!(%repo, %reason, "static hosting request failed, continuing")
            }
        }
        status
    }
}
