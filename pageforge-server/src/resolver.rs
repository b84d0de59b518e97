//! Repository Resolver.
//!
//! Naming is pinned to round 1: every round of a task publishes to
//! `{task}-round1`, so later rounds update the repository round 1 created.

use std::sync::Arc;

use crate::error::BuildError;
use crate::github::RepoHost;
use crate::model::RepositoryTarget;

/// Repository name for a task. The round does not participate.
pub fn repo_name(task: &str) -> String {
    format!("{task}-round1")
}

/// Static-site URL the host serves a repository at.
pub fn pages_url(owner: &str, name: &str) -> String {
    format!("https://{owner}.github.io/{name}/")
}

pub struct RepositoryResolver {
    host: Arc<dyn RepoHost>,
}

impl RepositoryResolver {
    pub fn new(host: Arc<dyn RepoHost>) -> Self {
        Self { host }
    }

    /// Look the target up, creating it when absent.
    ///
    /// Creation is never retried: a rejected create may still have left state
    /// behind on the host.
    pub async fn resolve(&self, task: &str, round: u32) -> Result<RepositoryTarget, BuildError> {
        let name = repo_name(task);
        let pages_url = pages_url(self.host.owner(), &name);

        let existing = self
            .host
            .get_repo(&name)
            .await
            .map_err(|e| BuildError::RepoLookup(e.to_string()))?;

        if let Some(info) = existing {
            tracing::info!(repo = %name, round, "repository exists");
            return Ok(RepositoryTarget {
                name,
                html_url: info.html_url,
                clone_url: info.clone_url,
                pages_url,
                exists: true,
            });
        }

        let info = self
            .host
            .create_repo(&name)
            .await
            .map_err(|e| BuildError::RepoCreate(e.to_string()))?;
        tracing::info!(repo = %name, url = %info.html_url, round, "repository created");

        Ok(RepositoryTarget {
            name,
            html_url: info.html_url,
            clone_url: info.clone_url,
            pages_url,
            exists: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::{HostError, HostingStatus, RepoInfo};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeHost {
        repos: Mutex<HashMap<String, RepoInfo>>,
        creates: Mutex<u32>,
        reject_create: bool,
    }

    fn info(name: &str) -> RepoInfo {
        RepoInfo {
            html_url: format!("https://github.com/octo/{name}"),
            clone_url: format!("https://github.com/octo/{name}.git"),
        }
    }

    #[async_trait]
    impl RepoHost for FakeHost {
        fn owner(&self) -> &str {
            "octo"
        }

        async fn get_repo(&self, name: &str) -> Result<Option<RepoInfo>, HostError> {
            Ok(self.repos.lock().unwrap().get(name).cloned())
        }

        async fn create_repo(&self, name: &str) -> Result<RepoInfo, HostError> {
            *self.creates.lock().unwrap() += 1;
            if self.reject_create {
                return Err(HostError::Status {
                    status: 422,
                    body: "name already exists on this account".into(),
                });
            }
            let created = info(name);
            self.repos.lock().unwrap().insert(name.to_string(), created.clone());
            Ok(created)
        }

        async fn enable_pages(&self, _name: &str) -> HostingStatus {
            HostingStatus::Enabled
        }
    }

    #[test]
    fn naming_is_pinned_to_round_one() {
        assert_eq!(repo_name("demo"), "demo-round1");
        assert_eq!(pages_url("octo", "demo-round1"), "https://octo.github.io/demo-round1/");
    }

    #[tokio::test]
    async fn creates_missing_repository() {
        let host = Arc::new(FakeHost::default());
        let target = RepositoryResolver::new(host.clone()).resolve("demo", 1).await.unwrap();
        assert!(!target.exists);
        assert_eq!(target.name, "demo-round1");
        assert_eq!(target.html_url, "https://github.com/octo/demo-round1");
        assert_eq!(target.pages_url, "https://octo.github.io/demo-round1/");
        assert_eq!(*host.creates.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn existing_repository_is_not_recreated() {
        let host = Arc::new(FakeHost::default());
        host.repos.lock().unwrap().insert("demo-round1".into(), info("demo-round1"));
        let resolver = RepositoryResolver::new(host.clone());

        let first = resolver.resolve("demo", 2).await.unwrap();
        let second = resolver.resolve("demo", 2).await.unwrap();
        assert!(first.exists);
        assert!(second.exists);
        assert_eq!(first, second);
        assert_eq!(*host.creates.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn rejected_create_is_terminal() {
        let host = Arc::new(FakeHost {
            reject_create: true,
            ..Default::default()
        });
        let err = RepositoryResolver::new(host.clone()).resolve("demo", 1).await.unwrap_err();
        assert_eq!(
            err,
            BuildError::RepoCreate("422 name already exists on this account".into())
        );
        assert_eq!(*host.creates.lock().unwrap(), 1);
    }
}
