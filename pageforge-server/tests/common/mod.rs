//! Shared fakes for the HTTP tests.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;

use pageforge_server::config::Config;
use pageforge_server::git::{GitError, Vcs};
use pageforge_server::github::{HostError, HostingStatus, RepoHost, RepoInfo};
use pageforge_server::llm::{GenerationError, Generator};
use pageforge_server::model::NotificationPayload;
use pageforge_server::notifier::Evaluator;
use pageforge_server::orchestrator::{Collaborators, Orchestrator};

pub const OWNER: &str = "octo";
pub const SECRET: &str = "correct-horse";
pub const EMAIL: &str = "student@example.com";
pub const PAGE: &str = "<!DOCTYPE html><html><body><p id=\"app-status\">hi</p></body></html>";

pub fn test_config() -> Config {
    Config {
        github_token: "ghp_test".into(),
        github_owner: OWNER.into(),
        student_secret: SECRET.into(),
        allowed_email: EMAIL.into(),
        openai_api_key: "sk-test".into(),
        evaluation_url: "http://evaluator.invalid/notify".into(),
        notify_base_delay_ms: 1,
        ..Default::default()
    }
}

/// Bind an axum app on an ephemeral port.
pub async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

// ── Generator ──────────────────────────────────────────────────────────

pub struct FakeGenerator {
    pub calls: AtomicUsize,
    pub reply: Mutex<Result<String, GenerationError>>,
}

impl Default for FakeGenerator {
    fn default() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            reply: Mutex::new(Ok(format!("Sure!\n```html\n{PAGE}\n```\n"))),
        }
    }
}

#[async_trait]
impl Generator for FakeGenerator {
    async fn generate(&self, _system: &str, _prompt: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.lock().unwrap().clone()
    }
}

// ── Repository host ────────────────────────────────────────────────────

pub struct FakeHost {
    pub repos: Mutex<HashMap<String, RepoInfo>>,
    pub calls: AtomicUsize,
    pub creates: AtomicUsize,
    pub reject_create: Mutex<Option<HostError>>,
    pub pages: Mutex<HostingStatus>,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self {
            repos: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            creates: AtomicUsize::new(0),
            reject_create: Mutex::new(None),
            pages: Mutex::new(HostingStatus::Enabled),
        }
    }
}

pub fn repo_info(name: &str) -> RepoInfo {
    RepoInfo {
        html_url: format!("https://github.com/{OWNER}/{name}"),
        clone_url: format!("https://github.com/{OWNER}/{name}.git"),
    }
}

#[async_trait]
impl RepoHost for FakeHost {
    fn owner(&self) -> &str {
        OWNER
    }

    async fn get_repo(&self, name: &str) -> Result<Option<RepoInfo>, HostError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.repos.lock().unwrap().get(name).cloned())
    }

    async fn create_repo(&self, name: &str) -> Result<RepoInfo, HostError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.creates.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.reject_create.lock().unwrap().clone() {
            return Err(err);
        }
        let info = repo_info(name);
        self.repos.lock().unwrap().insert(name.to_string(), info.clone());
        Ok(info)
    }

    async fn enable_pages(&self, _name: &str) -> HostingStatus {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages.lock().unwrap().clone()
    }
}

// ── Version control ────────────────────────────────────────────────────

/// Remotes kept in memory, keyed by clone URL.
#[derive(Default)]
pub struct FakeVcs {
    pub remotes: Mutex<HashMap<String, BTreeMap<String, String>>>,
    pub checkouts: Mutex<HashMap<PathBuf, String>>,
    pub commits: Mutex<Vec<String>>,
    pub clones: AtomicUsize,
    pub fail_push: Mutex<bool>,
}

impl FakeVcs {
    /// Files on the remote whose URL ends with `{name}.git`.
    pub fn remote_files(&self, name: &str) -> BTreeMap<String, String> {
        let suffix = format!("/{name}.git");
        self.remotes
            .lock()
            .unwrap()
            .iter()
            .find(|(url, _)| url.ends_with(&suffix))
            .map(|(_, files)| files.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Vcs for FakeVcs {
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), GitError> {
        self.clones.fetch_add(1, Ordering::SeqCst);
        std::fs::create_dir_all(dest).unwrap();
        let remotes = self.remotes.lock().unwrap();
        if let Some(files) = remotes.get(url) {
            for (name, content) in files {
                std::fs::write(dest.join(name), content).unwrap();
            }
        }
        self.checkouts
            .lock()
            .unwrap()
            .insert(dest.to_path_buf(), url.to_string());
        Ok(())
    }

    async fn set_identity(&self, _dir: &Path, _name: &str, _email: &str) -> Result<(), GitError> {
        Ok(())
    }

    async fn commit_all(&self, _dir: &Path, message: &str) -> Result<String, GitError> {
        let mut commits = self.commits.lock().unwrap();
        commits.push(message.to_string());
        Ok(format!("{:0>40x}", commits.len()))
    }

    async fn push(&self, dir: &Path) -> Result<(), GitError> {
        if *self.fail_push.lock().unwrap() {
            return Err(GitError::Failed {
                step: "push",
                stderr: "! [remote rejected] main -> main".into(),
            });
        }
        let url = self.checkouts.lock().unwrap()[dir].clone();
        let mut files = BTreeMap::new();
        for entry in std::fs::read_dir(dir).unwrap().flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            files.insert(name, std::fs::read_to_string(entry.path()).unwrap());
        }
        self.remotes.lock().unwrap().insert(url, files);
        Ok(())
    }
}

// ── Evaluator ──────────────────────────────────────────────────────────

/// Scripted evaluator; repeats the last reply once the script runs out.
pub struct RecordingEvaluator {
    pub replies: Mutex<VecDeque<Result<u16, String>>>,
    pub received: Mutex<Vec<(String, NotificationPayload)>>,
}

impl RecordingEvaluator {
    pub fn new(replies: Vec<Result<u16, String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            received: Mutex::new(Vec::new()),
        }
    }
}

impl Default for RecordingEvaluator {
    fn default() -> Self {
        Self::new(vec![Ok(200)])
    }
}

#[async_trait]
impl Evaluator for RecordingEvaluator {
    async fn post(&self, url: &str, payload: &NotificationPayload) -> Result<u16, String> {
        self.received
            .lock()
            .unwrap()
            .push((url.to_string(), payload.clone()));
        let mut replies = self.replies.lock().unwrap();
        if replies.len() > 1 {
            replies.pop_front().unwrap()
        } else {
            replies.front().cloned().unwrap()
        }
    }
}

// ── Harness ────────────────────────────────────────────────────────────

pub struct Harness {
    pub generator: Arc<FakeGenerator>,
    pub host: Arc<FakeHost>,
    pub vcs: Arc<FakeVcs>,
    pub evaluator: Arc<RecordingEvaluator>,
    pub addr: SocketAddr,
    http: reqwest::Client,
}

impl Harness {
    pub async fn start() -> Self {
        Self::start_with(test_config(), RecordingEvaluator::default()).await
    }

    pub async fn start_with(config: Config, evaluator: RecordingEvaluator) -> Self {
        let generator = Arc::new(FakeGenerator::default());
        let host = Arc::new(FakeHost::default());
        let vcs = Arc::new(FakeVcs::default());
        let evaluator = Arc::new(evaluator);

        let orchestrator = Orchestrator::new(
            &config,
            Collaborators {
                generator: generator.clone(),
                host: host.clone(),
                vcs: vcs.clone(),
                evaluator: evaluator.clone(),
            },
        );
        let addr = spawn(pageforge_server::web::router(Arc::new(orchestrator))).await;

        Self {
            generator,
            host,
            vcs,
            evaluator,
            addr,
            http: reqwest::Client::new(),
        }
    }

    pub async fn post_json(&self, path: &str, body: &serde_json::Value) -> (u16, serde_json::Value) {
        let resp = self
            .http
            .post(format!("http://{}{path}", self.addr))
            .json(body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    pub async fn build(&self, body: &serde_json::Value) -> (u16, serde_json::Value) {
        self.post_json("/api-endpoint", body).await
    }

    /// Total calls made to any collaborator.
    pub fn external_calls(&self) -> usize {
        self.generator.calls.load(Ordering::SeqCst)
            + self.host.calls.load(Ordering::SeqCst)
            + self.vcs.clones.load(Ordering::SeqCst)
            + self.evaluator.received.lock().unwrap().len()
    }
}

pub fn request(task: &str, round: i64) -> serde_json::Value {
    serde_json::json!({
        "email": EMAIL,
        "secret": SECRET,
        "task": task,
        "round": round,
        "nonce": "abc",
        "brief": "say hi",
        "evaluation_url": "http://evaluator.test/notify",
    })
}
