//! Service configuration.
//!
//! Every value can be given as a flag or through the environment. The config is
//! parsed once at startup and shared read-only; components receive the pieces
//! they need instead of reading the environment themselves.

use std::time::Duration;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "pageforge-server", about = "Publish LLM-generated pages for a grading harness")]
pub struct Config {
    /// Address to listen on (host:port). Falls back to 0.0.0.0:$PORT.
    #[arg(long, env = "PAGEFORGE_ADDR")]
    pub listen_addr: Option<String>,

    /// Repository host API token.
    #[arg(long, env = "GITHUB_TOKEN", default_value = "", hide_env_values = true)]
    pub github_token: String,

    /// Account that owns the published repositories.
    #[arg(long, env = "GITHUB_OWNER", default_value = "")]
    pub github_owner: String,

    /// Repository host REST API base.
    #[arg(long, env = "GITHUB_API_URL", default_value = "https://api.github.com")]
    pub github_api_url: String,

    /// Shared secret every build request must carry.
    #[arg(long, env = "STUDENT_SECRET", default_value = "", hide_env_values = true)]
    pub student_secret: String,

    /// Caller identity allowed to request builds (case-insensitive). Unset accepts any.
    #[arg(long, env = "STUDENT_EMAIL", default_value = "")]
    pub allowed_email: String,

    /// API key for the chat-completions endpoint.
    #[arg(long, env = "OPENAI_API_KEY", default_value = "", hide_env_values = true)]
    pub openai_api_key: String,

    /// Chat-completions API base.
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub openai_base_url: String,

    /// Model used for page generation.
    #[arg(long, env = "PAGEFORGE_MODEL", default_value = "gpt-4o-mini")]
    pub model: String,

    /// Sampling temperature for page generation.
    #[arg(long, env = "PAGEFORGE_TEMPERATURE", default_value_t = 0.2)]
    pub temperature: f32,

    /// Evaluator endpoint used when a request carries none.
    #[arg(long, env = "EVALUATION_URL", default_value = "http://localhost:9000/evaluation")]
    pub evaluation_url: String,

    /// Committer name for published commits.
    #[arg(long, env = "GIT_COMMITTER_NAME", default_value = "pageforge")]
    pub committer_name: String,

    /// Committer email for published commits.
    #[arg(long, env = "GIT_COMMITTER_EMAIL", default_value = "pageforge@users.noreply.github.com")]
    pub committer_email: String,

    /// Delivery attempts per notification.
    #[arg(long, env = "NOTIFY_ATTEMPTS", default_value_t = 5)]
    pub notify_attempts: u32,

    /// Backoff time unit in milliseconds (delays are 1, 2, 4, 8 units).
    #[arg(long, env = "NOTIFY_BASE_DELAY_MS", default_value_t = 1000)]
    pub notify_base_delay_ms: u64,

    /// Timeout for repository host and evaluator calls.
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 30)]
    pub http_timeout_secs: u64,

    /// Timeout for a generation call.
    #[arg(long, env = "LLM_TIMEOUT_SECS", default_value_t = 120)]
    pub llm_timeout_secs: u64,

    /// Timeout for each git command.
    #[arg(long, env = "GIT_TIMEOUT_SECS", default_value_t = 120)]
    pub git_timeout_secs: u64,

    /// Emit JSON logs.
    #[arg(long, env = "PAGEFORGE_LOG_JSON")]
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: None,
            github_token: String::new(),
            github_owner: String::new(),
            github_api_url: "https://api.github.com".to_string(),
            student_secret: String::new(),
            allowed_email: String::new(),
            openai_api_key: String::new(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            evaluation_url: "http://localhost:9000/evaluation".to_string(),
            committer_name: "pageforge".to_string(),
            committer_email: "pageforge@users.noreply.github.com".to_string(),
            notify_attempts: 5,
            notify_base_delay_ms: 1000,
            http_timeout_secs: 30,
            llm_timeout_secs: 120,
            git_timeout_secs: 120,
            log_json: false,
        }
    }
}

impl Config {
    /// Names of required settings that are empty.
    pub fn missing_required(&self) -> Vec<&'static str> {
        [
            ("GITHUB_TOKEN", &self.github_token),
            ("GITHUB_OWNER", &self.github_owner),
            ("STUDENT_SECRET", &self.student_secret),
            ("OPENAI_API_KEY", &self.openai_api_key),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(k, _)| k)
        .collect()
    }

    /// Listen address, honoring `PORT` when no explicit address is set.
    pub fn resolved_listen_addr(&self, port: Option<&str>) -> String {
        match (&self.listen_addr, port) {
            (Some(addr), _) => addr.clone(),
            (None, Some(port)) => format!("0.0.0.0:{port}"),
            (None, None) => "0.0.0.0:8000".to_string(),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    pub fn git_timeout(&self) -> Duration {
        Duration::from_secs(self.git_timeout_secs)
    }

    pub fn notify_base_delay(&self) -> Duration {
        Duration::from_millis(self.notify_base_delay_ms)
    }
}
