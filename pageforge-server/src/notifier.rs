//! Evaluator Notifier.
//!
//! Delivery is best effort. Up to `attempts` POSTs are made; the delay before
//! attempt k (k >= 2) is `base_delay * 2^(k-2)`, so the default policy waits
//! 1, 2, 4 and 8 units between five attempts. Only an exact 200 counts as
//! delivered. Exhaustion is reported as [`Delivery::Exhausted`], never as an
//! error.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::model::NotificationPayload;

/// Status the evaluator must answer with for a delivery to count.
pub const DELIVERED_STATUS: u16 = 200;

/// Evaluator collaborator: one POST, returning the HTTP status.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn post(&self, url: &str, payload: &NotificationPayload) -> Result<u16, String>;
}

pub struct HttpEvaluator {
    http: reqwest::Client,
}

impl HttpEvaluator {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Evaluator for HttpEvaluator {
    async fn post(&self, url: &str, payload: &NotificationPayload) -> Result<u16, String> {
        self.http
            .post(url)
            .json(payload)
            .send()
            .await
            .map(|resp| resp.status().as_u16())
            .map_err(|e| e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before the 1-based `attempt`. Zero for the first.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt < 2 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(attempt - 2).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Sum of all delays if every attempt fails.
    pub fn total_wait(&self) -> Duration {
        (1..=self.attempts).map(|k| self.delay_before(k)).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Delivered { attempts: u32 },
    Exhausted { attempts: u32, last_error: String },
}

impl Delivery {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Delivery::Delivered { .. })
    }
}

pub struct Notifier {
    evaluator: Arc<dyn Evaluator>,
    policy: RetryPolicy,
}

impl Notifier {
    pub fn new(evaluator: Arc<dyn Evaluator>, policy: RetryPolicy) -> Self {
        Self { evaluator, policy }
    }

    pub async fn notify(&self, payload: &NotificationPayload, url: &str) -> Delivery {
        let attempts = self.policy.attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            let delay = self.policy.delay_before(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            match self.evaluator.post(url, payload).await {
                Ok(DELIVERED_STATUS) => {
                    tracing::info!(%url, attempt, task = %payload.task, round = payload.round, "evaluator notified");
                    return Delivery::Delivered { attempts: attempt };
                }
                Ok(status) => {
                    last_error = format!("status {status}");
                    tracing::warn!(%url, attempt, status, "evaluator rejected notification");
                }
                Err(e) => {
                    tracing::warn!(%url, attempt, error = %e, "evaluator unreachable");
                    last_error = e;
                }
            }
        }

        tracing::warn!(%url, attempts, %last_error, "giving up on evaluator notification");
        Delivery::Exhausted {
            attempts,
            last_error,
        }
    }
}
