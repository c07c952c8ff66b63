//! HTTP fetching against an anti-bot layer: rotating browser headers and
//! a bounded retry loop with exponential backoff.

pub mod headers;

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::error::ExtractError;
use crate::extract;

/// Retry and backoff knobs for page fetches.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Total attempts per fetch, including the first.
    pub max_attempts: u32,
    /// Base delay for exponential backoff between attempts.
    pub backoff_base: Duration,
    /// Upper bound for the uniform jitter added to each backoff delay.
    pub jitter_max: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(5),
            jitter_max: Duration::from_secs(2),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Result of a [`Fetcher::fetch`] call, or of a single attempt within it.
///
/// `Blocked` and `TransientError` are the per-attempt classifications;
/// both consume a retry, so a full `fetch` resolves to either `Success`
/// or `ExhaustedRetries`.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success { html: String },
    /// 2xx response whose body is a bot-protection challenge page.
    Blocked { reason: String },
    /// 403, another non-2xx status, or a network-level failure.
    TransientError { reason: String },
    ExhaustedRetries { last_reason: String },
}

impl FetchOutcome {
    /// Human-readable failure reason; `None` for `Success`.
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            FetchOutcome::Success { .. } => None,
            FetchOutcome::Blocked { reason } | FetchOutcome::TransientError { reason } => {
                Some(reason)
            }
            FetchOutcome::ExhaustedRetries { last_reason } => Some(last_reason),
        }
    }
}

/// Deterministic part of the backoff schedule: `base * 2^(attempt-1)` for
/// attempt >= 1. Attempt 0 fires immediately. Jitter is the caller's job,
/// which keeps this testable.
pub(crate) fn backoff_delay(attempt: u32, base: Duration) -> Duration {
    if attempt == 0 {
        Duration::ZERO
    } else {
        base * 2u32.saturating_pow(attempt - 1)
    }
}

/// Classify one HTTP exchange. 403 is a soft failure the site hands out
/// when it dislikes the headers, so it gets the same treatment as a
/// network error; a 2xx whose body carries the challenge markers is
/// blocked, not success.
fn classify_response(status: StatusCode, body: String) -> FetchOutcome {
    if status == StatusCode::FORBIDDEN {
        return FetchOutcome::TransientError {
            reason: "403 Forbidden".to_string(),
        };
    }
    if !status.is_success() {
        return FetchOutcome::TransientError {
            reason: format!("unexpected HTTP status {status}"),
        };
    }
    if extract::is_bot_blocked(&body) {
        return FetchOutcome::Blocked {
            reason: ExtractError::BotBlocked.to_string(),
        };
    }
    FetchOutcome::Success { html: body }
}

pub struct Fetcher {
    client: Client,
    config: FetchConfig,
    rng: StdRng,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self, reqwest::Error> {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Same as [`Fetcher::new`] with a caller-supplied RNG, so header
    /// rotation and jitter are reproducible under test.
    pub fn with_rng(config: FetchConfig, rng: StdRng) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            config,
            rng,
        })
    }

    /// Fetch `url`, retrying soft failures with exponential backoff and a
    /// fresh header profile per attempt. Always resolves to exactly one
    /// outcome; exhaustion carries the last failure reason.
    pub async fn fetch(&mut self, url: &str) -> FetchOutcome {
        let mut last_reason = String::from("no attempts made");

        for attempt in 0..self.config.max_attempts {
            if attempt > 0 {
                let jitter = self
                    .rng
                    .random_range(Duration::ZERO..=self.config.jitter_max);
                let delay = backoff_delay(attempt, self.config.backoff_base) + jitter;
                debug!(attempt, delay_ms = delay.as_millis() as u64, url, "retrying after backoff");
                tokio::time::sleep(delay).await;
            }

            match self.attempt(url).await {
                FetchOutcome::Success { html } => return FetchOutcome::Success { html },
                outcome => {
                    let reason = outcome
                        .failure_reason()
                        .unwrap_or("unknown failure")
                        .to_string();
                    warn!(attempt, url, reason = %reason, "fetch attempt failed");
                    last_reason = reason;
                }
            }
        }

        FetchOutcome::ExhaustedRetries { last_reason }
    }

    /// One attempt: fresh header profile, single GET, classify.
    async fn attempt(&mut self, url: &str) -> FetchOutcome {
        let profile = headers::random_profile(&mut self.rng);
        let request = headers::apply(profile, self.client.get(url));

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                match response.text().await {
                    Ok(body) => classify_response(status, body),
                    Err(e) => FetchOutcome::TransientError {
                        reason: e.to_string(),
                    },
                }
            }
            Err(e) => FetchOutcome::TransientError {
                reason: e.to_string(),
            },
        }
    }
}
