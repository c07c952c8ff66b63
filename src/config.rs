//! Runtime configuration, assembled from the environment once at startup
//! and passed explicitly into the components. Nothing in the pipeline
//! reads the environment on its own.

use std::path::PathBuf;

use crate::fetch::FetchConfig;
use crate::watcher::PacingConfig;

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub user: String,
    pub password: String,
}

/// Host-application settings. SMTP is optional: without it, alerts are
/// logged instead of mailed.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub watchlist_path: PathBuf,
    pub state_path: PathBuf,
    pub recipients: Vec<String>,
    pub smtp: Option<SmtpConfig>,
    pub fetch: FetchConfig,
    pub pacing: PacingConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let recipients = parse_recipients(
            &std::env::var("EMAIL_RECIPIENTS").unwrap_or_default(),
        );

        let smtp = match (std::env::var("SMTP_USER"), std::env::var("SMTP_PASS")) {
            (Ok(user), Ok(password)) => Some(SmtpConfig {
                host: std::env::var("SMTP_HOST")
                    .unwrap_or_else(|_| "smtp.gmail.com".to_string()),
                user,
                password,
            }),
            _ => None,
        };

        Self {
            watchlist_path: env_path("WATCHLIST_FILE", "watchlist.json"),
            state_path: env_path("STATE_FILE", "last_state.json"),
            recipients,
            smtp,
            fetch: FetchConfig::default(),
            pacing: PacingConfig::default(),
        }
    }
}

fn env_path(var: &str, default: &str) -> PathBuf {
    std::env::var(var)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
