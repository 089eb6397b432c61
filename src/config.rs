use std::path::PathBuf;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the REST gateway, e.g. `https://api.example.com`
    pub api_base_url: String,
    /// Address of the push channel, e.g. `wss://api.example.com/live`
    pub ws_url: String,
    /// Where the session file lives between runs
    pub session_file: PathBuf,
    /// Maximum number of readings kept in the in-memory history
    pub history_capacity: usize,
    /// HTTP request timeout in seconds
    pub request_timeout_secs: u64,
    /// Initial reconnect delay for the push channel, in seconds
    pub reconnect_base_secs: u64,
    /// Upper bound on the reconnect delay, in seconds
    pub reconnect_max_secs: u64,
    /// Credentials for headless login when no session is stored
    pub login_email: Option<String>,
    pub login_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            api_base_url: required("API_BASE_URL")?,
            ws_url: required("WS_URL")?,
            session_file: optional("SESSION_FILE", "fireguard-session.json").into(),
            history_capacity: optional("HISTORY_CAPACITY", "288")
                .parse()
                .context("HISTORY_CAPACITY must be a positive integer")?,
            request_timeout_secs: optional("REQUEST_TIMEOUT_SECS", "10")
                .parse()
                .context("REQUEST_TIMEOUT_SECS must be a positive integer")?,
            reconnect_base_secs: optional("RECONNECT_BASE_SECS", "1")
                .parse()
                .context("RECONNECT_BASE_SECS must be a positive integer")?,
            reconnect_max_secs: optional("RECONNECT_MAX_SECS", "60")
                .parse()
                .context("RECONNECT_MAX_SECS must be a positive integer")?,
            login_email: std::env::var("LOGIN_EMAIL").ok(),
            login_password: std::env::var("LOGIN_PASSWORD").ok(),
        })
    }
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("missing required env var: {key}"))
}

fn optional(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}
