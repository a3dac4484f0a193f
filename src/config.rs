use std::time::Duration;

pub const API_URL_ENV: &str = "KANBAN_API_URL";
pub const API_TIMEOUT_ENV: &str = "KANBAN_API_TIMEOUT_SECS";

const DEFAULT_API_URL: &str = "http://localhost:5000/api";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL every endpoint path is appended to, without trailing slash.
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig::new(DEFAULT_API_URL)
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        ClientConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_url = lookup(API_URL_ENV)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let timeout = lookup(API_TIMEOUT_ENV)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        ClientConfig::new(base_url.trim()).with_timeout(Duration::from_secs(timeout))
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}
