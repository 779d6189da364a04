//! Client configuration, resolved once at process start.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Environment variable consulted when no API key is configured explicitly.
pub const API_KEY_ENV: &str = "NEON_API_KEY";

pub const DEFAULT_BASE_URL: &str = "https://console.neon.tech/";

pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error(
        "missing or empty Neon API key: set `api_key` in the configuration or use the \
         NEON_API_KEY environment variable"
    )]
    MissingApiKey,
}

/// Settings shared by every call a client makes.
#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: String,
    api_key: String,
    /// Log every request and capture every attempt, not just the first.
    pub debug: bool,
    /// Constant delay between retry attempts.
    pub retry_backoff: Duration,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ConfigError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            debug: false,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        })
    }

    /// Use `explicit` when set, otherwise fall back to `NEON_API_KEY`.
    pub fn resolve(explicit: Option<&str>) -> Result<Self, ConfigError> {
        Self::resolve_with(explicit, |name| std::env::var(name).ok())
    }

    /// Like `resolve`, reading the fallback through `lookup`.
    pub fn resolve_with(
        explicit: Option<&str>,
        lookup: impl FnOnce(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        match explicit {
            Some(key) => Self::new(key),
            None => Self::new(lookup(API_KEY_ENV).unwrap_or_default()),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[redacted]")
            .field("debug", &self.debug)
            .field("retry_backoff", &self.retry_backoff)
            .finish()
    }
}
