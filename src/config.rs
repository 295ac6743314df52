//! Client configuration parsed from environment variables.

use std::path::PathBuf;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CREDENTIAL_FILE: &str = ".smartshield/credentials.json";

/// Errors produced while reading client configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The base URL was set but is empty after trimming.
    #[error("empty API base URL in {var}")]
    EmptyBaseUrl { var: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeouts: Timeouts,
    pub credential_file: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_owned(),
            timeouts: Timeouts::default(),
            credential_file: PathBuf::from(DEFAULT_CREDENTIAL_FILE),
        }
    }
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `SMARTSHIELD_API_URL`: backend base URL, default `http://localhost:8080/api`
    /// - `SMARTSHIELD_REQUEST_TIMEOUT_SECS`: default 30
    /// - `SMARTSHIELD_CONNECT_TIMEOUT_SECS`: default 10
    /// - `SMARTSHIELD_CREDENTIAL_FILE`: default `.smartshield/credentials.json`
    ///
    /// # Errors
    ///
    /// Returns an error if `SMARTSHIELD_API_URL` is set to an empty value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = match std::env::var("SMARTSHIELD_API_URL") {
            Ok(raw) => normalize_base_url(&raw).ok_or(ConfigError::EmptyBaseUrl { var: "SMARTSHIELD_API_URL" })?,
            Err(_) => DEFAULT_API_BASE_URL.to_owned(),
        };
        let timeouts = Timeouts {
            request_secs: env_parse_u64("SMARTSHIELD_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("SMARTSHIELD_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        let credential_file = std::env::var("SMARTSHIELD_CREDENTIAL_FILE")
            .map_or_else(|_| PathBuf::from(DEFAULT_CREDENTIAL_FILE), PathBuf::from);

        Ok(Self { base_url, timeouts, credential_file })
    }

    /// Replace the base URL, applying the same normalization as `from_env`.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is empty after trimming.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ConfigError> {
        self.base_url = normalize_base_url(base_url).ok_or(ConfigError::EmptyBaseUrl { var: "base_url" })?;
        Ok(self)
    }
}

/// Trim whitespace and trailing slashes so paths like `/auth/me` join cleanly.
pub(crate) fn normalize_base_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() { None } else { Some(trimmed.to_owned()) }
}

/// Positive integer from `key`, else `default`. Zero counts as invalid.
fn env_parse_u64(key: &str, default: u64) -> u64 {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse::<u64>() {
            Ok(value) if value > 0 => value,
            _ => default,
        },
        Err(_) => default,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
