use std::{env, path::PathBuf, time::Duration};

use crate::error::ConfigError;

/// AppConfig
///
/// Holds the client's entire configuration. Immutable once loaded and cloned
/// into every component that needs it (API client, session store, CLI).
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Base URL of the REST backend, without a trailing slash.
    pub api_base_url: String,
    // File backing the persisted session keys (`user`, `token`).
    pub session_store_path: PathBuf,
    // Per-request timeout applied by the HTTP client.
    pub request_timeout: Duration,
    // Runtime environment marker. Controls log format and required variables.
    pub env: Env,
}

/// Env
///
/// Local runs against a backend on localhost with sensible fallbacks.
/// Production demands every endpoint be configured explicitly.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_SESSION_STORE_PATH: &str = ".mucu-session.json";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

impl Default for AppConfig {
    /// Non-panicking configuration for test scaffolding.
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            session_store_path: PathBuf::from(DEFAULT_SESSION_STORE_PATH),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            env: Env::Local,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from the process environment. Call
    /// `dotenv::dotenv()` first if a `.env` file should be honoured.
    ///
    /// # Errors
    /// `ConfigError::Missing` when `API_BASE_URL` is absent in production,
    /// `ConfigError::Invalid` when a value cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let api_base_url = match (&env, env::var("API_BASE_URL")) {
            (_, Ok(url)) if !url.trim().is_empty() => url,
            (Env::Production, _) => return Err(ConfigError::Missing("API_BASE_URL")),
            (Env::Local, _) => DEFAULT_API_BASE_URL.to_string(),
        };
        let api_base_url = normalize_base_url(&api_base_url)?;

        let session_store_path = env::var("SESSION_STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SESSION_STORE_PATH));

        let request_timeout = match env::var("REQUEST_TIMEOUT_SECS") {
            Ok(raw) => raw
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::Invalid {
                    name: "REQUEST_TIMEOUT_SECS",
                    value: raw,
                })?,
            Err(_) => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        Ok(Self {
            api_base_url,
            session_store_path,
            request_timeout,
            env,
        })
    }
}

/// Strips trailing slashes and rejects anything that is not an http(s) URL.
fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::Invalid {
            name: "API_BASE_URL",
            value: raw.to_string(),
        });
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_trimmed() {
        assert_eq!(
            normalize_base_url("https://api.example.org/ ").unwrap(),
            "https://api.example.org"
        );
    }

    #[test]
    fn base_url_without_scheme_is_rejected() {
        assert!(normalize_base_url("api.example.org").is_err());
    }
}
