//! Runtime configuration
//!
//! Settings come from environment variables. The `--api-url` flag
//! overrides `CRM_API_URL`.

use std::env;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:8003/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// Environment variable names
const ENV_API_URL: &str = "CRM_API_URL";
const ENV_IDENTITY_API_KEY: &str = "CRM_IDENTITY_API_KEY";
const ENV_REQUEST_TIMEOUT: &str = "CRM_REQUEST_TIMEOUT_SECS";
const ENV_LOG_JSON: &str = "CRM_LOG_JSON";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid API URL {value:?}: {source}")]
    InvalidUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Invalid CRM_REQUEST_TIMEOUT_SECS value {0:?}, expected whole seconds")]
    InvalidTimeout(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: Url,
    /// Web API key of the identity provider. Needed for password sign-in.
    pub identity_api_key: Option<String>,
    pub request_timeout: Duration,
    pub log_json: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_url = parse_api_url(&get(ENV_API_URL).unwrap_or_else(|| DEFAULT_API_URL.to_string()))?;

        let request_timeout = match get(ENV_REQUEST_TIMEOUT) {
            Some(raw) => Duration::from_secs(
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidTimeout(raw.clone()))?,
            ),
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        let log_json = get(ENV_LOG_JSON)
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            api_url,
            identity_api_key: get(ENV_IDENTITY_API_KEY),
            request_timeout,
            log_json,
        })
    }

    pub fn with_api_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.api_url = parse_api_url(url)?;
        Ok(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: Url::parse(DEFAULT_API_URL).expect("default API URL is valid"),
            identity_api_key: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            log_json: false,
        }
    }
}

fn parse_api_url(value: &str) -> Result<Url, ConfigError> {
    Url::parse(value.trim()).map_err(|source| ConfigError::InvalidUrl {
        value: value.to_string(),
        source,
    })
}
