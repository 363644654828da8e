//! Client configuration: API endpoints, request timeout and where the
//! session slot lives. Defaults target a local API; environment variables
//! override them for packaged deployments. Configuration values are public;
//! do not store secrets here.

use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;
use url::Url;

pub const ENV_API_BASE_URL: &str = "SKILLSYNC_API_BASE_URL";
pub const ENV_STORE: &str = "SKILLSYNC_STORE";
pub const ENV_TIMEOUT_SECS: &str = "SKILLSYNC_TIMEOUT_SECS";

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

const LOGIN_PATH: &str = "/api/auth/login";
const REGISTER_PATH: &str = "/api/auth/register";
const TWO_FACTOR_PATH: &str = "/api/auth/2fa/verify";
const STORE_DIR_NAME: &str = ".skillsync";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid API base URL '{url}': {reason}")]
    BaseUrl { url: String, reason: String },
    #[error("invalid request timeout '{0}'")]
    Timeout(String),
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub login_path: String,
    pub register_path: String,
    pub two_factor_path: String,
    pub request_timeout: Duration,
    /// Directory holding the credential slot.
    pub storage_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            login_path: LOGIN_PATH.to_string(),
            register_path: REGISTER_PATH.to_string(),
            two_factor_path: TWO_FACTOR_PATH.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            storage_dir: default_storage_dir(),
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_storage_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.storage_dir = dir.as_ref().to_path_buf();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Loads defaults and applies non-empty environment overrides.
    ///
    /// # Errors
    /// Returns an error if an override is present but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let overrides = EnvOverrides {
            api_base_url: read_env(ENV_API_BASE_URL),
            storage_dir: read_env(ENV_STORE),
            timeout_secs: read_env(ENV_TIMEOUT_SECS),
        };
        let mut config = Self::default();
        apply_overrides(&mut config, overrides)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the API base is an absolute http(s) URL.
    ///
    /// # Errors
    /// Returns an error describing the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::BaseUrl {
            url: self.api_base_url.clone(),
            reason,
        };
        let url = Url::parse(self.api_base_url.trim()).map_err(|err| invalid(err.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("expected http or https".to_string()));
        }
        Ok(())
    }
}

#[derive(Default)]
struct EnvOverrides {
    api_base_url: Option<String>,
    storage_dir: Option<String>,
    timeout_secs: Option<String>,
}

fn apply_overrides(config: &mut ClientConfig, overrides: EnvOverrides) -> Result<(), ConfigError> {
    if let Some(value) = overrides.api_base_url {
        config.api_base_url = value;
    }
    if let Some(value) = overrides.storage_dir {
        config.storage_dir = PathBuf::from(value);
    }
    if let Some(value) = overrides.timeout_secs {
        config.request_timeout = parse_timeout(&value)?;
    }
    Ok(())
}

/// Parses a positive number of seconds.
///
/// # Errors
/// Returns an error for zero or non-numeric input.
pub fn parse_timeout(value: &str) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::Timeout(value.to_string())),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| normalize_value(&value))
}

fn normalize_value(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn default_storage_dir() -> PathBuf {
    env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map_or_else(|| PathBuf::from(STORE_DIR_NAME), |home| {
            PathBuf::from(home).join(STORE_DIR_NAME)
        })
}
