use std::{path::PathBuf, time::Duration};

use crate::config::{ClientConfig, ConfigError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// Options shared by every subcommand. Unset values fall back to the
/// environment, then to the built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
    pub api_base_url: Option<String>,
    pub store_dir: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub log_format: LogFormat,
}

impl GlobalArgs {
    /// Client configuration: environment first, flags on top.
    ///
    /// # Errors
    /// Returns an error if an environment override is malformed or the
    /// resulting API base URL is not an absolute http(s) URL.
    pub fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        let mut config = ClientConfig::from_env()?;
        if let Some(url) = &self.api_base_url {
            config.api_base_url = url.trim().to_string();
        }
        if let Some(dir) = &self.store_dir {
            config = config.with_storage_dir(dir);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        config.validate()?;
        Ok(config)
    }
}
