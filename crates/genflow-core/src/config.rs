use crate::error::{GenflowError, Result};
use crate::session::OutputPrefs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api/";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_500;
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 180;
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 3;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Root of `config.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub service: ServiceConfig,
    pub polling: PollingConfig,
    pub storage: StorageConfig,
    pub defaults: OutputPrefs,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_token: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ServiceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Job polling knobs.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_ms: u64,
    pub timeout_secs: u64,
    /// Consecutive failed status checks tolerated before giving up.
    pub max_consecutive_failures: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
            timeout_secs: DEFAULT_POLL_TIMEOUT_SECS,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
        }
    }
}

impl EngineConfig {
    /// Rejects settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.polling.validate()
    }
}

impl PollingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(GenflowError::config("polling.interval_ms must be greater than 0"));
        }
        if self.timeout_secs == 0 {
            return Err(GenflowError::config("polling.timeout_secs must be greater than 0"));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{AspectRatio, Resolution};

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            [polling]
            interval_ms = 500

            [defaults]
            aspect_ratio = "9:16"
            "#,
        )
        .unwrap();
        assert_eq!(config.polling.interval(), Duration::from_millis(500));
        assert_eq!(config.polling.timeout_secs, DEFAULT_POLL_TIMEOUT_SECS);
        assert_eq!(config.service.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.defaults.aspect_ratio, AspectRatio::Story);
        assert_eq!(config.defaults.resolution, Resolution::Standard);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_poll_interval_is_rejected() {
        let config: EngineConfig = toml::from_str("[polling]\ninterval_ms = 0\n").unwrap();
        assert!(matches!(config.validate(), Err(GenflowError::Config(_))));

        let mut config = EngineConfig::default();
        config.polling.timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
