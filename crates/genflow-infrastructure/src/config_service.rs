//! Configuration loading.
//!
//! Resolution order, later wins:
//! 1. Built-in defaults
//! 2. `config.toml` (`GENFLOW_CONFIG_PATH` or `~/.config/genflow/config.toml`)
//! 3. `GENFLOW_*` environment overrides

use crate::paths::GenflowPaths;
use genflow_core::config::EngineConfig;
use genflow_core::error::{GenflowError, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

pub const ENV_CONFIG_PATH: &str = "GENFLOW_CONFIG_PATH";
pub const ENV_BASE_URL: &str = "GENFLOW_BASE_URL";
pub const ENV_API_TOKEN: &str = "GENFLOW_API_TOKEN";
pub const ENV_POLL_INTERVAL_MS: &str = "GENFLOW_POLL_INTERVAL_MS";
pub const ENV_POLL_TIMEOUT_SECS: &str = "GENFLOW_POLL_TIMEOUT_SECS";
pub const ENV_SESSIONS_DIR: &str = "GENFLOW_SESSIONS_DIR";

/// Environment lookup used by the loader; swapped out in tests.
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

fn process_env() -> EnvLookup {
    Arc::new(|key| std::env::var(key).ok())
}

/// Loads and caches the engine configuration.
#[derive(Clone)]
pub struct ConfigService {
    config: Arc<RwLock<Option<EngineConfig>>>,
    env: EnvLookup,
    explicit_path: Option<PathBuf>,
}

impl ConfigService {
    pub fn new() -> Self {
        Self::with_env(process_env())
    }

    pub fn with_env(env: EnvLookup) -> Self {
        Self {
            config: Arc::new(RwLock::new(None)),
            env,
            explicit_path: None,
        }
    }

    /// Reads from `path` instead of the env/default location.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_path = Some(path.into());
        self
    }

    /// Returns the configuration, loading it on first access.
    pub fn get_config(&self) -> Result<EngineConfig> {
        {
            let read_lock = self
                .config
                .read()
                .map_err(|e| GenflowError::internal(format!("config lock poisoned: {}", e)))?;
            if let Some(ref cached) = *read_lock {
                return Ok(cached.clone());
            }
        }

        let loaded = self.load()?;

        let mut write_lock = self
            .config
            .write()
            .map_err(|e| GenflowError::internal(format!("config lock poisoned: {}", e)))?;
        *write_lock = Some(loaded.clone());
        Ok(loaded)
    }

    /// Forces a reload on next access.
    pub fn invalidate_cache(&self) {
        if let Ok(mut write_lock) = self.config.write() {
            *write_lock = None;
        }
    }

    /// Directory for session snapshots after overrides.
    pub fn sessions_dir(&self) -> Result<PathBuf> {
        match self.get_config()?.storage.sessions_dir {
            Some(dir) => Ok(dir),
            None => Ok(GenflowPaths::sessions_dir()?),
        }
    }

    fn config_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.explicit_path {
            return Ok(path.clone());
        }
        if let Some(path) = (self.env)(ENV_CONFIG_PATH) {
            return Ok(PathBuf::from(path));
        }
        Ok(GenflowPaths::config_file()?)
    }

    fn load(&self) -> Result<EngineConfig> {
        let path = self.config_path()?;
        let mut config = read_config_file(&path)?;
        apply_env_overrides(&mut config, &*self.env)?;
        config.validate()?;
        tracing::debug!("Loaded config (file: {})", path.display());
        Ok(config)
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

/// Missing files yield defaults; malformed files are errors.
fn read_config_file(path: &Path) -> Result<EngineConfig> {
    if !path.exists() {
        tracing::debug!("No config file at {}, using defaults", path.display());
        return Ok(EngineConfig::default());
    }
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    Ok(config)
}

fn apply_env_overrides(
    config: &mut EngineConfig,
    env: &(dyn Fn(&str) -> Option<String> + Send + Sync),
) -> Result<()> {
    let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = non_empty(ENV_BASE_URL) {
        config.service.base_url = url;
    }
    if let Some(token) = non_empty(ENV_API_TOKEN) {
        config.service.api_token = Some(token);
    }
    if let Some(raw) = non_empty(ENV_POLL_INTERVAL_MS) {
        config.polling.interval_ms = parse_u64(ENV_POLL_INTERVAL_MS, &raw)?;
    }
    if let Some(raw) = non_empty(ENV_POLL_TIMEOUT_SECS) {
        config.polling.timeout_secs = parse_u64(ENV_POLL_TIMEOUT_SECS, &raw)?;
    }
    if let Some(dir) = non_empty(ENV_SESSIONS_DIR) {
        config.storage.sessions_dir = Some(PathBuf::from(dir));
    }
    Ok(())
}

fn parse_u64(key: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|_| GenflowError::config(format!("{} must be an integer, got '{}'", key, raw)))
}
