//! Path management for genflow configuration and session files.
//!
//! ```text
//! ~/.config/genflow/           # Config directory (platform dependent)
//! ├── config.toml              # Engine configuration
//! └── sessions/                # One JSON snapshot per workflow variant
//!     ├── composite.json
//!     ├── try-on.json
//!     └── backdrop-swap.json
//! ```

use std::path::PathBuf;

const APP_DIR: &str = "genflow";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Platform config directory could not be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find config directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for genflow_core::GenflowError {
    fn from(e: PathError) -> Self {
        genflow_core::GenflowError::config(e.to_string())
    }
}

pub struct GenflowPaths;

impl GenflowPaths {
    /// Returns the genflow configuration directory (e.g. `~/.config/genflow/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::ConfigDirNotFound)
    }

    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Default directory for session snapshots.
    pub fn sessions_dir() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("sessions"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_share_config_dir() {
        // Headless CI boxes may have no config dir at all.
        let Ok(config_dir) = GenflowPaths::config_dir() else {
            return;
        };
        assert!(config_dir.ends_with(APP_DIR));
        assert_eq!(
            GenflowPaths::config_file().unwrap(),
            config_dir.join("config.toml")
        );
        assert_eq!(
            GenflowPaths::sessions_dir().unwrap(),
            config_dir.join("sessions")
        );
    }
}
