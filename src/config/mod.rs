//! Configuration for the Frapper evaluation engine
//!
//! Settings are stored as TOML:
//! - `[evaluation]` - cycle policy and propagation depth limit
//! - `[logging]` - tracing filter and optional rolling log directory
//!
//! # Config Location
//!
//! The default config file lives in the platform config directory:
//! - **Linux**: `~/.config/org.frapper.engine/engine.toml`
//! - **macOS**: `~/Library/Application Support/org.frapper.engine/engine.toml`
//! - **Windows**: `%APPDATA%\org.frapper.engine\engine.toml`
//!
//! # Example
//!
//! ```ignore
//! use frapper_core::config::EngineConfig;
//!
//! let config = EngineConfig::load_or_default();
//! let network = Network::with_config(config.evaluation.clone());
//! ```

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "org.frapper.engine";

/// Config filename
pub const CONFIG_FILE: &str = "engine.toml";

/// Default limit on nested propagation steps within one pass
pub const DEFAULT_MAX_PROPAGATION_DEPTH: usize = 1024;

/// Default tracing filter
pub const DEFAULT_LOG_FILTER: &str = "info,frapper_core=debug";

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Get the path to the default config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join(CONFIG_FILE))
}

/// Evaluation policy for a `Network`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Deepest chain of nested propagation steps before a pass is aborted.
    pub max_propagation_depth: usize,

    /// Refuse connections and affects edges that would close a cycle.
    pub reject_cycles: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            max_propagation_depth: DEFAULT_MAX_PROPAGATION_DEPTH,
            reject_cycles: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub filter: String,

    /// Write a daily rolling log file into this directory as well.
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            log_dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub evaluation: EvaluationConfig,
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load a config file from an explicit path
    pub fn load_from(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> EngineResult<Self> {
        toml::from_str(content)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load from the default location. A missing file yields defaults.
    pub fn load() -> EngineResult<Self> {
        let path = config_path().ok_or_else(|| {
            EngineError::Config("Could not determine config directory".to_string())
        })?;

        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(path)
    }

    /// Load the config, returning defaults on any error
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load engine config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save to an explicit path, creating parent directories
    pub fn save_to(&self, path: impl AsRef<Path>) -> EngineResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    EngineError::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| EngineError::Config(format!("Failed to write config: {}", e)))
    }

    /// Save to the default location
    pub fn save(&self) -> EngineResult<()> {
        let path = config_path().ok_or_else(|| {
            EngineError::Config("Could not determine config directory".to_string())
        })?;
        self.save_to(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(config.evaluation.reject_cycles);
        assert_eq!(
            config.evaluation.max_propagation_depth,
            DEFAULT_MAX_PROPAGATION_DEPTH
        );
        assert_eq!(config.logging.filter, DEFAULT_LOG_FILTER);
        assert!(config.logging.log_dir.is_none());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = EngineConfig::from_toml(
            r#"
            [evaluation]
            max_propagation_depth = 16
            "#,
        )
        .unwrap();
        assert_eq!(config.evaluation.max_propagation_depth, 16);
        assert!(config.evaluation.reject_cycles);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = EngineConfig::from_toml("evaluation = 3").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let mut config = EngineConfig::default();
        config.evaluation.reject_cycles = false;
        config.logging.log_dir = Some(dir.path().join("logs"));
        config.save_to(&path).unwrap();

        let loaded = EngineConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
