//! Configuration Loader
//!
//! Loads and validates the full application configuration from a TOML
//! file. Every section has defaults, so a minimal file (or none of a
//! section) still yields a working configuration; validation is eager
//! and happens at load, never mid-cycle.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::engine::{EngineConfig, EngineConfigError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error(transparent)]
    Invalid(#[from] EngineConfigError),
}

/// Logging configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Optional state persistence section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistenceSection {
    /// Where to save/load the engine snapshot between restarts
    pub snapshot_path: Option<PathBuf>,
}

/// Runtime loop parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeSection {
    /// Seconds between evaluation cycles
    pub poll_seconds: u64,
    /// Candles fetched per cycle
    pub candle_window: usize,
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            poll_seconds: 30,
            candle_window: 120,
        }
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub persistence: PersistenceSection,
    #[serde(default)]
    pub runtime: RuntimeSection,
}

/// Load and validate configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: AppConfig = toml::from_str(&contents)?;
    config.engine.validate()?;
    tracing::debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}

/// Write a fully-populated default configuration, a starting point for
/// editing.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let config = AppConfig::default();
    let contents = toml::to_string_pretty(&config)?;
    fs::write(path, contents).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_empty_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.engine.symbol, "ES");
        assert_eq!(config.runtime.poll_seconds, 30);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_override() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[engine]
symbol = "NQ"
reversal_min_confidence = 85.0

[engine.risk_limits]
max_daily_loss = 750.0
max_trailing_drawdown = 4000.0
max_position_contracts = 3
max_total_exposure = 1500000.0
per_trade_risk = 400.0
max_stop_percent = 1.0
point_value = 20.0
scaling_tiers = [
    { profit_floor = 0.0, max_contracts = 3 },
    { profit_floor = -500.0, max_contracts = 1 },
]
allow_overnight = false
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.engine.symbol, "NQ");
        assert_eq!(config.engine.risk_limits.max_daily_loss, 750.0);
        assert_eq!(config.engine.risk_limits.point_value, 20.0);
    }

    #[test]
    fn test_invalid_limits_rejected_at_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[engine.risk_limits]
max_daily_loss = -100.0
max_trailing_drawdown = 4000.0
max_position_contracts = 5
max_total_exposure = 1500000.0
per_trade_risk = 500.0
max_stop_percent = 1.0
point_value = 50.0
scaling_tiers = []
allow_overnight = false
"#,
        )
        .unwrap();

        assert!(matches!(load_config(&path), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_write_default_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        write_default_config(&path).unwrap();
        let config = load_config(&path).unwrap();
        assert!(config.engine.validate().is_ok());
    }

    #[test]
    fn test_missing_file() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
