//! Bridge configuration.
//!
//! Loaded from `~/.config/uibridge/config.toml` when present, otherwise
//! defaults apply. Every field has a default so a partial file is fine.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

/// What the scheduler puts on the wire for each render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Send the whole flattened snapshot every time.
    FullSnapshot,
    /// Diff against the previous snapshot and send patches.
    Patch,
    /// Send the single-root nested tree, for hosts that predate the flat
    /// encoding.
    LegacyNested,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Maximum parent-to-descendant distance in a snapshot.
    pub max_depth: usize,
    /// Largest frame payload accepted on either side, in bytes.
    pub max_frame_bytes: usize,
    /// Connection attempts before `connect` gives up.
    pub connect_retries: u32,
    /// Delay between connection attempts, in milliseconds.
    pub connect_retry_delay_ms: u64,
    /// Upper bound on one scheduler idle wait, in milliseconds.
    pub poll_interval_ms: u64,
    /// Minimum interval between two render passes, in milliseconds.
    pub min_frame_interval_ms: u64,
    /// Default timeout for correlated requests, in milliseconds.
    pub request_timeout_ms: u64,
    pub render_mode: RenderMode,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_depth: 100,
            max_frame_bytes: 16 * 1024 * 1024,
            connect_retries: 20,
            connect_retry_delay_ms: 100,
            poll_interval_ms: 250,
            min_frame_interval_ms: 16,
            request_timeout_ms: 5_000,
            render_mode: RenderMode::FullSnapshot,
        }
    }
}

impl BridgeConfig {
    /// Returns the path to the configuration file.
    ///
    /// Uses `~/.config/uibridge/config.toml` on Unix/macOS, or equivalent
    /// via `dirs::config_dir()`. Falls back to the current directory.
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("uibridge").join("config.toml")
    }

    /// Loads configuration from the default config file.
    ///
    /// A missing file yields `BridgeConfig::default()`; read, parse, and
    /// validation failures are returned as typed errors.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::ValidationError {
                message: "max_depth must be at least 1".to_string(),
            });
        }
        if self.max_frame_bytes < 8 {
            return Err(ConfigError::ValidationError {
                message: "max_frame_bytes is too small to hold any message".to_string(),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError {
                message: "poll_interval_ms must be non-zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn connect_retry_delay(&self) -> Duration {
        Duration::from_millis(self.connect_retry_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn min_frame_interval(&self) -> Duration {
        Duration::from_millis(self.min_frame_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
