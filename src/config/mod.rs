//! Configuration module for brickpipe
//!
//! Settings are read from `config.toml` in the platform-appropriate config
//! directory:
//! - **Linux**: `~/.config/dev.brickpipe.brickpipe/`
//! - **macOS**: `~/Library/Application Support/dev.brickpipe.brickpipe/`
//! - **Windows**: `%APPDATA%\dev.brickpipe.brickpipe\`
//!
//! # Example
//!
//! ```toml
//! [pipe]
//! default_encoding = "utf8"
//! random_seed = 42
//!
//! [logging]
//! filter = "info,brickpipe=trace"
//! ```

use crate::chain::TextEncoding;
use crate::error::{BrickpipeError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "dev.brickpipe.brickpipe";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Get the platform-specific config directory
pub fn config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Get the path to the default config file
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join(CONFIG_FILE))
}

/// Pipe behaviour defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipeConfig {
    /// Encoding tagged onto byte content injected from files or base64.
    pub default_encoding: TextEncoding,
    /// Bucket the CLI injects content into when none is given.
    pub selected_bucket: usize,
    /// Seed for setting randomization; random when unset.
    pub random_seed: Option<u64>,
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            default_encoding: TextEncoding::Utf8,
            selected_bucket: 0,
            random_seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub filter: String,
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,brickpipe=debug".to_string(),
            ansi: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pipe: PipeConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load a config file. Missing keys fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BrickpipeError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        Self::from_toml(&content)
            .map_err(|e| e.with_context(format!("Failed to parse config file {:?}", path)))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| BrickpipeError::Config(e.to_string()))
    }

    /// Load from the default location, returning defaults on any error
    pub fn load_or_default() -> Self {
        let Some(path) = default_config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save as TOML, creating the parent directory.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                BrickpipeError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| BrickpipeError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            BrickpipeError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }
}
