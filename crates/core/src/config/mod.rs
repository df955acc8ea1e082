//! Workspace configuration
//!
//! Settings that change how a [`Workspace`](crate::Workspace) behaves are
//! kept in a small TOML file:
//!
//! ```toml
//! version = 1
//! strictness = "draft"
//! auto_name = true
//! ```
//!
//! # Example
//!
//! ```ignore
//! use bemkit_core::{workspace_config_path, WorkspaceConfig};
//!
//! let config = WorkspaceConfig::load(workspace_config_path()?)?;
//! let ws = Workspace::with_config(registry, config);
//! ```

mod loader;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::validity::Strictness;

pub use loader::{config_dir, workspace_config_path, workspace_config_path_in, CONFIG_DIR_ENV};

/// Configuration system errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read or write config file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML content
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config to TOML
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Per-workspace settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Config version for future migration support
    pub version: u32,

    /// Default level for [`Workspace::is_valid`](crate::Workspace::is_valid)
    pub strictness: Strictness,

    /// Give new named objects a generated name
    pub auto_name: bool,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            version: 1,
            strictness: Strictness::Draft,
            auto_name: true,
        }
    }
}

impl WorkspaceConfig {
    /// Load config from file, creating default if missing.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();

        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            tracing::debug!("Loaded workspace config from {:?}", path);
            Ok(config)
        } else {
            let default = Self::default();
            default.save(path)?;
            tracing::info!("Created default workspace config at {:?}", path);
            Ok(default)
        }
    }

    /// Save config to file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        tracing::debug!("Saved workspace config to {:?}", path);
        Ok(())
    }

    /// Reload config from file.
    pub fn reload(&mut self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        *self = toml::from_str(&content)?;
        tracing::debug!("Reloaded workspace config from {:?}", path);
        Ok(())
    }
}
