//! Configuration loading
//!
//! Resolution follows a fixed priority order:
//! 1. Explicit path (highest priority)
//! 2. `LABELKIT_CONFIG` environment variable
//! 3. Platform config file (`<config_dir>/labelkit/config.toml`)
//! 4. Compiled defaults (fallback)
//!
//! A missing file is not an error: a warning is logged and defaults are used.
//! A file that exists but does not parse is an [`Error::Config`].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "LABELKIT_CONFIG";

/// Environment variable overriding the logging level
pub const LOG_LEVEL_ENV_VAR: &str = "LABELKIT_LOG_LEVEL";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelkitConfig {
    pub ingest: IngestConfig,
    pub snapshot: SnapshotConfig,
    pub logging: LoggingConfig,
}

/// Ingestion settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Collapse every file to a single bucket label named after the file
    pub hierarchical: bool,
    /// JSON file name skipped during ingestion (build settings, not examples)
    pub settings_file_name: String,
    /// Deepest entity nesting accepted before the record is rejected
    pub max_entity_depth: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            hierarchical: false,
            settings_file_name: "orchestratorsettings.json".to_string(),
            max_entity_depth: 32,
        }
    }
}

/// Snapshot artifact settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// File name used when a whole folder builds into one snapshot
    pub default_file_name: String,
    /// Snapshot file extension (without the dot)
    pub extension: String,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            default_file_name: "orchestrator.blu".to_string(),
            extension: "blu".to_string(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LabelkitConfig {
    /// Load configuration following the documented priority order
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match resolve_config_path(explicit) {
            Some(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                Self::from_file(&path)?
            }
            Some(path) => {
                warn!(
                    "Config file not found: {}; using compiled defaults",
                    path.display()
                );
                Self::default()
            }
            None => Self::default(),
        };

        if let Ok(level) = std::env::var(LOG_LEVEL_ENV_VAR) {
            if !level.trim().is_empty() {
                config.logging.level = level.trim().to_string();
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{} ({})", e, path.display())))
    }

    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Reject values the ingestion engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.ingest.max_entity_depth == 0 {
            return Err(Error::Config(
                "ingest.max_entity_depth must be at least 1".to_string(),
            ));
        }
        if self.snapshot.extension.trim().is_empty() {
            return Err(Error::Config("snapshot.extension must not be empty".to_string()));
        }
        if self.snapshot.default_file_name.trim().is_empty() {
            return Err(Error::Config(
                "snapshot.default_file_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Pick the config file to read, if any
fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: explicit path
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    // Priority 2: environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: platform config file, only when present
    default_config_path().filter(|p| p.exists())
}

/// Platform config file location (`~/.config/labelkit/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("labelkit").join("config.toml"))
}
