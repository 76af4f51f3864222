//! Configuration loading and resolution
//!
//! Config file resolution follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. User config file (`<config dir>/chapter-player/config.toml`)
//! 4. Compiled defaults (fallback)
//!
//! A missing config file is not an error: a warning is logged and the
//! compiled defaults are used. A file that exists but does not parse is.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Error, Result};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "CHAPTER_PLAYER_CONFIG";

/// Accepted range for the position ticker interval
pub const POSITION_INTERVAL_RANGE_MS: std::ops::RangeInclusive<u64> = 10..=5000;

/// What to do when an appended item's id is already queued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Append anyway; the queue may hold the same id twice
    #[default]
    Allow,
    /// Silently drop the duplicate (logged)
    Skip,
    /// Fail the append with an error
    Reject,
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Position ticker interval
    pub position_interval_ms: u64,
    /// Engine fast-forward increment
    pub fast_forward_ms: u64,
    /// Engine rewind increment
    pub rewind_ms: u64,
    /// Identifier collision policy for queue appends
    pub duplicate_policy: DuplicatePolicy,
    /// Per-subscriber buffer of the session event bus
    pub event_capacity: usize,
    /// Optional JSON catalog file; the built-in sample book is used otherwise
    pub catalog_path: Option<PathBuf>,
    /// Default tracing filter level when RUST_LOG is unset
    pub log_level: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            position_interval_ms: 100,
            fast_forward_ms: 15_000,
            rewind_ms: 15_000,
            duplicate_policy: DuplicatePolicy::Allow,
            event_capacity: 100,
            catalog_path: None,
            log_level: "info".to_string(),
        }
    }
}

impl SessionConfig {
    /// Parse a TOML document and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SessionConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !POSITION_INTERVAL_RANGE_MS.contains(&self.position_interval_ms) {
            return Err(Error::Config(format!(
                "position_interval_ms must be within {}..={}, got {}",
                POSITION_INTERVAL_RANGE_MS.start(),
                POSITION_INTERVAL_RANGE_MS.end(),
                self.position_interval_ms
            )));
        }
        if self.fast_forward_ms == 0 || self.rewind_ms == 0 {
            return Err(Error::Config(
                "fast_forward_ms and rewind_ms must be greater than zero".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config("event_capacity must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn position_interval(&self) -> std::time::Duration {
        crate::time::millis_to_duration(self.position_interval_ms)
    }
}

/// Locate the config file to load, if any
///
/// Returns the first candidate in priority order. CLI and environment paths
/// are returned even if they do not exist so the caller can warn about them.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: User config file
    default_config_path().filter(|path| path.exists())
}

/// Platform config location: `<config dir>/chapter-player/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("chapter-player").join("config.toml"))
}

/// Resolve and load the session configuration
///
/// Falls back to compiled defaults when no file is found.
pub fn load_config(cli_arg: Option<&Path>, env_var_name: &str) -> Result<SessionConfig> {
    match resolve_config_path(cli_arg, env_var_name) {
        Some(path) if path.exists() => {
            debug!(path = %path.display(), "Loading session config");
            SessionConfig::from_file(&path)
        }
        Some(path) => {
            warn!(
                path = %path.display(),
                "Config file not found, using compiled defaults"
            );
            Ok(SessionConfig::default())
        }
        None => {
            debug!("No config file, using compiled defaults");
            Ok(SessionConfig::default())
        }
    }
}
