//! Configuration management for linksync.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority)
//! 2. Project-local `linksync.toml` file
//! 3. User config `~/.config/linksync/config.toml`
//! 4. Built-in defaults (lowest priority)

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod defaults;

pub use defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Link toggle behaviour.
    pub link: LinkConfig,

    /// Status indicator rendering.
    pub indicator: IndicatorConfig,

    /// Symbol index scanning.
    pub index: IndexConfig,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./linksync.toml` (project local)
    /// 2. `~/.config/linksync/config.toml` (user config)
    /// 3. Falls back to defaults
    ///
    /// Environment overrides apply in every case.
    pub fn load() -> Result<Self, ConfigError> {
        if Path::new(PROJECT_CONFIG_FILE).exists() {
            return Self::from_file(PROJECT_CONFIG_FILE);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join(USER_CONFIG_DIR).join(USER_CONFIG_FILE);
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Reject settings the rest of the crate cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.index.extensions.is_empty() {
            return Err(ConfigError::Invalid(
                "index.extensions must list at least one extension".to_string(),
            ));
        }
        if self.indicator.synced_icon.is_empty() || self.indicator.broken_icon.is_empty() {
            return Err(ConfigError::Invalid(
                "indicator icons must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Some(enabled) = env_bool("LINKSYNC_LINK_ENABLED") {
            self.link.enabled = enabled;
        }
        if let Some(reveal) = env_bool("LINKSYNC_REVEAL_FIRST_FAILURE") {
            self.link.reveal_first_failure = reveal;
        }
        if let Some(show) = env_bool("LINKSYNC_SHOW_BROKEN_WHEN_DISABLED") {
            self.indicator.show_broken_when_disabled = show;
        }
        if let Ok(size) = std::env::var("LINKSYNC_MAX_FILE_SIZE") {
            if let Ok(n) = size.parse() {
                self.index.max_file_size = n;
            }
        }
    }

    /// Create a default config file content as a string.
    pub fn default_config_string() -> String {
        Config::default().to_toml_string().unwrap_or_default()
    }

    /// Serialize this configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

fn env_bool(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Link toggle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Initial state of the "Link with Editor" switch.
    pub enabled: bool,

    /// When false, the runner's automatic first-failure selection updates the
    /// tree selection and status but does not move the editor. That is the
    /// classic IDE behaviour, see [`DEFAULT_REVEAL_FIRST_FAILURE`].
    pub reveal_first_failure: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            enabled: DEFAULT_LINK_ENABLED,
            reveal_first_failure: DEFAULT_REVEAL_FIRST_FAILURE,
        }
    }
}

/// Status indicator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub synced_icon: String,
    pub broken_icon: String,
    pub synced_tooltip: String,
    pub broken_tooltip: String,

    /// When false, the synced icon is rendered whenever linking is off.
    /// The tracked status is unaffected.
    pub show_broken_when_disabled: bool,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            synced_icon: DEFAULT_SYNCED_ICON.to_string(),
            broken_icon: DEFAULT_BROKEN_ICON.to_string(),
            synced_tooltip: DEFAULT_SYNCED_TOOLTIP.to_string(),
            broken_tooltip: DEFAULT_BROKEN_TOOLTIP.to_string(),
            show_broken_when_disabled: DEFAULT_SHOW_BROKEN_WHEN_DISABLED,
        }
    }
}

/// Symbol index configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// File extensions to parse (without leading dot).
    pub extensions: Vec<String>,

    /// Directory names skipped while walking.
    pub exclude_dirs: Vec<String>,

    /// Files above this size (bytes) are skipped.
    pub max_file_size: u64,

    /// Honour `.gitignore` files.
    pub respect_gitignore: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            exclude_dirs: DEFAULT_EXCLUDE_DIRS.iter().map(|s| s.to_string()).collect(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            respect_gitignore: DEFAULT_RESPECT_GITIGNORE,
        }
    }
}

impl IndexConfig {
    /// Whether a file should be indexed, judged by extension.
    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }

    /// Whether a directory name is excluded.
    pub fn excludes_dir(&self, name: &str) -> bool {
        self.exclude_dirs.iter().any(|d| d == name)
    }
}
