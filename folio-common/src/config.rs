//! Configuration loading and base URL resolution
//!
//! Resolution order for every overridable value:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "FOLIO_CONFIG";

/// Environment variable overriding the timeline base URL
pub const BASE_URL_ENV_VAR: &str = "FOLIO_TIMELINE_URL";

/// Compiled default for the timeline asset root
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080/timeline";

/// Timeline loader tuning, the `[loader]` table of the TOML file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderSettings {
    /// Root URL of the timeline assets (`projects.json` lives directly under it)
    pub base_url: String,
    /// Cache entry lifetime in milliseconds
    pub cache_expiry_ms: u64,
    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Attempts per index/project fetch
    pub max_retries: u32,
    /// Concurrent project fetches in `load_all_projects`
    pub batch_size: usize,
    /// Base retry delay; doubles on each failed attempt
    pub retry_delay_ms: u64,
    /// Highest image index probed by auto-detection
    pub image_probe_limit: u32,
    /// Bytes requested per image probe
    pub image_probe_bytes: u64,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_expiry_ms: 300_000,
            request_timeout_ms: 10_000,
            max_retries: 3,
            batch_size: 5,
            retry_delay_ms: 1_000,
            image_probe_limit: 10,
            image_probe_bytes: 1_024,
        }
    }
}

impl LoaderSettings {
    /// Clamp values that would make the loader unusable
    pub fn normalized(mut self) -> Self {
        self.base_url = trim_base_url(&self.base_url);
        self.max_retries = self.max_retries.max(1);
        self.batch_size = self.batch_size.max(1);
        self
    }
}

/// Logging configuration, the `[logging]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing level when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Full contents of the folio TOML config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub loader: LoaderSettings,
    pub logging: LoggingConfig,
}

impl TomlConfig {
    /// Parse a config file.
    ///
    /// A missing file yields defaults with a warning; a file that exists but
    /// does not parse is a configuration error.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let config: TomlConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }
}

/// Locate the config file: CLI argument, then `FOLIO_CONFIG`, then the
/// platform config directory. Returns `None` when no candidate exists.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir()
        .map(|d| d.join("folio").join("config.toml"))
        .filter(|p| p.exists())
}

/// Load the TOML config from the resolved location, or defaults if none
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    match resolve_config_path(cli_arg) {
        Some(path) => TomlConfig::load(&path),
        None => {
            debug!("No config file found, using compiled defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Resolve the timeline base URL with CLI > ENV > TOML > default priority
pub fn resolve_base_url(cli_arg: Option<&str>, toml_config: &TomlConfig) -> String {
    if let Some(url) = cli_arg {
        return trim_base_url(url);
    }

    if let Ok(url) = std::env::var(BASE_URL_ENV_VAR) {
        if !url.trim().is_empty() {
            return trim_base_url(&url);
        }
    }

    if !toml_config.loader.base_url.trim().is_empty() {
        return trim_base_url(&toml_config.loader.base_url);
    }

    DEFAULT_BASE_URL.to_string()
}

fn trim_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
