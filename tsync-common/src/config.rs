//! TOML configuration loading and setting resolution
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default
//!
//! A missing TOML file is not an error: the tool warns and runs on
//! environment and defaults alone. A TOML file that exists but does not
//! parse is a configuration error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "TSYNC_CONFIG";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub contentful: ContentfulSection,
    #[serde(default)]
    pub linkedin: LinkedInSection,
    #[serde(default)]
    pub gemini: GeminiSection,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ContentfulSection {
    pub space_id: Option<String>,
    pub cma_token: Option<String>,
    /// Environment name (default "master")
    pub environment: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct LinkedInSection {
    /// `li_at` session cookie value
    pub cookie: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct GeminiSection {
    pub api_key: Option<String>,
    pub model: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Whole-run time limits in seconds
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_scrape_secs")]
    pub scrape_secs: u64,
    #[serde(default = "default_list_secs")]
    pub list_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            scrape_secs: default_scrape_secs(),
            list_secs: default_list_secs(),
        }
    }
}

fn default_scrape_secs() -> u64 {
    120
}

fn default_list_secs() -> u64 {
    30
}

/// Platform config file location: `{config_dir}/tsync/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tsync").join("config.toml"))
}

/// Pick the config file: explicit path, then `TSYNC_CONFIG`, then platform default
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path()
}

/// Load TOML config, falling back to defaults when the file is missing
pub fn load_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = path else {
        warn!("Could not determine config directory, using defaults");
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        warn!(
            path = %path.display(),
            "Config file not found, using environment and defaults"
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    info!(path = %path.display(), "Loaded config file");
    Ok(config)
}

/// Where a resolved setting came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingSource {
    CommandLine,
    Environment,
    Toml,
}

impl SettingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CommandLine => "command line",
            Self::Environment => "environment",
            Self::Toml => "TOML",
        }
    }
}

/// Validate a setting value (non-empty, non-whitespace)
pub fn is_valid_value(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Resolve one setting from its three sources
///
/// Blank values count as unset. When more than one source carries a value
/// a warning names them all, since that usually means a stale credential
/// is lying around somewhere.
pub fn resolve_setting(
    name: &str,
    cli: Option<&str>,
    env: Option<&str>,
    toml: Option<&str>,
) -> Option<(String, SettingSource)> {
    let candidates = [
        (cli, SettingSource::CommandLine),
        (env, SettingSource::Environment),
        (toml, SettingSource::Toml),
    ];

    let present: Vec<(&str, SettingSource)> = candidates
        .iter()
        .filter_map(|(value, source)| value.filter(|v| is_valid_value(v)).map(|v| (v, *source)))
        .collect();

    if present.len() > 1 {
        let sources: Vec<&str> = present.iter().map(|(_, s)| s.as_str()).collect();
        warn!(
            "{} found in multiple sources: {}. Using {} (highest priority).",
            name,
            sources.join(", "),
            present[0].1.as_str()
        );
    }

    present
        .first()
        .map(|(value, source)| (value.trim().to_string(), *source))
}
