//! Configuration loading and setting resolution
//!
//! Settings are resolved per key with the priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not an error: a warning is logged and defaults apply.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable that overrides the TOML config file location
pub const CONFIG_ENV_VAR: &str = "CHAPTERTUNE_CONFIG";

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Bootstrap configuration loaded from TOML file
///
/// Every section is optional; absent sections fall back to their defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub openai: OpenAiConfig,

    #[serde(default)]
    pub spotify: SpotifyConfig,

    #[serde(default)]
    pub pipeline: PipelineSettings,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Text-generation service settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OpenAiConfig {
    pub model: Option<String>,
    pub api_base: Option<String>,
    pub api_key: Option<String>,
    pub temperature: Option<f32>,
}

/// Music service credentials
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub access_token: Option<String>,
}

/// Pipeline feature flags and retry budgets
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineSettings {
    #[serde(default = "default_true")]
    pub use_track_seeds: bool,

    #[serde(default = "default_true")]
    pub use_artist_seeds: bool,

    #[serde(default = "default_true")]
    pub write_descriptions: bool,

    /// Attempts per music-service call (clamped to 3..=5 when applied)
    #[serde(default = "default_api_max_attempts")]
    pub api_max_attempts: u32,

    #[serde(default = "default_extraction_max_attempts")]
    pub extraction_max_attempts: u32,

    /// Output-token budget of the first chapter-extraction attempt
    #[serde(default = "default_extraction_token_budget")]
    pub extraction_token_budget: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            use_track_seeds: true,
            use_artist_seeds: true,
            write_descriptions: true,
            api_max_attempts: default_api_max_attempts(),
            extraction_max_attempts: default_extraction_max_attempts(),
            extraction_token_budget: default_extraction_token_budget(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_api_max_attempts() -> u32 {
    3
}

fn default_extraction_max_attempts() -> u32 {
    3
}

fn default_extraction_token_budget() -> u32 {
    1000
}

/// Where a resolved setting came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingSource {
    CommandLine,
    Environment,
    Toml,
}

impl std::fmt::Display for SettingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingSource::CommandLine => write!(f, "command line"),
            SettingSource::Environment => write!(f, "environment"),
            SettingSource::Toml => write!(f, "TOML"),
        }
    }
}

/// A setting value together with its source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSetting {
    pub value: String,
    pub source: SettingSource,
}

/// Validate a key or setting value (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve one setting from CLI → ENV → TOML
///
/// Blank values are skipped as if absent. When more than one tier provides a
/// value a warning is logged, since the lower tiers are silently shadowed.
pub fn resolve_setting(
    name: &str,
    cli_value: Option<&str>,
    env_var: &str,
    toml_value: Option<&str>,
) -> Option<ResolvedSetting> {
    let env_value = std::env::var(env_var).ok();

    let candidates = [
        (cli_value, SettingSource::CommandLine),
        (env_value.as_deref(), SettingSource::Environment),
        (toml_value, SettingSource::Toml),
    ];

    let valid: Vec<(&str, SettingSource)> = candidates
        .iter()
        .filter_map(|(value, source)| value.filter(|v| is_valid_key(v)).map(|v| (v, *source)))
        .collect();

    if valid.len() > 1 {
        let sources: Vec<String> = valid.iter().map(|(_, s)| s.to_string()).collect();
        warn!(
            setting = name,
            "Setting found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            valid[0].1
        );
    }

    valid.first().map(|(value, source)| {
        debug!(setting = name, source = %source, "Resolved setting");
        ResolvedSetting {
            value: value.trim().to_string(),
            source: *source,
        }
    })
}

/// Platform default TOML config path: `<config_dir>/chaptertune/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("chaptertune").join("config.toml"))
}

/// Resolve the TOML config path from CLI → ENV → platform default
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if is_valid_key(&path) {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path()
}

/// Load the TOML config file, falling back to defaults when it does not exist
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file not found: {} (using defaults and environment)",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// OS-dependent data directory for saved run presets
pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("chaptertune"))
        .unwrap_or_else(|| PathBuf::from("./chaptertune_data"))
}
