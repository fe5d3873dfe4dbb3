//! Configuration resolution for chaptertune
//!
//! Builds the effective [`AppConfig`] from command line → ENV → TOML →
//! compiled defaults. Missing credentials are a configuration error, which
//! the binary reports as fatal before any client is constructed.

use crate::services::spotify_client::SpotifyCredentials;
use crate::workflow::PipelineConfig;
use chaptertune_common::config::{
    resolve_setting, LoggingConfig, TomlConfig, DEFAULT_OPENAI_API_BASE, DEFAULT_OPENAI_MODEL,
    DEFAULT_TEMPERATURE,
};
use chaptertune_common::{Error, Result};
use tracing::info;

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const OPENAI_MODEL_ENV: &str = "OPENAI_MODEL";
pub const OPENAI_API_BASE_ENV: &str = "OPENAI_API_BASE";
pub const SPOTIFY_CLIENT_ID_ENV: &str = "SPOTIFY_CLIENT_ID";
pub const SPOTIFY_CLIENT_SECRET_ENV: &str = "SPOTIFY_CLIENT_SECRET";
pub const SPOTIFY_REFRESH_TOKEN_ENV: &str = "SPOTIFY_REFRESH_TOKEN";
pub const SPOTIFY_ACCESS_TOKEN_ENV: &str = "SPOTIFY_ACCESS_TOKEN";

/// Text-model connection settings
#[derive(Clone)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub temperature: f32,
}

impl std::fmt::Debug for OpenAiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiSettings")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// Fully resolved configuration for one run
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub openai: OpenAiSettings,
    pub spotify: SpotifyCredentials,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Resolve every setting; `model_override` comes from the command line
    pub fn resolve(toml_config: &TomlConfig, model_override: Option<&str>) -> Result<Self> {
        let openai = resolve_openai(toml_config, model_override)?;
        let spotify = resolve_spotify(toml_config)?;
        let pipeline = PipelineConfig::from_settings(&toml_config.pipeline, openai.temperature);

        Ok(Self {
            logging: toml_config.logging.clone(),
            openai,
            spotify,
            pipeline,
        })
    }

    /// Log the effective configuration without secret values
    pub fn log_effective(&self) {
        info!(
            model = %self.openai.model,
            api_base = %self.openai.api_base,
            temperature = self.openai.temperature,
            "Text model configuration"
        );
        info!(
            client_id = self.spotify.client_id.is_some(),
            client_secret = self.spotify.client_secret.is_some(),
            refresh_token = self.spotify.refresh_token.is_some(),
            access_token = self.spotify.access_token.is_some(),
            "Spotify credentials configured"
        );
        info!(
            log_level = %self.logging.level,
            use_track_seeds = self.pipeline.use_track_seeds,
            use_artist_seeds = self.pipeline.use_artist_seeds,
            write_descriptions = self.pipeline.write_descriptions,
            api_max_attempts = self.pipeline.api_max_attempts,
            extraction_max_attempts = self.pipeline.extraction.max_attempts,
            extraction_token_budget = self.pipeline.extraction.initial_token_budget,
            "Pipeline configuration"
        );
    }
}

fn resolve_openai(toml_config: &TomlConfig, model_override: Option<&str>) -> Result<OpenAiSettings> {
    let section = &toml_config.openai;

    let api_key = resolve_setting(
        "openai.api_key",
        None,
        OPENAI_API_KEY_ENV,
        section.api_key.as_deref(),
    )
    .ok_or_else(|| {
        Error::Config(format!(
            "OpenAI API key not configured. Please configure using one of:\n\
             1. Environment: {}=your-key-here\n\
             2. TOML config: [openai] api_key = \"your-key\"",
            OPENAI_API_KEY_ENV
        ))
    })?;
    info!("OpenAI API key loaded from {}", api_key.source);

    let model = resolve_setting("openai.model", model_override, OPENAI_MODEL_ENV, section.model.as_deref())
        .map(|s| s.value)
        .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());

    let api_base = resolve_setting(
        "openai.api_base",
        None,
        OPENAI_API_BASE_ENV,
        section.api_base.as_deref(),
    )
    .map(|s| s.value)
    .unwrap_or_else(|| DEFAULT_OPENAI_API_BASE.to_string());

    let temperature = section.temperature.unwrap_or(DEFAULT_TEMPERATURE);
    if !(0.0..=2.0).contains(&temperature) {
        return Err(Error::Config(format!(
            "openai.temperature = {} is outside 0.0..=2.0",
            temperature
        )));
    }

    Ok(OpenAiSettings {
        api_key: api_key.value,
        model,
        api_base,
        temperature,
    })
}

fn resolve_spotify(toml_config: &TomlConfig) -> Result<SpotifyCredentials> {
    let section = &toml_config.spotify;
    let value = |name: &str, env_var: &str, toml_value: &Option<String>| {
        resolve_setting(name, None, env_var, toml_value.as_deref()).map(|s| s.value)
    };

    let credentials = SpotifyCredentials {
        client_id: value("spotify.client_id", SPOTIFY_CLIENT_ID_ENV, &section.client_id),
        client_secret: value("spotify.client_secret", SPOTIFY_CLIENT_SECRET_ENV, &section.client_secret),
        refresh_token: value("spotify.refresh_token", SPOTIFY_REFRESH_TOKEN_ENV, &section.refresh_token),
        access_token: value("spotify.access_token", SPOTIFY_ACCESS_TOKEN_ENV, &section.access_token),
    };

    let can_refresh = credentials.refresh_token.is_some()
        && credentials.client_id.is_some()
        && credentials.client_secret.is_some();

    if !can_refresh && credentials.access_token.is_none() {
        return Err(Error::Config(format!(
            "Spotify credentials not configured. Set either {} (with {} and {}) or {}, \
             in the environment or in the [spotify] TOML section",
            SPOTIFY_REFRESH_TOKEN_ENV, SPOTIFY_CLIENT_ID_ENV, SPOTIFY_CLIENT_SECRET_ENV, SPOTIFY_ACCESS_TOKEN_ENV
        )));
    }

    Ok(credentials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    const ALL_ENV: [&str; 7] = [
        OPENAI_API_KEY_ENV,
        OPENAI_MODEL_ENV,
        OPENAI_API_BASE_ENV,
        SPOTIFY_CLIENT_ID_ENV,
        SPOTIFY_CLIENT_SECRET_ENV,
        SPOTIFY_REFRESH_TOKEN_ENV,
        SPOTIFY_ACCESS_TOKEN_ENV,
    ];

    fn clear_env() {
        for var in ALL_ENV {
            env::remove_var(var);
        }
    }

    fn toml_with_keys() -> TomlConfig {
        let mut config = TomlConfig::default();
        config.openai.api_key = Some("sk-toml".to_string());
        config.spotify.access_token = Some("toml-token".to_string());
        config
    }

    #[test]
    #[serial]
    fn test_defaults_applied() {
        clear_env();
        let config = AppConfig::resolve(&toml_with_keys(), None).unwrap();

        assert_eq!(config.openai.api_key, "sk-toml");
        assert_eq!(config.openai.model, DEFAULT_OPENAI_MODEL);
        assert_eq!(config.openai.api_base, DEFAULT_OPENAI_API_BASE);
        assert_eq!(config.openai.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(config.spotify.access_token.as_deref(), Some("toml-token"));
        assert_eq!(config.pipeline.api_max_attempts, 3);
    }

    #[test]
    #[serial]
    fn test_env_and_cli_priority() {
        clear_env();
        env::set_var(OPENAI_API_KEY_ENV, "sk-env");
        env::set_var(OPENAI_MODEL_ENV, "env-model");

        let config = AppConfig::resolve(&toml_with_keys(), None).unwrap();
        assert_eq!(config.openai.api_key, "sk-env");
        assert_eq!(config.openai.model, "env-model");

        let config = AppConfig::resolve(&toml_with_keys(), Some("cli-model")).unwrap();
        assert_eq!(config.openai.model, "cli-model");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_missing_openai_key_is_config_error() {
        clear_env();
        let mut toml = toml_with_keys();
        toml.openai.api_key = Some("   ".to_string());

        match AppConfig::resolve(&toml, None) {
            Err(Error::Config(msg)) => assert!(msg.contains(OPENAI_API_KEY_ENV)),
            other => panic!("expected config error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    #[serial]
    fn test_spotify_credentials_required() {
        clear_env();
        let mut toml = toml_with_keys();
        toml.spotify.access_token = None;
        toml.spotify.refresh_token = Some("refresh".to_string());
        assert!(matches!(AppConfig::resolve(&toml, None), Err(Error::Config(_))));

        toml.spotify.client_id = Some("id".to_string());
        toml.spotify.client_secret = Some("secret".to_string());
        let config = AppConfig::resolve(&toml, None).unwrap();
        assert_eq!(config.spotify.refresh_token.as_deref(), Some("refresh"));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let settings = OpenAiSettings {
            api_key: "sk-secret".to_string(),
            model: "m".to_string(),
            api_base: "b".to_string(),
            temperature: 0.7,
        };
        assert!(!format!("{:?}", settings).contains("sk-secret"));
    }
}
