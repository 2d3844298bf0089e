//! Configuration loading, validation, and management for Kai.
//!
//! Loads configuration from `~/.kai/config.toml` (or an explicit path) with
//! environment variable overrides. The upstream credential is *not* frozen
//! here: see [`credentials`] for the per-request lookup.

pub mod credentials;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use credentials::{CredentialSource, EnvCredentials, StaticCredentials};

/// The root configuration structure.
///
/// Maps directly to `~/.kai/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Upstream model settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// HTTP gateway settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Conversation history settings
    #[serde(default)]
    pub session: SessionConfig,

    /// Assistant persona
    #[serde(default)]
    pub persona: PersonaConfig,

    /// Where the upstream credential comes from
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider label used in logs
    #[serde(default = "default_provider_name")]
    pub name: String,

    /// OpenAI-compatible base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens per reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Upper bound on a single upstream call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_provider_name() -> String {
    "openrouter".into()
}
fn default_api_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_model() -> String {
    "google/gemini-flash-1.5".into()
}
fn default_temperature() -> f32 {
    0.6
}
fn default_max_tokens() -> u32 {
    350
}
fn default_request_timeout() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            api_url: default_api_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allow any origin, method and header (browser and Flutter web clients)
    #[serde(default = "default_true")]
    pub cors_allow_any: bool,

    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8000
}
fn default_true() -> bool {
    true
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_allow_any: true,
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Turns kept per conversation, oldest dropped first
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
}

fn default_max_turns() -> usize {
    16
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// The name the assistant answers to
    #[serde(default = "default_persona_name")]
    pub name: String,

    /// Replace the built-in persona instruction entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,
}

fn default_persona_name() -> String {
    "Kai".into()
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: default_persona_name(),
            system_prompt_override: None,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Environment variable holding the API key
    #[serde(default = "default_env_var")]
    pub env_var: String,

    /// Dotenv file consulted when the variable is not in the environment
    #[serde(default = "default_env_file")]
    pub env_file: PathBuf,

    /// Last-resort key stored in the config file itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_env_var() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_env_file() -> PathBuf {
    PathBuf::from(".env")
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            env_var: default_env_var(),
            env_file: default_env_file(),
            api_key: None,
        }
    }
}

impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("env_var", &self.env_var)
            .field("env_file", &self.env_file)
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.kai/config.toml).
    ///
    /// Environment overrides:
    /// - `KAI_MODEL`
    /// - `KAI_HOST`
    /// - `KAI_PORT`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_overrides(&Self::config_dir().join("config.toml"))
    }

    /// Load from `path`, then apply environment overrides.
    pub fn load_with_overrides(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;

        if let Ok(model) = std::env::var("KAI_MODEL") {
            config.provider.model = model;
        }

        if let Ok(host) = std::env::var("KAI_HOST") {
            config.gateway.host = host;
        }

        if let Ok(port) = std::env::var("KAI_PORT") {
            config.gateway.port = port.parse().map_err(|_| {
                ConfigError::ValidationError(format!("KAI_PORT is not a valid port: {port}"))
            })?;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".kai")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(ConfigError::ValidationError(
                "provider.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.provider.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "provider.max_tokens must be > 0".into(),
            ));
        }

        if self.session.max_turns == 0 {
            return Err(ConfigError::ValidationError(
                "session.max_turns must be > 0".into(),
            ));
        }

        if self.credentials.env_var.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "credentials.env_var must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Credential lookup described by the `[credentials]` section.
    pub fn credential_source(&self) -> EnvCredentials {
        EnvCredentials::new(&self.credentials.env_var, &self.credentials.env_file)
            .with_fallback(self.credentials.api_key.clone())
    }

    /// Generate a default config TOML string (for `kai config --default`).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_matches_upstream_contract() {
        let config = AppConfig::default();
        assert_eq!(config.provider.model, "google/gemini-flash-1.5");
        assert!(config.provider.api_url.contains("openrouter.ai"));
        assert!((config.provider.temperature - 0.6).abs() < f32::EPSILON);
        assert_eq!(config.provider.max_tokens, 350);
        assert_eq!(config.session.max_turns, 16);
        assert_eq!(config.credentials.env_var, "OPENROUTER_API_KEY");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.provider.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_max_turns_rejected() {
        let mut config = AppConfig::default();
        config.session.max_turns = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_turns"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/kai.toml")).unwrap();
        assert_eq!(config.gateway.port, 8000);
        assert_eq!(config.persona.name, "Kai");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[provider]
model = "openai/gpt-4o-mini"

[gateway]
port = 9100

[persona]
name = "Mira"
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.provider.model, "openai/gpt-4o-mini");
        assert_eq!(config.provider.max_tokens, 350);
        assert_eq!(config.gateway.port, 9100);
        assert_eq!(config.gateway.host, "127.0.0.1");
        assert_eq!(config.persona.name, "Mira");
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[gateway\nport = ").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let mut config = AppConfig::default();
        config.credentials.api_key = Some("sk-or-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-or-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gemini-flash-1.5"));
        assert!(toml_str.contains("OPENROUTER_API_KEY"));
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.gateway.port, 8000);
    }
}
