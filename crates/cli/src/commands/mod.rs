pub mod chat;
pub mod config_cmd;
pub mod doctor;
pub mod serve;

use std::path::{Path, PathBuf};

use kai_config::{AppConfig, ConfigError};

/// The config file the CLI reads: `--config` if given, else the default.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}

/// Load configuration with environment overrides applied.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    AppConfig::load_with_overrides(&config_path(explicit))
}
