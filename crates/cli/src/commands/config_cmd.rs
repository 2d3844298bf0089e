//! `kai config`: Print the effective or default configuration.

use std::path::Path;

use kai_config::AppConfig;

pub fn run(config_path: Option<&Path>, default: bool) -> Result<(), Box<dyn std::error::Error>> {
    if default {
        print!("{}", AppConfig::default_toml());
        return Ok(());
    }

    let config =
        super::load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    println!("# {}", super::config_path(config_path).display());
    println!("{}", render_redacted(&config)?);
    Ok(())
}

/// Serialize `config` as TOML with the inline API key masked.
fn render_redacted(config: &AppConfig) -> Result<String, toml::ser::Error> {
    let mut shown = config.clone();
    if shown.credentials.api_key.is_some() {
        shown.credentials.api_key = Some("[REDACTED]".into());
    }
    toml::to_string_pretty(&shown)
}
