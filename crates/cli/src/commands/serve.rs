//! `kai serve`: Start the HTTP chat backend.

use std::path::Path;

use kai_config::CredentialSource;
use tracing::{info, warn};

pub async fn run(
    config_path: Option<&Path>,
    host_override: Option<String>,
    port_override: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config =
        super::load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(host) = host_override {
        config.gateway.host = host;
    }
    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    info!(
        host = %config.gateway.host,
        port = config.gateway.port,
        model = %config.provider.model,
        "Starting Kai backend"
    );

    let credentials = config.credential_source();
    if credentials.api_key().is_none() {
        // Requests fail with 500 until a key appears; the .env file is re-read per request.
        warn!(lookup = %credentials.describe(), "No API key configured yet");
    }

    kai_gateway::start(config).await?;

    Ok(())
}
