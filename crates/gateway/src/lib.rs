//! HTTP API gateway for Kai.
//!
//! Exposes the liveness endpoint and the chat endpoint over Axum.
//! The handlers live in [`api`]; this module wires the chat service,
//! the router layers and the server loop.

pub mod api;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use kai_agent::{ChatService, ModelParams, PromptAssembler};
use kai_config::{AppConfig, CredentialSource, GatewayConfig};
use kai_core::error::ProviderError;
use kai_core::session::SessionStore;
use kai_memory::InMemorySessionStore;
use kai_providers::OpenAiCompatFactory;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub chat: Arc<ChatService>,
}

pub type SharedState = Arc<GatewayState>;

/// Wire a [`ChatService`] from configuration: OpenAI-compatible upstream,
/// env/.env credentials and an in-process session store.
pub fn build_chat_service(config: &AppConfig) -> Result<ChatService, ProviderError> {
    let factory = OpenAiCompatFactory::from_config(&config.provider)?;
    let sessions = InMemorySessionStore::with_max_turns(config.session.max_turns);

    Ok(ChatService::new(
        Arc::new(factory),
        Arc::new(config.credential_source()),
        Arc::new(sessions),
    )
    .with_assembler(PromptAssembler::from_config(&config.persona))
    .with_params(ModelParams::from(&config.provider)))
}

/// Build the Axum router with all gateway routes.
///
/// Layers applied:
/// - Request body size limit
/// - Permissive CORS (when `cors_allow_any` is set)
/// - HTTP trace logging
pub fn build_router(state: SharedState, gateway: &GatewayConfig) -> Router {
    let router = Router::new()
        .route("/", get(api::root_handler))
        .route("/chat", post(api::chat_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(gateway.body_limit_bytes));

    let router = if gateway.cors_allow_any {
        router.layer(CorsLayer::very_permissive())
    } else {
        router
    };

    router.layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server and run until Ctrl-C.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let chat = build_chat_service(&config)?;
    info!(
        model = %chat.params().model,
        max_turns = chat.sessions().max_turns(),
        credentials = %config.credential_source().describe(),
        "Chat service ready"
    );

    let state = Arc::new(GatewayState {
        chat: Arc::new(chat),
    });
    let app = build_router(state, &config.gateway);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
