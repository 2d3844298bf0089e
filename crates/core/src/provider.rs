//! Provider trait: the abstraction over the upstream LLM.
//!
//! A Provider knows how to send an ordered message list to a model and get a
//! single completion back. The credential is resolved per request, so
//! providers are built on demand through a [`ProviderFactory`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::message::Message;

/// Configuration for a provider request.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    /// The model to use (e.g., "google/gemini-flash-1.5")
    pub model: String,

    /// The prompt messages, in order
    pub messages: Vec<Message>,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
}

/// A complete response from a provider.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    /// The generated assistant message
    pub message: Message,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

/// Token usage information.
#[derive(Debug, Clone)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core Provider trait.
///
/// The chat service calls `complete()` without knowing which backend is in
/// use; tests substitute a scripted implementation.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openrouter").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError>;

    /// Health check: can we reach the provider?
    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }
}

/// Builds a [`Provider`] bound to a credential.
///
/// The credential is re-read on every chat request, so the handler asks the
/// factory for a provider each time instead of holding one for the process.
pub trait ProviderFactory: Send + Sync {
    fn build(&self, api_key: &str) -> Arc<dyn Provider>;
}

impl<F> ProviderFactory for F
where
    F: Fn(&str) -> Arc<dyn Provider> + Send + Sync,
{
    fn build(&self, api_key: &str) -> Arc<dyn Provider> {
        self(api_key)
    }
}
