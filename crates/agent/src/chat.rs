//! The chat exchange: one user message in, one sanitized reply out.
//!
//! ```text
//! validate → credential → session lookup (locked) → prompt → provider
//!          → sanitize → session update → reply
//! ```
//!
//! A failed upstream call leaves the conversation untouched: turns are only
//! written after a successful completion.

use std::sync::Arc;

use chrono::Local;
use kai_config::{CredentialSource, ProviderConfig};
use kai_core::error::{ProviderError, SessionError};
use kai_core::message::{ConversationId, Message};
use kai_core::provider::{ProviderFactory, ProviderRequest};
use kai_core::session::{SessionGuard, SessionStore};
use tracing::{debug, info, warn};

use crate::prompt::PromptAssembler;
use crate::sanitize::strip_leading_greeting;

/// Sampling parameters sent with every upstream request.
#[derive(Debug, Clone)]
pub struct ModelParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl From<&ProviderConfig> for ModelParams {
    fn from(config: &ProviderConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

impl Default for ModelParams {
    fn default() -> Self {
        Self::from(&ProviderConfig::default())
    }
}

/// The outcome of a successful exchange.
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub reply: String,
    pub conversation_id: ConversationId,
}

/// Why an exchange failed.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Message must not be empty")]
    EmptyMessage,

    #[error("Server is not configured with an upstream API key ({source_hint}).")]
    MissingCredential { source_hint: String },

    #[error("Upstream model error: {0}")]
    Upstream(#[from] ProviderError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Orchestrates a single chat exchange.
pub struct ChatService {
    factory: Arc<dyn ProviderFactory>,
    credentials: Arc<dyn CredentialSource>,
    sessions: Arc<dyn SessionStore>,
    assembler: PromptAssembler,
    params: ModelParams,
}

impl ChatService {
    pub fn new(
        factory: Arc<dyn ProviderFactory>,
        credentials: Arc<dyn CredentialSource>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            factory,
            credentials,
            sessions,
            assembler: PromptAssembler::default(),
            params: ModelParams::default(),
        }
    }

    pub fn with_assembler(mut self, assembler: PromptAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn with_params(mut self, params: ModelParams) -> Self {
        self.params = params;
        self
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    /// Run one exchange. `conversation_id` continues an existing
    /// conversation; `None`, empty or unknown ids start a new one.
    pub async fn chat(
        &self,
        message: &str,
        conversation_id: Option<&str>,
    ) -> Result<ChatReply, ChatError> {
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let api_key = self
            .credentials
            .api_key()
            .ok_or_else(|| ChatError::MissingCredential {
                source_hint: self.credentials.describe(),
            })?;

        // Held until the exchange is stored, so concurrent turns on one
        // conversation are serialized.
        let (id, _guard, mut history) = self.resolve(conversation_id).await?;

        info!(
            conversation_id = %id,
            history_turns = history.len(),
            message_len = message.len(),
            "Chat request"
        );

        let now = Local::now().naive_local();
        let request = ProviderRequest {
            model: self.params.model.clone(),
            messages: self.assembler.build(&history, message, now),
            temperature: self.params.temperature,
            max_tokens: Some(self.params.max_tokens),
        };

        let provider = self.factory.build(&api_key);
        let response = provider.complete(request).await.map_err(|e| {
            warn!(conversation_id = %id, provider = provider.name(), error = %e, "Upstream call failed");
            ChatError::Upstream(e)
        })?;

        if let Some(usage) = &response.usage {
            debug!(
                model = %response.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Upstream usage"
            );
        }

        let reply = strip_leading_greeting(&response.message.content);

        history.push(Message::user(message));
        history.push(Message::assistant(reply.clone()));
        self.sessions.put(&id, history).await?;

        Ok(ChatReply {
            reply,
            conversation_id: id,
        })
    }

    /// Find the conversation to continue, or start a new one.
    async fn resolve(
        &self,
        requested: Option<&str>,
    ) -> Result<(ConversationId, SessionGuard, Vec<Message>), SessionError> {
        if let Some(raw) = requested.filter(|s| !s.is_empty()) {
            let id = ConversationId::from(raw);
            let guard = self.sessions.lock(&id).await?;
            if let Some(history) = self.sessions.get(&id).await? {
                return Ok((id, guard, history));
            }
            debug!(requested = raw, "Unknown conversation id, starting a new conversation");
        }

        let id = ConversationId::new();
        let guard = self.sessions.lock(&id).await?;
        Ok((id, guard, Vec::new()))
    }
}
