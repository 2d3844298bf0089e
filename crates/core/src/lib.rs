//! # Kai Core
//!
//! Domain types, traits, and error definitions for the Kai chat proxy.
//! This crate has **no framework dependencies**: it defines the domain model
//! that the other crates implement against.
//!
//! ## Seams
//!
//! Each collaborator of the chat flow is a trait here, with implementations
//! living in their own crates:
//! - [`Provider`] / [`ProviderFactory`]: the upstream LLM (`kai-providers`)
//! - [`SessionStore`]: bounded conversation history (`kai-memory`)
//!
//! Tests swap either side for an in-process fake.

pub mod error;
pub mod message;
pub mod provider;
pub mod session;

// Re-export key types at crate root for ergonomics
pub use error::{ProviderError, SessionError};
pub use message::{ConversationId, Message, Role};
pub use provider::{Provider, ProviderFactory, ProviderRequest, ProviderResponse, Usage};
pub use session::{SessionGuard, SessionStore, trim_history, DEFAULT_MAX_TURNS};
