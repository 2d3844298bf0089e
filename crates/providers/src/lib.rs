//! Upstream LLM provider implementations for Kai.
//!
//! All providers implement the `kai_core::Provider` trait. The gateway holds
//! a [`ProviderFactory`](kai_core::ProviderFactory) and binds a provider to
//! the credential resolved for each request.

pub mod openai_compat;

pub use openai_compat::{OpenAiCompatFactory, OpenAiCompatProvider};
