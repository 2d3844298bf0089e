//! The conversational core of Kai.
//!
//! One exchange runs as:
//!
//! 1. **Resolve** the conversation (new id, or stored history under lock)
//! 2. **Assemble** the prompt: time context, persona, greeting policy,
//!    history, new user message
//! 3. **Complete** via the upstream provider
//! 4. **Sanitize** the reply by stripping leading greetings
//! 5. **Store** the user/assistant pair, keeping the last 16 turns

pub mod chat;
pub mod prompt;
pub mod sanitize;

pub use chat::{ChatError, ChatReply, ChatService, ModelParams};
pub use prompt::{GREETING_POLICY, PromptAssembler, persona_prompt, time_context};
pub use sanitize::{GREETING_TOKENS, strip_leading_greeting};
