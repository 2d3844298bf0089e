//! Prompt assembly: the ordered message list sent upstream.
//!
//! Every prompt has the same shape, whether or not the conversation is new:
//!
//! 1. time context (system)
//! 2. persona instruction (system)
//! 3. greeting policy (system)
//! 4. stored history, oldest first
//! 5. the new user message

use chrono::{NaiveDateTime, Timelike};
use kai_config::PersonaConfig;
use kai_core::message::Message;

/// Appended to every prompt; the reply sanitizer backs it up after the fact.
pub const GREETING_POLICY: &str = "GLOBAL POLICY: Never open a reply with a greeting or salutation \
(no 'Hi', 'Hello', 'Hey', or time-of-day greetings such as 'Good morning'). This applies to every \
reply, including the very first one. Start directly with warm, empathetic content.";

/// The built-in persona instruction for an assistant called `name`.
pub fn persona_prompt(name: &str) -> String {
    format!(
        "You are '{name}', a calm, kind friend who helps people feel a little better and find simple next steps.

Scope:
- Only support wellbeing topics: stress, feelings and mood, anxiety, burnout, relationships, grief and loss, sleep, coping skills, self-care, and physical symptoms or illnesses that affect how someone feels.
- If the person asks for anything outside this scope (for example coding or tech, maths, homework, shopping, weather, sports, news, politics, finance, or general knowledge), politely decline and redirect to their wellbeing.
- When declining, be brief and do NOT answer the off-topic question. Invite them to share how they are feeling or what is weighing on them.

Before offering solutions:
- Ask at most ONE short, gentle question per reply, then wait for the answer before asking another.
- Use very simple English and short sentences. Be warm and caring.
- Keep a soothing, hopeful tone. A few supportive emojis are fine.
- Keep every reply under 120 words.
- You are not a licensed therapist. If someone mentions a crisis or self-harm, gently encourage them to contact a professional or a local helpline.

When you are ready to offer solutions:
- Give the most practical steps in plain language.
- Keep them brief and clear.

Never include stickers or image links."
    )
}

/// Local date/time line that lets the model pick a fitting tone.
pub fn time_context(now: NaiveDateTime) -> String {
    format!(
        "Current local datetime: {} | hour24={}",
        now.format("%Y-%m-%dT%H:%M"),
        now.hour()
    )
}

/// Builds upstream prompts around a fixed persona.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    persona: String,
}

impl PromptAssembler {
    /// Use the built-in persona under the given name.
    pub fn new(persona_name: &str) -> Self {
        Self {
            persona: persona_prompt(persona_name),
        }
    }

    /// Use `persona` verbatim as the persona instruction.
    pub fn with_persona(persona: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
        }
    }

    pub fn from_config(config: &PersonaConfig) -> Self {
        match &config.system_prompt_override {
            Some(text) => Self::with_persona(text.clone()),
            None => Self::new(&config.name),
        }
    }

    pub fn persona(&self) -> &str {
        &self.persona
    }

    /// Assemble the full prompt for one exchange.
    pub fn build(&self, history: &[Message], user_message: &str, now: NaiveDateTime) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 4);
        messages.push(Message::system(time_context(now)));
        messages.push(Message::system(self.persona.clone()));
        messages.push(Message::system(GREETING_POLICY));
        messages.extend(history.iter().cloned());
        messages.push(Message::user(user_message));
        messages
    }
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::from_config(&PersonaConfig::default())
    }
}
