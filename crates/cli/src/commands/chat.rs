//! `kai chat`: Talk to Kai from the terminal.
//!
//! With `-m` a single exchange is run and printed. Without it, messages are
//! read from stdin one line at a time and every turn continues the same
//! conversation until `exit` or end of input.

use std::io::Write;
use std::path::Path;

use kai_agent::ChatService;
use kai_config::{AppConfig, CredentialSource};
use kai_core::message::ConversationId;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::info;

pub async fn run(
    config_path: Option<&Path>,
    message: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config =
        super::load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;

    // Fail before any prompt when there is no key to send.
    if config.credential_source().api_key().is_none() {
        print_key_help(&config);
        return Err("No API key found. See above for setup instructions.".into());
    }

    let chat = kai_gateway::build_chat_service(&config)?;
    info!(model = %chat.params().model, interactive = message.is_none(), "Chat session starting");

    if let Some(msg) = message {
        // Single message mode
        let reply = chat.chat(&msg, None).await?;
        println!("{}", reply.reply);
        println!();
        println!("conversation_id: {}", reply.conversation_id);
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  Kai: interactive mode");
    println!("  Model: {}", config.provider.model);
    println!("  Type your message and press Enter. Type 'exit' or Ctrl+C to quit.");
    println!();

    let stdin = BufReader::new(tokio::io::stdin());
    let conversation = converse(&chat, stdin, &mut std::io::stdout()).await?;

    println!();
    if let Some(id) = conversation {
        println!("  conversation_id: {id}");
    }
    println!("  Take care.");
    Ok(())
}

/// Run one exchange per input line, carrying the conversation id from each
/// reply into the next turn. Returns the conversation id, if any turn
/// succeeded.
async fn converse<R, W>(
    chat: &ChatService,
    input: R,
    out: &mut W,
) -> Result<Option<ConversationId>, Box<dyn std::error::Error>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut conversation: Option<ConversationId> = None;

    write!(out, "  You > ")?;
    out.flush()?;

    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if text == "exit" || text == "quit" {
            break;
        }

        if !text.is_empty() {
            let id = conversation.as_ref().map(ConversationId::as_str);
            match chat.chat(text, id).await {
                Ok(reply) => {
                    writeln!(out)?;
                    for line in reply.reply.lines() {
                        writeln!(out, "  Kai > {line}")?;
                    }
                    writeln!(out)?;
                    conversation = Some(reply.conversation_id);
                }
                Err(e) => {
                    writeln!(out, "  [Error] {e}")?;
                    writeln!(out)?;
                }
            }
        }

        write!(out, "  You > ")?;
        out.flush()?;
    }

    Ok(conversation)
}

fn print_key_help(config: &AppConfig) {
    eprintln!();
    eprintln!("  ERROR: No API key configured!");
    eprintln!();
    eprintln!("  Set the key in your environment or in a .env file:");
    eprintln!("    {}=sk-or-v1-...", config.credentials.env_var);
    eprintln!();
    eprintln!("  Get an OpenRouter key at: https://openrouter.ai/keys");
    eprintln!();
}
