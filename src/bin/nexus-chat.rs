//! Interactive chat with the NovaNexus site assistant.
//!
//! This binary is a terminal stand-in for the site's chat widget: each line
//! you type is posted to the conversational webhook and the reply is shown
//! once it arrives.
//!
//! # Usage
//!
//! ```bash
//! # Webhook from the environment
//! NEXUS_CHAT_WEBHOOK=https://hooks.example.com/webhook/abc nexus-chat
//!
//! # Scope questions to particular documents
//! nexus-chat --webhook-url https://hooks.example.com/webhook/abc --tags pricing.pdf,faq.pdf
//!
//! # Disable colors (useful for piping output)
//! nexus-chat --no-color
//! ```
//!
//! Set `NEXUS_CHAT_LOG=debug` to see request logging on stderr.

use std::sync::Arc;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use nexus_chat::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatInput, ChatSession, IgnoreReason, PlainTextRenderer,
    Renderer, SubmitOutcome, classify_input, help_text,
};
use nexus_chat::session_store::default_state_path;
use nexus_chat::utils::time::format_rfc3339;
use nexus_chat::{FileSessionStore, WebhookClient};

const LOG_ENV: &str = "NEXUS_CHAT_LOG";

/// Main entry point for the nexus-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let (args, _) = ChatArgs::from_command_line_relaxed("nexus-chat [OPTIONS]");
    let config = ChatConfig::resolve(args)?;

    let client = WebhookClient::with_options(config.webhook_url()?, Some(config.request_timeout))?;
    let state_path = match &config.state_file {
        Some(path) => path.clone(),
        None => default_state_path()?,
    };
    let store = FileSessionStore::new(state_path);
    let session = ChatSession::new(Arc::new(client), Arc::new(store), &config);
    let mut renderer = PlainTextRenderer::with_color(config.use_color);
    let mut rl = DefaultEditor::new()?;

    // Ctrl+C while a reply is outstanding cancels it.
    let handle = session.clone();
    ctrlc::set_handler(move || {
        handle.cancel();
    })?;

    println!("NovaNexus Chat");
    match session.ensure_session() {
        Ok(session_id) => println!("Session: {session_id}"),
        Err(err) => renderer.print_error(&format!("Could not load session: {err}")),
    }
    println!("Type /help for commands, /quit to exit\n");

    loop {
        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let input = classify_input(&line);
                if input == ChatInput::Blank {
                    continue;
                }

                let _ = rl.add_history_entry(line.trim());

                let text = match input {
                    ChatInput::Blank => continue,
                    ChatInput::Message(text) => text,
                    ChatInput::Command(cmd) => {
                        match cmd {
                            ChatCommand::Quit => {
                                println!("Goodbye!");
                                break;
                            }
                            ChatCommand::Help => {
                                for line in help_text().lines() {
                                    println!("    {}", line);
                                }
                            }
                            ChatCommand::History => {
                                let transcript = session.render();
                                if transcript.is_empty() {
                                    renderer.print_info("No messages yet.");
                                } else {
                                    renderer.print_transcript(&transcript);
                                }
                            }
                            ChatCommand::Session => match session.session_id() {
                                Some(session_id) => {
                                    renderer.print_info(&format!("Session: {session_id}"))
                                }
                                None => renderer.print_info("Session: (not established)"),
                            },
                            ChatCommand::New => match session.reset() {
                                Ok(session_id) => renderer
                                    .print_info(&format!("Started a new session: {session_id}")),
                                Err(err) => renderer
                                    .print_error(&format!("Failed to start a new session: {err}")),
                            },
                            ChatCommand::Tags(tags) => {
                                renderer.print_info(&format!("Tags set to: {}", tags.join(", ")));
                                session.set_selected_tags(tags);
                            }
                            ChatCommand::ClearTags => {
                                session.set_selected_tags(Vec::new());
                                renderer.print_info("Tags cleared.");
                            }
                            ChatCommand::ShowTags => {
                                renderer.print_info(&format!(
                                    "Tags: {}",
                                    describe_tags(&session.selected_tags())
                                ));
                            }
                            ChatCommand::SaveTranscript(path) => {
                                match session.save_transcript_to(&path) {
                                    Ok(_) => {
                                        renderer.print_info(&format!("Transcript saved to {path}"))
                                    }
                                    Err(err) => renderer
                                        .print_error(&format!("Failed to save transcript: {err}")),
                                }
                            }
                            ChatCommand::Stats => {
                                print_stats(&session);
                            }
                            ChatCommand::ShowConfig => {
                                print_config(&config, &session);
                            }
                            ChatCommand::Invalid(message) => {
                                renderer.print_error(&message);
                            }
                        }
                        continue;
                    }
                };

                renderer.print_pending();
                match session.send(text).await {
                    SubmitOutcome::Answered { reply } | SubmitOutcome::Failed { reply, .. } => {
                        renderer.print_message(&reply);
                    }
                    SubmitOutcome::Cancelled { reply } => {
                        renderer.print_interrupted();
                        renderer.print_message(&reply);
                    }
                    SubmitOutcome::Ignored(IgnoreReason::Busy) => {
                        renderer.print_error("Still waiting for the previous reply.");
                    }
                    SubmitOutcome::Ignored(IgnoreReason::EmptyInput)
                    | SubmitOutcome::Discarded => {
                        renderer.clear_pending();
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_stats(session: &ChatSession) {
    let stats = session.stats();
    println!("    Session Statistics:");
    match &stats.session_id {
        Some(session_id) => println!("      Session: {session_id}"),
        None => println!("      Session: (not established)"),
    }
    println!("      Messages: {}", stats.message_count);
    println!(
        "      Requests: {} ({} failed, {} cancelled, {} discarded)",
        stats.total_requests,
        stats.failed_requests,
        stats.cancelled_requests,
        stats.discarded_responses
    );
    println!("      Tags: {}", describe_tags(&stats.selected_tags));
    match format_rfc3339(&stats.started_at) {
        Ok(started) => println!("      Started: {started}"),
        Err(_) => println!("      Started: {}", stats.started_at),
    }
}

fn print_config(config: &ChatConfig, session: &ChatSession) {
    println!("    Current Configuration:");
    println!(
        "      Webhook: {}",
        config.webhook_url.as_deref().unwrap_or("(unset)")
    );
    println!("      Timeout: {}s", session.request_timeout().as_secs_f64());
    match &config.state_file {
        Some(path) => println!("      State file: {}", path.display()),
        None => match default_state_path() {
            Ok(path) => println!("      State file: {}", path.display()),
            Err(_) => println!("      State file: (unavailable)"),
        },
    }
    println!("      Tags: {}", describe_tags(&session.selected_tags()));
    println!(
        "      Color: {}",
        if config.use_color {
            "enabled"
        } else {
            "disabled"
        }
    );
}

fn describe_tags(tags: &[String]) -> String {
    if tags.is_empty() {
        "(none)".to_string()
    } else {
        tags.join(", ")
    }
}
