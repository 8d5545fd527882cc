//! Chat application module for conversations with the site's assistant.
//!
//! This module provides the chat session and the pieces of the terminal
//! REPL built on it:
//!
//! - [`session`]: the transcript, the single-flight submit cycle and
//!   cancellation
//! - [`config`]: CLI argument parsing and configuration
//! - [`commands`]: slash command parsing

mod commands;
mod config;
mod session;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, ChatInput, classify_input, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, ChatConfigFile, WEBHOOK_ENV, parse_tags};
pub use session::{
    ChatSession, ERROR_TEXT, IgnoreReason, SessionState, SessionStats, SubmitOutcome,
};
