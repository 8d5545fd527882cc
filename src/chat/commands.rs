//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the chat session without sending messages
//! to the webhook.

use crate::chat::config::parse_tags;

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the webhook.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Print the transcript again.
    History,

    /// Show the session identifier.
    Session,

    /// Start a new session, abandoning the current transcript.
    New,

    /// Set the context tags sent with each message.
    Tags(Vec<String>),

    /// Clear the context tags.
    ClearTags,

    /// Show the current context tags.
    ShowTags,

    /// Export the transcript to a file.
    SaveTranscript(String),

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Display session statistics.
    Stats,

    /// Show the current configuration.
    ShowConfig,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// One line read at the prompt, sorted by what the REPL should do with it.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatInput<'a> {
    /// Only whitespace; nothing to do.
    Blank,
    /// A slash command.
    Command(ChatCommand),
    /// Text for the assistant, exactly as typed.
    Message(&'a str),
}

/// Sorts a prompt line into blank input, a command, or a message.
///
/// Surrounding whitespace is ignored for the blank and command checks but
/// kept in the message text.
pub fn classify_input(line: &str) -> ChatInput<'_> {
    if line.trim().is_empty() {
        return ChatInput::Blank;
    }
    match parse_command(line) {
        Some(cmd) => ChatInput::Command(cmd),
        None => ChatInput::Message(line),
    }
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be sent as a regular message.
///
/// # Examples
///
/// ```
/// # use nexus_chat::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/tags pricing.pdf").is_some());
/// assert!(parse_command("What services do you offer?").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input[1..].splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "history" | "transcript" => ChatCommand::History,
        "session" => ChatCommand::Session,
        "new" | "reset" => ChatCommand::New,
        "tags" => match argument {
            None => ChatCommand::ShowTags,
            Some(arg) if arg.eq_ignore_ascii_case("clear") => ChatCommand::ClearTags,
            Some(arg) => {
                let tags = parse_tags(arg);
                if tags.is_empty() {
                    ChatCommand::Invalid("/tags expects a comma-separated list".to_string())
                } else {
                    ChatCommand::Tags(tags)
                }
            }
        },
        "save" => match argument {
            Some(arg) => ChatCommand::SaveTranscript(arg.to_string()),
            None => ChatCommand::Invalid("/save requires a file path".to_string()),
        },
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "stats" | "status" => ChatCommand::Stats,
        "config" => ChatCommand::ShowConfig,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /history               Show the conversation so far
  /session               Show the session identifier
  /new                   Start a new session (discards this conversation)
  /tags <a,b,...>        Scope questions to these documents
  /tags clear            Stop scoping questions
  /tags                  Show the current tags
  /save <file>           Export the transcript as JSON
  /stats                 Show session statistics
  /config                Show current configuration
  /help                  Show this help message
  /quit                  Exit the chat
Press Ctrl+C while waiting for a reply to cancel it."#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_keeps_message_whitespace() {
        assert_eq!(classify_input(""), ChatInput::Blank);
        assert_eq!(classify_input("  \t "), ChatInput::Blank);
        assert_eq!(
            classify_input("  /quit  "),
            ChatInput::Command(ChatCommand::Quit)
        );
        assert_eq!(classify_input("  hi  "), ChatInput::Message("  hi  "));
        assert_eq!(
            classify_input("    let x = 1;"),
            ChatInput::Message("    let x = 1;")
        );
    }

    #[test]
    fn parse_quit_commands() {
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/q"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("  /quit  "), Some(ChatCommand::Quit));
    }

    #[test]
    fn parse_session_commands() {
        assert_eq!(parse_command("/session"), Some(ChatCommand::Session));
        assert_eq!(parse_command("/NEW"), Some(ChatCommand::New));
        assert_eq!(parse_command("/reset"), Some(ChatCommand::New));
        assert_eq!(parse_command("/history"), Some(ChatCommand::History));
    }

    #[test]
    fn parse_tag_commands() {
        assert_eq!(
            parse_command("/tags pricing.pdf, faq.pdf"),
            Some(ChatCommand::Tags(vec![
                "pricing.pdf".to_string(),
                "faq.pdf".to_string()
            ]))
        );
        assert_eq!(parse_command("/tags clear"), Some(ChatCommand::ClearTags));
        assert_eq!(parse_command("/tags"), Some(ChatCommand::ShowTags));
        assert!(matches!(
            parse_command("/tags ,,"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("comma-separated")
        ));
    }

    #[test]
    fn parse_save() {
        assert_eq!(
            parse_command("/save chat.json"),
            Some(ChatCommand::SaveTranscript("chat.json".to_string()))
        );
        assert!(matches!(
            parse_command("/save"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("requires")
        ));
    }

    #[test]
    fn parse_stats_and_config() {
        assert_eq!(parse_command("/stats"), Some(ChatCommand::Stats));
        assert_eq!(parse_command("/config"), Some(ChatCommand::ShowConfig));
    }

    #[test]
    fn unknown_command() {
        assert_eq!(
            parse_command("/model gpt"),
            Some(ChatCommand::Invalid("Unknown command: /model".to_string()))
        );
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("Hello there!"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("  "), None);
        assert_eq!(parse_command("price / hour?"), None);
    }

    #[test]
    fn help_text_not_empty() {
        let help = help_text();
        assert!(help.contains("/quit"));
        assert!(help.contains("/new"));
        assert!(help.contains("/tags"));
    }
}
