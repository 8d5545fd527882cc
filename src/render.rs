//! Output rendering for the chat application.
//!
//! This module provides a trait-based rendering abstraction.  The default
//! implementation writes to stdout and uses ANSI escape codes to tell the
//! visitor's lines apart from the assistant's formatted replies.

use std::io::{self, Write};

use crate::markdown::format_markdown;
use crate::types::{Message, Transcript};

/// ANSI escape code for dim text (used for the typing indicator).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for italic text (used for the typing indicator).
const ANSI_ITALIC: &str = "\x1b[3m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the visitor's lines).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for green text (used for the assistant label).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Text shown while a reply is outstanding.
pub const PENDING_TEXT: &str = "Typing...";

/// Trait for rendering chat output.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
pub trait Renderer: Send {
    /// Print one transcript entry.
    fn print_message(&mut self, message: &Message);

    /// Print every entry of a transcript in order.
    fn print_transcript(&mut self, transcript: &Transcript) {
        for message in transcript {
            self.print_message(message);
        }
    }

    /// Show the pending indicator while a reply is outstanding.
    fn print_pending(&mut self);

    /// Remove the pending indicator.
    fn clear_pending(&mut self);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Called when the user interrupts a pending request.
    fn print_interrupted(&mut self) {}
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    out: Box<dyn Write + Send>,
    use_color: bool,
    pending: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self::with_writer(Box::new(io::stdout()), use_color)
    }

    /// Creates a renderer that writes to `out`.
    pub fn with_writer(out: Box<dyn Write + Send>, use_color: bool) -> Self {
        Self {
            out,
            use_color,
            pending: false,
        }
    }

    fn flush(&mut self) {
        let _ = self.out.flush();
    }

    fn write_line(&mut self, line: &str) {
        let _ = writeln!(self.out, "{line}");
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_message(&mut self, message: &Message) {
        self.clear_pending();
        if message.is_user {
            if self.use_color {
                self.write_line(&format!("{ANSI_CYAN}> {}{ANSI_RESET}", message.text));
            } else {
                self.write_line(&format!("> {}", message.text));
            }
        } else {
            let body = format_markdown(&message.text, self.use_color);
            if self.use_color {
                self.write_line(&format!("{ANSI_GREEN}Assistant:{ANSI_RESET}"));
            } else {
                self.write_line("Assistant:");
            }
            self.write_line(&body);
            self.write_line("");
        }
        self.flush();
    }

    fn print_pending(&mut self) {
        if self.pending {
            return;
        }
        self.pending = true;
        if self.use_color {
            let _ = write!(self.out, "{ANSI_DIM}{ANSI_ITALIC}{PENDING_TEXT}{ANSI_RESET}");
        } else {
            let _ = write!(self.out, "{PENDING_TEXT}");
        }
        self.flush();
    }

    fn clear_pending(&mut self) {
        if !self.pending {
            return;
        }
        self.pending = false;
        if self.use_color {
            // Return to column 0 and erase the indicator line.
            let _ = write!(self.out, "\r\x1b[2K");
        } else {
            let _ = writeln!(self.out);
        }
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        self.clear_pending();
        if self.use_color {
            eprintln!("{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            eprintln!("Error: {error}");
        }
    }

    fn print_info(&mut self, info: &str) {
        self.clear_pending();
        self.write_line(info);
        self.flush();
    }

    fn print_interrupted(&mut self) {
        self.clear_pending();
        if self.use_color {
            self.write_line(&format!("{ANSI_DIM}[cancelled]{ANSI_RESET}"));
        } else {
            self.write_line("[cancelled]");
        }
        self.flush();
    }
}
