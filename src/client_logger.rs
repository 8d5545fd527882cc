//! Logging trait for webhook exchanges.
//!
//! This module provides the [`ClientLogger`] trait that allows callers to
//! capture every request and response passing through a
//! [`WebhookClient`](crate::WebhookClient).

use crate::Error;
use crate::types::{ChatRequest, ChatResponse};

/// A trait for logging chat exchanges.
///
/// # Example
///
/// ```rust,ignore
/// use nexus_chat::{ChatRequest, ChatResponse, ClientLogger};
/// use std::sync::Mutex;
///
/// struct Recorder {
///     lines: Mutex<Vec<String>>,
/// }
///
/// impl ClientLogger for Recorder {
///     fn log_request(&self, request: &ChatRequest) {
///         self.lines.lock().unwrap().push(format!("> {}", request.message));
///     }
///
///     fn log_response(&self, response: &ChatResponse) {
///         self.lines.lock().unwrap().push(format!("< {}", response.reply_text()));
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Log an outbound request, called once before it is sent.
    fn log_request(&self, request: &ChatRequest);

    /// Log a successfully parsed response.
    fn log_response(&self, response: &ChatResponse);

    /// Log a failed exchange.
    fn log_failure(&self, error: &Error) {
        _ = error;
    }
}
