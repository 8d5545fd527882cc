//! Chat session client and contact relay for the NovaNexus site.
//!
//! [`ChatSession`] drives a strict request/response conversation against a
//! conversational webhook, keeping the transcript in memory and the session
//! identifier in a [`SessionStore`].  The [`contact`] module submits the
//! site's contact form.

// Public modules
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod contact;
pub mod error;
pub mod markdown;
pub mod observability;
pub mod render;
pub mod session_store;
pub mod types;
pub mod utils;

// Re-exports
pub use chat::{ChatConfig, ChatSession, SubmitOutcome};
pub use client::{ChatTransport, WebhookClient};
pub use client_logger::ClientLogger;
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use session_store::{FileSessionStore, MemorySessionStore, SessionStore};
pub use types::*;
