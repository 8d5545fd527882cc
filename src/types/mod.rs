// Public modules
pub mod chat_request;
pub mod chat_response;
pub mod message;
pub mod session_id;
pub mod transcript;

// Re-exports
pub use chat_request::ChatRequest;
pub use chat_response::{ChatResponse, NO_RESPONSE_TEXT};
pub use message::{Message, MessageRole};
pub use session_id::SessionId;
pub use transcript::Transcript;
