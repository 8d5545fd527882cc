use serde::{Deserialize, Serialize};

/// One turn of a chat transcript.
///
/// A message is either user-authored or produced by the remote agent; there
/// are no other roles.  Messages are never mutated once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The literal content of the turn.
    pub text: String,

    /// True for user-authored turns, false for assistant turns.
    #[serde(rename = "isUser")]
    pub is_user: bool,
}

impl Message {
    /// Create a user-authored message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_user: true,
        }
    }

    /// Create an assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_user: false,
        }
    }

    /// Returns the role of this message.
    pub fn role(&self) -> MessageRole {
        if self.is_user {
            MessageRole::User
        } else {
            MessageRole::Assistant
        }
    }
}

/// Role of a chat turn.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User role.
    User,

    /// Assistant role.
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}
