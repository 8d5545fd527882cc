use serde::{Deserialize, Serialize};

use crate::types::SessionId;

/// Body of the single POST issued per chat submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The persisted session identifier.
    pub session_id: SessionId,

    /// The raw user text, exactly as typed.
    pub message: String,

    /// Optional context tags scoping the query.
    ///
    /// Serialized as `null` when no tags are selected; an empty selection is
    /// never sent as an empty array.
    #[serde(rename = "selectedProperties")]
    pub selected_properties: Option<Vec<String>>,
}

impl ChatRequest {
    /// Create a new request.  An empty tag list collapses to `None`.
    pub fn new(
        session_id: SessionId,
        message: impl Into<String>,
        selected_properties: Option<Vec<String>>,
    ) -> Self {
        Self {
            session_id,
            message: message.into(),
            selected_properties: selected_properties.filter(|tags| !tags.is_empty()),
        }
    }
}
