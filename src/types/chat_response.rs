use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Text shown when the remote answers without a usable `output` field.
pub const NO_RESPONSE_TEXT: &str = "No response from server";

/// JSON body returned by the conversational webhook.
///
/// Only `output` is interpreted; any other fields are ignored.  A body that
/// is valid JSON but not an object (an array, a string, a bare number)
/// carries no `output` and yields [`NO_RESPONSE_TEXT`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChatResponse {
    /// The assistant's reply text.
    pub output: Option<String>,
}

impl ChatResponse {
    /// Create a response carrying the given output.
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: Some(output.into()),
        }
    }

    /// Create a response with no output field.
    pub fn empty() -> Self {
        Self { output: None }
    }

    /// The text to append to the transcript for this response.
    pub fn reply_text(&self) -> &str {
        match self.output.as_deref() {
            Some(text) if !text.is_empty() => text,
            _ => NO_RESPONSE_TEXT,
        }
    }
}

impl<'de> Deserialize<'de> for ChatResponse {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let output = match Value::deserialize(deserializer)? {
            Value::Object(mut fields) => fields.remove("output").and_then(lenient_output),
            _ => None,
        };
        Ok(Self { output })
    }
}

// A falsy `output` (null, false, 0, "") means "no response"; non-string
// truthy values are shown in their JSON form.
fn lenient_output(value: Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) => Some(s),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}
