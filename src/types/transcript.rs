use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::Message;

/// A read-only snapshot of a chat transcript.
///
/// Snapshots are cheap to clone and can be iterated any number of times.  They
/// never observe messages appended after they were taken.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Arc<[Message]>,
}

impl Transcript {
    /// Create a snapshot from a slice of messages.
    pub fn new(messages: &[Message]) -> Self {
        Self {
            messages: Arc::from(messages),
        }
    }

    /// Number of messages in the snapshot.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if the snapshot holds no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Iterate over the messages in display order.
    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    /// The messages as a slice.
    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    /// The most recent message, if any.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
