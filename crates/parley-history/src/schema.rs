//! Transcript file format

use parley_core::{ChatMessage, Role};
use serde::{Deserialize, Serialize};

/// One entry of the transcript file.
///
/// Serialized as `{"type": "human", "data": {"content": "..."}}`. Extra fields
/// written by other tools are ignored on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Role of the turn author
    #[serde(rename = "type")]
    pub kind: Role,

    /// Turn payload
    pub data: StoredMessageData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessageData {
    /// Message text
    pub content: String,
}

impl From<&ChatMessage> for StoredMessage {
    fn from(message: &ChatMessage) -> Self {
        Self {
            kind: message.role,
            data: StoredMessageData {
                content: message.content.clone(),
            },
        }
    }
}

impl From<StoredMessage> for ChatMessage {
    fn from(stored: StoredMessage) -> Self {
        ChatMessage::new(stored.kind, stored.data.content)
    }
}
