use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::serde_as;
use strum_macros::Display;

use crate::serde_helpers::StringFromAny;

/// Author role attached to a chat message row.
#[non_exhaustive]
#[derive(Clone, Debug, Display, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageRole {
    /// The visitor chatting in the widget
    User,
    /// The bot
    Assistant,
    /// A human operator who joined the conversation
    Owner,
    /// Unknown role from the backend (captures the raw value for debugging).
    #[serde(untagged)]
    Unknown(String),
}

impl MessageRole {
    /// Whether messages with this role are delivered to subscribers.
    ///
    /// Rows with any other role are dropped and logged, without affecting the
    /// connection state.
    #[must_use]
    pub const fn is_deliverable(&self) -> bool {
        matches!(self, Self::User | Self::Assistant | Self::Owner)
    }
}

/// A chat message row, as inserted into the messages table.
#[serde_as]
#[non_exhaustive]
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ChatMessage {
    /// Unique identifier for this message (bigint serial or uuid)
    #[serde_as(as = "StringFromAny")]
    pub id: String,
    /// Identifier of the session this message belongs to
    pub session_id: String,
    /// Who authored the message
    pub role: MessageRole,
    /// The text content of the message
    pub content: String,
    /// When the message was created
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Decode an inserted row, logging any unrecognized fields.
    ///
    /// # Errors
    ///
    /// Returns an error if required fields are missing or have the wrong
    /// shape.
    pub fn from_record(record: Value) -> crate::Result<Self> {
        crate::serde_helpers::deserialize_with_warnings(record)
    }
}
