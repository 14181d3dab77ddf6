#![cfg_attr(doc, doc = include_str!("../README.md"))]

pub mod channel;
pub mod error;
pub(crate) mod serde_helpers;
pub mod stream;
pub mod types;

use crate::error::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Name of the table chat messages are inserted into. Channel topics and
/// insert filters are derived from it.
pub const CHAT_MESSAGES_TABLE: &str = "chat_messages";
