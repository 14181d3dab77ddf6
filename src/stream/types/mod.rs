//! Wire types for the chat message stream.

pub mod request;
pub mod response;

pub use request::Heartbeat;
pub use response::{ChatMessage, MessageRole};
