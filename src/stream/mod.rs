//! Realtime chat message streaming.
//!
//! This module keeps a chat widget subscribed to its session's messages and
//! owns every connection concern: subscription lifecycle, exponential-backoff
//! reconnection, heartbeat liveness probing, and role filtering.
//!
//! # Architecture
//!
//! - [`StreamManager`]: Public handle; owns a driver task and at most one
//!   live channel at a time
//! - [`ConnectionState`]: Observable connection state, including the current
//!   reconnection attempt
//! - [`Notice`]: User-facing notices the embedding UI should surface
//!
//! # Example
//!
//! ```ignore
//! let manager = StreamManager::new(transport, Config::default());
//! manager.setup(SessionId::new(session_id)?)?;
//!
//! let mut messages = pin!(manager.messages());
//! while let Some(message) = messages.next().await {
//!     render(message?);
//! }
//! ```

mod machine;
pub mod manager;
pub mod notice;
pub mod types;

pub use machine::ConnectionState;
pub use manager::StreamManager;
pub use notice::{Notice, Severity};
pub use types::{ChatMessage, Heartbeat, MessageRole};
