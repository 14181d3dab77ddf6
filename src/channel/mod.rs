//! Realtime channel infrastructure.
//!
//! This module provides the pluggable channel layer the stream manager runs
//! on: a transport opens topic-scoped channels, and each channel reports
//! inserts and status changes as signals.
//!
//! # Architecture
//!
//! - [`ChannelTransport`]: Factory for channels, implemented per backend
//! - [`Channel`]: An open channel that can carry broadcast messages
//! - [`Config`]: Heartbeat and reconnection tuning shared by all streams
//!
//! # Example
//!
//! ```ignore
//! // Implement the transport for your backend
//! struct Realtime { /* ... */ }
//!
//! impl ChannelTransport for Realtime {
//!     type Channel = RealtimeChannel;
//!     fn open(&self, topic: &ChannelTopic, filter: &InsertFilter)
//!         -> Result<(Self::Channel, UnboundedReceiver<ChannelSignal>)> { /* ... */ }
//! }
//!
//! let manager = StreamManager::new(Realtime::connect()?, Config::default());
//! ```

pub mod config;
pub mod error;
pub mod traits;

pub use config::{Config, ReconnectConfig};
#[expect(
    clippy::module_name_repetitions,
    reason = "ChannelError includes module name for clarity when used outside this module"
)]
pub use error::ChannelError;
pub use traits::*;
