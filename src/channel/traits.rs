//! Core traits for pluggable realtime channel backends.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::Display;
use tokio::sync::mpsc;

use crate::types::{ChannelTopic, InsertFilter};

/// Subscription status reported by the backend for an open channel.
///
/// The wire values match the status strings realtime backends emit during the
/// subscribe handshake and afterwards, so implementations can forward them
/// without translation.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelStatus {
    /// The subscribe handshake completed and events will flow.
    Subscribed,
    /// The channel was closed by the backend or the network.
    Closed,
    /// The backend reported an error on the channel.
    ChannelError,
}

/// Event delivered by a channel implementation to the stream driver.
///
/// Implementations push signals into the receiver half returned by
/// [`ChannelTransport::open`]. Dropping the sender is treated the same as a
/// [`ChannelStatus::Closed`] status.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq)]
pub enum ChannelSignal {
    /// A row was inserted into the table the channel watches.
    Insert {
        /// The inserted row as raw JSON.
        record: Value,
    },
    /// The subscription status changed.
    Status(ChannelStatus),
    /// The backend reported an error outside the status lifecycle.
    SystemError(String),
}

/// A broadcast payload sent from the client over an open channel.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastMessage {
    /// Event name, e.g. `heartbeat`.
    pub event: String,
    /// Arbitrary JSON payload.
    pub payload: Value,
}

impl BroadcastMessage {
    #[must_use]
    pub fn new<S: Into<String>>(event: S, payload: Value) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }
}

/// Factory for realtime channels.
///
/// This abstracts the backend that actually carries events, so the stream
/// manager can run against a production realtime service or an in-process
/// test double.
///
/// `open` must return promptly: the subscribe handshake completes
/// asynchronously and is reported through a [`ChannelStatus::Subscribed`]
/// signal on the returned receiver.
pub trait ChannelTransport: Send + Sync + 'static {
    /// The channel handle type produced by this transport.
    type Channel: Channel;

    /// Open a channel on `topic`, watching inserts matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel could not be created at all. Failures
    /// after creation are reported as signals instead.
    fn open(
        &self,
        topic: &ChannelTopic,
        filter: &InsertFilter,
    ) -> crate::Result<(Self::Channel, mpsc::UnboundedReceiver<ChannelSignal>)>;
}

/// An open realtime channel.
#[async_trait]
pub trait Channel: Send + Sync + 'static {
    /// Send a broadcast message over the channel.
    ///
    /// Used for best-effort liveness probes. A failed send indicates the
    /// channel is no longer usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the message could not be sent or the channel is
    /// already closed.
    async fn send(&self, message: &BroadcastMessage) -> crate::Result<()>;

    /// Close the channel and release backend resources.
    ///
    /// Closing an already closed channel is a no-op.
    async fn close(&mut self);
}
