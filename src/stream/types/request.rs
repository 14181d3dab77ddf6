use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::channel::BroadcastMessage;

/// Liveness probe broadcast over the channel while subscribed.
///
/// The backend does not answer probes; a failed send is the signal that the
/// channel has gone stale.
#[non_exhaustive]
#[derive(Clone, Debug, Serialize)]
pub struct Heartbeat {
    /// When the probe was created
    pub sent_at: DateTime<Utc>,
}

impl Heartbeat {
    /// Create a probe stamped with the current time.
    #[must_use]
    pub fn now() -> Self {
        Self {
            sent_at: Utc::now(),
        }
    }

    /// Render the probe as a broadcast message.
    #[must_use]
    pub fn to_message(&self) -> BroadcastMessage {
        BroadcastMessage::new("heartbeat", json!({ "sent_at": self.sent_at }))
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::missing_panics_doc,
        reason = "Do not need additional syntax for setting up tests"
    )]

    use super::*;

    #[test]
    fn probe_renders_as_heartbeat_event() {
        let probe = Heartbeat::now();
        let message = probe.to_message();

        assert_eq!(message.event, "heartbeat");
        let sent_at = message
            .payload
            .get("sent_at")
            .and_then(serde_json::Value::as_str)
            .unwrap();
        assert_eq!(
            sent_at.parse::<DateTime<Utc>>().unwrap(),
            probe.sent_at,
            "payload carries the probe timestamp"
        );
    }
}
