//! Reconnection walkthrough against a scripted in-process backend.
//!
//! The backend hands out channels that misbehave on a schedule: the first
//! channel errors out after two rows, so the manager's automatic recovery
//! kicks in, and a manual reconnect later in the run shows the user-driven
//! path. Watch the state transitions, notices, and heartbeats in the logs.
//!
//! Run with tracing enabled:
//! ```sh
//! RUST_LOG=debug cargo run --example reconnecting_stream --features tracing
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt as _;
use serde_json::json;
use talkbase_realtime_sdk::channel::{
    BroadcastMessage, Channel, ChannelSignal, ChannelStatus, ChannelTransport, Config,
};
use talkbase_realtime_sdk::stream::StreamManager;
use talkbase_realtime_sdk::types::{ChannelTopic, InsertFilter, SessionId, Utc};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tracing::{debug, info};

const DEMO_SESSION: &str = "0b9c3c1e-8f43-4f89-9d3e-2f1a7d9f0c55";

/// Backend double that scripts one failure into the first channel.
#[derive(Default)]
struct ScriptedBackend {
    generation: AtomicU64,
}

impl ChannelTransport for ScriptedBackend {
    type Channel = ScriptedChannel;

    fn open(
        &self,
        topic: &ChannelTopic,
        _filter: &InsertFilter,
    ) -> talkbase_realtime_sdk::Result<(Self::Channel, mpsc::UnboundedReceiver<ChannelSignal>)>
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        info!(%topic, generation, "backend opened a channel");

        tokio::spawn(drive_channel(generation, signal_tx));

        Ok((ScriptedChannel { generation }, signal_rx))
    }
}

struct ScriptedChannel {
    generation: u64,
}

#[async_trait]
impl Channel for ScriptedChannel {
    async fn send(&self, message: &BroadcastMessage) -> talkbase_realtime_sdk::Result<()> {
        debug!(
            generation = self.generation,
            event = %message.event,
            "backend received a broadcast"
        );
        Ok(())
    }

    async fn close(&mut self) {
        info!(generation = self.generation, "backend closed the channel");
    }
}

/// Acknowledge the subscription, then emit rows until superseded.
async fn drive_channel(generation: u64, signals: mpsc::UnboundedSender<ChannelSignal>) {
    sleep(Duration::from_millis(200)).await;
    if signals
        .send(ChannelSignal::Status(ChannelStatus::Subscribed))
        .is_err()
    {
        return;
    }

    let mut id = generation * 100;
    loop {
        sleep(Duration::from_millis(400)).await;
        id += 1;

        // Every row ending in 3 carries a role outside the allow-list, so
        // the manager drops it with a warning
        let role = if id % 10 == 3 {
            "system"
        } else if id % 2 == 0 {
            "user"
        } else {
            "assistant"
        };
        let record = json!({
            "id": id,
            "session_id": DEMO_SESSION,
            "role": role,
            "content": format!("message {id} from generation {generation}"),
            "created_at": Utc::now(),
        });
        if signals.send(ChannelSignal::Insert { record }).is_err() {
            break;
        }

        // The first channel dies young to show automatic recovery
        if generation == 1 && id == generation * 100 + 2 {
            drop(signals.send(ChannelSignal::Status(ChannelStatus::ChannelError)));
            break;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut config = Config::default();
    config.heartbeat_interval = Duration::from_secs(2);

    let manager = StreamManager::new(ScriptedBackend::default(), config);

    // Log state transitions in the background
    let mut state_rx = manager.state_receiver();
    tokio::spawn(async move {
        while state_rx.changed().await.is_ok() {
            let state = *state_rx.borrow_and_update();
            info!(?state, "connection state changed");
        }
    });

    // Surface notices the way an embedding UI would
    let notices = manager.notices();
    tokio::spawn(async move {
        let mut notices = Box::pin(notices);
        while let Some(notice) = notices.next().await {
            info!(severity = %notice.severity(), "{notice}");
        }
    });

    let mut messages = Box::pin(manager.messages());
    manager.setup(SessionId::new(DEMO_SESSION)?)?;

    // The first channel errors out after two rows; the manager recovers on
    // its own and the stream keeps flowing
    let mut received = 0;
    while let Ok(Some(result)) = timeout(Duration::from_secs(5), messages.next()).await {
        match result {
            Ok(message) => {
                info!(id = %message.id, role = %message.role, content = %message.content);
                received += 1;
                if received >= 6 {
                    break;
                }
            }
            Err(e) => debug!(error = %e),
        }
    }

    // Manual reconnect tears the channel down and rebuilds it immediately
    info!("requesting a manual reconnect");
    manager.reconnect()?;

    let mut after_reconnect = 0;
    while let Ok(Some(result)) = timeout(Duration::from_secs(5), messages.next()).await {
        match result {
            Ok(message) => {
                info!(id = %message.id, role = %message.role, "after manual reconnect");
                after_reconnect += 1;
                if after_reconnect >= 2 {
                    break;
                }
            }
            Err(e) => debug!(error = %e),
        }
    }

    manager.shutdown().await;
    info!(received, after_reconnect, "demo finished");

    Ok(())
}
