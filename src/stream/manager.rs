#![expect(
    clippy::module_name_repetitions,
    reason = "Manager types expose their domain in the name for clarity"
)]

use std::future;
use std::pin::Pin;

use async_stream::{stream, try_stream};
use futures::Stream;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{Instant, Interval, Sleep, interval_at, sleep};
use tokio_util::sync::CancellationToken;

use super::machine::{ConnectionState, Effect, Input, Machine};
use super::notice::Notice;
use super::types::request::Heartbeat;
use super::types::response::ChatMessage;
use crate::channel::{Channel, ChannelError, ChannelSignal, ChannelStatus, ChannelTransport, Config};
use crate::types::{ChannelTopic, InsertFilter, SessionId};

/// Broadcast channel capacity for incoming chat messages.
const BROADCAST_CAPACITY: usize = 1024;

/// Broadcast channel capacity for user-facing notices.
const NOTICE_CAPACITY: usize = 32;

/// Commands accepted by the driver task.
#[derive(Debug)]
enum Command {
    /// Bind to a session and build a fresh subscription
    Setup(SessionId),
    /// Tear down and rebuild the current subscription
    Reconnect,
}

/// Manages the realtime subscription to a chat session.
///
/// The manager owns at most one live channel at a time and handles all
/// connection concerns on behalf of the embedding UI:
/// - Subscribing to inserts for a session's messages
/// - Automatic reconnection with exponential backoff
/// - Liveness probing via periodic heartbeats
/// - Broadcasting decoded messages to multiple subscribers
///
/// Transport failures never surface as errors from this type. Callers observe
/// [`ConnectionState`] and the [`Notice`] stream instead.
///
/// # Example
///
/// ```ignore
/// let manager = StreamManager::new(transport, Config::default());
/// manager.setup(SessionId::new("0b9c3c1e-8f43-4f89-9d3e-2f1a7d9f0c55")?)?;
///
/// let mut messages = pin!(manager.messages());
/// while let Some(message) = messages.next().await {
///     println!("Received: {:?}", message?);
/// }
/// ```
pub struct StreamManager {
    /// Command channel into the driver task
    command_tx: mpsc::UnboundedSender<Command>,
    /// Watch channel receiver for state changes (for use in checking the current state)
    state_rx: watch::Receiver<ConnectionState>,
    /// Broadcast sender for decoded chat messages
    message_tx: broadcast::Sender<ChatMessage>,
    /// Broadcast sender for user-facing notices
    notice_tx: broadcast::Sender<Notice>,
    /// Stops the driver task when the manager goes away
    guard: DriverGuard,
}

impl StreamManager {
    /// Create a new manager and start its driver task.
    ///
    /// The driver runs in a background task until the manager is dropped or
    /// [`shutdown`](Self::shutdown) is called. No channel is opened until
    /// [`setup`](Self::setup).
    pub fn new<T: ChannelTransport>(transport: T, config: Config) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (message_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let (notice_tx, _) = broadcast::channel(NOTICE_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let token = CancellationToken::new();
        let (done_tx, done_rx) = oneshot::channel();

        let driver = Driver {
            machine: Machine::new(config.reconnect.clone()),
            transport,
            config,
            session: None,
            link: None,
            generation: 0,
            heartbeat: None,
            retry: None,
            command_rx,
            state_tx,
            message_tx: message_tx.clone(),
            notice_tx: notice_tx.clone(),
            cancel: token.clone(),
        };

        tokio::spawn(async move {
            driver.run().await;
            done_tx.send(())
        });

        Self {
            command_tx,
            state_rx,
            message_tx,
            notice_tx,
            guard: DriverGuard {
                token,
                done: Some(done_rx),
            },
        }
    }

    /// Establish a new subscription bound to `session`.
    ///
    /// Any existing subscription is torn down first, together with its
    /// heartbeat and any pending reconnection timer.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Driver`] if the driver task is no longer
    /// running.
    pub fn setup(&self, session: SessionId) -> crate::Result<()> {
        self.command_tx
            .send(Command::Setup(session))
            .map_err(|_e| ChannelError::Driver)?;
        Ok(())
    }

    /// Manually tear down and rebuild the current subscription.
    ///
    /// Resets the retry counter, surfaces a [`Notice::Reconnecting`], and
    /// revives a subscription that exhausted its automatic attempts. Without
    /// a prior [`setup`](Self::setup) this is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Driver`] if the driver task is no longer
    /// running.
    pub fn reconnect(&self) -> crate::Result<()> {
        self.command_tx
            .send(Command::Reconnect)
            .map_err(|_e| ChannelError::Driver)?;
        Ok(())
    }

    /// Get the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Whether the subscription is currently active.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Subscribe to connection state changes.
    ///
    /// Returns a receiver that notifies when the connection state changes.
    /// This is useful for reflecting connectivity in a UI.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Subscribe to decoded chat messages.
    ///
    /// Each call returns a new independent stream. A subscriber that falls
    /// behind by more than the broadcast capacity receives
    /// [`ChannelError::Lagged`] as the final item; subscribing again resumes
    /// from live data. The stream ends silently when the manager is gone.
    #[must_use]
    pub fn messages(&self) -> impl Stream<Item = crate::Result<ChatMessage>> + use<> {
        let mut rx = self.message_tx.subscribe();

        try_stream! {
            loop {
                match rx.recv().await {
                    Ok(message) => yield message,
                    Err(RecvError::Lagged(count)) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!("chat message stream lagged, missed {count} messages");
                        Err(ChannelError::Lagged { count })?;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    /// Subscribe to user-facing notices.
    ///
    /// Notices are presentation hints; a subscriber that lags skips the
    /// missed ones rather than failing.
    #[must_use]
    pub fn notices(&self) -> impl Stream<Item = Notice> + use<> {
        let mut rx = self.notice_tx.subscribe();

        stream! {
            loop {
                match rx.recv().await {
                    Ok(notice) => yield notice,
                    Err(RecvError::Lagged(count)) => {
                        #[cfg(feature = "tracing")]
                        tracing::debug!("notice stream lagged, skipped {count} notices");
                        #[cfg(not(feature = "tracing"))]
                        let _ = count;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    /// Stop the driver task and wait for its channel to be released.
    pub async fn shutdown(mut self) {
        self.guard.cancel_and_wait().await;
    }
}

/// A specific wrapper type to invoke the inner [`CancellationToken`] to:
///  1. Avoid manually implementing [`Drop`] for [`StreamManager`] which causes issues with moving
///     values out of such a type <https://doc.rust-lang.org/error_codes/E0509.html>
///  2. Keep a [`oneshot::Receiver`] so shutdown can wait for the driver to finish releasing the
///     channel before returning.
///
/// This way, the driver is expressly cancelled when the manager is dropped,
/// even without an explicit shutdown call.
#[derive(Debug)]
struct DriverGuard {
    token: CancellationToken,
    done: Option<oneshot::Receiver<()>>,
}

impl DriverGuard {
    /// Cancel the driver and wait until it has torn everything down.
    async fn cancel_and_wait(&mut self) {
        self.token.cancel();
        if let Some(done) = self.done.take() {
            _ = done.await;
        }
    }
}

impl Drop for DriverGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// A live channel together with its signal feed.
///
/// Dropping the receiver half severs the channel's callbacks, so signals
/// from a superseded channel can never reach the driver.
struct Link<C> {
    channel: C,
    signal_rx: mpsc::UnboundedReceiver<ChannelSignal>,
    generation: u64,
}

/// Background task owning the channel, the timers, and the state machine.
struct Driver<T: ChannelTransport> {
    transport: T,
    config: Config,
    machine: Machine,
    session: Option<SessionId>,
    link: Option<Link<T::Channel>>,
    /// Monotonic counter distinguishing successive channels in logs
    generation: u64,
    heartbeat: Option<Interval>,
    retry: Option<Pin<Box<Sleep>>>,
    command_rx: mpsc::UnboundedReceiver<Command>,
    state_tx: watch::Sender<ConnectionState>,
    message_tx: broadcast::Sender<ChatMessage>,
    notice_tx: broadcast::Sender<Notice>,
    cancel: CancellationToken,
}

impl<T: ChannelTransport> Driver<T> {
    /// Main event loop. Exits on cancellation or when the manager is gone,
    /// then tears down exactly once.
    async fn run(mut self) {
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,

                command = self.command_rx.recv() => {
                    match command {
                        Some(Command::Setup(session)) => {
                            self.session = Some(session);
                            self.apply(Input::Setup).await;
                        }
                        Some(Command::Reconnect) if self.session.is_some() => {
                            self.apply(Input::Reconnect).await;
                        }
                        Some(Command::Reconnect) => {
                            #[cfg(feature = "tracing")]
                            tracing::debug!("reconnect requested without a session, ignoring");
                        }
                        None => break,
                    }
                }

                signal = next_signal(&mut self.link) => {
                    match signal {
                        Some(ChannelSignal::Insert { record }) => self.deliver(record),
                        Some(ChannelSignal::Status(status)) => {
                            let input = match status {
                                ChannelStatus::Subscribed => Input::SubscribeOk,
                                ChannelStatus::Closed => Input::ChannelClosed,
                                ChannelStatus::ChannelError => Input::ChannelErrored,
                            };
                            self.apply(input).await;
                        }
                        Some(ChannelSignal::SystemError(message)) => {
                            #[cfg(feature = "tracing")]
                            tracing::warn!(%message, "channel reported a system error");
                            #[cfg(not(feature = "tracing"))]
                            let _ = message;
                            self.apply(Input::ChannelErrored).await;
                        }
                        // The backend dropped its side without a status.
                        None => self.apply(Input::ChannelClosed).await,
                    }
                }

                () = tick(&mut self.heartbeat) => {
                    self.probe().await;
                }

                () = elapsed(&mut self.retry) => {
                    self.retry = None;
                    self.apply(Input::RetryElapsed).await;
                }
            }
        }

        self.teardown().await;
    }

    /// Feed one input through the machine and execute the resulting effects.
    ///
    /// A failed rebuild is fed back in as a transport error, which can only
    /// schedule or abandon, so this always terminates.
    async fn apply(&mut self, input: Input) {
        let mut next = Some(input);

        while let Some(input) = next.take() {
            for effect in self.machine.handle(input) {
                match effect {
                    Effect::Rebuild => {
                        if let Err(error) = self.rebuild().await {
                            #[cfg(feature = "tracing")]
                            tracing::warn!(error = %error, "failed to open chat channel");
                            #[cfg(not(feature = "tracing"))]
                            let _ = &error;
                            next = Some(Input::ChannelErrored);
                        }
                    }
                    Effect::Release => self.release().await,
                    Effect::StartHeartbeat => self.start_heartbeat(),
                    Effect::StopHeartbeat => self.heartbeat = None,
                    Effect::ScheduleRetry { delay } => {
                        #[cfg(feature = "tracing")]
                        tracing::debug!(
                            attempt = self.machine.retries(),
                            ?delay,
                            "scheduling reconnection"
                        );
                        self.retry = Some(Box::pin(sleep(delay)));
                    }
                    Effect::CancelRetry => self.retry = None,
                    Effect::Notify(notice) => {
                        _ = self.notice_tx.send(notice);
                    }
                }
            }

            _ = self.state_tx.send(self.machine.state());
        }
    }

    /// Tear down the current channel (if any) and open a fresh one for the
    /// bound session.
    async fn rebuild(&mut self) -> Result<(), ChannelError> {
        // The previous channel is fully released before the new one opens,
        // so at most one channel exists at any instant.
        self.release().await;

        let Some(session) = &self.session else {
            return Err(ChannelError::Open("no session to subscribe to".to_owned()));
        };

        let topic = ChannelTopic::messages(session);
        let filter = InsertFilter::chat_messages(session);
        self.generation = self.generation.wrapping_add(1);

        #[cfg(feature = "tracing")]
        tracing::debug!(%topic, generation = self.generation, "opening chat channel");

        let (channel, signal_rx) = self
            .transport
            .open(&topic, &filter)
            .map_err(|error| ChannelError::Open(error.to_string()))?;

        self.link = Some(Link {
            channel,
            signal_rx,
            generation: self.generation,
        });

        Ok(())
    }

    /// Release the current channel, closing it in the backend.
    async fn release(&mut self) {
        if let Some(mut link) = self.link.take() {
            #[cfg(feature = "tracing")]
            tracing::debug!(generation = link.generation, "closing chat channel");
            #[cfg(not(feature = "tracing"))]
            let _ = link.generation;
            link.channel.close().await;
        }
    }

    /// Start the periodic heartbeat. The first probe fires one full interval
    /// after subscribing.
    fn start_heartbeat(&mut self) {
        let period = self.config.heartbeat_interval;
        self.heartbeat = Some(interval_at(Instant::now() + period, period));
    }

    /// Send one liveness probe over the live channel.
    ///
    /// A failed send means the channel has gone stale and is handled exactly
    /// like the backend reporting a closure.
    async fn probe(&mut self) {
        let Some(link) = &self.link else {
            // The channel went away between scheduling and firing.
            self.heartbeat = None;
            return;
        };

        let probe = Heartbeat::now();
        match link.channel.send(&probe.to_message()).await {
            Ok(()) => {
                #[cfg(feature = "tracing")]
                tracing::trace!(sent_at = %probe.sent_at, "heartbeat sent");
            }
            Err(error) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %error, "heartbeat send failed, scheduling reconnection");
                #[cfg(not(feature = "tracing"))]
                let _ = &error;
                self.apply(Input::HeartbeatFailed).await;
            }
        }
    }

    /// Decode an inserted row and broadcast it to subscribers.
    ///
    /// Rows with unrecognized roles and undecodable rows are dropped and
    /// logged, without touching the connection state.
    fn deliver(&self, record: serde_json::Value) {
        match ChatMessage::from_record(record) {
            Ok(message) if message.role.is_deliverable() => {
                _ = self.message_tx.send(message);
            }
            Ok(message) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    role = %message.role,
                    id = %message.id,
                    "dropping chat message with unrecognized role"
                );
                #[cfg(not(feature = "tracing"))]
                let _ = &message;
            }
            Err(error) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %error, "dropping undecodable chat message");
                #[cfg(not(feature = "tracing"))]
                let _ = &error;
            }
        }
    }

    /// Clear all timers and release the channel.
    async fn teardown(&mut self) {
        self.heartbeat = None;
        self.retry = None;
        self.release().await;
        _ = self.state_tx.send(ConnectionState::Disconnected);

        #[cfg(feature = "tracing")]
        tracing::debug!("chat stream driver stopped");
    }
}

/// Wait for the next signal from the live channel, or forever if there is
/// none.
async fn next_signal<C: Channel>(link: &mut Option<Link<C>>) -> Option<ChannelSignal> {
    match link {
        Some(link) => link.signal_rx.recv().await,
        None => future::pending().await,
    }
}

/// Wait for the next heartbeat tick, or forever if the heartbeat is stopped.
async fn tick(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => future::pending().await,
    }
}

/// Wait for the pending reconnection timer, or forever if none is armed.
async fn elapsed(retry: &mut Option<Pin<Box<Sleep>>>) {
    match retry {
        Some(sleep) => sleep.as_mut().await,
        None => future::pending().await,
    }
}
