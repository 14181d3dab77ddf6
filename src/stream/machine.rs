//! Connection state machine for a chat message stream.
//!
//! The machine is pure: it consumes [`Input`]s and emits [`Effect`]s, while
//! the driver task in [`super::manager`] owns the channel handle and timers
//! and executes the effects. Keeping the transition logic free of I/O makes
//! the retry accounting directly testable.

use std::time::{Duration, Instant};

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff as _;

use crate::channel::ReconnectConfig;
use crate::stream::notice::Notice;

/// Connection state tracking.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No subscription has been set up
    Disconnected,
    /// Attempting the initial subscription
    Connecting,
    /// Successfully subscribed
    Connected {
        /// When the subscription was established
        since: Instant,
    },
    /// Reconnecting after failure
    Reconnecting {
        /// Current reconnection attempt number
        attempt: u32,
    },
    /// Automatic reconnection gave up after exhausting all attempts
    Abandoned,
}

impl ConnectionState {
    /// Check if the subscription is currently active.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}

/// Internal lifecycle phase of the managed channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Connecting,
    Subscribed,
    Closed,
    Errored,
    Abandoned,
}

/// External stimulus fed into the machine by the driver.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Input {
    /// A new subscription was requested
    Setup,
    /// A manual reconnect was requested
    Reconnect,
    /// The channel reported a successful subscription
    SubscribeOk,
    /// The channel reported it was closed
    ChannelClosed,
    /// The channel reported a transport error
    ChannelErrored,
    /// A heartbeat probe could not be sent
    HeartbeatFailed,
    /// A scheduled reconnection timer fired
    RetryElapsed,
}

/// Action the driver must carry out in response to a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Effect {
    /// Tear down the current channel (if any) and open a fresh one
    Rebuild,
    /// Tear down the current channel without replacing it
    Release,
    /// Start the periodic heartbeat, replacing any running one
    StartHeartbeat,
    /// Stop the heartbeat if one is running
    StopHeartbeat,
    /// Arm the reconnection timer, replacing any pending one
    ScheduleRetry {
        /// How long to wait before rebuilding
        delay: Duration,
    },
    /// Disarm any pending reconnection timer
    CancelRetry,
    /// Surface a user-visible notice
    Notify(Notice),
}

/// Pure transition logic plus retry bookkeeping.
///
/// The retry counter and the backoff schedule advance in lockstep: both reset
/// on a successful subscription and on manual reconnect, and both advance by
/// one per recoverable failure. The delay for the Nth scheduled reconnection
/// (0-indexed) is therefore `min(initial * multiplier^N, max)`.
#[derive(Debug)]
pub(crate) struct Machine {
    phase: Phase,
    retries: u32,
    backoff: ExponentialBackoff,
    policy: ReconnectConfig,
    connected_since: Option<Instant>,
}

impl Machine {
    pub(crate) fn new(policy: ReconnectConfig) -> Self {
        Self {
            phase: Phase::Idle,
            retries: 0,
            backoff: policy.clone().into(),
            policy,
            connected_since: None,
        }
    }

    /// Advance the machine and return the effects the driver must execute,
    /// in order.
    pub(crate) fn handle(&mut self, input: Input) -> Vec<Effect> {
        // The terminal phase ignores everything except an external revival,
        // so the terminal notice fires at most once per abandonment.
        if self.phase == Phase::Abandoned && !matches!(input, Input::Setup | Input::Reconnect) {
            return Vec::new();
        }

        match input {
            Input::Setup => {
                self.phase = Phase::Connecting;
                self.connected_since = None;
                vec![Effect::CancelRetry, Effect::StopHeartbeat, Effect::Rebuild]
            }
            Input::Reconnect => {
                self.retries = 0;
                self.backoff.reset();
                self.phase = Phase::Connecting;
                self.connected_since = None;
                vec![
                    Effect::CancelRetry,
                    Effect::StopHeartbeat,
                    Effect::Notify(Notice::Reconnecting),
                    Effect::Rebuild,
                ]
            }
            Input::SubscribeOk => {
                self.retries = 0;
                self.backoff.reset();
                self.phase = Phase::Subscribed;
                self.connected_since = Some(Instant::now());
                vec![Effect::StartHeartbeat]
            }
            Input::ChannelClosed | Input::HeartbeatFailed => self.fail(Phase::Closed, None),
            Input::ChannelErrored => self.fail(Phase::Errored, Some(Notice::ConnectionError)),
            Input::RetryElapsed => {
                self.phase = Phase::Connecting;
                vec![Effect::Rebuild]
            }
        }
    }

    /// Record a recoverable failure: release the channel, then either
    /// schedule the next reconnection or abandon.
    fn fail(&mut self, phase: Phase, notice: Option<Notice>) -> Vec<Effect> {
        let mut effects = vec![Effect::StopHeartbeat, Effect::Release];
        if let Some(notice) = notice {
            effects.push(Effect::Notify(notice));
        }

        self.connected_since = None;
        self.retries = self.retries.saturating_add(1);

        if let Some(max) = self.policy.max_attempts
            && self.retries >= max
        {
            self.phase = Phase::Abandoned;
            effects.push(Effect::CancelRetry);
            effects.push(Effect::Notify(Notice::RetriesExhausted));
            return effects;
        }

        self.phase = phase;
        let delay = self
            .backoff
            .next_backoff()
            .unwrap_or(self.policy.max_backoff);
        effects.push(Effect::ScheduleRetry { delay });
        effects
    }

    /// Project the internal phase onto the observable connection state.
    pub(crate) fn state(&self) -> ConnectionState {
        match self.phase {
            Phase::Idle => ConnectionState::Disconnected,
            Phase::Connecting if self.retries == 0 => ConnectionState::Connecting,
            Phase::Connecting | Phase::Closed | Phase::Errored => ConnectionState::Reconnecting {
                attempt: self.retries,
            },
            Phase::Subscribed => ConnectionState::Connected {
                since: self.connected_since.unwrap_or_else(Instant::now),
            },
            Phase::Abandoned => ConnectionState::Abandoned,
        }
    }

    /// Current reconnection attempt number.
    pub(crate) const fn retries(&self) -> u32 {
        self.retries
    }
}
