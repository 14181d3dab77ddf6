#![expect(
    clippy::module_name_repetitions,
    reason = "Configuration types intentionally mirror the module name for clarity"
)]

use std::time::Duration;

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};

const DEFAULT_HEARTBEAT_INTERVAL_DURATION: Duration = Duration::from_secs(30);
const DEFAULT_INITIAL_BACKOFF_DURATION: Duration = Duration::from_secs(1);
const DEFAULT_MAX_BACKOFF_DURATION: Duration = Duration::from_secs(30);
const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Configuration for channel subscription behavior.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct Config {
    /// Interval between liveness probes broadcast over a subscribed channel
    pub heartbeat_interval: Duration,
    /// Reconnection strategy configuration
    pub reconnect: ReconnectConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL_DURATION,
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// Configuration for automatic reconnection behavior.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Maximum number of consecutive recoverable failures before the stream
    /// is abandoned. `None` means retry forever.
    pub max_attempts: Option<u32>,
    /// Delay before the first reconnection attempt
    pub initial_backoff: Duration,
    /// Maximum delay between reconnection attempts
    pub max_backoff: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: Some(DEFAULT_MAX_ATTEMPTS),
            initial_backoff: DEFAULT_INITIAL_BACKOFF_DURATION,
            max_backoff: DEFAULT_MAX_BACKOFF_DURATION,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl From<ReconnectConfig> for ExponentialBackoff {
    fn from(config: ReconnectConfig) -> Self {
        ExponentialBackoffBuilder::default()
            .with_initial_interval(config.initial_backoff)
            .with_max_interval(config.max_backoff)
            .with_multiplier(config.backoff_multiplier)
            .with_randomization_factor(0.0) // Deterministic schedule, no jitter
            .with_max_elapsed_time(None) // We handle max attempts separately
            .build()
    }
}

#[cfg(test)]
mod tests {
    use backoff::backoff::Backoff as _;

    use super::*;

    #[test]
    fn backoff_sequence_doubles_up_to_cap() {
        let config = ReconnectConfig::default();
        let mut backoff: ExponentialBackoff = config.into();

        let delays: Vec<Duration> = (0..7)
            .map(|_| backoff.next_backoff().expect("backoff never elapses"))
            .collect();

        assert_eq!(
            delays,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8),
                Duration::from_secs(16),
                Duration::from_secs(30),
                Duration::from_secs(30),
            ],
            "delay for attempt N should be min(1s * 2^N, 30s)"
        );
    }

    #[test]
    fn backoff_respects_max() {
        let config = ReconnectConfig {
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(2),
            backoff_multiplier: 3.0,
            max_attempts: None,
        };
        let mut backoff: ExponentialBackoff = config.into();

        // Exhaust several iterations
        for _ in 0..10 {
            let _next = backoff.next_backoff();
        }

        // Should still return values capped at max
        let duration = backoff.next_backoff().expect("backoff never elapses");
        assert!(
            duration <= Duration::from_secs(2),
            "delay should stay at the cap"
        );
    }

    #[test]
    fn backoff_resets_to_initial() {
        let config = ReconnectConfig::default();
        let mut backoff: ExponentialBackoff = config.into();

        for _ in 0..4 {
            let _next = backoff.next_backoff();
        }
        backoff.reset();

        assert_eq!(
            backoff.next_backoff(),
            Some(Duration::from_secs(1)),
            "reset should restart the schedule at the initial delay"
        );
    }

    #[test]
    fn default_heartbeat_is_thirty_seconds() {
        let config = Config::default();
        assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
    }

    #[test]
    fn default_retry_budget_is_five_attempts() {
        let config = ReconnectConfig::default();
        assert_eq!(config.max_attempts, Some(5));
    }
}
