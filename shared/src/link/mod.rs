//! Hub ↔ relay link lifecycle
//!
//! Both sides track their own view of the single link. The hub reconnects
//! with [`ReconnectPolicy`]; the relay pings the hub on a [`HeartbeatConfig`]
//! cadence. Liveness is decided by the transport's close/error events only.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default delay unit for linear backoff
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(5);
/// Default burst size before the long cooldown
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
/// Default long-interval wait after a full burst
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);
/// Default relay → hub ping cadence
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl LinkState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

/// What to do after a failed or closed connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Reconnect after `delay` (`base_delay * attempt`)
    Retry { attempt: u32, delay: Duration },
    /// Burst exhausted: wait, call [`ReconnectPolicy::reset`], reconnect
    Cooldown(Duration),
}

impl Backoff {
    pub fn delay(&self) -> Duration {
        match self {
            Self::Retry { delay, .. } => *delay,
            Self::Cooldown(delay) => *delay,
        }
    }
}

/// Linear reconnect backoff with a bounded burst and a long cooldown.
///
/// attempts 1..=max wait `base_delay * attempt`; the next failure yields
/// [`Backoff::Cooldown`] and the counter stays at `max` until the caller
/// resets it after the wait.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    attempts: u32,
    max_attempts: u32,
    base_delay: Duration,
    cooldown: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_COOLDOWN)
    }
}

impl ReconnectPolicy {
    pub fn new(base_delay: Duration, max_attempts: u32, cooldown: Duration) -> Self {
        Self {
            attempts: 0,
            max_attempts,
            base_delay,
            cooldown,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Successful connect, or end of a cooldown
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn next_backoff(&mut self) -> Backoff {
        if self.attempts >= self.max_attempts {
            return Backoff::Cooldown(self.cooldown);
        }
        self.attempts += 1;
        Backoff::Retry {
            attempt: self.attempts,
            delay: self.base_delay * self.attempts,
        }
    }
}

/// Relay → hub ping cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    pub interval: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }
}

impl HeartbeatConfig {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_backoff_then_cooldown() {
        let mut policy = ReconnectPolicy::default();
        for n in 1..=10u32 {
            assert_eq!(
                policy.next_backoff(),
                Backoff::Retry {
                    attempt: n,
                    delay: Duration::from_secs(5) * n
                }
            );
        }
        assert_eq!(policy.next_backoff(), Backoff::Cooldown(Duration::from_secs(60)));
        // stays in cooldown until reset
        assert_eq!(policy.attempts(), 10);
        assert_eq!(policy.next_backoff(), Backoff::Cooldown(Duration::from_secs(60)));

        policy.reset();
        assert_eq!(
            policy.next_backoff(),
            Backoff::Retry {
                attempt: 1,
                delay: Duration::from_secs(5)
            }
        );
    }

    #[test]
    fn test_backoff_non_decreasing_within_burst() {
        let mut policy = ReconnectPolicy::new(Duration::from_millis(100), 5, Duration::from_secs(1));
        let mut last = Duration::ZERO;
        for _ in 0..5 {
            let delay = policy.next_backoff().delay();
            assert!(delay >= last);
            last = delay;
        }
    }

    #[test]
    fn test_reset_on_connect_mid_burst() {
        let mut policy = ReconnectPolicy::default();
        policy.next_backoff();
        policy.next_backoff();
        assert_eq!(policy.attempts(), 2);
        policy.reset();
        assert_eq!(policy.attempts(), 0);
    }

    #[test]
    fn test_zero_max_attempts_always_cools_down() {
        let mut policy = ReconnectPolicy::new(Duration::from_secs(1), 0, Duration::from_secs(7));
        assert_eq!(policy.next_backoff(), Backoff::Cooldown(Duration::from_secs(7)));
    }

    #[test]
    fn test_link_state_serialize() {
        assert_eq!(
            serde_json::to_string(&LinkState::Connected).unwrap(),
            "\"connected\""
        );
        assert_eq!(LinkState::Connecting.to_string(), "connecting");
        assert!(!LinkState::default().is_connected());
    }
}
