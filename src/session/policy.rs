//! Retry policies of the session channel
//!
//! Two policies, deliberately kept apart:
//!
//! - [`ProbeBackoff`] governs acquiring the backend before the channel has
//!   ever connected. Delays grow geometrically up to a cap and give up after
//!   a fixed number of attempts.
//! - [`ReconnectPolicy`] governs re-opening a channel that was connected and
//!   dropped. The delay is fixed and there is no attempt limit.

use std::time::Duration;

use crate::config::SessionConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeBackoff {
    pub base: Duration,
    pub growth: f64,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl ProbeBackoff {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            base: Duration::from_millis(config.probe_base_delay_ms),
            growth: config.probe_growth,
            max_delay: Duration::from_millis(config.probe_max_delay_ms),
            max_attempts: config.probe_max_attempts,
        }
    }

    /// Wait after the failed attempt `attempt` (0-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = self.growth.powi(attempt as i32);
        let secs = self.base.as_secs_f64() * factor;
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        // Negative growth from a hand-edited config lands here
        Duration::try_from_secs_f64(secs).unwrap_or(self.max_delay)
    }

    /// Delay before the attempt following `failed_attempt`, or `None` once
    /// every attempt is spent
    pub fn next_delay(&self, failed_attempt: u32) -> Option<Duration> {
        if failed_attempt + 1 >= self.max_attempts {
            None
        } else {
            Some(self.delay(failed_attempt))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
}

impl ReconnectPolicy {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            delay: Duration::from_millis(config.reconnect_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backoff() -> ProbeBackoff {
        ProbeBackoff::from_config(&SessionConfig::default())
    }

    #[test]
    fn test_delays_grow_then_cap() {
        let backoff = backoff();
        let delays: Vec<_> = (0..9).map(|n| backoff.delay(n)).collect();
        assert_eq!(delays[0], Duration::from_millis(500));
        assert_eq!(delays[1], Duration::from_millis(750));
        assert_eq!(delays[2], Duration::from_millis(1125));
        assert_eq!(delays[3], Duration::from_micros(1_687_500));
        assert_eq!(delays[6], Duration::from_millis(5000));
        assert!(delays.iter().all(|d| *d <= Duration::from_millis(5000)));
        assert_eq!(backoff.delay(500), Duration::from_millis(5000));
    }

    #[test]
    fn test_ten_attempts_then_stop() {
        let backoff = backoff();
        let scheduled = (0..20).filter_map(|n| backoff.next_delay(n)).count();
        // Attempt 0 runs immediately; nine waits lead to attempts 1..=9
        assert_eq!(scheduled, 9);
        assert!(backoff.next_delay(9).is_none());
    }

    #[test]
    fn test_negative_growth_falls_back_to_cap() {
        let config = SessionConfig {
            probe_growth: -1.5,
            ..SessionConfig::default()
        };
        let backoff = ProbeBackoff::from_config(&config);
        assert_eq!(backoff.delay(0), Duration::from_millis(500));
        assert_eq!(backoff.delay(1), Duration::from_millis(5000));
        assert_eq!(backoff.delay(2), Duration::from_millis(1125));
    }

    #[test]
    fn test_reconnect_is_fixed() {
        let policy = ReconnectPolicy::from_config(&SessionConfig::default());
        assert_eq!(policy.delay, Duration::from_millis(2000));
    }
}
