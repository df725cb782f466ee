//! Reconnection backoff.
//!
//! Exponential growth with a ceiling and no retry limit: the stream client
//! keeps trying for as long as the process lives.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Backoff settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Delay before the first reconnect attempt.
    #[serde(with = "humantime_serde", default = "default_initial_delay")]
    pub initial_delay: Duration,
    /// Upper bound on the delay.
    #[serde(with = "humantime_serde", default = "default_max_delay")]
    pub max_delay: Duration,
    /// Growth factor applied after every scheduled retry.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            multiplier: default_multiplier(),
        }
    }
}

/// Retry state: the delay the next attempt will wait and how many
/// consecutive attempts have been scheduled.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    config: RetryConfig,
    current_delay: Duration,
    attempts: u32,
}

impl ReconnectPolicy {
    /// Creates a policy at its initial delay.
    pub fn new(config: RetryConfig) -> Self {
        let current_delay = config.initial_delay;
        Self {
            config,
            current_delay,
            attempts: 0,
        }
    }

    /// Delay the next scheduled attempt will wait.
    pub fn current_delay(&self) -> Duration {
        self.current_delay
    }

    /// Number of attempts scheduled since the last successful open.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Schedules a retry: returns the delay to wait, then grows it.
    pub fn schedule(&mut self) -> Duration {
        let delay = self.current_delay;
        self.attempts = self.attempts.saturating_add(1);

        let grown = delay.as_secs_f64() * self.config.multiplier.max(1.0);
        let ceiling = self.config.max_delay.max(self.config.initial_delay);
        self.current_delay = if grown.is_finite() && grown < ceiling.as_secs_f64() {
            Duration::from_secs_f64(grown)
        } else {
            ceiling
        };
        delay
    }

    /// A connection opened: back to the initial delay.
    pub fn reset(&mut self) {
        self.current_delay = self.config.initial_delay;
        self.attempts = 0;
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_grow_to_ceiling() {
        let mut policy = ReconnectPolicy::new(RetryConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        });
        let delays: Vec<u64> = (0..6).map(|_| policy.schedule().as_secs()).collect();
        assert_eq!(delays, [1, 2, 4, 8, 10, 10]);
        assert_eq!(policy.attempts(), 6);
    }

    #[test]
    fn test_delays_never_decrease() {
        let mut policy = ReconnectPolicy::default();
        let mut last = Duration::ZERO;
        for _ in 0..100 {
            let next = policy.schedule();
            assert!(next >= last);
            last = next;
        }
        assert_eq!(last, RetryConfig::default().max_delay);
    }

    #[test]
    fn test_multiplier_below_one_does_not_shrink() {
        let mut policy = ReconnectPolicy::new(RetryConfig {
            multiplier: 0.5,
            ..Default::default()
        });
        let first = policy.schedule();
        assert!(policy.schedule() >= first);
    }

    #[test]
    fn test_reset() {
        let mut policy = ReconnectPolicy::default();
        policy.schedule();
        policy.schedule();
        policy.reset();
        assert_eq!(policy.current_delay(), RetryConfig::default().initial_delay);
        assert_eq!(policy.attempts(), 0);
    }
}
