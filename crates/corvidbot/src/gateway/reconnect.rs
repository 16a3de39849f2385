//! Reconnect budget and exponential backoff.

use std::time::Duration;

use rand::Rng;

/// Reconnect policy: exponential backoff with jitter and a bounded
/// attempt budget.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Delay before the first reconnect attempt.
    pub base_delay: Duration,
    /// Upper bound on the computed delay, before jitter.
    pub max_delay: Duration,
    /// Multiplier applied per consecutive failure.
    pub multiplier: f64,
    /// Random jitter added on top of the computed delay.
    pub jitter: Duration,
    /// Consecutive failed attempts allowed before giving up.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            jitter: Duration::from_secs(2),
            max_attempts: 5,
        }
    }
}

impl ReconnectPolicy {
    /// Deterministic delay for the given 1-based attempt, before jitter.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.saturating_sub(1) as i32);
        let delay_millis = (self.base_delay.as_millis() as f64 * factor) as u64;
        Duration::from_millis(delay_millis).min(self.max_delay)
    }

    /// Delay for the given attempt with jitter applied.
    #[must_use]
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let jitter_millis = self.jitter.as_millis() as u64;
        let jitter = if jitter_millis == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_millis))
        };

        self.delay_for_attempt(attempt) + jitter
    }

    /// Whether another attempt is allowed after `attempt` consecutive
    /// failures.
    #[must_use]
    pub const fn should_reconnect(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}
