//! Bounded retry with exponential backoff, used to poll the node until it
//! answers status queries.

use std::time::Duration;

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
    /// Whether to add up to 25% jitter to delays.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy.
    pub fn new(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay,
            ..Default::default()
        }
    }

    /// Disable jitter, making delays deterministic.
    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_delay_ms = self.initial_delay.as_millis() as f64;
        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let delay_ms = base_delay_ms * self.multiplier.powi(exponent);
        let capped_delay =
            Duration::from_millis(delay_ms.min(self.max_delay.as_millis() as f64) as u64);

        if self.jitter {
            let jitter_factor = 1.0 + (rand::random::<f64>() * 0.25);
            Duration::from_millis((capped_delay.as_millis() as f64 * jitter_factor) as u64)
        } else {
            capped_delay
        }
    }

    /// Whether another attempt is allowed after `attempt` attempts.
    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Sum of all backoff delays, without jitter.
    pub fn total_backoff(&self) -> Duration {
        let deterministic = self.clone().without_jitter();
        (1..self.max_attempts)
            .map(|attempt| deterministic.delay_for_attempt(attempt))
            .sum()
    }
}
