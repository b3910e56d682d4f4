//! Fixed per-priority retry planner.
//!
//! The table is a compile-time constant keyed by [`Priority`]: nothing in
//! the rest of the system overrides it per recipient or domain.

use std::time::Duration;

use rand::Rng;
use relay_common::Priority;

/// Max attempts and the fixed per-attempt delays (seconds) for one priority class.
#[derive(Debug, Clone, Copy)]
pub struct RetryPlan {
    pub max_attempts: u32,
    delays: &'static [u64],
}

const CRITICAL: RetryPlan = RetryPlan {
    max_attempts: 5,
    delays: &[1, 5, 15, 60, 300],
};

const HIGH: RetryPlan = RetryPlan {
    max_attempts: 3,
    delays: &[5, 30, 120],
};

const NORMAL: RetryPlan = RetryPlan {
    max_attempts: 2,
    delays: &[10, 60],
};

const LOW: RetryPlan = RetryPlan {
    max_attempts: 1,
    delays: &[],
};

/// Look up the fixed retry plan for a priority class.
#[must_use]
pub const fn get_retry_plan(priority: Priority) -> RetryPlan {
    match priority {
        Priority::Critical => CRITICAL,
        Priority::High => HIGH,
        Priority::Normal => NORMAL,
        Priority::Low => LOW,
    }
}

impl RetryPlan {
    /// Returns `true` if `attempt_number` (1-indexed, the attempt just recorded)
    /// leaves budget for another try.
    #[must_use]
    pub const fn should_retry(&self, attempt_number: u32) -> bool {
        attempt_number < self.max_attempts
    }

    /// Delay before `attempt_number` (1-indexed). Attempt 1 is immediate.
    ///
    /// For `attempt_number` within the configured table, uses the exact
    /// configured delay. Beyond the table, falls back to exponential backoff
    /// off the last configured delay (or 1s if none configured), jittered
    /// by a symmetric uniform ±20%.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn next_delay(&self, attempt_number: u32) -> Duration {
        if attempt_number <= 1 {
            return Duration::ZERO;
        }

        let k = attempt_number as usize;
        if let Some(&delay) = self.delays.get(k - 2) {
            return Duration::from_secs(delay);
        }

        let base = self.delays.last().copied().unwrap_or(1) as f64;
        let n = (k - self.delays.len()) as i32;
        let exp = base * 2f64.powi(n);

        let jitter_range = exp * 0.2;
        let jitter: f64 = rand::rng().random_range(-jitter_range..=jitter_range);
        let jittered = (exp + jitter).max(0.0);

        Duration::from_secs_f64(jittered)
    }
}
