//! In-memory per-key token-bucket rate limiter.
//!
//! Not distributed; single-process only, consistent with the pipeline's
//! single-process non-goal. Only consulted by workers when
//! `RATE_LIMIT_ENABLED` is set.
//!
//! # Token Bucket Algorithm
//!
//! Tokens refill continuously at `refill_rate` tokens/sec up to `capacity`;
//! each `allow` call consumes `amount` tokens if available.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "defaults::capacity")]
    pub capacity: f64,
    #[serde(default = "defaults::refill_rate")]
    pub refill_rate: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: defaults::capacity(),
            refill_rate: defaults::refill_rate(),
        }
    }
}

mod defaults {
    pub const fn capacity() -> f64 {
        10.0
    }

    pub const fn refill_rate() -> f64 {
        1.0
    }
}

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    capacity: f64,
    refill_rate: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, refill_rate: f64) -> Self {
        Self {
            tokens: capacity,
            capacity,
            refill_rate,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }

    /// Refills then attempts to consume `amount`, returning whether it succeeded.
    fn try_consume(&mut self, amount: f64) -> bool {
        self.refill();
        if self.tokens >= amount {
            self.tokens -= amount;
            true
        } else {
            false
        }
    }
}

/// Per-key token-bucket rate limiter. Keys are opaque strings (the worker
/// pool uses `recipient:{recipient}`).
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: DashMap<String, Arc<parking_lot::Mutex<TokenBucket>>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: DashMap::new(),
        }
    }

    fn get_bucket(&self, key: &str) -> Arc<parking_lot::Mutex<TokenBucket>> {
        self.buckets
            .entry(key.to_string())
            .or_insert_with(|| {
                Arc::new(parking_lot::Mutex::new(TokenBucket::new(
                    self.config.capacity,
                    self.config.refill_rate,
                )))
            })
            .clone()
    }

    /// Returns `true` if `amount` tokens were available (and consumed) for `key`.
    pub fn allow(&self, key: &str, amount: f64) -> bool {
        let allowed = self.get_bucket(key).lock().try_consume(amount);
        if !allowed {
            if let Some(metrics) = relay_metrics::try_metrics() {
                metrics.delivery.record_rate_limit_rejection();
            }
        }
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_then_exhaustion() {
        let limiter = RateLimiter::new(RateLimitConfig {
            capacity: 5.0,
            refill_rate: 1.0,
        });
        for _ in 0..5 {
            assert!(limiter.allow("recipient:a", 1.0));
        }
        assert!(!limiter.allow("recipient:a", 1.0));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new(RateLimitConfig {
            capacity: 1.0,
            refill_rate: 1.0,
        });
        assert!(limiter.allow("recipient:a", 1.0));
        assert!(!limiter.allow("recipient:a", 1.0));
        assert!(limiter.allow("recipient:b", 1.0));
    }

    #[test]
    #[cfg_attr(miri, ignore = "time-based test not compatible with Miri")]
    fn test_refill_over_time() {
        let limiter = RateLimiter::new(RateLimitConfig {
            capacity: 2.0,
            refill_rate: 10.0,
        });
        assert!(limiter.allow("k", 2.0));
        assert!(!limiter.allow("k", 1.0));

        let bucket = limiter.get_bucket("k");
        {
            let mut guard = bucket.lock();
            guard.last_refill = Instant::now().checked_sub(Duration::from_millis(200)).unwrap();
        }
        assert!(limiter.allow("k", 1.0));
    }

    #[test]
    fn test_new_bucket_starts_full() {
        let limiter = RateLimiter::new(RateLimitConfig {
            capacity: 3.0,
            refill_rate: 1.0,
        });
        assert!(limiter.allow("fresh", 3.0));
        assert!(!limiter.allow("fresh", 0.1));
    }
}
