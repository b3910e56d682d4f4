//! Per-recipient circuit breaker to prevent retry storms.
//!
//! # Circuit Breaker Pattern
//!
//! The circuit breaker has three states:
//! - **Closed**: normal operation, deliveries allowed, failures counted.
//! - **Open**: circuit tripped, all deliveries rejected immediately until cooldown elapses.
//! - **Half-Open**: exactly one probe in flight; success closes, failure reopens.
//!
//! ```text
//! ┌─────────┐  failure_count >= threshold  ┌──────┐
//! │ Closed  │ ────────────────────────────>│ Open │
//! └─────────┘                              └──────┘
//!     ^                                       │
//!     │ success                               │ now - opened_at >= cooldown
//!     │                    ┌───────────────┐  v
//!     └────────────────────│  Half-Open    │<─┘
//!                          └───────────────┘
//!                                  │ failure
//!                                  v
//!                            ┌──────┐
//!                            │ Open │
//!                            └──────┘
//! ```

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use relay_common::{tracing, Recipient};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures required to open the circuit.
    #[serde(default = "defaults::failure_threshold")]
    pub failure_threshold: u32,
    /// Seconds an open circuit waits before admitting a probe.
    #[serde(default = "defaults::cooldown_secs")]
    pub cooldown_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: defaults::failure_threshold(),
            cooldown_secs: defaults::cooldown_secs(),
        }
    }
}

mod defaults {
    pub const fn failure_threshold() -> u32 {
        3
    }

    pub const fn cooldown_secs() -> u64 {
        60
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    const fn label(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

#[derive(Debug)]
struct CircuitBreakerData {
    state: CircuitState,
    failure_count: u32,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
    failure_threshold: u32,
    cooldown: Duration,
}

impl CircuitBreakerData {
    const fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            opened_at: None,
            probe_in_flight: false,
            failure_threshold,
            cooldown,
        }
    }

    fn on_success(&mut self, recipient: &Recipient) {
        let was_open = self.state != CircuitState::Closed;
        self.state = CircuitState::Closed;
        self.failure_count = 0;
        self.opened_at = None;
        self.probe_in_flight = false;
        if was_open {
            tracing::info!(%recipient, "circuit breaker CLOSED - probe succeeded");
        }
    }

    fn on_failure(&mut self, recipient: &Recipient) {
        if self.state == CircuitState::HalfOpen {
            // Immediately open again; never accumulate past the threshold.
            self.state = CircuitState::Open;
            self.opened_at = Some(Instant::now());
            self.probe_in_flight = false;
            self.failure_count = self.failure_count.max(self.failure_threshold);
            tracing::warn!(%recipient, "circuit breaker probe failed - reopening");
            return;
        }

        self.failure_count += 1;
        if self.failure_count >= self.failure_threshold {
            self.state = CircuitState::Open;
            self.opened_at = Some(Instant::now());
            tracing::warn!(
                %recipient,
                failure_count = self.failure_count,
                threshold = self.failure_threshold,
                "circuit breaker OPENED"
            );
        }
    }

    /// Single critical section for the allow-check and the probe claim, so
    /// two concurrent half-open callers can never both observe `true`.
    fn allow_request(&mut self) -> bool {
        match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let Some(opened_at) = self.opened_at else {
                    self.opened_at = Some(Instant::now());
                    return false;
                };
                if opened_at.elapsed() >= self.cooldown {
                    self.state = CircuitState::HalfOpen;
                    self.probe_in_flight = true;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if self.probe_in_flight {
                    false
                } else {
                    self.probe_in_flight = true;
                    true
                }
            }
        }
    }
}

fn record_transition(before: CircuitState, after: CircuitState) {
    if before == after {
        return;
    }
    if let Some(metrics) = relay_metrics::try_metrics() {
        metrics
            .delivery
            .record_circuit_transition(before.label(), after.label());
    }
}

/// Per-recipient circuit breaker manager.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    breakers: DashMap<Recipient, Arc<parking_lot::Mutex<CircuitBreakerData>>>,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            breakers: DashMap::new(),
        }
    }

    fn get_breaker(&self, recipient: &Recipient) -> Arc<parking_lot::Mutex<CircuitBreakerData>> {
        self.breakers
            .entry(recipient.clone())
            .or_insert_with(|| {
                Arc::new(parking_lot::Mutex::new(CircuitBreakerData::new(
                    self.config.failure_threshold,
                    Duration::from_secs(self.config.cooldown_secs),
                )))
            })
            .clone()
    }

    /// Returns `true` if a delivery attempt should proceed.
    pub fn allow_request(&self, recipient: &Recipient) -> bool {
        let breaker = self.get_breaker(recipient);
        let mut guard = breaker.lock();
        let before = guard.state;
        let allowed = guard.allow_request();
        let after = guard.state;
        drop(guard);
        record_transition(before, after);
        allowed
    }

    pub fn on_success(&self, recipient: &Recipient) {
        let breaker = self.get_breaker(recipient);
        let mut guard = breaker.lock();
        let before = guard.state;
        guard.on_success(recipient);
        let after = guard.state;
        drop(guard);
        record_transition(before, after);
    }

    pub fn on_failure(&self, recipient: &Recipient) {
        let breaker = self.get_breaker(recipient);
        let mut guard = breaker.lock();
        let before = guard.state;
        guard.on_failure(recipient);
        let after = guard.state;
        drop(guard);
        record_transition(before, after);
    }

    #[must_use]
    pub fn get_state(&self, recipient: &Recipient) -> CircuitState {
        self.get_breaker(recipient).lock().state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(threshold: u32, cooldown_secs: u64) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: threshold,
            cooldown_secs,
        }
    }

    #[test]
    fn test_closed_to_open_on_threshold() {
        let breaker = CircuitBreaker::new(config(3, 60));
        let r = Recipient::new("user@example.com");

        assert_eq!(breaker.get_state(&r), CircuitState::Closed);
        assert!(breaker.allow_request(&r));

        breaker.on_failure(&r);
        breaker.on_failure(&r);
        assert_eq!(breaker.get_state(&r), CircuitState::Closed);

        breaker.on_failure(&r);
        assert_eq!(breaker.get_state(&r), CircuitState::Open);
        assert!(!breaker.allow_request(&r));
    }

    #[test]
    fn test_half_open_allows_single_probe() {
        let breaker = CircuitBreaker::new(config(2, 0));
        let r = Recipient::new("user@example.com");

        breaker.on_failure(&r);
        breaker.on_failure(&r);
        assert_eq!(breaker.get_state(&r), CircuitState::Open);

        assert!(breaker.allow_request(&r));
        assert_eq!(breaker.get_state(&r), CircuitState::HalfOpen);
        // A second concurrent check must not also get a probe.
        assert!(!breaker.allow_request(&r));
    }

    #[test]
    fn test_half_open_success_closes() {
        let breaker = CircuitBreaker::new(config(2, 0));
        let r = Recipient::new("user@example.com");

        breaker.on_failure(&r);
        breaker.on_failure(&r);
        assert!(breaker.allow_request(&r));
        breaker.on_success(&r);
        assert_eq!(breaker.get_state(&r), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_failure_reopens_without_accumulating() {
        let breaker = CircuitBreaker::new(config(2, 0));
        let r = Recipient::new("user@example.com");

        breaker.on_failure(&r);
        breaker.on_failure(&r);
        assert!(breaker.allow_request(&r));
        breaker.on_failure(&r);
        assert_eq!(breaker.get_state(&r), CircuitState::Open);
    }

    #[test]
    fn test_success_resets_failure_count() {
        let breaker = CircuitBreaker::new(config(3, 60));
        let r = Recipient::new("user@example.com");

        breaker.on_failure(&r);
        breaker.on_failure(&r);
        breaker.on_success(&r);

        breaker.on_failure(&r);
        breaker.on_failure(&r);
        assert_eq!(breaker.get_state(&r), CircuitState::Closed);
    }

    #[test]
    fn test_recipients_are_independent() {
        let breaker = CircuitBreaker::new(config(1, 60));
        let a = Recipient::new("a@example.com");
        let b = Recipient::new("b@example.com");

        breaker.on_failure(&a);
        assert_eq!(breaker.get_state(&a), CircuitState::Open);
        assert_eq!(breaker.get_state(&b), CircuitState::Closed);
    }
}
