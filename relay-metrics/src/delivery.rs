//! Delivery pipeline metrics
//!
//! Tracks the notification pipeline end to end:
//! - Admissions by channel and priority
//! - Delivery attempts by outcome
//! - Circuit breaker state transitions
//! - Rate-limit rejections
//! - Delivery latency

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use opentelemetry::{
    metrics::{Counter, Histogram, Meter},
    KeyValue,
};

use crate::MetricsError;

/// Delivery pipeline metrics collector
#[derive(Debug)]
pub struct DeliveryMetrics {
    /// Total number of notifications admitted, by channel and priority
    admissions_total: Counter<u64>,

    /// Total number of delivery attempts by outcome (delivered/failed/retry)
    attempts_total: Counter<u64>,

    /// Total number of circuit breaker state transitions
    circuit_transitions_total: Counter<u64>,

    /// Total number of requests rejected by the rate limiter
    rate_limit_rejections_total: Counter<u64>,

    /// Distribution of delivery latencies by channel
    latency_seconds: Histogram<f64>,

    // Fast atomic counters for hot path (read by observable counters via callbacks)
    delivered_count: Arc<AtomicU64>,
    failed_count: Arc<AtomicU64>,
    retrying_count: Arc<AtomicU64>,
}

impl DeliveryMetrics {
    /// Create a new delivery metrics collector
    ///
    /// # Errors
    ///
    /// Returns an error if metric instruments cannot be created.
    pub fn new() -> Result<Self, MetricsError> {
        let meter = meter();

        let admissions_total = meter
            .u64_counter("relay.delivery.admissions.total")
            .with_description("Total number of notifications admitted")
            .build();

        let attempts_total = meter
            .u64_counter("relay.delivery.attempts.total")
            .with_description("Total number of delivery attempts by outcome")
            .build();

        let circuit_transitions_total = meter
            .u64_counter("relay.delivery.circuit.transitions.total")
            .with_description("Total number of circuit breaker state transitions")
            .build();

        let rate_limit_rejections_total = meter
            .u64_counter("relay.delivery.rate_limit.rejections.total")
            .with_description("Total number of requests rejected by the rate limiter")
            .build();

        let latency_seconds = meter
            .f64_histogram("relay.delivery.latency.seconds")
            .with_description("Distribution of delivery latencies by channel")
            .build();

        let delivered_ref = Arc::new(AtomicU64::new(0));
        let failed_ref = Arc::new(AtomicU64::new(0));
        let retrying_ref = Arc::new(AtomicU64::new(0));

        let delivered_clone = delivered_ref.clone();
        meter
            .u64_observable_counter("relay.delivery.messages.delivered.total")
            .with_description("Total number of notifications delivered successfully")
            .with_callback(move |observer| {
                observer.observe(delivered_clone.load(Ordering::Relaxed), &[]);
            })
            .build();

        let failed_clone = failed_ref.clone();
        meter
            .u64_observable_counter("relay.delivery.messages.failed.total")
            .with_description("Total number of notifications permanently failed")
            .with_callback(move |observer| {
                observer.observe(failed_clone.load(Ordering::Relaxed), &[]);
            })
            .build();

        let retrying_clone = retrying_ref.clone();
        meter
            .u64_observable_counter("relay.delivery.messages.retrying.total")
            .with_description("Total number of notifications scheduled for retry")
            .with_callback(move |observer| {
                observer.observe(retrying_clone.load(Ordering::Relaxed), &[]);
            })
            .build();

        let delivered_for_rate = delivered_ref.clone();
        let failed_for_rate = failed_ref.clone();
        let retrying_for_rate = retrying_ref.clone();
        meter
            .f64_observable_gauge("relay.delivery.error_rate")
            .with_description("Delivery error rate (failed / total attempts, 0-1)")
            .with_callback(move |observer| {
                let delivered = delivered_for_rate.load(Ordering::Relaxed);
                let failed = failed_for_rate.load(Ordering::Relaxed);
                let retrying = retrying_for_rate.load(Ordering::Relaxed);
                let total = delivered + failed + retrying;

                let error_rate = if total > 0 {
                    #[allow(clippy::cast_precision_loss)]
                    {
                        failed as f64 / total as f64
                    }
                } else {
                    0.0
                };

                observer.observe(error_rate, &[]);
            })
            .build();

        Ok(Self {
            admissions_total,
            attempts_total,
            circuit_transitions_total,
            rate_limit_rejections_total,
            latency_seconds,
            delivered_count: delivered_ref,
            failed_count: failed_ref,
            retrying_count: retrying_ref,
        })
    }

    /// Record a notification admitted to the pipeline.
    pub fn record_admission(&self, channel: &str, priority: &str) {
        let attributes = [
            KeyValue::new("channel", channel.to_string()),
            KeyValue::new("priority", priority.to_string()),
        ];
        self.admissions_total.add(1, &attributes);
    }

    /// Record a delivery attempt and its outcome (`delivered`, `failed`, or `retry`).
    pub fn record_attempt(&self, outcome: &str, channel: &str, latency_secs: f64) {
        let attributes = [
            KeyValue::new("outcome", outcome.to_string()),
            KeyValue::new("channel", channel.to_string()),
        ];
        self.attempts_total.add(1, &attributes);
        self.latency_seconds
            .record(latency_secs, &[KeyValue::new("channel", channel.to_string())]);

        match outcome {
            "delivered" => {
                self.delivered_count.fetch_add(1, Ordering::Relaxed);
            }
            "retry" => {
                self.retrying_count.fetch_add(1, Ordering::Relaxed);
            }
            _ => {
                self.failed_count.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Record a circuit breaker state transition, e.g. `closed` -> `open`.
    pub fn record_circuit_transition(&self, from: &str, to: &str) {
        let attributes = [
            KeyValue::new("from", from.to_string()),
            KeyValue::new("to", to.to_string()),
        ];
        self.circuit_transitions_total.add(1, &attributes);
    }

    /// Record a request rejected by the rate limiter.
    pub fn record_rate_limit_rejection(&self) {
        self.rate_limit_rejections_total.add(1, &[]);
    }

    /// Current count of delivered notifications observed so far.
    #[must_use]
    pub fn delivered_count(&self) -> u64 {
        self.delivered_count.load(Ordering::Relaxed)
    }

    /// Current count of failed notifications observed so far.
    #[must_use]
    pub fn failed_count(&self) -> u64 {
        self.failed_count.load(Ordering::Relaxed)
    }

    /// Current count of retrying notifications observed so far.
    #[must_use]
    pub fn retrying_count(&self) -> u64 {
        self.retrying_count.load(Ordering::Relaxed)
    }
}

/// Get the OpenTelemetry meter for delivery metrics
fn meter() -> Meter {
    opentelemetry::global::meter("relay.delivery")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_metrics_creation() {
        assert!(DeliveryMetrics::new().is_ok());
    }

    #[test]
    fn test_attempt_counters_accumulate_by_outcome() {
        let metrics = DeliveryMetrics::new().unwrap();
        metrics.record_attempt("delivered", "email", 0.5);
        metrics.record_attempt("delivered", "email", 0.3);
        metrics.record_attempt("failed", "sms", 1.2);
        metrics.record_attempt("retry", "webhook", 0.1);

        assert_eq!(metrics.delivered_count(), 2);
        assert_eq!(metrics.failed_count(), 1);
        assert_eq!(metrics.retrying_count(), 1);
    }

    #[test]
    fn test_admission_and_rejection_do_not_panic() {
        let metrics = DeliveryMetrics::new().unwrap();
        metrics.record_admission("email", "high");
        metrics.record_circuit_transition("closed", "open");
        metrics.record_rate_limit_rejection();
    }
}
