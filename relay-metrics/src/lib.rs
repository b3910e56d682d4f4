//! OpenTelemetry metrics for the notification delivery pipeline
//!
//! This crate provides observability instrumentation using OpenTelemetry.
//! It exports metrics via OTLP to an OpenTelemetry Collector, which can expose
//! them in Prometheus format for scraping.
//!
//! # Features
//!
//! - **Delivery metrics**: admissions, attempts by outcome, circuit breaker
//!   transitions, rate-limit rejections, delivery latency
//! - **OTLP export**: push metrics to an OpenTelemetry Collector
//!
//! # Architecture
//!
//! ```text
//! relay → OTLP/HTTP → OpenTelemetry Collector → Prometheus (scrape) → Grafana
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use relay_metrics::{init_metrics, MetricsConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MetricsConfig {
//!     enabled: true,
//!     endpoint: "http://localhost:4318".to_string(),
//!     api_key: None,
//! };
//!
//! init_metrics(&config)?;
//! # Ok(())
//! # }
//! ```

mod config;
mod delivery;
mod error;
mod exporter;

pub use config::MetricsConfig;
pub use delivery::DeliveryMetrics;
pub use error::MetricsError;
use once_cell::sync::OnceCell;

/// Global metrics instance
static METRICS_INSTANCE: OnceCell<Metrics> = OnceCell::new();

/// Root metrics container
#[derive(Debug)]
pub struct Metrics {
    pub delivery: DeliveryMetrics,
}

/// Initialize the metrics system
///
/// This must be called once at startup before any metrics are recorded.
/// If metrics are disabled in the config, this is a no-op.
///
/// Metrics will be pushed to the configured OTLP endpoint (typically an
/// OpenTelemetry Collector) which can then expose them for Prometheus to scrape.
/// Absent configuration, metrics are still recorded in-process (readable via
/// [`metrics()`]) but never shipped anywhere — this crate never hard-depends
/// on a collector being reachable.
///
/// # Errors
///
/// Returns an error if metrics initialization fails or if called multiple times.
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        tracing::info!("Metrics collection is disabled");
        return Ok(());
    }

    tracing::info!(
        endpoint = %config.endpoint,
        "Initializing OpenTelemetry metrics with OTLP exporter"
    );

    let provider = exporter::init_otlp_exporter(&config.endpoint)?;
    opentelemetry::global::set_meter_provider(provider);

    let delivery = DeliveryMetrics::new()?;
    let metrics = Metrics { delivery };

    METRICS_INSTANCE
        .set(metrics)
        .map_err(|_| MetricsError::AlreadyInitialized)?;

    tracing::info!("Metrics collection initialized successfully");

    Ok(())
}

/// Get a reference to the global metrics instance
///
/// # Panics
///
/// Panics if metrics have not been initialized via `init_metrics()`.
#[must_use]
pub fn metrics() -> &'static Metrics {
    METRICS_INSTANCE
        .get()
        .expect("Metrics not initialized. Call init_metrics() first.")
}

/// Get a reference to the global metrics instance, if it was initialized.
///
/// Hot-path call sites use this instead of [`metrics()`] since metrics can
/// be disabled in config, or initialization can fail without aborting
/// startup (`relay::controller::Relay::run` only warns on that error).
#[must_use]
pub fn try_metrics() -> Option<&'static Metrics> {
    METRICS_INSTANCE.get()
}

/// Check if metrics are enabled
#[must_use]
pub fn is_enabled() -> bool {
    METRICS_INSTANCE.get().is_some()
}
