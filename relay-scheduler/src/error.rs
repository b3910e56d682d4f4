//! Error types for scheduling operations.

use thiserror::Error;

/// Errors encountered while computing or applying a schedule.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("store error: {0}")]
    Store(#[from] relay_store::StoreError),

    #[error("delivery error: {0}")]
    Delivery(#[from] relay_delivery::DeliveryError),

    #[error("invalid cron expression {0:?}: {1}")]
    InvalidCron(String, String),

    #[error("invalid timezone {0:?}")]
    InvalidTimezone(String),
}
