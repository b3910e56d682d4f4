//! Error types for the delivery store.

use thiserror::Error;

/// Top-level delivery-store error type.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("notification not found: {0}")]
    NotificationNotFound(String),

    #[error("template not found: {0}")]
    TemplateNotFound(String),

    #[error("schedule not found: {0}")]
    ScheduleNotFound(String),

    #[error("template with this name already exists: {0}")]
    DuplicateTemplateName(String),

    #[error("store at capacity ({0} notifications)")]
    CapacityExceeded(usize),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Self::Internal(format!("lock poisoned: {e}"))
    }
}
