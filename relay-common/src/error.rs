//! Foundational error types shared across the workspace.
//!
//! Crate-specific errors (`relay_delivery::DeliveryError`, `relay_store::StoreError`)
//! build on top of these rather than duplicating them.

use thiserror::Error;

/// A user-visible input validation failure (HTTP 400 at the API boundary).
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    #[error("template with this name already exists")]
    DuplicateTemplateName,

    #[error("missing required template variables: {0}")]
    MissingTemplateVariables(String),

    #[error("batch size cannot exceed {max}, got {actual}")]
    BatchTooLarge { max: usize, actual: usize },

    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("{0}")]
    Other(String),
}
