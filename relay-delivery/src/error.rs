//! Typed error handling for delivery operations.
//!
//! Distinguishes between:
//! - Permanent failures - never retried.
//! - Transient failures - retried per the recipient's retry plan.
//! - System errors - internal/storage problems, not attributable to the recipient.
//! - Circuit-open - the breaker itself refused the attempt; not an adapter outcome.

use thiserror::Error;

/// Top-level delivery error type.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Permanent failure that should not be retried.
    #[error("permanent failure: {0}")]
    Permanent(#[from] PermanentError),

    /// Temporary failure that can be retried per the priority's retry plan.
    #[error("transient failure: {0}")]
    Transient(#[from] TransientError),

    /// System-level error (storage, rendering, internal invariants).
    #[error("system error: {0}")]
    System(#[from] SystemError),

    /// The recipient's circuit breaker refused the attempt outright.
    #[error("circuit open")]
    CircuitOpen,
}

/// Permanent errors: adapter-level validation or a non-retryable remote response.
#[derive(Debug, Error)]
pub enum PermanentError {
    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    #[error("template not found: {0}")]
    TemplateNotFound(String),

    #[error("missing template variables: {0}")]
    MissingTemplateVariables(String),

    #[error("message too large: {0}")]
    MessageTooLarge(String),

    #[error("message rejected ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Transient errors: retried with backoff per the recipient's retry plan.
/// Any adapter error not otherwise classified is folded into `Unknown`
/// rather than treated as permanent — an unretried false negative is
/// worse than an extra retry.
#[derive(Debug, Error)]
pub enum TransientError {
    #[error("connection timed out: {0}")]
    Timeout(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("server error ({status}): {body}")]
    ServerError { status: u16, body: String },

    #[error("carrier temporary failure: {0}")]
    CarrierFailure(String),

    #[error("smtp error: {0}")]
    Smtp(String),

    #[error("unclassified adapter error: {0}")]
    Unknown(String),
}

/// System-level errors: storage, rendering, and other internal problems.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error("store error: {0}")]
    Store(#[from] relay_store::StoreError),

    #[error("render error: {0}")]
    Render(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl PermanentError {
    /// The bare failure message, without this variant's own `Display` prefix.
    fn message(&self) -> String {
        match self {
            Self::InvalidRecipient(s)
            | Self::UnknownChannel(s)
            | Self::TemplateNotFound(s)
            | Self::MissingTemplateVariables(s)
            | Self::MessageTooLarge(s) => s.clone(),
            Self::Rejected { status, body } => format!("rejected ({status}): {body}"),
        }
    }
}

impl TransientError {
    /// The bare failure message, without this variant's own `Display` prefix.
    fn message(&self) -> String {
        match self {
            Self::Timeout(s)
            | Self::Network(s)
            | Self::CarrierFailure(s)
            | Self::Smtp(s)
            | Self::Unknown(s) => s.clone(),
            Self::ServerError { status, body } => format!("server error ({status}): {body}"),
        }
    }
}

impl SystemError {
    /// The bare failure message, without this variant's own `Display` prefix.
    fn message(&self) -> String {
        match self {
            Self::Store(e) => e.to_string(),
            Self::Render(s) | Self::Configuration(s) | Self::Internal(s) => s.clone(),
        }
    }
}

impl DeliveryError {
    /// Returns `true` if this error is transient and should be retried.
    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Returns `true` if this error is permanent and should not be retried.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent(_))
    }

    /// Returns `true` if this is a system error.
    #[must_use]
    pub const fn is_system(&self) -> bool {
        matches!(self, Self::System(_))
    }

    /// Returns `true` if the circuit breaker refused the attempt.
    #[must_use]
    pub const fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen)
    }

    /// The `error_message` to record on the delivery attempt row: the
    /// adapter's own message, not this type's layered `Display` prefixes.
    #[must_use]
    pub fn attempt_error_message(&self) -> String {
        match self {
            Self::CircuitOpen => "circuit_open".to_string(),
            Self::Permanent(e) => e.message(),
            Self::Transient(e) => e.message(),
            Self::System(e) => e.message(),
        }
    }
}

impl From<relay_store::StoreError> for DeliveryError {
    fn from(error: relay_store::StoreError) -> Self {
        Self::System(SystemError::Store(error))
    }
}
