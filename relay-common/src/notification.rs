//! Notification and delivery-attempt data model.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Channel, Priority};

/// Lifecycle status of a notification: `queued → sending → {delivered | failed | bounced}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Queued,
    Sending,
    Delivered,
    Failed,
    Bounced,
}

impl NotificationStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Failed | Self::Bounced)
    }
}

/// Outcome of a single delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    Delivered,
    Failed,
}

/// Subject/body content pair, optionally provided inline instead of via a template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: String,
}

/// A validated request to send a single notification, as reconstructed from
/// storage or as received (post-validation) from the HTTP API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub channel: Channel,
    pub recipient: String,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub variables: HashMap<String, Value>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub metadata: Value,
}

/// A single recorded attempt to deliver a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryAttempt {
    pub attempt_number: u32,
    pub status: AttemptStatus,
    pub error_message: Option<String>,
    pub response_code: Option<u16>,
    pub attempted_at: DateTime<Utc>,
    pub latency_ms: f64,
}

/// The persisted notification row plus its request payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub tracking_id: String,
    pub request: NotificationRequest,
    pub status: NotificationStatus,
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
}

impl Notification {
    #[must_use]
    pub fn new(tracking_id: String, request: NotificationRequest) -> Self {
        Self {
            tracking_id,
            request,
            status: NotificationStatus::Queued,
            attempts: 0,
            created_at: Utc::now(),
            last_attempt_at: None,
            delivered_at: None,
            failure_reason: None,
        }
    }
}

/// Response body for `GET /notifications/{tracking_id}/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationStatusResponse {
    pub tracking_id: String,
    pub status: NotificationStatus,
    pub channel: Channel,
    pub recipient: String,
    pub attempts: u32,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
    pub delivery_attempts: Vec<DeliveryAttempt>,
}
