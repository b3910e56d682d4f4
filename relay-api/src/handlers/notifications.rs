//! `/notifications/*` handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use relay_common::{ids, NotificationRequest, NotificationStatusResponse, ScheduleRequest, ValidationError};
use serde::{Deserialize, Serialize};

use crate::{error::ApiError, state::AppState};

const MAX_BATCH_SIZE: usize = 100;

/// `POST /notifications/send` accepts either a single request or a bulk
/// variant distinguished by the presence of `recipients`. Bulk is declared
/// first since untagged variants are tried in order and it's the more
/// specific shape.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SendRequest {
    Bulk(BulkNotificationRequest),
    Single(NotificationRequest),
}

#[derive(Debug, Deserialize)]
pub struct BulkNotificationRequest {
    #[serde(flatten)]
    pub template: NotificationTemplate,
    pub recipients: Vec<String>,
}

/// The parts of a `NotificationRequest` shared across all recipients in a
/// bulk send; `recipient` itself is supplied per-item by `recipients`.
#[derive(Debug, Deserialize)]
pub struct NotificationTemplate {
    pub channel: relay_common::Channel,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub content: Option<relay_common::Content>,
    #[serde(default)]
    pub variables: std::collections::HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub priority: relay_common::Priority,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SendResponse {
    Single { tracking_id: String },
    Bulk { tracking_ids: Vec<String>, count: usize },
}

pub async fn send(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SendRequest>,
) -> Result<Json<SendResponse>, ApiError> {
    match body {
        SendRequest::Single(request) => {
            let tracking_id =
                relay_delivery::admit(state.store.as_ref(), &state.queue, request).await?;
            Ok(Json(SendResponse::Single { tracking_id }))
        }
        SendRequest::Bulk(bulk) => {
            let mut tracking_ids = Vec::with_capacity(bulk.recipients.len());
            for recipient in bulk.recipients {
                let request = NotificationRequest {
                    channel: bulk.template.channel,
                    recipient,
                    template_id: bulk.template.template_id.clone(),
                    content: bulk.template.content.clone(),
                    variables: bulk.template.variables.clone(),
                    priority: bulk.template.priority,
                    metadata: bulk.template.metadata.clone(),
                };
                let tracking_id =
                    relay_delivery::admit(state.store.as_ref(), &state.queue, request).await?;
                tracking_ids.push(tracking_id);
            }
            let count = tracking_ids.len();
            Ok(Json(SendResponse::Bulk { tracking_ids, count }))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub schedule_id: String,
}

pub async fn schedule(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ScheduleRequest>,
) -> Result<Json<ScheduleResponse>, ApiError> {
    let resolved = request.resolve()?;
    let schedule_id = state.store.create_schedule(resolved).await?;
    Ok(Json(ScheduleResponse { schedule_id }))
}

pub async fn status(
    State(state): State<Arc<AppState>>,
    Path(tracking_id): Path<String>,
) -> Result<Json<NotificationStatusResponse>, ApiError> {
    state
        .store
        .get_notification(&tracking_id)
        .await
        .map(Json)
        .map_err(Into::into)
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    Atomic,
    BestEffort,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub notifications: Vec<NotificationRequest>,
    pub delivery_mode: DeliveryMode,
}

#[derive(Debug, Serialize)]
pub struct BatchItemResult {
    pub tracking_id: Option<String>,
    pub status: &'static str,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub batch_id: String,
    pub items: Vec<BatchItemResult>,
}

/// `POST /notifications/batch`. `atomic` mode validates the whole batch's
/// shape up front (already done by this point via `Json` deserialization)
/// and then admits every item unconditionally; `best_effort` admits each
/// item independently and records per-item errors. Neither mode rolls back
/// partial admissions — see design notes on why atomic isn't storage-atomic.
pub async fn batch(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BatchResponse>, ApiError> {
    if request.notifications.len() > MAX_BATCH_SIZE {
        return Err(ApiError::Validation(ValidationError::BatchTooLarge {
            max: MAX_BATCH_SIZE,
            actual: request.notifications.len(),
        }));
    }

    let batch_id = ids::new_batch_id();
    let mut items = Vec::with_capacity(request.notifications.len());

    for notification in request.notifications {
        match relay_delivery::admit(state.store.as_ref(), &state.queue, notification).await {
            Ok(tracking_id) => items.push(BatchItemResult {
                tracking_id: Some(tracking_id),
                status: "queued",
                error: None,
            }),
            Err(error) => {
                if request.delivery_mode == DeliveryMode::Atomic {
                    return Err(error.into());
                }
                items.push(BatchItemResult {
                    tracking_id: None,
                    status: "failed",
                    error: Some(error.to_string()),
                });
            }
        }
    }

    Ok(Json(BatchResponse { batch_id, items }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_request_single_deserializes() {
        let body = serde_json::json!({
            "channel": "email",
            "recipient": "a@example.com",
        });
        let request: SendRequest = serde_json::from_value(body).unwrap();
        assert!(matches!(request, SendRequest::Single(_)));
    }

    #[test]
    fn test_send_request_bulk_deserializes() {
        let body = serde_json::json!({
            "channel": "email",
            "recipients": ["a@example.com", "b@example.com"],
        });
        let request: SendRequest = serde_json::from_value(body).unwrap();
        assert!(matches!(request, SendRequest::Bulk(_)));
    }

    #[test]
    fn test_batch_over_limit_is_rejected_before_admission() {
        let error = ValidationError::BatchTooLarge { max: 100, actual: 101 };
        assert_eq!(error.to_string(), "batch size cannot exceed 100, got 101");
    }
}
