//! Admission into the pipeline: persist, then enqueue.
//!
//! Shared by the HTTP intake surface and the scheduler loop so both admit
//! notifications through exactly one path.

use relay_common::NotificationRequest;
use relay_store::DeliveryStore;

use crate::{error::DeliveryError, queue::PriorityQueue};

/// Persist `request` and push it onto `queue` at its priority, returning the
/// tracking ID callers use to poll status.
///
/// # Errors
///
/// Returns an error if the store fails to persist the notification.
pub async fn admit(
    store: &dyn DeliveryStore,
    queue: &PriorityQueue,
    request: NotificationRequest,
) -> Result<String, DeliveryError> {
    let priority = request.priority;
    let channel = request.channel;
    let tracking_id = store.create_notification(request).await?;
    queue.push(priority, tracking_id.clone());

    if let Some(metrics) = relay_metrics::try_metrics() {
        metrics
            .delivery
            .record_admission(&channel.to_string(), &priority.to_string());
    }

    Ok(tracking_id)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use relay_common::{Channel, Priority};
    use relay_store::InMemoryStore;

    use super::*;

    fn request() -> NotificationRequest {
        NotificationRequest {
            channel: Channel::Email,
            recipient: "a@example.com".to_string(),
            template_id: None,
            content: Some(relay_common::Content {
                subject: Some("hi".to_string()),
                body: "hi".to_string(),
            }),
            variables: std::collections::HashMap::new(),
            priority: Priority::High,
            metadata: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn test_admit_persists_and_enqueues() {
        let store: Arc<dyn DeliveryStore> = Arc::new(InMemoryStore::new(None));
        let queue = PriorityQueue::new();

        let tracking_id = admit(store.as_ref(), &queue, request()).await.unwrap();

        assert_eq!(queue.depth(), 1);
        let entry = queue.pop().await;
        assert_eq!(entry.tracking_id, tracking_id);
        assert_eq!(entry.priority_rank, Priority::High.rank());
    }
}
