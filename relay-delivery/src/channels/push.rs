//! Mock FCM/APNS-like push adapter.

use std::sync::LazyLock;

use async_trait::async_trait;
use rand::Rng;
use regex::Regex;
use relay_common::{Content, NotificationRequest};
use serde_json::json;
use uuid::Uuid;

use super::{ChannelAdapter, DispatchOutcome};
use crate::error::{DeliveryError, PermanentError, TransientError};

const DELAY_RANGE_SECS: (f64, f64) = (0.1, 1.0);

static TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_\-:.]{16,256}$").expect("valid regex"));

pub struct PushAdapter {
    failure_rate: f64,
}

impl PushAdapter {
    #[must_use]
    pub const fn new(failure_rate: f64) -> Self {
        Self { failure_rate }
    }
}

#[async_trait]
impl ChannelAdapter for PushAdapter {
    async fn send(
        &self,
        request: &NotificationRequest,
        rendered: &Content,
    ) -> Result<DispatchOutcome, DeliveryError> {
        let start = std::time::Instant::now();

        let token = request.recipient.trim();
        if !TOKEN_REGEX.is_match(token) {
            return Err(PermanentError::InvalidRecipient("invalid device token".into()).into());
        }

        let body = rendered.body.trim();
        if body.is_empty() {
            return Err(PermanentError::MessageTooLarge("push body is required".into()).into());
        }

        let delay = rand::rng().random_range(DELAY_RANGE_SECS.0..=DELAY_RANGE_SECS.1);
        tokio::time::sleep(std::time::Duration::from_secs_f64(delay)).await;

        if rand::rng().random::<f64>() < self.failure_rate {
            return Err(TransientError::Unknown("push provider temporary failure".into()).into());
        }

        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        Ok(DispatchOutcome {
            provider: "mock-push",
            latency_ms,
            extra: json!({ "receipt_id": format!("r_{}", Uuid::new_v4().simple()) }),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use relay_common::{Channel, Priority};
    use serde_json::Value;

    use super::*;

    fn request(recipient: &str) -> NotificationRequest {
        NotificationRequest {
            channel: Channel::Push,
            recipient: recipient.to_string(),
            template_id: None,
            content: None,
            variables: HashMap::new(),
            priority: Priority::Normal,
            metadata: Value::Null,
        }
    }

    #[tokio::test]
    async fn test_invalid_token_is_permanent() {
        let adapter = PushAdapter::new(0.0);
        let req = request("short");
        let rendered = Content {
            subject: None,
            body: "hi".into(),
        };
        let err = adapter.send(&req, &rendered).await.unwrap_err();
        assert!(err.is_permanent());
    }

    #[tokio::test]
    async fn test_success_reports_receipt_id() {
        let adapter = PushAdapter::new(0.0);
        let req = request("VALIDTOKEN_abc_1234567890");
        let rendered = Content {
            subject: None,
            body: "hi".into(),
        };
        let outcome = adapter.send(&req, &rendered).await.unwrap();
        assert_eq!(outcome.provider, "mock-push");
        assert!(outcome.extra["receipt_id"].is_string());
    }

    #[tokio::test]
    async fn test_forced_failure_rate_is_transient() {
        let adapter = PushAdapter::new(1.0);
        let req = request("VALIDTOKEN_abc_1234567890");
        let rendered = Content {
            subject: None,
            body: "hi".into(),
        };
        let err = adapter.send(&req, &rendered).await.unwrap_err();
        assert!(err.is_temporary());
    }
}
