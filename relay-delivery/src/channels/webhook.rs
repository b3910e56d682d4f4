//! HTTP webhook adapter.

use std::time::Duration;

use async_trait::async_trait;
use relay_common::{Content, NotificationRequest};
use reqwest::Client;
use serde_json::json;

use super::{ChannelAdapter, DispatchOutcome};
use crate::error::{DeliveryError, PermanentError, TransientError};

const TIMEOUT_SECS: u64 = 10;
const RESPONSE_BODY_PREVIEW: usize = 200;

pub struct WebhookAdapter {
    client: Client,
}

impl Default for WebhookAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl WebhookAdapter {
    #[must_use]
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .expect("reqwest client builder with only a timeout never fails");
        Self { client }
    }
}

#[async_trait]
impl ChannelAdapter for WebhookAdapter {
    async fn send(
        &self,
        request: &NotificationRequest,
        rendered: &Content,
    ) -> Result<DispatchOutcome, DeliveryError> {
        let recipient = request.recipient.to_lowercase();
        if !(recipient.starts_with("http://") || recipient.starts_with("https://")) {
            return Err(
                PermanentError::InvalidRecipient("webhook recipient must be a URL".into()).into(),
            );
        }

        let mut builder = self
            .client
            .post(&request.recipient)
            .header("User-Agent", "relay-notifications/0.1")
            .header("Content-Type", "application/json");

        if let Some(headers) = request.metadata.get("headers").and_then(|h| h.as_object()) {
            for (key, value) in headers {
                if let Some(value) = value.as_str() {
                    builder = builder.header(key.as_str(), value);
                }
            }
        }

        let payload = json!({
            "channel": "webhook",
            "subject": rendered.subject,
            "body": rendered.body,
            "metadata": request.metadata,
        });

        let start = std::time::Instant::now();
        let response = builder.json(&payload).send().await.map_err(|e| {
            if e.is_timeout() {
                TransientError::Timeout(format!("webhook timeout after {TIMEOUT_SECS}s"))
            } else {
                TransientError::Network(format!("webhook http error: {e}"))
            }
        })?;

        let status = response.status();
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        if status.is_success() {
            return Ok(DispatchOutcome {
                provider: "http",
                latency_ms,
                extra: json!({ "status_code": status.as_u16() }),
            });
        }

        let body = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(RESPONSE_BODY_PREVIEW)
            .collect::<String>();

        if status.is_client_error() {
            return Err(PermanentError::Rejected {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        Err(TransientError::ServerError {
            status: status.as_u16(),
            body,
        }
        .into())
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
            channel: Channel::Webhook,
            recipient: recipient.to_string(),
            template_id: None,
            content: None,
            variables: HashMap::new(),
            priority: Priority::Normal,
            metadata: Value::Null,
        }
    }

    #[tokio::test]
    async fn test_non_url_recipient_is_permanent() {
        let adapter = WebhookAdapter::new();
        let req = request("not-a-url");
        let rendered = Content {
            subject: None,
            body: "hi".into(),
        };
        let err = adapter.send(&req, &rendered).await.unwrap_err();
        assert!(err.is_permanent());
    }
}
