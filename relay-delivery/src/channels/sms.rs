//! Mock Twilio-like SMS adapter.

use std::sync::LazyLock;

use async_trait::async_trait;
use rand::Rng;
use regex::Regex;
use relay_common::{Content, NotificationRequest};
use serde_json::json;

use super::{ChannelAdapter, DispatchOutcome};
use crate::error::{DeliveryError, PermanentError, TransientError};

const HARD_CHAR_LIMIT: usize = 1000;
const SEGMENT_SIZE: usize = 160;
const DELAY_RANGE_SECS: (f64, f64) = (1.0, 5.0);

static PHONE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[1-9]\d{7,14}$").expect("valid regex"));

pub struct SmsAdapter {
    failure_rate: f64,
}

impl SmsAdapter {
    #[must_use]
    pub const fn new(failure_rate: f64) -> Self {
        Self { failure_rate }
    }
}

#[async_trait]
impl ChannelAdapter for SmsAdapter {
    async fn send(
        &self,
        request: &NotificationRequest,
        rendered: &Content,
    ) -> Result<DispatchOutcome, DeliveryError> {
        let start = std::time::Instant::now();

        let body = rendered.body.trim();
        if body.is_empty() {
            return Err(PermanentError::MessageTooLarge("SMS body is required".into()).into());
        }

        let recipient = request.recipient.trim();
        if !PHONE_REGEX.is_match(recipient) {
            return Err(PermanentError::InvalidRecipient(
                "invalid phone number format".into(),
            )
            .into());
        }

        if body.len() > HARD_CHAR_LIMIT {
            return Err(PermanentError::MessageTooLarge(format!(
                "SMS body exceeds {HARD_CHAR_LIMIT} characters"
            ))
            .into());
        }

        let delay = rand::rng().random_range(DELAY_RANGE_SECS.0..=DELAY_RANGE_SECS.1);
        tokio::time::sleep(std::time::Duration::from_secs_f64(delay)).await;

        if rand::rng().random::<f64>() < self.failure_rate {
            return Err(TransientError::CarrierFailure("Carrier temporary failure".into()).into());
        }

        let segments = body.len().div_ceil(SEGMENT_SIZE).max(1);
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        Ok(DispatchOutcome {
            provider: "mock-twilio",
            latency_ms,
            extra: json!({ "segments": segments }),
        })
    }
}
