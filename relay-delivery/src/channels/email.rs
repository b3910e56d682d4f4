//! Email adapter: real SMTP via `lettre` when host, username, and password
//! are all configured; mock success otherwise.

use std::sync::LazyLock;

use async_trait::async_trait;
use lettre::{
    message::{header, Header, HeaderName, HeaderValue, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use regex::Regex;
use relay_common::{Content, NotificationRequest};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{ChannelAdapter, DispatchOutcome};
use crate::error::{DeliveryError, PermanentError, TransientError};

const MAX_ATTACHMENT_BYTES: u64 = 10 * 1024 * 1024;

static TAG_STRIP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^<]+?>").expect("valid regex"));

/// SMTP connection settings, loaded from configuration (§6). Absent a host,
/// the adapter simulates success immediately.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: Option<String>,
    #[serde(default = "defaults::port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: Option<String>,
    #[serde(default = "defaults::use_tls")]
    pub use_tls: bool,
    #[serde(default = "defaults::use_starttls")]
    pub use_starttls: bool,
}

mod defaults {
    pub const fn port() -> u16 {
        587
    }

    pub const fn use_tls() -> bool {
        true
    }

    pub const fn use_starttls() -> bool {
        true
    }
}

/// A raw placeholder header; this adapter never performs real SPF/DKIM signing.
#[derive(Clone)]
struct PlaceholderHeader {
    name: &'static str,
    value: String,
}

impl Header for PlaceholderHeader {
    fn name() -> HeaderName {
        // Only used via `display`; `parse` is never exercised by this adapter.
        HeaderName::new_from_ascii("X-Relay-Placeholder".to_string()).expect("valid header name")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Self {
            name: "X-Relay-Placeholder",
            value: s.to_string(),
        })
    }

    fn display(&self) -> HeaderValue {
        let name = HeaderName::new_from_ascii(self.name.to_string()).expect("valid header name");
        HeaderValue::new(name, self.value.clone())
    }
}

pub struct EmailAdapter {
    smtp: SmtpConfig,
    add_spf_header: bool,
    add_dkim_header: bool,
}

impl EmailAdapter {
    #[must_use]
    pub const fn new(smtp: SmtpConfig, add_spf_header: bool, add_dkim_header: bool) -> Self {
        Self {
            smtp,
            add_spf_header,
            add_dkim_header,
        }
    }

    fn validate_attachments(metadata: &serde_json::Value) -> Result<(), DeliveryError> {
        let Some(attachments) = metadata.get("attachments").and_then(|a| a.as_object()) else {
            return Ok(());
        };
        let total: u64 = attachments
            .values()
            .filter_map(|meta| meta.get("size").and_then(serde_json::Value::as_u64))
            .sum();
        if total > MAX_ATTACHMENT_BYTES {
            return Err(
                PermanentError::MessageTooLarge("attachments exceed 10MiB total size limit".into())
                    .into(),
            );
        }
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for EmailAdapter {
    async fn send(
        &self,
        request: &NotificationRequest,
        rendered: &Content,
    ) -> Result<DispatchOutcome, DeliveryError> {
        let start = std::time::Instant::now();

        if !request.recipient.contains('@') {
            return Err(PermanentError::InvalidRecipient("invalid email recipient".into()).into());
        }

        Self::validate_attachments(&request.metadata)?;

        let subject = rendered
            .subject
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("(no subject)")
            .to_string();
        let body = rendered.body.trim();

        let (Some(host), Some(username), Some(password)) = (
            self.smtp.host.clone(),
            self.smtp.username.clone(),
            self.smtp.password.clone(),
        ) else {
            let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
            return Ok(DispatchOutcome {
                provider: "mock",
                latency_ms,
                extra: json!({ "message": "queued" }),
            });
        };

        let from = self
            .smtp
            .from
            .clone()
            .unwrap_or_else(|| username.clone());

        let plain_text = TAG_STRIP.replace_all(body, "").trim().to_string();
        let plain_text = if plain_text.is_empty() {
            "(empty)".to_string()
        } else {
            plain_text
        };
        let html_body = if body.is_empty() {
            "<p>(empty)</p>".to_string()
        } else {
            body.to_string()
        };

        let mut message_builder = Message::builder()
            .from(from.parse().map_err(|e| {
                DeliveryError::System(crate::error::SystemError::Configuration(format!(
                    "invalid SMTP_FROM address: {e}"
                )))
            })?)
            .to(request.recipient.parse().map_err(|_| {
                PermanentError::InvalidRecipient("invalid email recipient".into())
            })?)
            .subject(subject);

        if self.add_spf_header {
            message_builder = message_builder.header(PlaceholderHeader {
                name: "Received-SPF",
                value: "pass (placeholder)".to_string(),
            });
        }
        if self.add_dkim_header {
            message_builder = message_builder.header(PlaceholderHeader {
                name: "DKIM-Signature",
                value: "v=1; a=rsa-sha256; d=example.com; s=default; (placeholder)".to_string(),
            });
        }

        let email = message_builder
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(plain_text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(html_body),
                    ),
            )
            .map_err(|e| {
                DeliveryError::System(crate::error::SystemError::Internal(format!(
                    "failed to build email message: {e}"
                )))
            })?;

        let builder = if self.smtp.use_starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
        }
        .map_err(|e| TransientError::Smtp(format!("failed to configure relay: {e}")))?
        .port(self.smtp.port)
        .credentials(Credentials::new(username, password));

        let transport = builder.build();

        transport
            .send(email)
            .await
            .map_err(|e| TransientError::Smtp(e.to_string()))?;

        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        Ok(DispatchOutcome {
            provider: "smtp",
            latency_ms,
            extra: json!({}),
        })
    }
}
