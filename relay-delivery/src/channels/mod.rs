//! Channel adapters.
//!
//! Uniform contract: `send(request, rendered) -> metadata | {Permanent, Transient}`.
//! A registry maps each [`Channel`] to its adapter; there is exactly one
//! built-in adapter per channel, so dispatch is a match rather than a
//! dynamic lookup failure path.

pub mod email;
pub mod push;
pub mod sms;
pub mod webhook;

use std::sync::Arc;

use async_trait::async_trait;
use relay_common::{Channel, Content, NotificationRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DeliveryError;

/// Metadata returned by a successful dispatch. Always carries `latency_ms`
/// and a `provider` tag; channel-specific fields (segments, receipt id,
/// status code) live in `extra`.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub provider: &'static str,
    pub latency_ms: f64,
    #[serde(flatten)]
    pub extra: Value,
}

#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    async fn send(
        &self,
        request: &NotificationRequest,
        rendered: &Content,
    ) -> Result<DispatchOutcome, DeliveryError>;
}

/// Shared simulator/transport settings for the built-in adapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Shared simulated failure probability for the SMS/push mocks.
    #[serde(default = "defaults::failure_rate")]
    pub failure_rate: f64,
    #[serde(default)]
    pub smtp: email::SmtpConfig,
    #[serde(default = "defaults::add_spf_header")]
    pub add_spf_header: bool,
    #[serde(default = "defaults::add_dkim_header")]
    pub add_dkim_header: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            failure_rate: defaults::failure_rate(),
            smtp: email::SmtpConfig::default(),
            add_spf_header: defaults::add_spf_header(),
            add_dkim_header: defaults::add_dkim_header(),
        }
    }
}

mod defaults {
    pub const fn failure_rate() -> f64 {
        0.05
    }

    pub const fn add_spf_header() -> bool {
        true
    }

    pub const fn add_dkim_header() -> bool {
        true
    }
}

/// Resolves a [`Channel`] to the adapter that handles it. Lets the worker
/// pool depend on something narrower than the concrete registry, so tests
/// can substitute canned adapters without a network.
pub trait ChannelSource: Send + Sync {
    fn resolve(&self, channel: Channel) -> Arc<dyn ChannelAdapter>;
}

/// Fixed registry of the four built-in channel adapters.
pub struct ChannelRegistry {
    email: Arc<dyn ChannelAdapter>,
    sms: Arc<dyn ChannelAdapter>,
    push: Arc<dyn ChannelAdapter>,
    webhook: Arc<dyn ChannelAdapter>,
}

impl ChannelRegistry {
    #[must_use]
    pub fn new(config: ChannelConfig) -> Self {
        Self {
            email: Arc::new(email::EmailAdapter::new(
                config.smtp.clone(),
                config.add_spf_header,
                config.add_dkim_header,
            )),
            sms: Arc::new(sms::SmsAdapter::new(config.failure_rate)),
            push: Arc::new(push::PushAdapter::new(config.failure_rate)),
            webhook: Arc::new(webhook::WebhookAdapter::new()),
        }
    }

    #[must_use]
    pub fn get(&self, channel: Channel) -> Arc<dyn ChannelAdapter> {
        match channel {
            Channel::Email => self.email.clone(),
            Channel::Sms => self.sms.clone(),
            Channel::Push => self.push.clone(),
            Channel::Webhook => self.webhook.clone(),
        }
    }
}

impl ChannelSource for ChannelRegistry {
    fn resolve(&self, channel: Channel) -> Arc<dyn ChannelAdapter> {
        self.get(channel)
    }
}
