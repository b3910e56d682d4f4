//! Worker pool draining the priority queue.
//!
//! `QUEUE_WORKERS` copies of [`run`] are spawned against one shared
//! [`WorkerContext`]; each loop iteration pops a single `tracking_id` and
//! never lets a failure inside that iteration propagate out — a broken
//! adapter or store call costs one notification, not the worker.

use std::sync::Arc;

use relay_common::{tracing, AttemptStatus, Recipient, Signal};
use relay_store::DeliveryStore;
use relay_templates::TemplateService;
use tokio::sync::broadcast;

use crate::{
    channels::ChannelSource,
    circuit_breaker::CircuitBreaker,
    error::{DeliveryError, PermanentError},
    policy::get_retry_plan,
    queue::{DelayWheel, PriorityQueue},
    rate_limiter::RateLimiter,
};

const RATE_LIMIT_BACKOFF: std::time::Duration = std::time::Duration::from_millis(500);

/// Everything a worker needs, owned once by the controller and shared via `Arc`.
pub struct WorkerContext {
    pub store: Arc<dyn DeliveryStore>,
    pub templates: Arc<TemplateService>,
    pub channels: Arc<dyn ChannelSource>,
    pub circuit_breaker: Arc<CircuitBreaker>,
    pub rate_limiter: Option<Arc<RateLimiter>>,
    pub queue: Arc<PriorityQueue>,
    pub delay_wheel: Arc<DelayWheel>,
}

/// Run one worker loop until `shutdown` fires.
pub async fn run(ctx: Arc<WorkerContext>, worker_id: usize, mut shutdown: broadcast::Receiver<Signal>) {
    loop {
        tokio::select! {
            entry = ctx.queue.pop() => {
                if let Err(error) = process_one(&ctx, &entry.tracking_id, entry.priority_rank).await {
                    tracing::error!(worker_id, tracking_id = %entry.tracking_id, %error, "worker iteration failed");
                }
            }
            signal = shutdown.recv() => {
                if let Ok(Signal::Shutdown) = signal {
                    tracing::debug!(worker_id, "worker shutting down");
                }
                return;
            }
        }
    }
}

fn response_code_of(error: &DeliveryError) -> Option<u16> {
    match error {
        DeliveryError::Permanent(PermanentError::Rejected { status, .. }) => Some(*status),
        _ => None,
    }
}

async fn process_one(ctx: &WorkerContext, tracking_id: &str, priority_rank: u8) -> Result<(), DeliveryError> {
    let status = ctx.store.get_notification(tracking_id).await?;
    let request = ctx.store.reconstruct_request(tracking_id).await?;
    let attempt_number = status.attempts + 1;
    let retry_plan = get_retry_plan(request.priority);
    let recipient = Recipient::new(request.recipient.clone());

    if !ctx.circuit_breaker.allow_request(&recipient) {
        ctx.store
            .record_attempt(
                tracking_id,
                attempt_number,
                AttemptStatus::Failed,
                0.0,
                Some("circuit_open".to_string()),
                None,
            )
            .await?;
        return Ok(());
    }

    if let Some(limiter) = &ctx.rate_limiter {
        let key = format!("recipient:{}", request.recipient);
        if !limiter.allow(&key, 1.0) {
            tokio::time::sleep(RATE_LIMIT_BACKOFF).await;
            ctx.queue.push_rank(priority_rank, tracking_id.to_string());
            return Ok(());
        }
    }

    ctx.store.mark_sending(tracking_id).await?;

    let start = std::time::Instant::now();

    let rendered = match ctx.templates.resolve_and_render(&request).await {
        Ok(content) => content,
        Err(template_error) => {
            let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
            ctx.circuit_breaker.on_failure(&recipient);
            ctx.store
                .record_attempt(
                    tracking_id,
                    attempt_number,
                    AttemptStatus::Failed,
                    latency_ms,
                    Some(template_error.to_string()),
                    None,
                )
                .await?;
            return Ok(());
        }
    };

    let adapter = ctx.channels.resolve(request.channel);
    let channel_label = request.channel.to_string();
    match adapter.send(&request, &rendered).await {
        Ok(outcome) => {
            ctx.circuit_breaker.on_success(&recipient);
            let response_code = outcome
                .extra
                .get("status_code")
                .and_then(serde_json::Value::as_u64)
                .and_then(|code| u16::try_from(code).ok());
            ctx.store
                .record_attempt(
                    tracking_id,
                    attempt_number,
                    AttemptStatus::Delivered,
                    outcome.latency_ms,
                    None,
                    response_code,
                )
                .await?;

            if let Some(metrics) = relay_metrics::try_metrics() {
                metrics
                    .delivery
                    .record_attempt("delivered", &channel_label, outcome.latency_ms / 1000.0);
            }
        }
        Err(error) => {
            let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
            ctx.circuit_breaker.on_failure(&recipient);
            let response_code = response_code_of(&error);
            ctx.store
                .record_attempt(
                    tracking_id,
                    attempt_number,
                    AttemptStatus::Failed,
                    latency_ms,
                    Some(error.attempt_error_message()),
                    response_code,
                )
                .await?;

            let will_retry = !error.is_permanent() && retry_plan.should_retry(attempt_number);
            if will_retry {
                let delay = retry_plan.next_delay(attempt_number + 1);
                ctx.delay_wheel
                    .schedule(delay, priority_rank, tracking_id.to_string());
            }

            if let Some(metrics) = relay_metrics::try_metrics() {
                let outcome = if will_retry { "retry" } else { "failed" };
                metrics
                    .delivery
                    .record_attempt(outcome, &channel_label, latency_ms / 1000.0);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use relay_common::{Channel, Content, NotificationRequest, NotificationStatus, Priority};
    use relay_store::InMemoryStore;
    use serde_json::{json, Value};

    use super::*;
    use crate::channels::{ChannelAdapter, DispatchOutcome};
    use crate::circuit_breaker::CircuitBreakerConfig;

    struct MockAdapter<F>(F);

    #[async_trait]
    impl<F> ChannelAdapter for MockAdapter<F>
    where
        F: Fn() -> Result<DispatchOutcome, DeliveryError> + Send + Sync,
    {
        async fn send(
            &self,
            _request: &NotificationRequest,
            _rendered: &Content,
        ) -> Result<DispatchOutcome, DeliveryError> {
            (self.0)()
        }
    }

    struct SingleChannel(Arc<dyn ChannelAdapter>);

    impl ChannelSource for SingleChannel {
        fn resolve(&self, _channel: Channel) -> Arc<dyn ChannelAdapter> {
            self.0.clone()
        }
    }

    fn base_request(recipient: &str, priority: Priority) -> NotificationRequest {
        NotificationRequest {
            channel: Channel::Webhook,
            recipient: recipient.to_string(),
            template_id: None,
            content: Some(Content {
                subject: None,
                body: "hi".into(),
            }),
            variables: HashMap::new(),
            priority,
            metadata: Value::Null,
        }
    }

    async fn context_with_adapter(adapter: Arc<dyn ChannelAdapter>) -> (Arc<WorkerContext>, Arc<dyn DeliveryStore>) {
        let store: Arc<dyn DeliveryStore> = Arc::new(InMemoryStore::default());
        let ctx = Arc::new(WorkerContext {
            store: store.clone(),
            templates: Arc::new(TemplateService::new(store.clone())),
            channels: Arc::new(SingleChannel(adapter)),
            circuit_breaker: Arc::new(CircuitBreaker::new(CircuitBreakerConfig::default())),
            rate_limiter: None,
            queue: Arc::new(PriorityQueue::new()),
            delay_wheel: Arc::new(DelayWheel::new()),
        });
        (ctx, store)
    }

    #[tokio::test]
    async fn test_successful_delivery_marks_delivered() {
        let adapter: Arc<dyn ChannelAdapter> = Arc::new(MockAdapter(|| {
            Ok(DispatchOutcome {
                provider: "mock",
                latency_ms: 1.0,
                extra: json!({}),
            })
        }));
        let (ctx, store) = context_with_adapter(adapter).await;
        let tracking_id = store
            .create_notification(base_request("https://example.com/hook", Priority::Normal))
            .await
            .unwrap();

        process_one(&ctx, &tracking_id, Priority::Normal.rank())
            .await
            .unwrap();

        let status = store.get_notification(&tracking_id).await.unwrap();
        assert_eq!(status.status, NotificationStatus::Delivered);
        assert_eq!(status.attempts, 1);
    }

    #[tokio::test]
    async fn test_permanent_failure_does_not_retry() {
        let adapter: Arc<dyn ChannelAdapter> = Arc::new(MockAdapter(|| {
            Err(PermanentError::InvalidRecipient("bad".into()).into())
        }));
        let (ctx, store) = context_with_adapter(adapter).await;
        let tracking_id = store
            .create_notification(base_request("https://example.com/hook", Priority::Normal))
            .await
            .unwrap();

        process_one(&ctx, &tracking_id, Priority::Normal.rank())
            .await
            .unwrap();

        let status = store.get_notification(&tracking_id).await.unwrap();
        assert_eq!(status.status, NotificationStatus::Failed);
        assert_eq!(ctx.queue.depth(), 0);
    }

    #[tokio::test]
    async fn test_transient_failure_trips_breaker() {
        let adapter: Arc<dyn ChannelAdapter> = Arc::new(MockAdapter(|| {
            Err(crate::error::TransientError::Network("down".into()).into())
        }));
        let (ctx, store) = context_with_adapter(adapter).await;
        let tracking_id = store
            .create_notification(base_request("https://example.com/hook", Priority::Critical))
            .await
            .unwrap();

        process_one(&ctx, &tracking_id, Priority::Critical.rank())
            .await
            .unwrap();

        let status = store.get_notification(&tracking_id).await.unwrap();
        assert_eq!(status.status, NotificationStatus::Failed);
        let recipient = Recipient::new("https://example.com/hook");
        assert_eq!(ctx.circuit_breaker.get_state(&recipient), crate::circuit_breaker::CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_open_circuit_skips_dispatch_without_reenqueue() {
        let adapter: Arc<dyn ChannelAdapter> = Arc::new(MockAdapter(|| {
            Err(crate::error::TransientError::Network("down".into()).into())
        }));
        let (ctx, store) = context_with_adapter(adapter).await;
        let recipient = Recipient::new("https://example.com/hook");
        for _ in 0..5 {
            ctx.circuit_breaker.on_failure(&recipient);
        }

        let tracking_id = store
            .create_notification(base_request("https://example.com/hook", Priority::Normal))
            .await
            .unwrap();
        process_one(&ctx, &tracking_id, Priority::Normal.rank())
            .await
            .unwrap();

        let status = store.get_notification(&tracking_id).await.unwrap();
        assert_eq!(status.status, NotificationStatus::Failed);
        assert_eq!(status.failure_reason.as_deref(), Some("circuit_open"));
        assert_eq!(ctx.queue.depth(), 0);
    }

    #[tokio::test]
    async fn test_rate_limit_denial_reenqueues_same_priority() {
        let adapter: Arc<dyn ChannelAdapter> = Arc::new(MockAdapter(|| {
            Ok(DispatchOutcome {
                provider: "mock",
                latency_ms: 1.0,
                extra: json!({}),
            })
        }));
        let (mut ctx_value, store) = context_with_adapter(adapter).await;
        let limiter = Arc::new(RateLimiter::new(crate::rate_limiter::RateLimitConfig {
            capacity: 0.0,
            refill_rate: 0.0,
        }));
        Arc::get_mut(&mut ctx_value).unwrap().rate_limiter = Some(limiter);
        let ctx = ctx_value;

        let tracking_id = store
            .create_notification(base_request("https://example.com/hook", Priority::Normal))
            .await
            .unwrap();
        process_one(&ctx, &tracking_id, Priority::Normal.rank())
            .await
            .unwrap();

        let status = store.get_notification(&tracking_id).await.unwrap();
        assert_eq!(status.status, NotificationStatus::Queued);
        assert_eq!(ctx.queue.depth(), 1);
    }
}
