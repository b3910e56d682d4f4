//! Scheduler loop.
//!
//! Polls the store every `poll_interval_ms` for active schedules whose
//! `send_at` is due, admits each one through the same path as the HTTP
//! intake surface, and advances or retires the schedule. A single bad row
//! is logged and skipped; it never aborts the loop.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use relay_common::{ScheduledNotification, Signal};
use relay_delivery::PriorityQueue;
use relay_store::DeliveryStore;
use tokio::sync::broadcast;

use crate::cron_util;

/// Shared handles the scheduler loop needs, owned once by the controller.
pub struct SchedulerContext {
    pub store: Arc<dyn DeliveryStore>,
    pub queue: Arc<PriorityQueue>,
}

/// Run the scheduler loop until `shutdown` fires.
pub async fn run(
    ctx: Arc<SchedulerContext>,
    poll_interval: Duration,
    mut shutdown: broadcast::Receiver<Signal>,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                process_due_schedules(&ctx).await;
            }
            signal = shutdown.recv() => {
                if let Ok(Signal::Shutdown) = signal {
                    tracing::debug!("scheduler shutting down");
                }
                return;
            }
        }
    }
}

async fn process_due_schedules(ctx: &SchedulerContext) {
    let now = Utc::now();
    let due = match ctx.store.list_due_schedules(now).await {
        Ok(due) => due,
        Err(error) => {
            tracing::error!(%error, "failed to scan for due schedules");
            return;
        }
    };

    for schedule in due {
        if let Err(error) = process_one(ctx, schedule.clone(), now).await {
            tracing::error!(
                schedule_id = %schedule.schedule_id,
                %error,
                "failed processing schedule"
            );
        }
    }
}

async fn process_one(
    ctx: &SchedulerContext,
    mut schedule: ScheduledNotification,
    now: chrono::DateTime<Utc>,
) -> Result<(), crate::error::SchedulerError> {
    relay_delivery::admit(ctx.store.as_ref(), &ctx.queue, schedule.notification.clone()).await?;
    schedule.last_run = Some(now);

    if let Some(recurrence) = schedule.recurrence.clone() {
        schedule.send_at = cron_util::next_occurrence(now, &recurrence, &schedule.timezone)?;
    } else {
        schedule.active = false;
    }

    ctx.store.update_schedule(schedule).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use relay_common::{Channel, Content, NotificationRequest, Priority, ResolvedScheduleRequest};
    use relay_store::InMemoryStore;

    use super::*;

    fn notification() -> NotificationRequest {
        NotificationRequest {
            channel: Channel::Email,
            recipient: "a@example.com".to_string(),
            template_id: None,
            content: Some(Content {
                subject: Some("hi".to_string()),
                body: "hi".to_string(),
            }),
            variables: HashMap::new(),
            priority: Priority::Normal,
            metadata: serde_json::Value::Null,
        }
    }

    async fn context_with_due_schedule(recurrence: Option<&str>) -> (Arc<SchedulerContext>, String) {
        let store: Arc<dyn DeliveryStore> = Arc::new(InMemoryStore::new(None));
        let schedule_id = store
            .create_schedule(ResolvedScheduleRequest {
                notification: notification(),
                send_at: Utc::now() - chrono::Duration::seconds(5),
                timezone: "UTC".to_string(),
                recurrence: recurrence.map(ToString::to_string),
                active: true,
            })
            .await
            .unwrap();

        let ctx = Arc::new(SchedulerContext {
            store,
            queue: Arc::new(PriorityQueue::new()),
        });
        (ctx, schedule_id)
    }

    #[tokio::test]
    async fn test_one_off_schedule_fires_and_deactivates() {
        let (ctx, schedule_id) = context_with_due_schedule(None).await;

        process_due_schedules(&ctx).await;

        assert_eq!(ctx.queue.depth(), 1);
        let due = ctx.store.list_due_schedules(Utc::now()).await.unwrap();
        assert!(due.iter().all(|s| s.schedule_id != schedule_id));
    }

    #[tokio::test]
    async fn test_recurring_schedule_advances_send_at() {
        let (ctx, schedule_id) = context_with_due_schedule(Some("0 0 * * *")).await;
        let before = Utc::now();

        process_due_schedules(&ctx).await;

        assert_eq!(ctx.queue.depth(), 1);
        // The recurring schedule should have moved to a future send_at and
        // therefore no longer be immediately due.
        let due = ctx.store.list_due_schedules(Utc::now()).await.unwrap();
        assert!(due.iter().all(|s| s.schedule_id != schedule_id));
        let _ = before;
    }

    #[tokio::test]
    async fn test_bad_cron_on_one_schedule_does_not_abort_scan() {
        let (ctx, _) = context_with_due_schedule(Some("not a cron")).await;
        // Should log and return without panicking.
        process_due_schedules(&ctx).await;
    }
}
