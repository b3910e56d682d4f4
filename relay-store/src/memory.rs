//! In-memory `DeliveryStore` implementation.
//!
//! One `RwLock`-guarded map per entity kind, owned by a single struct
//! cloned around as an `Arc`. Reads (status queries, analytics) never
//! block each other; only the rare write path takes the write guard.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relay_common::{
    AnalyticsSummary, AttemptStatus, DeliveryAttempt, Notification, NotificationRequest,
    NotificationStatus, NotificationStatusResponse, ResolvedScheduleRequest, ScheduledNotification,
    Template, TemplateCreateRequest, TemplateListQuery, TemplateListResponse,
};

use crate::error::{Result, StoreError};
use crate::traits::DeliveryStore;

struct NotificationRow {
    notification: Notification,
    attempts: Vec<DeliveryAttempt>,
}

/// In-process backing store. Not durable, not shared across processes;
/// there is no cross-process coordination here by design.
pub struct InMemoryStore {
    notifications: RwLock<HashMap<String, NotificationRow>>,
    templates: RwLock<HashMap<String, Template>>,
    schedules: RwLock<HashMap<String, ScheduledNotification>>,
    capacity: Option<usize>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            notifications: RwLock::new(HashMap::new()),
            templates: RwLock::new(HashMap::new()),
            schedules: RwLock::new(HashMap::new()),
            capacity,
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl DeliveryStore for InMemoryStore {
    async fn create_notification(&self, request: NotificationRequest) -> Result<String> {
        let tracking_id = relay_common::ids::new_tracking_id();
        let mut guard = self.notifications.write()?;
        if let Some(cap) = self.capacity {
            if guard.len() >= cap {
                return Err(StoreError::CapacityExceeded(cap));
            }
        }
        let notification = Notification::new(tracking_id.clone(), request);
        guard.insert(
            tracking_id.clone(),
            NotificationRow {
                notification,
                attempts: Vec::new(),
            },
        );
        Ok(tracking_id)
    }

    async fn reconstruct_request(&self, tracking_id: &str) -> Result<NotificationRequest> {
        let guard = self.notifications.read()?;
        guard
            .get(tracking_id)
            .map(|row| row.notification.request.clone())
            .ok_or_else(|| StoreError::NotificationNotFound(tracking_id.to_string()))
    }

    async fn record_attempt(
        &self,
        tracking_id: &str,
        attempt_number: u32,
        status: AttemptStatus,
        latency_ms: f64,
        error_message: Option<String>,
        response_code: Option<u16>,
    ) -> Result<()> {
        let mut guard = self.notifications.write()?;
        let row = guard
            .get_mut(tracking_id)
            .ok_or_else(|| StoreError::NotificationNotFound(tracking_id.to_string()))?;

        let attempted_at = Utc::now();
        row.attempts.push(DeliveryAttempt {
            attempt_number,
            status,
            error_message: error_message.clone(),
            response_code,
            attempted_at,
            latency_ms,
        });

        let notif = &mut row.notification;
        notif.attempts = notif.attempts.max(attempt_number);
        notif.last_attempt_at = Some(attempted_at);
        match status {
            AttemptStatus::Delivered => {
                notif.status = NotificationStatus::Delivered;
                notif.delivered_at = Some(attempted_at);
                notif.failure_reason = None;
            }
            AttemptStatus::Failed => {
                notif.status = NotificationStatus::Failed;
                notif.failure_reason = error_message;
            }
        }
        Ok(())
    }

    async fn mark_sending(&self, tracking_id: &str) -> Result<()> {
        let mut guard = self.notifications.write()?;
        let row = guard
            .get_mut(tracking_id)
            .ok_or_else(|| StoreError::NotificationNotFound(tracking_id.to_string()))?;
        row.notification.status = NotificationStatus::Sending;
        Ok(())
    }

    async fn get_notification(&self, tracking_id: &str) -> Result<NotificationStatusResponse> {
        let guard = self.notifications.read()?;
        let row = guard
            .get(tracking_id)
            .ok_or_else(|| StoreError::NotificationNotFound(tracking_id.to_string()))?;
        let mut attempts = row.attempts.clone();
        attempts.sort_by_key(|a| a.attempt_number);
        Ok(NotificationStatusResponse {
            tracking_id: tracking_id.to_string(),
            status: row.notification.status,
            channel: row.notification.request.channel,
            recipient: row.notification.request.recipient.clone(),
            attempts: row.notification.attempts,
            last_attempt_at: row.notification.last_attempt_at,
            delivered_at: row.notification.delivered_at,
            failure_reason: row.notification.failure_reason.clone(),
            delivery_attempts: attempts,
        })
    }

    async fn create_template(&self, req: TemplateCreateRequest) -> Result<Template> {
        let mut guard = self.templates.write()?;
        if guard.values().any(|t| t.name == req.name) {
            return Err(StoreError::DuplicateTemplateName(req.name));
        }
        let now = Utc::now();
        let template = Template {
            template_id: relay_common::ids::new_template_id(),
            name: req.name,
            channel: req.channel,
            content: relay_common::Content {
                subject: req.subject,
                body: req.body,
            },
            variables: req.variables,
            active: req.active,
            created_at: now,
            updated_at: now,
        };
        guard.insert(template.template_id.clone(), template.clone());
        Ok(template)
    }

    async fn get_template_by_id(&self, template_id: &str) -> Result<Option<Template>> {
        Ok(self.templates.read()?.get(template_id).cloned())
    }

    async fn get_active_template_by_name(&self, name: &str) -> Result<Option<Template>> {
        Ok(self
            .templates
            .read()?
            .values()
            .find(|t| t.name == name && t.active)
            .cloned())
    }

    async fn list_templates(&self, query: TemplateListQuery) -> Result<(Vec<Template>, u64)> {
        let guard = self.templates.read()?;
        let mut items: Vec<Template> = guard
            .values()
            .filter(|t| query.channel.is_none_or(|c| c == t.channel))
            .filter(|t| query.active.is_none_or(|a| a == t.active))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = items.len() as u64;
        let start = ((query.page.max(1) - 1) as usize) * query.size as usize;
        let page = items
            .into_iter()
            .skip(start)
            .take(query.size as usize)
            .collect();
        Ok((page, total))
    }

    async fn set_template_active(&self, template_id: &str, active: bool) -> Result<bool> {
        let mut guard = self.templates.write()?;
        if let Some(t) = guard.get_mut(template_id) {
            t.active = active;
            t.updated_at = Utc::now();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn create_schedule(&self, req: ResolvedScheduleRequest) -> Result<String> {
        let schedule_id = relay_common::ids::new_schedule_id();
        let schedule = ScheduledNotification {
            schedule_id: schedule_id.clone(),
            notification: req.notification,
            send_at: req.send_at,
            timezone: req.timezone,
            recurrence: req.recurrence,
            last_run: None,
            active: req.active,
        };
        self.schedules.write()?.insert(schedule_id.clone(), schedule);
        Ok(schedule_id)
    }

    async fn list_due_schedules(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledNotification>> {
        let guard = self.schedules.read()?;
        Ok(guard
            .values()
            .filter(|s| s.active)
            .filter(|s| s.send_at <= now)
            .filter(|s| s.last_run.is_none_or(|last| last < s.send_at))
            .cloned()
            .collect())
    }

    async fn update_schedule(&self, schedule: ScheduledNotification) -> Result<()> {
        let mut guard = self.schedules.write()?;
        guard.insert(schedule.schedule_id.clone(), schedule);
        Ok(())
    }

    async fn summary(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<AnalyticsSummary> {
        let guard = self.notifications.read()?;
        let in_window: Vec<&NotificationRow> = guard
            .values()
            .filter(|row| {
                row.notification.created_at >= window_start
                    && row.notification.created_at <= window_end
            })
            .collect();

        let mut totals: HashMap<String, u64> = HashMap::new();
        let mut delivered: HashMap<String, u64> = HashMap::new();
        let mut total_ms = 0.0_f64;
        let mut delivered_count = 0_u64;
        let mut failure_reasons: HashMap<String, u64> = HashMap::new();

        for row in &in_window {
            let channel = row.notification.request.channel.to_string();
            *totals.entry(channel.clone()).or_insert(0) += 1;
            match row.notification.status {
                NotificationStatus::Delivered => {
                    *delivered.entry(channel).or_insert(0) += 1;
                    if let Some(delivered_at) = row.notification.delivered_at {
                        let delta = delivered_at - row.notification.created_at;
                        total_ms += delta.num_milliseconds() as f64;
                        delivered_count += 1;
                    }
                }
                NotificationStatus::Failed | NotificationStatus::Bounced => {
                    let reason = row
                        .notification
                        .failure_reason
                        .clone()
                        .unwrap_or_else(|| "unknown".to_string());
                    *failure_reasons.entry(reason).or_insert(0) += 1;
                }
                _ => {}
            }
        }

        let by_channel_delivery_rates = totals
            .into_iter()
            .map(|(channel, total)| {
                let delivered = delivered.get(&channel).copied().unwrap_or(0);
                let rate = if total > 0 {
                    delivered as f64 / total as f64
                } else {
                    0.0
                };
                (channel, rate)
            })
            .collect();

        let avg_delivery_time_ms = if delivered_count > 0 {
            total_ms / delivered_count as f64
        } else {
            0.0
        };

        Ok(AnalyticsSummary {
            by_channel_delivery_rates,
            avg_delivery_time_ms,
            failure_reasons,
            time_window_start: window_start,
            time_window_end: window_end,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_common::{Channel, Content, Priority};
    use std::collections::HashMap as StdHashMap;

    fn sample_request() -> NotificationRequest {
        NotificationRequest {
            channel: Channel::Email,
            recipient: "user@example.com".into(),
            template_id: None,
            content: Some(Content {
                subject: Some("hi".into()),
                body: "body".into(),
            }),
            variables: StdHashMap::new(),
            priority: Priority::Normal,
            metadata: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_notification() {
        let store = InMemoryStore::default();
        let id = store.create_notification(sample_request()).await.unwrap();
        let status = store.get_notification(&id).await.unwrap();
        assert_eq!(status.status, NotificationStatus::Queued);
        assert_eq!(status.attempts, 0);
    }

    #[tokio::test]
    async fn test_record_attempt_updates_parent() {
        let store = InMemoryStore::default();
        let id = store.create_notification(sample_request()).await.unwrap();
        store
            .record_attempt(&id, 1, AttemptStatus::Failed, 5.0, Some("boom".into()), None)
            .await
            .unwrap();
        let status = store.get_notification(&id).await.unwrap();
        assert_eq!(status.status, NotificationStatus::Failed);
        assert_eq!(status.attempts, 1);
        assert_eq!(status.failure_reason.as_deref(), Some("boom"));

        store
            .record_attempt(&id, 2, AttemptStatus::Delivered, 3.0, None, None)
            .await
            .unwrap();
        let status = store.get_notification(&id).await.unwrap();
        assert_eq!(status.status, NotificationStatus::Delivered);
        assert_eq!(status.attempts, 2);
        assert!(status.failure_reason.is_none());
        assert!(status.delivered_at.is_some());
        assert_eq!(status.delivery_attempts.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_template_name_rejected() {
        let store = InMemoryStore::default();
        let req = TemplateCreateRequest {
            name: "welcome".into(),
            channel: Channel::Push,
            subject: None,
            body: "hi".into(),
            variables: vec![],
            active: true,
        };
        store.create_template(req.clone()).await.unwrap();
        let err = store.create_template(req).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateTemplateName(_)));
    }

    #[tokio::test]
    async fn test_capacity_exceeded() {
        let store = InMemoryStore::new(Some(1));
        store.create_notification(sample_request()).await.unwrap();
        let err = store
            .create_notification(sample_request())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::CapacityExceeded(1)));
    }
}
