//! The abstract persistence contract.
//!
//! Expressed as a trait so the in-process implementation (the only backing
//! store this repository ships) can later be swapped for a durable one
//! without touching callers — the delivery worker pool, the scheduler, and
//! the HTTP API all depend on `DeliveryStore`, never on `InMemoryStore`
//! directly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relay_common::{
    AnalyticsSummary, AttemptStatus, NotificationRequest, NotificationStatusResponse,
    ResolvedScheduleRequest, ScheduledNotification, Template, TemplateCreateRequest,
    TemplateListQuery,
};

use crate::error::Result;

#[async_trait]
pub trait DeliveryStore: Send + Sync {
    /// Persist a new notification in `queued` state with `attempts = 0`.
    async fn create_notification(&self, request: NotificationRequest) -> Result<String>;

    /// Reconstruct the original request for a notification, the way a
    /// worker reloads it before dispatch.
    async fn reconstruct_request(&self, tracking_id: &str) -> Result<NotificationRequest>;

    /// Append an attempt and update the parent row's derived fields.
    #[allow(clippy::too_many_arguments)]
    async fn record_attempt(
        &self,
        tracking_id: &str,
        attempt_number: u32,
        status: AttemptStatus,
        latency_ms: f64,
        error_message: Option<String>,
        response_code: Option<u16>,
    ) -> Result<()>;

    /// Mark a notification `sending` ahead of dispatch.
    async fn mark_sending(&self, tracking_id: &str) -> Result<()>;

    async fn get_notification(&self, tracking_id: &str) -> Result<NotificationStatusResponse>;

    async fn create_template(&self, req: TemplateCreateRequest) -> Result<Template>;
    async fn get_template_by_id(&self, template_id: &str) -> Result<Option<Template>>;
    async fn get_active_template_by_name(&self, name: &str) -> Result<Option<Template>>;
    async fn list_templates(
        &self,
        query: TemplateListQuery,
    ) -> Result<(Vec<Template>, u64)>;
    async fn set_template_active(&self, template_id: &str, active: bool) -> Result<bool>;

    async fn create_schedule(&self, req: ResolvedScheduleRequest) -> Result<String>;
    async fn list_due_schedules(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledNotification>>;
    async fn update_schedule(&self, schedule: ScheduledNotification) -> Result<()>;

    async fn summary(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<AnalyticsSummary>;
}
