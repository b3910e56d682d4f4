pub mod analytics;
pub mod channel;
pub mod error;
pub mod ids;
pub mod logging;
pub mod notification;
pub mod priority;
pub mod recipient;
pub mod schedule;
pub mod signal;
pub mod template;

pub use analytics::AnalyticsSummary;
pub use channel::Channel;
pub use error::ValidationError;
pub use notification::{
    AttemptStatus, Content, DeliveryAttempt, Notification, NotificationRequest,
    NotificationStatus, NotificationStatusResponse,
};
pub use priority::Priority;
pub use recipient::Recipient;
pub use schedule::{ResolvedScheduleRequest, ScheduleRequest, ScheduledNotification};
pub use signal::Signal;
pub use template::{Template, TemplateCreateRequest, TemplateListQuery, TemplateListResponse};
pub use tracing;
