//! Scheduled (one-off or recurring) notification data model.

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::notification::NotificationRequest;

/// A notification request whose admission is deferred to a future moment,
/// optionally repeating on a cron schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledNotification {
    pub schedule_id: String,
    pub notification: NotificationRequest,
    /// The resolved UTC instant to fire at.
    pub send_at: DateTime<Utc>,
    pub timezone: String,
    /// Five-field cron expression; absent means one-off.
    pub recurrence: Option<String>,
    pub last_run: Option<DateTime<Utc>>,
    pub active: bool,
}

/// The wire shape accepted from clients: `send_at` is a naive wall-clock
/// time, interpreted in `timezone` rather than UTC.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleRequest {
    pub notification: NotificationRequest,
    pub send_at: NaiveDateTime,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub recurrence: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

/// `ScheduleRequest` with `send_at` resolved from its naive wall-clock
/// reading plus `timezone` to a concrete UTC instant, ready to persist.
#[derive(Debug, Clone)]
pub struct ResolvedScheduleRequest {
    pub notification: NotificationRequest,
    pub send_at: DateTime<Utc>,
    pub timezone: String,
    pub recurrence: Option<String>,
    pub active: bool,
}

impl ScheduleRequest {
    /// Converts `send_at` from a naive wall-clock reading in `timezone` to
    /// UTC. A local time that falls in a DST spring-forward gap or in a
    /// fall-back overlap resolves to its earliest possible UTC instant.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownTimezone`] if `timezone` is not a
    /// recognized IANA name.
    pub fn resolve(self) -> Result<ResolvedScheduleRequest, ValidationError> {
        let tz = Tz::from_str(&self.timezone)
            .map_err(|_| ValidationError::UnknownTimezone(self.timezone.clone()))?;
        let send_at = tz
            .from_local_datetime(&self.send_at)
            .earliest()
            .ok_or_else(|| ValidationError::UnknownTimezone(self.timezone.clone()))?
            .with_timezone(&Utc);
        Ok(ResolvedScheduleRequest {
            notification: self.notification,
            send_at,
            timezone: self.timezone,
            recurrence: self.recurrence,
            active: self.active,
        })
    }
}

fn default_timezone() -> String {
    "UTC".to_string()
}

const fn default_active() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::channel::Channel;

    fn notification() -> NotificationRequest {
        NotificationRequest {
            channel: Channel::Email,
            recipient: "a@example.com".to_string(),
            template_id: None,
            content: None,
            variables: std::collections::HashMap::new(),
            priority: crate::priority::Priority::Normal,
            metadata: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_resolve_converts_naive_local_time_to_utc() {
        let send_at = NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let request = ScheduleRequest {
            notification: notification(),
            send_at,
            timezone: "America/New_York".to_string(),
            recurrence: None,
            active: true,
        };
        // 09:00 EST (UTC-5) in January is 14:00 UTC.
        let resolved = request.resolve().unwrap();
        assert_eq!(
            resolved.send_at,
            Utc.with_ymd_and_hms(2026, 1, 1, 14, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_resolve_rejects_unknown_timezone() {
        let send_at = NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let request = ScheduleRequest {
            notification: notification(),
            send_at,
            timezone: "Not/AZone".to_string(),
            recurrence: None,
            active: true,
        };
        assert!(matches!(
            request.resolve(),
            Err(ValidationError::UnknownTimezone(_))
        ));
    }
}
