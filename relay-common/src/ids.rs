//! Opaque identifier generation.
//!
//! A fresh UUIDv4 string per tracking ID, batch ID, and template ID;
//! schedules get their own `schedule_id` the same way. No structured ID
//! scheme beyond that.

use uuid::Uuid;

#[must_use]
pub fn new_tracking_id() -> String {
    Uuid::new_v4().to_string()
}

#[must_use]
pub fn new_batch_id() -> String {
    Uuid::new_v4().to_string()
}

#[must_use]
pub fn new_template_id() -> String {
    Uuid::new_v4().to_string()
}

#[must_use]
pub fn new_schedule_id() -> String {
    Uuid::new_v4().to_string()
}

#[must_use]
pub fn new_attempt_id() -> String {
    Uuid::new_v4().to_string()
}
