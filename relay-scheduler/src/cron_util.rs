//! Cron recurrence evaluation.
//!
//! The stored cron expression is a standard five-field expression; the
//! `cron` crate expects a leading seconds field, so a bare five-field
//! expression is normalized by prepending `"0 "` before parsing.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;

use crate::error::SchedulerError;

fn normalize(expr: &str) -> String {
    let fields = expr.split_whitespace().count();
    if fields == 5 {
        format!("0 {expr}")
    } else {
        expr.to_string()
    }
}

fn parse_timezone(tz_name: &str) -> Result<Tz, SchedulerError> {
    Tz::from_str(tz_name).map_err(|_| SchedulerError::InvalidTimezone(tz_name.to_string()))
}

fn parse_schedule(cron_expr: &str) -> Result<Schedule, SchedulerError> {
    Schedule::from_str(&normalize(cron_expr))
        .map_err(|error| SchedulerError::InvalidCron(cron_expr.to_string(), error.to_string()))
}

/// Compute the next firing time, strictly after `after_utc`, for `cron_expr`
/// evaluated in `tz_name`. The schedule's own timezone is preserved across
/// recomputation; only the stored `send_at` instant changes.
///
/// # Errors
///
/// Returns an error if `tz_name` is not a recognized IANA timezone or
/// `cron_expr` does not parse as a five- or six-field cron expression.
pub fn next_occurrence(
    after_utc: DateTime<Utc>,
    cron_expr: &str,
    tz_name: &str,
) -> Result<DateTime<Utc>, SchedulerError> {
    let tz = parse_timezone(tz_name)?;
    let schedule = parse_schedule(cron_expr)?;

    let after_local = after_utc.with_timezone(&tz);
    let next_local = schedule
        .after(&after_local)
        .next()
        .ok_or_else(|| SchedulerError::InvalidCron(cron_expr.to_string(), "no upcoming occurrence".to_string()))?;

    Ok(next_local.with_timezone(&Utc))
}
