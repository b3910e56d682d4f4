//! Read-only delivery analytics summary.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsSummary {
    pub by_channel_delivery_rates: HashMap<String, f64>,
    pub avg_delivery_time_ms: f64,
    pub failure_reasons: HashMap<String, u64>,
    pub time_window_start: DateTime<Utc>,
    pub time_window_end: DateTime<Utc>,
}
