//! `/analytics/summary` handler.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use relay_common::AnalyticsSummary;
use serde::Deserialize;

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub window_start: Option<DateTime<Utc>>,
    pub window_end: Option<DateTime<Utc>>,
}

pub async fn summary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<AnalyticsSummary>, ApiError> {
    let window_end = query.window_end.unwrap_or_else(Utc::now);
    let window_start = query
        .window_start
        .unwrap_or_else(|| window_end - Duration::hours(24));

    state
        .store
        .summary(window_start, window_end)
        .await
        .map(Json)
        .map_err(Into::into)
}
