//! `/templates` handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use relay_common::{Template, TemplateCreateRequest, TemplateListQuery, TemplateListResponse};

use crate::{error::ApiError, state::AppState};

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TemplateCreateRequest>,
) -> Result<Json<Template>, ApiError> {
    state
        .templates
        .create(request)
        .await
        .map(Json)
        .map_err(Into::into)
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TemplateListQuery>,
) -> Result<Json<TemplateListResponse>, ApiError> {
    let (items, total) = state.templates.list(query).await?;
    Ok(Json(TemplateListResponse { items, total }))
}
