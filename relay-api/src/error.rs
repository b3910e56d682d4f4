//! HTTP error mapping: the pipeline's layered error taxonomy collapses to
//! status codes only at this outermost boundary.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(#[from] relay_common::ValidationError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Delivery(#[from] relay_delivery::DeliveryError),

    #[error(transparent)]
    Template(#[from] relay_templates::TemplateError),

    #[error(transparent)]
    Store(#[from] relay_store::StoreError),
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            Self::Validation(error) => (StatusCode::BAD_REQUEST, error.to_string()),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            Self::Template(relay_templates::TemplateError::NotFound(id)) => {
                (StatusCode::NOT_FOUND, format!("template not found: {id}"))
            }
            Self::Store(relay_store::StoreError::NotificationNotFound(id)) => {
                (StatusCode::NOT_FOUND, format!("notification not found: {id}"))
            }
            Self::Store(relay_store::StoreError::TemplateNotFound(id)) => {
                (StatusCode::NOT_FOUND, format!("template not found: {id}"))
            }
            Self::Store(relay_store::StoreError::DuplicateTemplateName(name)) => (
                StatusCode::BAD_REQUEST,
                format!("template with this name already exists: {name}"),
            ),
            _ => {
                tracing::error!(error = %self, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { detail })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_400() {
        let error = ApiError::Validation(relay_common::ValidationError::BatchTooLarge {
            max: 100,
            actual: 101,
        });
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let error = ApiError::NotFound("abc".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_internal_store_error_maps_to_500_without_leaking_detail() {
        let error = ApiError::Store(relay_store::StoreError::Internal("lock poisoned".to_string()));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_duplicate_template_name_maps_to_400() {
        let error = ApiError::Store(relay_store::StoreError::DuplicateTemplateName(
            "welcome".to_string(),
        ));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
