//! HTTP error mapping for registry failures.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use modreg_core::error::RegistryError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or invalid bearer token.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let registry = match self {
            AppError::Unauthenticated(reason) => {
                tracing::debug!("rejecting request: {reason}");
                return (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "error": format!("unauthenticated: {reason}") })),
                )
                    .into_response();
            }
            AppError::Registry(e) => e,
        };

        let status = StatusCode::from_u16(registry.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = match &registry {
            RegistryError::Internal(e) => {
                tracing::error!("internal error: {e:#}");
                json!({ "error": "internal error" })
            }
            RegistryError::Validation(errors) => json!({
                "error": registry.to_string(),
                "field_errors": errors,
            }),
            RegistryError::HydrationFailure { field, .. } => json!({
                "error": registry.to_string(),
                "field": field,
            }),
            _ => json!({ "error": registry.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
