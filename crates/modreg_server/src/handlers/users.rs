//! GET /users — the identity directory backing `users` relations.

use std::sync::Arc;

use axum::{Extension, Json};
use modreg_core::{module::Identity, service::RegistryService};

use crate::error::AppError;

pub async fn list_users(
    Extension(service): Extension<Arc<dyn RegistryService>>,
) -> Result<Json<Vec<Identity>>, AppError> {
    Ok(Json(service.list_users().await?))
}
