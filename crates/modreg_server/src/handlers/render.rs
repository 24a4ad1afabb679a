//! Rendered views for the caller's role.
//!
//! GET /modules/:key/form?record_id= — form, prefilled when `record_id` is given
//! GET /modules/:key/table           — list view of every record

use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use modreg_core::{
    principal::Principal,
    render::{RenderedForm, RenderedTable},
    service::RegistryService,
};
use serde::Deserialize;

use crate::error::AppError;

#[derive(Debug, Default, Deserialize)]
pub struct FormQuery {
    pub record_id: Option<String>,
}

pub async fn render_form(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<dyn RegistryService>>,
    Path(key): Path<String>,
    Query(query): Query<FormQuery>,
) -> Result<Json<RenderedForm>, AppError> {
    let form = service
        .render_form(&principal, &key, query.record_id.as_deref())
        .await?;
    Ok(Json(form))
}

pub async fn render_table(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<dyn RegistryService>>,
    Path(key): Path<String>,
) -> Result<Json<RenderedTable>, AppError> {
    Ok(Json(service.render_table(&principal, &key).await?))
}
