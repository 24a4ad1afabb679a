//! Module definition handlers.
//!
//! GET  /modules               — all definitions (bare)
//! GET  /modules/:key          — one definition (bare)
//! GET  /modules/:key/hydrated — relation options resolved, plus warnings
//! PUT  /modules/:id/fields    — whole-list replace (admin)
//! POST /modules/:key/edit     — one editor command (admin)

use std::sync::Arc;

use axum::{extract::Path, Extension, Json};
use modreg_core::{
    editor::EditCommand,
    field::FieldDescriptor,
    hydrate::HydratedModule,
    module::ModuleDefinition,
    principal::Principal,
    service::RegistryService,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct ReplaceFieldsRequest {
    pub fields: Vec<FieldDescriptor>,
    /// Version the caller last read.
    pub version: i64,
}

#[derive(Debug, Deserialize)]
pub struct EditRequest {
    pub command: EditCommand,
    #[serde(default)]
    pub version: Option<i64>,
}

pub async fn list_modules(
    Extension(service): Extension<Arc<dyn RegistryService>>,
) -> Result<Json<Vec<ModuleDefinition>>, AppError> {
    Ok(Json(service.list_modules().await?))
}

pub async fn get_module(
    Extension(service): Extension<Arc<dyn RegistryService>>,
    Path(key): Path<String>,
) -> Result<Json<ModuleDefinition>, AppError> {
    Ok(Json(service.get_module(&key).await?))
}

pub async fn hydrated_module(
    Extension(service): Extension<Arc<dyn RegistryService>>,
    Path(key): Path<String>,
) -> Result<Json<HydratedModule>, AppError> {
    Ok(Json(service.hydrated_module(&key).await?))
}

pub async fn replace_fields(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<dyn RegistryService>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReplaceFieldsRequest>,
) -> Result<Json<ModuleDefinition>, AppError> {
    let module = service
        .replace_fields(&principal, id, req.fields, req.version)
        .await?;
    Ok(Json(module))
}

pub async fn edit_module(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<dyn RegistryService>>,
    Path(key): Path<String>,
    Json(req): Json<EditRequest>,
) -> Result<Json<ModuleDefinition>, AppError> {
    let module = service
        .edit_module(&principal, &key, req.command, req.version)
        .await?;
    Ok(Json(module))
}
