//! Generic record CRUD, validated against the module definition.
//!
//! GET    /records/:module_key      — list
//! POST   /records/:module_key      — create
//! PUT    /records/:module_key/:id  — update
//! DELETE /records/:module_key/:id  — delete

use std::sync::Arc;

use axum::{extract::Path, http::StatusCode, Extension, Json};
use modreg_core::{module::Record, principal::Principal, service::RegistryService};
use serde_json::{Map, Value};

use crate::error::AppError;

pub async fn list_records(
    Extension(service): Extension<Arc<dyn RegistryService>>,
    Path(module_key): Path<String>,
) -> Result<Json<Vec<Record>>, AppError> {
    Ok(Json(service.list_records(&module_key).await?))
}

pub async fn create_record(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<dyn RegistryService>>,
    Path(module_key): Path<String>,
    Json(data): Json<Map<String, Value>>,
) -> Result<(StatusCode, Json<Record>), AppError> {
    let record = service.create_record(&principal, &module_key, data).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update_record(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<dyn RegistryService>>,
    Path((module_key, id)): Path<(String, String)>,
    Json(data): Json<Map<String, Value>>,
) -> Result<Json<Record>, AppError> {
    let record = service
        .update_record(&principal, &module_key, &id, data)
        .await?;
    Ok(Json(record))
}

pub async fn delete_record(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<dyn RegistryService>>,
    Path((module_key, id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    service.delete_record(&principal, &module_key, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
