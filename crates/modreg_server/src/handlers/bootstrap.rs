//! POST /bootstrap/seed_bundle — admin-only idempotent bootstrap endpoint.
//!
//! Modules whose key already exists are skipped, so re-posting the same
//! bundle is harmless.

use std::sync::Arc;

use axum::{extract::Extension, Json};
use modreg_core::{
    principal::Principal,
    seeds::{BootstrapResponse, SeedBundle},
    service::RegistryService,
};

use crate::error::AppError;

pub async fn bootstrap_seed_bundle(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Arc<dyn RegistryService>>,
    Json(bundle): Json<SeedBundle>,
) -> Result<Json<BootstrapResponse>, AppError> {
    // Hand-written bundles may omit the hash.
    let bundle = if bundle.bundle_hash.is_empty() {
        SeedBundle::new(bundle.modules)?
    } else {
        bundle
    };
    let resp = service.bootstrap_seed_bundle(&principal, bundle).await?;
    Ok(Json(resp))
}
