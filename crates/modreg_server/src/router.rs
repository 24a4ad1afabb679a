//! Router construction for the module registry server.

use std::sync::Arc;

use axum::{
    middleware as axum_mw,
    routing::{get, post, put},
    Extension, Router,
};
use modreg_core::service::RegistryService;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers;
use crate::middleware::jwt::{jwt_auth, JwtConfig};

/// Build the full axum router with all routes and middleware.
pub fn build_router(service: Arc<dyn RegistryService>, jwt_config: JwtConfig) -> Router {
    // Routes that require JWT authentication
    let protected = Router::new()
        .route("/modules", get(handlers::modules::list_modules))
        .route("/modules/:key", get(handlers::modules::get_module))
        .route(
            "/modules/:key/hydrated",
            get(handlers::modules::hydrated_module),
        )
        // Segment names must match across sibling routes; this one carries the module id.
        .route("/modules/:key/fields", put(handlers::modules::replace_fields))
        .route("/modules/:key/edit", post(handlers::modules::edit_module))
        .route("/modules/:key/form", get(handlers::render::render_form))
        .route("/modules/:key/table", get(handlers::render::render_table))
        .route(
            "/records/:module_key",
            get(handlers::records::list_records).post(handlers::records::create_record),
        )
        .route(
            "/records/:module_key/:id",
            put(handlers::records::update_record).delete(handlers::records::delete_record),
        )
        .route("/users", get(handlers::users::list_users))
        .route(
            "/bootstrap/seed_bundle",
            post(handlers::bootstrap::bootstrap_seed_bundle),
        )
        .layer(axum_mw::from_fn(jwt_auth))
        .layer(Extension(jwt_config));

    // Public routes (no auth)
    let public = Router::new().route("/health", get(handlers::health::health));

    // Combine and add shared state
    public
        .merge(protected)
        .layer(Extension(service))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
