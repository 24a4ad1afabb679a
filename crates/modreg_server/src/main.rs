//! modreg_server — standalone REST server for the module registry.
//!
//! Configuration comes from `MODREG_*` env vars; see [`ServerConfig::from_env`].

use std::sync::Arc;

use anyhow::Context;
use modreg_core::memory::{MemoryIdentityDirectory, MemoryModuleStore, MemoryRecordStore};
use modreg_core::principal::{Principal, ADMIN_ROLE};
use modreg_core::seeds::SeedBundle;
use modreg_core::service::{RegistryService, RegistryServiceImpl};
use modreg_postgres::PgStores;
use modreg_server::config::ServerConfig;
use modreg_server::middleware::jwt::JwtConfig;
use modreg_server::router::build_router;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,modreg_server=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;

    let service = match &config.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await
                .context("failed to connect to database")?;
            PgStores::migrate(&pool).await?;
            tracing::info!("Connected to database");

            let stores = PgStores::new(pool);
            RegistryServiceImpl::new(
                Arc::new(stores.modules),
                Arc::new(stores.records),
                Arc::new(stores.identities),
            )
        }
        None => {
            tracing::warn!("MODREG_DATABASE_URL not set; using in-memory stores");
            RegistryServiceImpl::new(
                Arc::new(MemoryModuleStore::new()),
                Arc::new(MemoryRecordStore::new()),
                Arc::new(MemoryIdentityDirectory::default()),
            )
        }
    }
    .with_hydration(config.hydration_policy, config.hydration_timeout);
    let service: Arc<dyn RegistryService> = Arc::new(service);

    if let Some(path) = &config.seed_path {
        let bundle = SeedBundle::load_yaml(path)?;
        let system = Principal::in_process("system", ADMIN_ROLE);
        let resp = service.bootstrap_seed_bundle(&system, bundle).await?;
        tracing::info!(
            path = %path.display(),
            created = resp.created,
            skipped = resp.skipped,
            "seed bundle loaded"
        );
    }

    tracing::info!(
        policy = %config.hydration_policy,
        timeout_ms = config.hydration_timeout.as_millis() as u64,
        "hydration configured"
    );

    let jwt_config = JwtConfig::from_secret(config.jwt_secret.as_bytes());
    let app = build_router(service, jwt_config);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;
    tracing::info!("modreg_server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
