//! Module registry PostgreSQL adapter.
//!
//! Definitions and records are JSONB documents; the legacy field shapes are
//! normalized by `modreg_core::wire` on the way in and out.

pub mod sqlx_types;
pub mod store;

use sqlx::PgPool;

pub use store::{PgIdentityDirectory, PgModuleStore, PgRecordStore};

const INIT_SQL: &str = include_str!("../migrations/001_modreg_init.sql");

/// All port implementations over one pool.
pub struct PgStores {
    pub modules: PgModuleStore,
    pub records: PgRecordStore,
    pub identities: PgIdentityDirectory,
}

impl PgStores {
    pub fn new(pool: PgPool) -> Self {
        Self {
            modules: PgModuleStore::new(pool.clone()),
            records: PgRecordStore::new(pool.clone()),
            identities: PgIdentityDirectory::new(pool),
        }
    }

    /// Create the `modreg` schema if it does not exist yet.
    pub async fn migrate(pool: &PgPool) -> anyhow::Result<()> {
        sqlx::raw_sql(INIT_SQL).execute(pool).await?;
        tracing::info!("modreg schema ready");
        Ok(())
    }
}
