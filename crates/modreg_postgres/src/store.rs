//! Postgres implementations of the modreg_core port traits.
//!
//! Each adapter is a newtype wrapping PgPool. All SQL is runtime-checked
//! (sqlx::query, not sqlx::query!) to avoid compile-time DB requirement.

use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::PgPool;
use uuid::Uuid;

use modreg_core::error::RegistryError;
use modreg_core::field::FieldDescriptor;
use modreg_core::module::{Identity, ModuleDefinition, Record};
use modreg_core::ports::{IdentityDirectory, ModuleStore, RecordStore, Result};
use modreg_core::wire::fields_for_storage;

use crate::sqlx_types::{PgModuleRow, PgRecordRow, PgUserRow};

fn fields_json(fields: &[FieldDescriptor]) -> Result<Value> {
    Ok(serde_json::to_value(fields_for_storage(fields)).map_err(|e| anyhow!(e))?)
}

// ── PgModuleStore ─────────────────────────────────────────────

pub struct PgModuleStore {
    pool: PgPool,
}

impl PgModuleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ModuleStore for PgModuleStore {
    async fn get(&self, key: &str) -> Result<ModuleDefinition> {
        let row = sqlx::query_as::<_, PgModuleRow>(
            r#"
            SELECT module_id, key, name, fields, version, created_at, updated_at
            FROM modreg.modules
            WHERE key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        row.ok_or_else(|| RegistryError::NotFound(format!("module {key}")))?
            .try_into()
    }

    async fn get_by_id(&self, id: Uuid) -> Result<ModuleDefinition> {
        let row = sqlx::query_as::<_, PgModuleRow>(
            r#"
            SELECT module_id, key, name, fields, version, created_at, updated_at
            FROM modreg.modules
            WHERE module_id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        row.ok_or_else(|| RegistryError::NotFound(format!("module {id}")))?
            .try_into()
    }

    async fn list(&self) -> Result<Vec<ModuleDefinition>> {
        let rows = sqlx::query_as::<_, PgModuleRow>(
            r#"
            SELECT module_id, key, name, fields, version, created_at, updated_at
            FROM modreg.modules
            ORDER BY created_at, key
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        rows.into_iter().map(ModuleDefinition::try_from).collect()
    }

    async fn insert(&self, module: &ModuleDefinition) -> Result<()> {
        let fields = fields_json(&module.fields)?;
        let result = sqlx::query(
            r#"
            INSERT INTO modreg.modules
                (module_id, key, name, fields, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (key) DO NOTHING
            "#,
        )
        .bind(module.id)
        .bind(&module.key)
        .bind(&module.name)
        .bind(&fields)
        .bind(module.version)
        .bind(module.created_at)
        .bind(module.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;

        if result.rows_affected() == 0 {
            return Err(RegistryError::Conflict(format!(
                "module key {} already exists",
                module.key
            )));
        }
        Ok(())
    }

    async fn replace_fields(
        &self,
        id: Uuid,
        fields: &[FieldDescriptor],
        expected_version: i64,
    ) -> Result<ModuleDefinition> {
        let fields = fields_json(fields)?;
        let mut tx = self.pool.begin().await.map_err(|e| anyhow!(e))?;

        let current = sqlx::query_scalar::<_, i64>(
            "SELECT version FROM modreg.modules WHERE module_id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| anyhow!(e))?
        .ok_or_else(|| RegistryError::NotFound(format!("module {id}")))?;

        if current != expected_version {
            return Err(RegistryError::Conflict(format!(
                "module {id} is at version {current}, not {expected_version}"
            )));
        }

        let row = sqlx::query_as::<_, PgModuleRow>(
            r#"
            UPDATE modreg.modules
            SET fields = $2, version = version + 1, updated_at = now()
            WHERE module_id = $1
            RETURNING module_id, key, name, fields, version, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&fields)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| anyhow!(e))?;

        tx.commit().await.map_err(|e| anyhow!(e))?;
        row.try_into()
    }
}

// ── PgRecordStore ─────────────────────────────────────────────

pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn list(&self, module_key: &str) -> Result<Vec<Record>> {
        let rows = sqlx::query_as::<_, PgRecordRow>(
            r#"
            SELECT record_id, module_key, data, name, email, created_at, updated_at
            FROM modreg.records
            WHERE module_key = $1
            ORDER BY created_at, record_id
            "#,
        )
        .bind(module_key)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(rows.into_iter().map(Record::from).collect())
    }

    async fn get(&self, module_key: &str, id: &str) -> Result<Record> {
        let row = sqlx::query_as::<_, PgRecordRow>(
            r#"
            SELECT record_id, module_key, data, name, email, created_at, updated_at
            FROM modreg.records
            WHERE module_key = $1 AND record_id = $2
            "#,
        )
        .bind(module_key)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        row.map(Record::from)
            .ok_or_else(|| RegistryError::NotFound(format!("record {module_key}/{id}")))
    }

    async fn create(&self, module_key: &str, data: Map<String, Value>) -> Result<Record> {
        let record = Record::new(module_key, data);
        let row = sqlx::query_as::<_, PgRecordRow>(
            r#"
            INSERT INTO modreg.records (record_id, module_key, data, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING record_id, module_key, data, name, email, created_at, updated_at
            "#,
        )
        .bind(&record.id)
        .bind(module_key)
        .bind(Value::Object(record.data))
        .bind(record.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(row.into())
    }

    async fn update(&self, module_key: &str, id: &str, data: Map<String, Value>) -> Result<Record> {
        let row = sqlx::query_as::<_, PgRecordRow>(
            r#"
            UPDATE modreg.records
            SET data = $3, updated_at = now()
            WHERE module_key = $1 AND record_id = $2
            RETURNING record_id, module_key, data, name, email, created_at, updated_at
            "#,
        )
        .bind(module_key)
        .bind(id)
        .bind(Value::Object(data))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        row.map(Record::from)
            .ok_or_else(|| RegistryError::NotFound(format!("record {module_key}/{id}")))
    }

    async fn delete(&self, module_key: &str, id: &str) -> Result<()> {
        let result =
            sqlx::query("DELETE FROM modreg.records WHERE module_key = $1 AND record_id = $2")
                .bind(module_key)
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(|e| anyhow!(e))?;

        if result.rows_affected() == 0 {
            return Err(RegistryError::NotFound(format!(
                "record {module_key}/{id}"
            )));
        }
        Ok(())
    }
}

// ── PgIdentityDirectory ───────────────────────────────────────

pub struct PgIdentityDirectory {
    pool: PgPool,
}

impl PgIdentityDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityDirectory for PgIdentityDirectory {
    async fn list(&self) -> Result<Vec<Identity>> {
        let rows = sqlx::query_as::<_, PgUserRow>(
            "SELECT user_id, name, email, role FROM modreg.users ORDER BY name NULLS LAST, user_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(rows.into_iter().map(Identity::from).collect())
    }
}
