//! Row types with `sqlx::FromRow`. The core crate stays free of sqlx; rows
//! convert into domain types here.

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use modreg_core::error::RegistryError;
use modreg_core::module::{Identity, ModuleDefinition, Record};
use modreg_core::wire::{parse_fields, StoredField};

#[derive(Debug, sqlx::FromRow)]
pub struct PgModuleRow {
    pub module_id: Uuid,
    pub key: String,
    pub name: String,
    pub fields: Value,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PgModuleRow> for ModuleDefinition {
    type Error = RegistryError;

    fn try_from(row: PgModuleRow) -> Result<Self, Self::Error> {
        let stored: Vec<StoredField> = match row.fields {
            Value::Null => Vec::new(),
            fields => serde_json::from_value(fields).map_err(|e| {
                RegistryError::Internal(anyhow::anyhow!(
                    "module {} has unreadable fields: {e}",
                    row.key
                ))
            })?,
        };
        Ok(Self {
            id: row.module_id,
            fields: parse_fields(stored)?,
            name: row.name,
            key: row.key,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct PgRecordRow {
    pub record_id: String,
    pub module_key: String,
    pub data: Value,
    pub name: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PgRecordRow> for Record {
    fn from(row: PgRecordRow) -> Self {
        Self {
            id: row.record_id,
            module_key: row.module_key,
            // Non-object payloads are treated as empty rather than failing the list.
            data: match row.data {
                Value::Object(map) => map,
                _ => Default::default(),
            },
            name: row.name,
            email: row.email,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct PgUserRow {
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

impl From<PgUserRow> for Identity {
    fn from(row: PgUserRow) -> Self {
        Self {
            id: row.user_id,
            name: row.name,
            email: row.email,
            role: row.role,
        }
    }
}
