//! Storage port traits.
//! Implemented by `memory` (tests, no database) and by `modreg_postgres`;
//! core logic depends only on these traits.

use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::RegistryError;
use crate::field::FieldDescriptor;
use crate::module::{Identity, ModuleDefinition, Record};

pub type Result<T> = std::result::Result<T, RegistryError>;

/// Durable module definitions; one definition per key, no history.
#[async_trait]
pub trait ModuleStore: Send + Sync {
    /// Look up a definition by its machine key.
    async fn get(&self, key: &str) -> Result<ModuleDefinition>;

    async fn get_by_id(&self, id: Uuid) -> Result<ModuleDefinition>;

    /// All definitions, oldest first.
    async fn list(&self) -> Result<Vec<ModuleDefinition>>;

    /// Insert a new definition. `Conflict` when the key is taken.
    async fn insert(&self, module: &ModuleDefinition) -> Result<()>;

    /// Replace the whole field list if `expected_version` still matches,
    /// returning the stored definition with its bumped version.
    async fn replace_fields(
        &self,
        id: Uuid,
        fields: &[FieldDescriptor],
        expected_version: i64,
    ) -> Result<ModuleDefinition>;
}

/// Untyped record storage keyed by module. `data` is opaque here.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list(&self, module_key: &str) -> Result<Vec<Record>>;

    async fn get(&self, module_key: &str, id: &str) -> Result<Record>;

    async fn create(&self, module_key: &str, data: Map<String, Value>) -> Result<Record>;

    async fn update(&self, module_key: &str, id: &str, data: Map<String, Value>) -> Result<Record>;

    /// `NotFound` when no record with `id` exists in the module.
    async fn delete(&self, module_key: &str, id: &str) -> Result<()>;
}

/// The user directory used by `users` relations.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn list(&self) -> Result<Vec<Identity>>;
}
