//! In-memory port implementations.
//!
//! Used by tests and by the server when no database is configured.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::RegistryError;
use crate::field::FieldDescriptor;
use crate::module::{Identity, ModuleDefinition, Record};
use crate::ports::{IdentityDirectory, ModuleStore, RecordStore, Result};
use crate::wire::bare_fields;

/// Module definitions kept in insertion order.
#[derive(Default, Clone)]
pub struct MemoryModuleStore {
    modules: Arc<RwLock<Vec<ModuleDefinition>>>,
}

impl MemoryModuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_modules(modules: Vec<ModuleDefinition>) -> Self {
        Self {
            modules: Arc::new(RwLock::new(modules)),
        }
    }
}

#[async_trait]
impl ModuleStore for MemoryModuleStore {
    async fn get(&self, key: &str) -> Result<ModuleDefinition> {
        let modules = self.modules.read().await;
        modules
            .iter()
            .find(|m| m.key == key)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(format!("module {key}")))
    }

    async fn get_by_id(&self, id: Uuid) -> Result<ModuleDefinition> {
        let modules = self.modules.read().await;
        modules
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(format!("module {id}")))
    }

    async fn list(&self) -> Result<Vec<ModuleDefinition>> {
        Ok(self.modules.read().await.clone())
    }

    async fn insert(&self, module: &ModuleDefinition) -> Result<()> {
        let mut modules = self.modules.write().await;
        if modules.iter().any(|m| m.key == module.key) {
            return Err(RegistryError::Conflict(format!(
                "module key {} already exists",
                module.key
            )));
        }
        let mut module = module.clone();
        module.fields = bare_fields(&module.fields);
        modules.push(module);
        Ok(())
    }

    async fn replace_fields(
        &self,
        id: Uuid,
        fields: &[FieldDescriptor],
        expected_version: i64,
    ) -> Result<ModuleDefinition> {
        let mut modules = self.modules.write().await;
        let module = modules
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| RegistryError::NotFound(format!("module {id}")))?;
        if module.version != expected_version {
            return Err(RegistryError::Conflict(format!(
                "module {} is at version {}, not {expected_version}",
                module.key, module.version
            )));
        }
        module.fields = bare_fields(fields);
        module.version += 1;
        module.updated_at = Utc::now();
        Ok(module.clone())
    }
}

/// Records grouped by module key, each group in insertion order.
#[derive(Default, Clone)]
pub struct MemoryRecordStore {
    records: Arc<RwLock<HashMap<String, Vec<Record>>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully-formed record as is (fixtures, imports).
    pub async fn put(&self, record: Record) {
        let mut records = self.records.write().await;
        records
            .entry(record.module_key.clone())
            .or_default()
            .push(record);
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn list(&self, module_key: &str) -> Result<Vec<Record>> {
        let records = self.records.read().await;
        Ok(records.get(module_key).cloned().unwrap_or_default())
    }

    async fn get(&self, module_key: &str, id: &str) -> Result<Record> {
        let records = self.records.read().await;
        records
            .get(module_key)
            .and_then(|rs| rs.iter().find(|r| r.id == id))
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(format!("record {module_key}/{id}")))
    }

    async fn create(&self, module_key: &str, data: Map<String, Value>) -> Result<Record> {
        let record = Record::new(module_key, data);
        self.put(record.clone()).await;
        Ok(record)
    }

    async fn update(&self, module_key: &str, id: &str, data: Map<String, Value>) -> Result<Record> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(module_key)
            .and_then(|rs| rs.iter_mut().find(|r| r.id == id))
            .ok_or_else(|| RegistryError::NotFound(format!("record {module_key}/{id}")))?;
        record.data = data;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn delete(&self, module_key: &str, id: &str) -> Result<()> {
        let mut records = self.records.write().await;
        let group = records
            .get_mut(module_key)
            .ok_or_else(|| RegistryError::NotFound(format!("record {module_key}/{id}")))?;
        let before = group.len();
        group.retain(|r| r.id != id);
        if group.len() == before {
            return Err(RegistryError::NotFound(format!("record {module_key}/{id}")));
        }
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct MemoryIdentityDirectory {
    identities: Arc<RwLock<Vec<Identity>>>,
}

impl MemoryIdentityDirectory {
    pub fn new(identities: Vec<Identity>) -> Self {
        Self {
            identities: Arc::new(RwLock::new(identities)),
        }
    }
}

#[async_trait]
impl IdentityDirectory for MemoryIdentityDirectory {
    async fn list(&self) -> Result<Vec<Identity>> {
        Ok(self.identities.read().await.clone())
    }
}
