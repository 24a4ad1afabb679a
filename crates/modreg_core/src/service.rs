//! RegistryService — the domain service behind every HTTP handler.
//!
//! Takes port traits via `Arc<dyn PortTrait>` so the same logic runs against
//! Postgres or the in-memory stores.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::editor::{EditCommand, ModuleEditor};
use crate::error::{FieldErrors, RegistryError};
use crate::field::FieldDescriptor;
use crate::hydrate::{HydratedModule, HydrationPolicy, Hydrator};
use crate::module::{check_field_list, Identity, ModuleDefinition, Record};
use crate::ports::{IdentityDirectory, ModuleStore, RecordStore};
use crate::principal::Principal;
use crate::render::{render_form, render_table, RenderedForm, RenderedTable};
use crate::seeds::{BootstrapResponse, SeedBundle};
use crate::validate::validate_record;

pub use crate::ports::Result;

// ── RegistryService trait ─────────────────────────────────────

/// All methods that act for a caller take `&Principal` explicitly.
#[async_trait]
pub trait RegistryService: Send + Sync {
    async fn list_modules(&self) -> Result<Vec<ModuleDefinition>>;

    /// Bare definition, no relation options.
    async fn get_module(&self, key: &str) -> Result<ModuleDefinition>;

    async fn hydrated_module(&self, key: &str) -> Result<HydratedModule>;

    /// Whole-list replace guarded by `expected_version`. Admin only.
    async fn replace_fields(
        &self,
        principal: &Principal,
        id: Uuid,
        fields: Vec<FieldDescriptor>,
        expected_version: i64,
    ) -> Result<ModuleDefinition>;

    /// Apply one editor command and persist the result. When
    /// `expected_version` is given it must match the stored version. Admin only.
    async fn edit_module(
        &self,
        principal: &Principal,
        key: &str,
        command: EditCommand,
        expected_version: Option<i64>,
    ) -> Result<ModuleDefinition>;

    /// Form for the caller's role, prefilled from `record_id` when given.
    async fn render_form(
        &self,
        principal: &Principal,
        key: &str,
        record_id: Option<&str>,
    ) -> Result<RenderedForm>;

    async fn render_table(&self, principal: &Principal, key: &str) -> Result<RenderedTable>;

    async fn list_records(&self, module_key: &str) -> Result<Vec<Record>>;

    async fn create_record(
        &self,
        principal: &Principal,
        module_key: &str,
        data: Map<String, Value>,
    ) -> Result<Record>;

    async fn update_record(
        &self,
        principal: &Principal,
        module_key: &str,
        id: &str,
        data: Map<String, Value>,
    ) -> Result<Record>;

    async fn delete_record(&self, principal: &Principal, module_key: &str, id: &str) -> Result<()>;

    async fn list_users(&self) -> Result<Vec<Identity>>;

    /// Create every seeded module whose key is not taken (idempotent). Admin only.
    async fn bootstrap_seed_bundle(
        &self,
        principal: &Principal,
        bundle: SeedBundle,
    ) -> Result<BootstrapResponse>;
}

// ── RegistryServiceImpl ───────────────────────────────────────

pub struct RegistryServiceImpl {
    pub modules: Arc<dyn ModuleStore>,
    pub records: Arc<dyn RecordStore>,
    pub identities: Arc<dyn IdentityDirectory>,
    hydrator: Hydrator,
}

impl RegistryServiceImpl {
    pub fn new(
        modules: Arc<dyn ModuleStore>,
        records: Arc<dyn RecordStore>,
        identities: Arc<dyn IdentityDirectory>,
    ) -> Self {
        let hydrator = Hydrator::new(modules.clone(), records.clone(), identities.clone());
        Self {
            modules,
            records,
            identities,
            hydrator,
        }
    }

    /// Set the hydration policy and deadline (builder pattern).
    pub fn with_hydration(mut self, policy: HydrationPolicy, deadline: Duration) -> Self {
        self.hydrator = self.hydrator.with_policy(policy).with_deadline(deadline);
        self
    }
}

#[async_trait]
impl RegistryService for RegistryServiceImpl {
    async fn list_modules(&self) -> Result<Vec<ModuleDefinition>> {
        self.modules.list().await
    }

    async fn get_module(&self, key: &str) -> Result<ModuleDefinition> {
        self.modules.get(key).await
    }

    async fn hydrated_module(&self, key: &str) -> Result<HydratedModule> {
        self.hydrator.hydrate(key).await
    }

    async fn replace_fields(
        &self,
        principal: &Principal,
        id: Uuid,
        fields: Vec<FieldDescriptor>,
        expected_version: i64,
    ) -> Result<ModuleDefinition> {
        principal.require_admin()?;
        check_field_list(&fields)?;
        let module = self.modules.replace_fields(id, &fields, expected_version).await?;
        info!(
            actor = %principal.actor_id,
            module = %module.key,
            version = module.version,
            "module fields replaced"
        );
        Ok(module)
    }

    async fn edit_module(
        &self,
        principal: &Principal,
        key: &str,
        command: EditCommand,
        expected_version: Option<i64>,
    ) -> Result<ModuleDefinition> {
        principal.require_admin()?;
        let module = self.modules.get(key).await?;
        if let Some(expected) = expected_version.filter(|v| *v != module.version) {
            return Err(RegistryError::Conflict(format!(
                "module {key} is at version {}, not {expected}",
                module.version
            )));
        }

        let mut editor = ModuleEditor::new(module);
        debug!(actor = %principal.actor_id, module = %key, ?command, "applying editor command");
        if !editor.apply(command)? {
            return Ok(editor.module().clone());
        }
        let module = editor.commit(self.modules.as_ref()).await?;
        info!(module = %module.key, version = module.version, "module edited");
        Ok(module)
    }

    async fn render_form(
        &self,
        principal: &Principal,
        key: &str,
        record_id: Option<&str>,
    ) -> Result<RenderedForm> {
        let hydrated = self.hydrator.hydrate(key).await?;
        let data = match record_id {
            Some(id) => self.records.get(key, id).await?.data,
            None => Map::new(),
        };
        let form = render_form(&hydrated.module, &principal.role, &data, &FieldErrors::new());
        Ok(form.with_warnings(hydrated.warnings))
    }

    async fn render_table(&self, principal: &Principal, key: &str) -> Result<RenderedTable> {
        let hydrated = self.hydrator.hydrate(key).await?;
        let records = self.records.list(key).await?;
        let mut table = render_table(&hydrated.module, &principal.role, &records);
        table.warnings = hydrated.warnings;
        Ok(table)
    }

    async fn list_records(&self, module_key: &str) -> Result<Vec<Record>> {
        self.modules.get(module_key).await?;
        self.records.list(module_key).await
    }

    async fn create_record(
        &self,
        principal: &Principal,
        module_key: &str,
        data: Map<String, Value>,
    ) -> Result<Record> {
        let module = self.modules.get(module_key).await?;
        validate_record(&module, &principal.role, &data)?;
        let record = self.records.create(module_key, data).await?;
        debug!(
            actor = %principal.actor_id,
            module = %module_key,
            id = %record.id,
            "record created"
        );
        Ok(record)
    }

    async fn update_record(
        &self,
        principal: &Principal,
        module_key: &str,
        id: &str,
        data: Map<String, Value>,
    ) -> Result<Record> {
        let module = self.modules.get(module_key).await?;
        validate_record(&module, &principal.role, &data)?;
        let record = self.records.update(module_key, id, data).await?;
        debug!(actor = %principal.actor_id, module = %module_key, %id, "record updated");
        Ok(record)
    }

    async fn delete_record(&self, principal: &Principal, module_key: &str, id: &str) -> Result<()> {
        self.modules.get(module_key).await?;
        self.records.delete(module_key, id).await?;
        debug!(actor = %principal.actor_id, module = %module_key, %id, "record deleted");
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<Identity>> {
        self.identities.list().await
    }

    async fn bootstrap_seed_bundle(
        &self,
        principal: &Principal,
        bundle: SeedBundle,
    ) -> Result<BootstrapResponse> {
        principal.require_admin()?;
        let mut created = 0u32;
        let mut skipped = 0u32;

        for seed in bundle.modules {
            match self.modules.get(&seed.key).await {
                Ok(_) => skipped += 1,
                Err(RegistryError::NotFound(_)) => {
                    check_field_list(&seed.fields)?;
                    self.modules.insert(&seed.into_definition()).await?;
                    created += 1;
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            actor = %principal.actor_id,
            bundle_hash = %bundle.bundle_hash,
            created,
            skipped,
            "seed bundle applied"
        );
        Ok(BootstrapResponse {
            bundle_hash: bundle.bundle_hash,
            created,
            skipped,
        })
    }
}
