//! Relation hydration — resolves every `relation` field's `ref` into live options.
//!
//! Relation fields are resolved concurrently under one deadline that also
//! covers the definition fetch. Under [`HydrationPolicy::Degrade`] a failed or
//! timed-out lookup leaves that field with no options and records a warning;
//! under [`HydrationPolicy::FailFast`] the first failure aborts the call and an
//! expired deadline fails it as a whole.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio::time::{timeout_at, Instant};

use crate::error::RegistryError;
use crate::field::{FieldDescriptor, FieldType, RelationTarget, SelectOption};
use crate::module::ModuleDefinition;
use crate::ports::{IdentityDirectory, ModuleStore, RecordStore, Result};

pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HydrationPolicy {
    #[default]
    Degrade,
    FailFast,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HydrationWarning {
    pub field: String,
    pub message: String,
}

/// A definition whose relation fields carry live options.
#[derive(Debug, Clone, Serialize)]
pub struct HydratedModule {
    #[serde(flatten)]
    pub module: ModuleDefinition,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<HydrationWarning>,
}

pub struct Hydrator {
    modules: Arc<dyn ModuleStore>,
    records: Arc<dyn RecordStore>,
    identities: Arc<dyn IdentityDirectory>,
    policy: HydrationPolicy,
    deadline: Duration,
}

impl Hydrator {
    pub fn new(
        modules: Arc<dyn ModuleStore>,
        records: Arc<dyn RecordStore>,
        identities: Arc<dyn IdentityDirectory>,
    ) -> Self {
        Self {
            modules,
            records,
            identities,
            policy: HydrationPolicy::default(),
            deadline: DEFAULT_DEADLINE,
        }
    }

    pub fn with_policy(mut self, policy: HydrationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Fetch the bare definition for `key` and hydrate it.
    pub async fn hydrate(&self, key: &str) -> Result<HydratedModule> {
        let deadline = Instant::now() + self.deadline;
        let module = timeout_at(deadline, self.modules.get(key))
            .await
            .map_err(|_| self.timed_out("*"))??;
        self.resolve_all(module, deadline).await
    }

    /// Hydrate an already-fetched definition.
    pub async fn hydrate_definition(&self, module: ModuleDefinition) -> Result<HydratedModule> {
        self.resolve_all(module, Instant::now() + self.deadline).await
    }

    fn timed_out(&self, field: &str) -> RegistryError {
        RegistryError::HydrationFailure {
            field: field.into(),
            reason: format!("timed out after {:?}", self.deadline),
        }
    }

    async fn resolve_all(
        &self,
        mut module: ModuleDefinition,
        deadline: Instant,
    ) -> Result<HydratedModule> {
        let outcomes = match self.policy {
            HydrationPolicy::FailFast => {
                let lookups = join_all(module.fields.iter().map(|f| self.resolve(f, None)));
                timeout_at(deadline, lookups)
                    .await
                    .map_err(|_| self.timed_out("*"))?
            }
            HydrationPolicy::Degrade => {
                join_all(module.fields.iter().map(|f| self.resolve(f, Some(deadline)))).await
            }
        };

        let mut warnings = Vec::new();
        for (field, outcome) in module.fields.iter_mut().zip(outcomes) {
            let Some(outcome) = outcome else { continue };
            let options = match outcome {
                Ok(options) => {
                    tracing::debug!(
                        module = %module.key,
                        field = %field.key,
                        count = options.len(),
                        "relation hydrated"
                    );
                    options
                }
                Err(e) => {
                    let reason = match e {
                        RegistryError::HydrationFailure { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    if self.policy == HydrationPolicy::FailFast {
                        return Err(RegistryError::HydrationFailure {
                            field: field.key.clone(),
                            reason,
                        });
                    }
                    tracing::warn!(
                        module = %module.key,
                        field = %field.key,
                        "relation lookup failed, continuing without options: {reason}"
                    );
                    warnings.push(HydrationWarning {
                        field: field.key.clone(),
                        message: reason,
                    });
                    Vec::new()
                }
            };
            if let FieldType::Relation(spec) = &mut field.field_type {
                spec.options = options;
            }
        }

        Ok(HydratedModule { module, warnings })
    }

    /// `None` for fields that need no lookup. With a deadline, a lookup still
    /// pending at expiry fails on its own.
    async fn resolve(
        &self,
        field: &FieldDescriptor,
        deadline: Option<Instant>,
    ) -> Option<Result<Vec<SelectOption>>> {
        let target = field.relation()?.target.as_ref()?;
        let Some(deadline) = deadline else {
            return Some(self.options_for(target).await);
        };
        Some(
            timeout_at(deadline, self.options_for(target))
                .await
                .unwrap_or_else(|_| Err(self.timed_out(&field.key))),
        )
    }

    async fn options_for(&self, target: &RelationTarget) -> Result<Vec<SelectOption>> {
        match target {
            RelationTarget::Users => Ok(self
                .identities
                .list()
                .await?
                .into_iter()
                .map(|who| SelectOption::new(who.display_label(), who.id))
                .collect()),
            RelationTarget::Module(key) => Ok(self
                .records
                .list(key)
                .await?
                .into_iter()
                .map(|r| SelectOption::new(r.display_label(), r.id))
                .collect()),
        }
    }
}
