//! SeedBundle — canonical, hashable bootstrap payload of module definitions.
//!
//! Loaded from YAML at server startup or posted to `/bootstrap/seed_bundle`.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::RegistryError;
use crate::field::FieldDescriptor;
use crate::module::ModuleDefinition;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedBundle {
    /// SHA-256 of the canonical JSON of `modules` (sorted by key),
    /// prefixed with "v1:". Empty in hand-written seed files; fill it with
    /// [`SeedBundle::new`].
    #[serde(default)]
    pub bundle_hash: String,
    pub modules: Vec<ModuleSeed>,
}

/// One module to create if its key is not taken yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleSeed {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

impl ModuleSeed {
    pub fn into_definition(self) -> ModuleDefinition {
        ModuleDefinition::new(self.key, self.name, self.fields)
    }
}

impl SeedBundle {
    /// Bundle with its hash computed.
    pub fn new(modules: Vec<ModuleSeed>) -> Result<Self, RegistryError> {
        let bundle_hash = Self::compute_hash(&modules).context("hashing seed bundle")?;
        Ok(Self {
            bundle_hash,
            modules,
        })
    }

    /// Stable, version-prefixed SHA-256 over the modules sorted by key, so
    /// source ordering does not change the hash.
    pub fn compute_hash(modules: &[ModuleSeed]) -> Result<String, serde_json::Error> {
        let mut sorted: Vec<&ModuleSeed> = modules.iter().collect();
        sorted.sort_by_key(|m| &m.key);
        let json = serde_json::to_string(&sorted)?;
        let hash = Sha256::digest(json.as_bytes());
        Ok(format!("v1:{}", hex::encode(hash)))
    }

    /// Read a YAML seed file, filling in the hash when absent.
    pub fn load_yaml(path: &Path) -> Result<Self, RegistryError> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading seed file {}", path.display()))?;
        let bundle: SeedBundle = serde_yaml::from_str(&raw)
            .with_context(|| format!("parsing seed file {}", path.display()))?;
        if bundle.bundle_hash.is_empty() {
            return Self::new(bundle.modules);
        }
        Ok(bundle)
    }
}

/// Outcome of an idempotent bootstrap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapResponse {
    pub bundle_hash: String,
    pub created: u32,
    pub skipped: u32,
}
