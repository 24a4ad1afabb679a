//! Module definitions, records and identities — pure value types, no DB dependency.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{FieldErrors, RegistryError};
use crate::field::FieldDescriptor;

/// A named entity type whose shape is defined at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDefinition {
    pub id: Uuid,
    pub name: String,
    pub key: String,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    /// Optimistic concurrency token; bumped on every field replace.
    #[serde(default)]
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ModuleDefinition {
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        fields: Vec<FieldDescriptor>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            key: key.into(),
            fields,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn field(&self, key: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// The active field holding `key`, if any.
    pub fn active_field(&self, key: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.key == key && f.is_active())
    }
}

/// Check the invariants a full field list must satisfy before it is stored:
/// non-empty keys and no key shared by two active fields.
pub fn check_field_list(fields: &[FieldDescriptor]) -> Result<(), RegistryError> {
    let mut errors = FieldErrors::new();
    let mut seen = HashSet::new();
    for field in fields {
        if field.key.trim().is_empty() {
            errors.add("", "field key must not be empty");
            continue;
        }
        if field.is_active() && !seen.insert(field.key.as_str()) {
            errors.add(field.key.clone(), "duplicate active key");
        }
    }
    errors.into_result()
}

/// One stored instance of a module's data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub module_key: String,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `data` keys tried, in order, when deriving a record's display label.
pub const LABEL_KEYS: [&str; 6] = ["name", "shopName", "title", "label", "code", "billNumber"];

fn non_empty(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl Record {
    pub fn new(module_key: impl Into<String>, data: Map<String, Value>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            module_key: module_key.into(),
            data,
            name: None,
            email: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Best-guess human label. Heuristic: the first non-empty of the
    /// [`LABEL_KEYS`] in `data`, then top-level `name` / `email`, then the id.
    /// Callers must accept the id-only label as the degraded case.
    pub fn display_label(&self) -> String {
        LABEL_KEYS
            .iter()
            .find_map(|k| non_empty(self.data.get(*k)))
            .or_else(|| self.name.clone().filter(|s| !s.trim().is_empty()))
            .or_else(|| self.email.clone().filter(|s| !s.trim().is_empty()))
            .unwrap_or_else(|| self.id.clone())
    }
}

/// An entry of the identity directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl Identity {
    /// First non-empty of name, email, id.
    pub fn display_label(&self) -> String {
        [&self.name, &self.email]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| self.id.clone())
    }
}
