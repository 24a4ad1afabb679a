//! Module editor protocol.
//!
//! Every command works on a working copy of the field list; the result is
//! written back as one whole-list replace guarded by the module version.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::RegistryError;
use crate::field::{FieldDescriptor, FieldKind, FieldStatus};
use crate::module::ModuleDefinition;
use crate::ports::{ModuleStore, Result};
use crate::wire::{
    join_list, options_to_text, split_list, StoredField, StoredList, StoredOptions,
};

/// Longest key [`derive_key`] produces.
pub const MAX_KEY_LEN: usize = 40;

/// Derive a machine key from a label: lower-case, runs of anything outside
/// `[a-z0-9]` collapse to `_`, no leading or trailing `_`, then cut to
/// [`MAX_KEY_LEN`]. Non-ASCII letters count as separators.
pub fn derive_key(label: &str) -> String {
    let mut key = String::with_capacity(label.len());
    let mut pending_sep = false;
    for c in label.chars().map(|c| c.to_ascii_lowercase()) {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !key.is_empty() {
                key.push('_');
            }
            pending_sep = false;
            key.push(c);
        } else {
            pending_sep = true;
        }
    }
    // The cut can land right after a separator.
    key.truncate(MAX_KEY_LEN);
    key.trim_end_matches('_').to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

/// One editor action, as sent by the admin UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditCommand {
    Add { field: FieldDescriptor },
    Edit { field: FieldDescriptor },
    Disable { key: String },
    Enable { key: String },
    Move { key: String, direction: Direction },
}

pub struct ModuleEditor {
    module: ModuleDefinition,
}

impl ModuleEditor {
    pub fn new(module: ModuleDefinition) -> Self {
        Self { module }
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.module.fields
    }

    pub fn module(&self) -> &ModuleDefinition {
        &self.module
    }

    /// Index of the field holding `key`, preferring the active one.
    fn position(&self, key: &str) -> Result<usize> {
        let fields = &self.module.fields;
        fields
            .iter()
            .position(|f| f.key == key && f.is_active())
            .or_else(|| fields.iter().position(|f| f.key == key))
            .ok_or_else(|| {
                RegistryError::NotFound(format!("field {key} in module {}", self.module.key))
            })
    }

    fn active_key_taken(&self, key: &str, except: Option<usize>) -> bool {
        self.module
            .fields
            .iter()
            .enumerate()
            .any(|(i, f)| Some(i) != except && f.key == key && f.is_active())
    }

    pub fn add_field(&mut self, mut field: FieldDescriptor) -> Result<()> {
        if field.key.trim().is_empty() {
            return Err(RegistryError::InvalidInput("field key must not be empty".into()));
        }
        if self.active_key_taken(&field.key, None) {
            return Err(RegistryError::DuplicateKey(field.key));
        }
        field.order = Some(self.module.fields.len() as i64 + 1);
        self.module.fields.push(field);
        Ok(())
    }

    /// Replace the field with the candidate's key. Keys never change here.
    pub fn edit_field(&mut self, mut field: FieldDescriptor) -> Result<()> {
        let idx = self.position(&field.key)?;
        let existing = &self.module.fields[idx];
        if field.order.is_none() {
            field.order = existing.order;
        }
        self.module.fields[idx] = field;
        Ok(())
    }

    pub fn disable_field(&mut self, key: &str) -> Result<()> {
        let idx = self.position(key)?;
        self.module.fields[idx].status = FieldStatus::Disabled;
        Ok(())
    }

    pub fn enable_field(&mut self, key: &str) -> Result<()> {
        let fields = &self.module.fields;
        let Some(idx) = fields.iter().position(|f| f.key == key && !f.is_active()) else {
            // Already active, or missing entirely.
            return self.position(key).map(|_| ());
        };
        if self.active_key_taken(key, Some(idx)) {
            return Err(RegistryError::DuplicateKey(key.to_string()));
        }
        self.module.fields[idx].status = FieldStatus::Active;
        Ok(())
    }

    /// Swap with the neighbour and renumber. Returns `false` at a boundary,
    /// where nothing changes.
    pub fn move_field(&mut self, key: &str, direction: Direction) -> Result<bool> {
        let idx = self.position(key)?;
        let target = match direction {
            Direction::Up if idx > 0 => idx - 1,
            Direction::Down if idx + 1 < self.module.fields.len() => idx + 1,
            _ => return Ok(false),
        };
        self.module.fields.swap(idx, target);
        for (i, field) in self.module.fields.iter_mut().enumerate() {
            field.order = Some(i as i64 + 1);
        }
        Ok(true)
    }

    /// Apply one command; `Ok(false)` when it left the list untouched.
    pub fn apply(&mut self, command: EditCommand) -> Result<bool> {
        match command {
            EditCommand::Add { field } => self.add_field(field).map(|_| true),
            EditCommand::Edit { field } => self.edit_field(field).map(|_| true),
            EditCommand::Disable { key } => self.disable_field(&key).map(|_| true),
            EditCommand::Enable { key } => self.enable_field(&key).map(|_| true),
            EditCommand::Move { key, direction } => self.move_field(&key, direction),
        }
    }

    /// Write the working copy back with one whole-list replace.
    pub async fn commit(self, store: &dyn ModuleStore) -> Result<ModuleDefinition> {
        debug!(
            module = %self.module.key,
            version = self.module.version,
            fields = self.module.fields.len(),
            "committing field list"
        );
        store
            .replace_fields(self.module.id, &self.module.fields, self.module.version)
            .await
    }
}

/// Editable state of one field in the admin form. List-valued attributes
/// are held as comma-separated strings until saved.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDraft {
    pub label: String,
    pub key: String,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<Value>,
    pub options: String,
    pub roles: String,
    pub show_in_form: bool,
    pub show_in_list: bool,
    pub relation_ref: String,
    pub multi: bool,
    pub order: Option<i64>,
    pub status: FieldStatus,
    editing: bool,
    key_touched: bool,
}

impl FieldDraft {
    /// Draft for a brand-new field; the key follows the label.
    pub fn blank() -> Self {
        Self {
            label: String::new(),
            key: String::new(),
            kind: FieldKind::Text,
            required: false,
            default: None,
            options: String::new(),
            roles: String::new(),
            show_in_form: true,
            show_in_list: true,
            relation_ref: String::new(),
            multi: false,
            order: None,
            status: FieldStatus::Active,
            editing: false,
            key_touched: false,
        }
    }

    /// Draft for an existing field; the key is frozen.
    pub fn from_field(field: &FieldDescriptor) -> Self {
        let relation = field.relation();
        Self {
            label: field.label.clone(),
            key: field.key.clone(),
            kind: field.kind(),
            required: field.required,
            default: field.default.clone(),
            options: match relation {
                Some(spec) if spec.target.is_some() => String::new(),
                _ => options_to_text(field.options()),
            },
            roles: join_list(&field.roles),
            show_in_form: field.show_in_form,
            show_in_list: field.show_in_list,
            relation_ref: relation
                .and_then(|spec| spec.target.as_ref())
                .map(|t| t.as_ref_str().to_string())
                .unwrap_or_default(),
            multi: relation.is_some_and(|spec| spec.multi),
            order: field.order,
            status: field.status,
            editing: true,
            key_touched: true,
        }
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
        if !self.editing && !self.key_touched {
            self.key = derive_key(&self.label);
        }
    }

    /// Set the key by hand. Ignored in edit mode.
    pub fn set_key(&mut self, key: impl Into<String>) {
        if self.editing {
            return;
        }
        self.key = key.into();
        self.key_touched = true;
    }

    /// Normalize into a descriptor: strings re-split, visibility taken from
    /// the two booleans.
    pub fn into_field(self) -> Result<FieldDescriptor> {
        let is_relation = self.kind == FieldKind::Relation;
        let stored = StoredField {
            key: self.key.trim().to_string(),
            label: Some(self.label.trim().to_string()).filter(|l| !l.is_empty()),
            field_type: Some(self.kind.to_string()),
            required: self.required,
            default: self.default,
            options: Some(StoredOptions::Text(self.options)),
            roles: Some(StoredList::List(split_list(&self.roles))),
            visible: None,
            show_in_form: Some(self.show_in_form),
            show_in_list: Some(self.show_in_list),
            status: Some(self.status.as_ref().to_string()),
            order: self.order,
            ref_key: Some(self.relation_ref.trim().to_string())
                .filter(|r| is_relation && !r.is_empty()),
            multi: is_relation.then_some(self.multi),
        };
        FieldDescriptor::try_from(stored)
    }
}
