use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("A field with this key already exists: {0}")]
    DuplicateKey(String),

    #[error("validation failed: {} field(s)", .0.len())]
    Validation(FieldErrors),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("failed to load module: field `{field}`: {reason}")]
    HydrationFailure { field: String, reason: String },

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl RegistryError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::DuplicateKey(_) => 409,
            Self::Validation(_) => 422,
            Self::Conflict(_) => 409,
            Self::HydrationFailure { .. } => 502,
            Self::Unauthorized(_) => 403,
            Self::InvalidInput(_) => 400,
            Self::Internal(_) => 500,
        }
    }

    /// Field-keyed messages when this is a validation error.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Validation messages keyed by field `key`, ordered for stable output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message for `key`. The first message per key wins.
    pub fn add(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.0.entry(key.into()).or_insert_with(|| message.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `Ok(())` when empty, otherwise a `Validation` error carrying these messages.
    pub fn into_result(self) -> Result<(), RegistryError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(RegistryError::Validation(self))
        }
    }
}

impl FromIterator<(String, String)> for FieldErrors {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut errors = Self::new();
        for (k, v) in iter {
            errors.add(k, v);
        }
        errors
    }
}
