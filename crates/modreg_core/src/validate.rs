//! Record validation against a module definition.
//!
//! Only active fields are checked. Keys in `data` that no longer match an
//! active field are left alone so records survive schema drift.

use chrono::{DateTime, NaiveDate};
use serde_json::{Map, Value};

use crate::error::{FieldErrors, RegistryError};
use crate::field::{FieldDescriptor, FieldType, SelectOption};
use crate::module::ModuleDefinition;
use crate::wire::scalar_to_string;

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

fn is_number(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(s) => s.trim().parse::<f64>().is_ok_and(f64::is_finite),
        _ => false,
    }
}

fn is_date(value: &Value) -> bool {
    let Value::String(s) = value else {
        return false;
    };
    NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() || DateTime::parse_from_rfc3339(s).is_ok()
}

fn unknown_option(options: &[SelectOption], value: &Value) -> Option<String> {
    let raw = scalar_to_string(value).unwrap_or_else(|| value.to_string());
    (!options.iter().any(|o| o.value == raw)).then_some(raw)
}

/// Type check for a non-blank value. `None` means the value is acceptable.
fn check_value(field: &FieldDescriptor, value: &Value) -> Option<String> {
    match &field.field_type {
        FieldType::Text => (!is_scalar(value)).then(|| "must be text".to_string()),
        FieldType::Number => (!is_number(value)).then(|| "must be a number".to_string()),
        FieldType::Date => (!is_date(value)).then(|| "must be a date (YYYY-MM-DD)".to_string()),
        FieldType::Boolean => (!value.is_boolean()).then(|| "must be true or false".to_string()),
        FieldType::Dropdown { options } => {
            if !is_scalar(value) {
                return Some("must be a single value".into());
            }
            unknown_option(options, value).map(|raw| format!("`{raw}` is not a valid option"))
        }
        FieldType::MultiSelect { options } => {
            let Value::Array(items) = value else {
                return Some("must be a list of values".into());
            };
            items
                .iter()
                .find_map(|v| unknown_option(options, v))
                .map(|raw| format!("`{raw}` is not a valid option"))
        }
        FieldType::Relation(spec) if spec.multi => match value {
            Value::Array(items) if items.iter().all(is_scalar) => None,
            _ => Some("must be a list of references".into()),
        },
        FieldType::Relation(_) => {
            (!is_scalar(value)).then(|| "must be a single reference".to_string())
        }
    }
}

/// Validate submitted record data. Required checks apply to fields the role
/// can see on the form; type checks apply to every active field present.
pub fn validate_record(
    module: &ModuleDefinition,
    role: &str,
    data: &Map<String, Value>,
) -> Result<(), RegistryError> {
    let mut errors = FieldErrors::new();
    for field in module.fields.iter().filter(|f| f.is_active()) {
        let value = data.get(&field.key);
        if is_blank(value) {
            if field.required && field.show_in_form && field.visible_to(role) {
                errors.add(&field.key, "is required");
            }
            continue;
        }
        if let Some(message) = value.and_then(|v| check_value(field, v)) {
            errors.add(&field.key, message);
        }
    }
    errors.into_result()
}
