//! Persisted field shape and the two-way normalization to [`FieldDescriptor`].
//!
//! Historical documents express visibility either as `visible: ["form", "list"]`
//! or as `showInForm` / `showInList` booleans, and store `options` / `roles`
//! either as comma-separated strings or as arrays. Parsing accepts all of
//! these; serializing always writes arrays plus both visibility forms.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::RegistryError;
use crate::field::{
    FieldDescriptor, FieldKind, FieldStatus, FieldType, RelationSpec, RelationTarget, SelectOption,
};

/// `options` as stored: a comma-separated string or a list of entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredOptions {
    Text(String),
    List(Vec<StoredOption>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredOption {
    Pair {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        value: Value,
    },
    Plain(Value),
}

/// `roles` as stored: a comma-separated string or a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredList {
    Text(String),
    List(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredField {
    #[serde(default)]
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<StoredOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<StoredList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_in_form: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_in_list: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_order",
        skip_serializing_if = "Option::is_none"
    )]
    pub order: Option<i64>,
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub ref_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi: Option<bool>,
}

/// Split an editor string on commas, trimming and dropping empty entries.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Join a sequence for editing.
pub fn join_list(items: &[String]) -> String {
    items.join(", ")
}

/// Parse editor-string options. `label=value` keeps a distinct label.
pub fn options_from_text(raw: &str) -> Vec<SelectOption> {
    split_list(raw)
        .into_iter()
        .map(|entry| match entry.split_once('=') {
            Some((label, value)) if !label.trim().is_empty() && !value.trim().is_empty() => {
                SelectOption::new(label.trim(), value.trim())
            }
            _ => SelectOption::plain(entry),
        })
        .collect()
}

/// Inverse of [`options_from_text`].
pub fn options_to_text(options: &[SelectOption]) -> String {
    options
        .iter()
        .map(|o| {
            if o.label == o.value {
                o.value.clone()
            } else {
                format!("{}={}", o.label, o.value)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Stringify a scalar JSON value the way option values and ids are compared.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn lenient_order<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

impl StoredOptions {
    fn into_options(self) -> Vec<SelectOption> {
        match self {
            Self::Text(raw) => options_from_text(&raw),
            Self::List(entries) => entries
                .into_iter()
                .filter_map(StoredOption::into_option)
                .collect(),
        }
    }
}

impl StoredOption {
    fn into_option(self) -> Option<SelectOption> {
        match self {
            Self::Pair { label, value } => {
                let value = scalar_to_string(&value)?;
                let label = label.filter(|l| !l.trim().is_empty()).unwrap_or_else(|| value.clone());
                Some(SelectOption::new(label, value))
            }
            Self::Plain(value) => {
                let value = scalar_to_string(&value)?;
                let value = value.trim().to_string();
                (!value.is_empty()).then(|| SelectOption::plain(value))
            }
        }
    }
}

impl StoredList {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::Text(raw) => split_list(&raw),
            Self::List(items) => items
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }
}

fn option_list(options: &[SelectOption]) -> StoredOptions {
    StoredOptions::List(
        options
            .iter()
            .map(|o| StoredOption::Pair {
                label: Some(o.label.clone()),
                value: Value::String(o.value.clone()),
            })
            .collect(),
    )
}

/// Visibility resolution: explicit booleans, then legacy `visible`, then visible.
fn resolve_visibility(stored: &StoredField) -> (bool, bool) {
    if stored.show_in_form.is_some() || stored.show_in_list.is_some() {
        return (
            stored.show_in_form.unwrap_or(true),
            stored.show_in_list.unwrap_or(true),
        );
    }
    match &stored.visible {
        Some(views) if !views.is_empty() => (
            views.iter().any(|v| v == "form"),
            views.iter().any(|v| v == "list"),
        ),
        _ => (true, true),
    }
}

impl TryFrom<StoredField> for FieldDescriptor {
    type Error = RegistryError;

    fn try_from(stored: StoredField) -> Result<Self, Self::Error> {
        let key = stored.key.trim().to_string();
        if key.is_empty() {
            return Err(RegistryError::InvalidInput(
                "field key must not be empty".into(),
            ));
        }

        let (show_in_form, show_in_list) = resolve_visibility(&stored);

        let kind = match stored.field_type.as_deref().map(str::trim) {
            None | Some("") => FieldKind::Text,
            Some(raw) => raw.parse::<FieldKind>().map_err(|_| {
                RegistryError::InvalidInput(format!("unknown field type `{raw}` for field `{key}`"))
            })?,
        };

        let options = stored.options.map(StoredOptions::into_options).unwrap_or_default();
        let field_type = match kind {
            FieldKind::Text => FieldType::Text,
            FieldKind::Number => FieldType::Number,
            FieldKind::Date => FieldType::Date,
            FieldKind::Dropdown => FieldType::Dropdown { options },
            FieldKind::MultiSelect => FieldType::MultiSelect { options },
            FieldKind::Boolean => FieldType::Boolean,
            FieldKind::Relation => {
                let target = stored
                    .ref_key
                    .as_deref()
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(RelationTarget::parse);
                // Options of a ref-bearing relation only ever come from hydration.
                let options = if target.is_some() { Vec::new() } else { options };
                FieldType::Relation(RelationSpec {
                    target,
                    multi: stored.multi.unwrap_or(false),
                    options,
                })
            }
        };

        let label = stored
            .label
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| key.clone());

        let status = match stored.status.as_deref() {
            Some("disabled") => FieldStatus::Disabled,
            _ => FieldStatus::Active,
        };

        Ok(Self {
            key,
            label,
            field_type,
            required: stored.required,
            default: stored.default.filter(|d| !d.is_null()),
            roles: stored.roles.map(StoredList::into_vec).unwrap_or_default(),
            show_in_form,
            show_in_list,
            status,
            order: stored.order,
        })
    }
}

impl From<FieldDescriptor> for StoredField {
    fn from(field: FieldDescriptor) -> Self {
        let mut visible = Vec::new();
        if field.show_in_form {
            visible.push("form".to_string());
        }
        if field.show_in_list {
            visible.push("list".to_string());
        }

        let (options, ref_key, multi) = match &field.field_type {
            FieldType::Dropdown { options } | FieldType::MultiSelect { options } => {
                (Some(option_list(options)), None, None)
            }
            FieldType::Relation(spec) => (
                (!spec.options.is_empty()).then(|| option_list(&spec.options)),
                spec.target.as_ref().map(|t| t.as_ref_str().to_string()),
                Some(spec.multi),
            ),
            FieldType::Text | FieldType::Number | FieldType::Date | FieldType::Boolean => {
                (None, None, None)
            }
        };

        Self {
            field_type: Some(field.kind().as_ref().to_string()),
            key: field.key,
            label: Some(field.label),
            required: field.required,
            default: field.default,
            options,
            roles: (!field.roles.is_empty()).then(|| StoredList::List(field.roles)),
            visible: Some(visible),
            show_in_form: Some(field.show_in_form),
            show_in_list: Some(field.show_in_list),
            status: Some(field.status.as_ref().to_string()),
            order: field.order,
            ref_key,
            multi,
        }
    }
}

/// Copy of `fields` with hydrated relation options removed.
pub fn bare_fields(fields: &[FieldDescriptor]) -> Vec<FieldDescriptor> {
    fields
        .iter()
        .cloned()
        .map(|mut field| {
            if let FieldType::Relation(spec) = &mut field.field_type {
                if spec.target.is_some() {
                    spec.options.clear();
                }
            }
            field
        })
        .collect()
}

/// Storage form of a field list: hydrated relation options are stripped.
pub fn fields_for_storage(fields: &[FieldDescriptor]) -> Vec<StoredField> {
    bare_fields(fields).into_iter().map(StoredField::from).collect()
}

/// Parse a stored field list, failing on the first malformed entry.
pub fn parse_fields(stored: Vec<StoredField>) -> Result<Vec<FieldDescriptor>, RegistryError> {
    stored.into_iter().map(FieldDescriptor::try_from).collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(value: Value) -> FieldDescriptor {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn explicit_booleans_win_over_legacy_visible() {
        let f = parse(json!({
            "key": "a",
            "type": "text",
            "visible": ["list"],
            "showInForm": false
        }));
        assert!(!f.show_in_form);
        assert!(f.show_in_list, "missing boolean defaults to true");
    }

    #[test]
    fn legacy_visible_form_only() {
        let f = parse(json!({"key": "a", "type": "text", "visible": ["form"]}));
        assert!(f.show_in_form);
        assert!(!f.show_in_list);
    }

    #[test]
    fn legacy_visible_empty_is_permissive() {
        let f = parse(json!({"key": "a", "type": "text", "visible": []}));
        assert!(f.show_in_form);
        assert!(f.show_in_list);
    }

    #[test]
    fn no_visibility_at_all_is_visible() {
        let f = parse(json!({"key": "a"}));
        assert!(f.show_in_form && f.show_in_list);
        assert_eq!(f.kind(), FieldKind::Text);
        assert_eq!(f.label, "a", "label defaults to key");
    }

    #[test]
    fn comma_strings_are_split_and_trimmed() {
        let f = parse(json!({
            "key": "mode",
            "type": "dropdown",
            "options": " Cash, Card ,, UPI ",
            "roles": "admin,  staff ,"
        }));
        let values: Vec<_> = f.options().iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, ["Cash", "Card", "UPI"]);
        assert_eq!(f.roles, ["admin", "staff"]);
    }

    #[test]
    fn option_entries_accept_pairs_and_plain_values() {
        let f = parse(json!({
            "key": "mode",
            "type": "multi_select",
            "options": [{"label": "Cash", "value": "cash"}, "card", {"value": 3}]
        }));
        assert_eq!(
            f.options(),
            [
                SelectOption::new("Cash", "cash"),
                SelectOption::plain("card"),
                SelectOption::plain("3"),
            ]
        );
    }

    #[test]
    fn relation_options_are_never_loaded_or_stored() {
        let f = parse(json!({
            "key": "retailer",
            "type": "relation",
            "ref": "retailer",
            "options": [{"label": "Stale", "value": "R0"}]
        }));
        assert!(f.options().is_empty());

        let mut hydrated = f.clone();
        if let FieldType::Relation(spec) = &mut hydrated.field_type {
            spec.options = vec![SelectOption::new("Acme Shop", "R1")];
        }
        let stored = fields_for_storage(&[hydrated]);
        assert!(stored[0].options.is_none());
        assert_eq!(stored[0].ref_key.as_deref(), Some("retailer"));
        assert_eq!(stored[0].multi, Some(false));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = FieldDescriptor::try_from(StoredField {
            key: "x".into(),
            field_type: Some("checkbox".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidInput(_)));
    }

    #[test]
    fn empty_key_is_rejected() {
        let err = FieldDescriptor::try_from(StoredField::default()).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidInput(_)));
    }

    #[test]
    fn order_accepts_numeric_strings() {
        let f = parse(json!({"key": "a", "order": "7"}));
        assert_eq!(f.order, Some(7));
        let g = parse(json!({"key": "a", "order": 2.0}));
        assert_eq!(g.order, Some(2));
    }

    #[test]
    fn canonical_descriptor_survives_normalization() {
        let cash = SelectOption::new("Cash", "cash");
        let original = FieldDescriptor::new("mode", FieldType::dropdown(vec![cash]))
            .with_label("Payment mode")
            .with_roles(["admin"])
            .with_visibility(true, false)
            .with_order(3)
            .with_default(json!("cash"))
            .required();
        let json = serde_json::to_value(&original).unwrap();
        let back: FieldDescriptor = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(back, original);
        assert_eq!(serde_json::to_value(&back).unwrap(), json);
    }

    #[test]
    fn save_writes_legacy_visible_alongside_booleans() {
        let f = FieldDescriptor::new("a", FieldType::Text).with_visibility(false, true);
        let stored = StoredField::from(f);
        assert_eq!(stored.visible, Some(vec!["list".to_string()]));
        assert_eq!(stored.show_in_form, Some(false));
        assert_eq!(stored.show_in_list, Some(true));
    }

    #[test]
    fn editor_text_round_trip_keeps_distinct_labels() {
        let options = vec![SelectOption::new("Cash", "cash"), SelectOption::plain("card")];
        let text = options_to_text(&options);
        assert_eq!(text, "Cash=cash, card");
        assert_eq!(options_from_text(&text), options);
        assert_eq!(join_list(&["admin".into(), "staff".into()]), "admin, staff");
    }

    #[test]
    fn null_default_means_no_default() {
        let f = parse(json!({"key": "a", "default": null}));
        assert!(f.default.is_none());
    }

    #[test]
    fn disabled_status_is_parsed() {
        let f = parse(json!({"key": "a", "status": "disabled"}));
        assert_eq!(f.status, FieldStatus::Disabled);
        let g = parse(json!({"key": "a", "status": "whatever"}));
        assert_eq!(g.status, FieldStatus::Active);
    }
}
