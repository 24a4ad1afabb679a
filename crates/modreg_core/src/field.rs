//! Field descriptor — the canonical in-memory shape of one module attribute.
//!
//! Persisted shapes (legacy `visible` arrays, comma-separated `options` and
//! `roles`) never reach this type: serde goes through [`crate::wire::StoredField`]
//! in both directions.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::wire::StoredField;

/// Sentinel `ref` values that point at the identity directory instead of a module.
pub const USER_REFS: [&str; 2] = ["user", "users"];

/// One selectable `{label, value}` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }

    /// Option whose label and value are the same string.
    pub fn plain(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            label: value.clone(),
            value,
        }
    }
}

/// Rendering context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum View {
    Form,
    List,
}

/// The `type` discriminator as persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum FieldKind {
    Text,
    Number,
    Date,
    Dropdown,
    MultiSelect,
    Boolean,
    Relation,
}

/// What a relation field points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationTarget {
    /// The identity directory (`ref` = `user` / `users`).
    Users,
    /// Records of another module, by module key.
    Module(String),
}

impl RelationTarget {
    pub fn parse(raw: &str) -> Self {
        if USER_REFS.contains(&raw) {
            Self::Users
        } else {
            Self::Module(raw.to_string())
        }
    }

    pub fn as_ref_str(&self) -> &str {
        match self {
            Self::Users => "users",
            Self::Module(key) => key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationSpec {
    pub target: Option<RelationTarget>,
    pub multi: bool,
    /// Filled in by hydration; never persisted when `target` is set.
    pub options: Vec<SelectOption>,
}

/// Closed set of field types with their per-type payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Number,
    Date,
    Dropdown { options: Vec<SelectOption> },
    MultiSelect { options: Vec<SelectOption> },
    Boolean,
    Relation(RelationSpec),
}

impl FieldType {
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Text => FieldKind::Text,
            Self::Number => FieldKind::Number,
            Self::Date => FieldKind::Date,
            Self::Dropdown { .. } => FieldKind::Dropdown,
            Self::MultiSelect { .. } => FieldKind::MultiSelect,
            Self::Boolean => FieldKind::Boolean,
            Self::Relation(_) => FieldKind::Relation,
        }
    }

    pub fn relation(target: &str, multi: bool) -> Self {
        Self::Relation(RelationSpec {
            target: Some(RelationTarget::parse(target)),
            multi,
            options: Vec::new(),
        })
    }

    pub fn dropdown(options: Vec<SelectOption>) -> Self {
        Self::Dropdown { options }
    }

    pub fn multi_select(options: Vec<SelectOption>) -> Self {
        Self::MultiSelect { options }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FieldStatus {
    #[default]
    Active,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredField", into = "StoredField")]
pub struct FieldDescriptor {
    pub key: String,
    pub label: String,
    pub field_type: FieldType,
    pub required: bool,
    pub default: Option<serde_json::Value>,
    pub roles: Vec<String>,
    pub show_in_form: bool,
    pub show_in_list: bool,
    pub status: FieldStatus,
    pub order: Option<i64>,
}

impl FieldDescriptor {
    /// Active, visible everywhere, open to all roles, label = key.
    pub fn new(key: impl Into<String>, field_type: FieldType) -> Self {
        let key = key.into();
        Self {
            label: key.clone(),
            key,
            field_type,
            required: false,
            default: None,
            roles: Vec::new(),
            show_in_form: true,
            show_in_list: true,
            status: FieldStatus::Active,
            order: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.status = FieldStatus::Disabled;
        self
    }

    pub fn with_visibility(mut self, show_in_form: bool, show_in_list: bool) -> Self {
        self.show_in_form = show_in_form;
        self.show_in_list = show_in_list;
        self
    }

    pub fn kind(&self) -> FieldKind {
        self.field_type.kind()
    }

    pub fn is_active(&self) -> bool {
        self.status == FieldStatus::Active
    }

    /// Whether the field holds a sequence of values.
    pub fn is_multi_valued(&self) -> bool {
        match &self.field_type {
            FieldType::MultiSelect { .. } => true,
            FieldType::Relation(spec) => spec.multi,
            _ => false,
        }
    }

    /// Selectable options for dropdown, multi-select and relation fields.
    pub fn options(&self) -> &[SelectOption] {
        match &self.field_type {
            FieldType::Dropdown { options } | FieldType::MultiSelect { options } => options,
            FieldType::Relation(spec) => &spec.options,
            FieldType::Text | FieldType::Number | FieldType::Date | FieldType::Boolean => &[],
        }
    }

    pub fn relation(&self) -> Option<&RelationSpec> {
        match &self.field_type {
            FieldType::Relation(spec) => Some(spec),
            _ => None,
        }
    }

    /// Empty `roles` means every role may see the field.
    pub fn visible_to(&self, role: &str) -> bool {
        self.roles.is_empty() || self.roles.iter().any(|r| r == role)
    }

    pub fn visible_in(&self, view: View) -> bool {
        match view {
            View::Form => self.show_in_form,
            View::List => self.show_in_list,
        }
    }

    /// Label with the required marker appended.
    pub fn display_label(&self) -> String {
        if self.required {
            format!("{} *", self.label)
        } else {
            self.label.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_strings() {
        for kind in [
            FieldKind::Text,
            FieldKind::Number,
            FieldKind::Date,
            FieldKind::Dropdown,
            FieldKind::MultiSelect,
            FieldKind::Boolean,
            FieldKind::Relation,
        ] {
            let parsed: FieldKind = kind.as_ref().parse().unwrap();
            assert_eq!(parsed, kind);
        }
        assert_eq!(FieldKind::MultiSelect.as_ref(), "multi_select");
        assert!("checkbox".parse::<FieldKind>().is_err());
    }

    #[test]
    fn relation_target_sentinels() {
        assert_eq!(RelationTarget::parse("user"), RelationTarget::Users);
        assert_eq!(RelationTarget::parse("users"), RelationTarget::Users);
        assert_eq!(
            RelationTarget::parse("retailer"),
            RelationTarget::Module("retailer".into())
        );
    }

    #[test]
    fn multi_valued_fields() {
        assert!(FieldDescriptor::new("tags", FieldType::multi_select(vec![])).is_multi_valued());
        let staff = FieldDescriptor::new("staff", FieldType::relation("users", true));
        assert!(staff.is_multi_valued());
        let shop = FieldDescriptor::new("shop", FieldType::relation("retailer", false));
        assert!(!shop.is_multi_valued());
        assert!(!FieldDescriptor::new("name", FieldType::Text).is_multi_valued());
    }

    #[test]
    fn role_visibility_is_flat_comparison() {
        let open = FieldDescriptor::new("a", FieldType::Text);
        assert!(open.visible_to("anyone"));

        let gated = FieldDescriptor::new("b", FieldType::Text).with_roles(["admin", "manager"]);
        assert!(gated.visible_to("admin"));
        assert!(!gated.visible_to("Admin"));
        assert!(!gated.visible_to("staff"));
    }

    #[test]
    fn display_label_marks_required() {
        let f = FieldDescriptor::new("amount", FieldType::Number).required();
        assert_eq!(f.display_label(), "amount *");
        let g = FieldDescriptor::new("note", FieldType::Text).with_label("Note");
        assert_eq!(g.display_label(), "Note");
    }
}
