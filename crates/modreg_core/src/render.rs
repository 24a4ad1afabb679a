//! Render interpreter — pure functions from (definition, role, view, data) to
//! renderable form fields and table cells.
//!
//! Field selection is identical for both views: drop disabled fields, drop
//! fields gated to other roles, drop fields hidden in the view, then stable
//! sort by `order` (absent = 0).

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::FieldErrors;
use crate::field::{FieldDescriptor, FieldType, SelectOption, View};
use crate::hydrate::HydrationWarning;
use crate::module::{ModuleDefinition, Record};
use crate::wire::scalar_to_string;

/// Placeholder shown for empty values in list view.
pub const EMPTY_DISPLAY: &str = "—";

pub fn select_fields<'a>(
    module: &'a ModuleDefinition,
    role: &str,
    view: View,
) -> Vec<&'a FieldDescriptor> {
    let mut fields: Vec<&FieldDescriptor> = module
        .fields
        .iter()
        .filter(|f| f.is_active())
        .filter(|f| f.visible_to(role))
        .filter(|f| f.visible_in(view))
        .collect();
    // `sort_by_key` is stable: ties keep definition order.
    fields.sort_by_key(|f| f.order.unwrap_or(0));
    fields
}

fn empty_value(field: &FieldDescriptor) -> Value {
    if field.is_multi_valued() {
        Value::Array(Vec::new())
    } else {
        match field.field_type {
            FieldType::Boolean => Value::Bool(false),
            _ => Value::String(String::new()),
        }
    }
}

/// Value a form control starts with: the stored value, else the field's
/// default, else the type's empty value.
pub fn form_value(field: &FieldDescriptor, raw: Option<&Value>) -> Value {
    match raw {
        Some(v) if !v.is_null() => v.clone(),
        _ => field.default.clone().unwrap_or_else(|| empty_value(field)),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn is_true(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn raw_text(value: &Value) -> String {
    scalar_to_string(value).unwrap_or_else(|| value.to_string())
}

/// Label of the option whose value matches, else the raw value.
fn option_label(options: &[SelectOption], value: &Value) -> String {
    let raw = raw_text(value);
    options
        .iter()
        .find(|o| o.value == raw)
        .map(|o| o.label.clone())
        .unwrap_or(raw)
}

fn join_labels(options: &[SelectOption], value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .filter(|v| !is_blank(v))
            .map(|v| option_label(options, v))
            .collect::<Vec<_>>()
            .join(", "),
        other => option_label(options, other),
    }
}

/// Read-only list-view text for a stored value.
pub fn display_value(field: &FieldDescriptor, raw: Option<&Value>) -> String {
    let options: &[SelectOption] = match &field.field_type {
        FieldType::Boolean => {
            let effective = raw.filter(|v| !v.is_null()).or(field.default.as_ref());
            return if effective.is_some_and(is_true) { "Yes" } else { "No" }.to_string();
        }
        FieldType::Dropdown { options } | FieldType::MultiSelect { options } => options,
        FieldType::Relation(spec) => &spec.options,
        FieldType::Text | FieldType::Number | FieldType::Date => &[],
    };

    let Some(value) = raw.filter(|v| !is_blank(v)) else {
        return EMPTY_DISPLAY.to_string();
    };
    let text = join_labels(options, value);

    if text.is_empty() {
        EMPTY_DISPLAY.to_string()
    } else {
        text
    }
}

/// Form control a field renders as.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "control", rename_all = "snake_case")]
pub enum Control {
    TextInput,
    NumberInput,
    DatePicker,
    Select { options: Vec<SelectOption> },
    MultiSelect { options: Vec<SelectOption> },
    Toggle { checked: bool },
}

fn control_for(field: &FieldDescriptor, value: &Value) -> Control {
    match &field.field_type {
        FieldType::Text => Control::TextInput,
        FieldType::Number => Control::NumberInput,
        FieldType::Date => Control::DatePicker,
        FieldType::Dropdown { options } => Control::Select {
            options: options.clone(),
        },
        FieldType::MultiSelect { options } => Control::MultiSelect {
            options: options.clone(),
        },
        FieldType::Boolean => Control::Toggle {
            checked: is_true(value),
        },
        FieldType::Relation(spec) if spec.multi => Control::MultiSelect {
            options: spec.options.clone(),
        },
        FieldType::Relation(spec) => Control::Select {
            options: spec.options.clone(),
        },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormField {
    pub key: String,
    /// Label with the required marker.
    pub label: String,
    pub required: bool,
    #[serde(flatten)]
    pub control: Control,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedForm {
    pub module_key: String,
    pub fields: Vec<FormField>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<HydrationWarning>,
}

impl RenderedForm {
    /// Attach hydration warnings. A warned field shows the message inline
    /// unless it already carries a validation error.
    pub fn with_warnings(mut self, warnings: Vec<HydrationWarning>) -> Self {
        for warning in &warnings {
            if let Some(field) = self.fields.iter_mut().find(|f| f.key == warning.field) {
                field
                    .error
                    .get_or_insert_with(|| format!("options unavailable: {}", warning.message));
            }
        }
        self.warnings = warnings;
        self
    }
}

/// Form for `role`, prefilled from `data`, with `errors` attached per field.
pub fn render_form(
    module: &ModuleDefinition,
    role: &str,
    data: &Map<String, Value>,
    errors: &FieldErrors,
) -> RenderedForm {
    let fields = select_fields(module, role, View::Form)
        .into_iter()
        .map(|field| {
            let value = form_value(field, data.get(&field.key));
            FormField {
                key: field.key.clone(),
                label: field.display_label(),
                required: field.required,
                control: control_for(field, &value),
                value,
                error: errors.get(&field.key).map(str::to_string),
            }
        })
        .collect();
    RenderedForm {
        module_key: module.key.clone(),
        fields,
        warnings: Vec::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub key: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRow {
    pub id: String,
    /// Best-guess record label; may be the bare id.
    pub label: String,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedTable {
    pub module_key: String,
    pub columns: Vec<Column>,
    pub rows: Vec<TableRow>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<HydrationWarning>,
}

/// List view of `records` for `role`; one cell per visible column.
pub fn render_table(module: &ModuleDefinition, role: &str, records: &[Record]) -> RenderedTable {
    let fields = select_fields(module, role, View::List);
    let columns = fields
        .iter()
        .map(|f| Column {
            key: f.key.clone(),
            label: f.label.clone(),
        })
        .collect();
    let rows = records
        .iter()
        .map(|record| TableRow {
            id: record.id.clone(),
            label: record.display_label(),
            cells: fields
                .iter()
                .map(|f| display_value(f, record.data.get(&f.key)))
                .collect(),
        })
        .collect();
    RenderedTable {
        module_key: module.key.clone(),
        columns,
        rows,
        warnings: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::field::RelationSpec;

    fn module(fields: Vec<FieldDescriptor>) -> ModuleDefinition {
        ModuleDefinition::new("m", "M", fields)
    }

    fn keys(fields: &[&FieldDescriptor]) -> Vec<String> {
        fields.iter().map(|f| f.key.clone()).collect()
    }

    #[test]
    fn explicit_order_sorts_ascending() {
        let m = module(vec![
            FieldDescriptor::new("a", FieldType::Text).with_order(3),
            FieldDescriptor::new("b", FieldType::Text).with_order(1),
            FieldDescriptor::new("c", FieldType::Text).with_order(2),
        ]);
        assert_eq!(keys(&select_fields(&m, "admin", View::Form)), ["b", "c", "a"]);
    }

    #[test]
    fn equal_or_absent_order_keeps_sequence() {
        let m = module(vec![
            FieldDescriptor::new("x", FieldType::Text),
            FieldDescriptor::new("y", FieldType::Text).with_order(0),
            FieldDescriptor::new("z", FieldType::Text),
            FieldDescriptor::new("w", FieldType::Text).with_order(-1),
        ]);
        assert_eq!(keys(&select_fields(&m, "admin", View::List)), ["w", "x", "y", "z"]);
    }

    #[test]
    fn role_gated_fields_never_render() {
        let m = module(vec![
            FieldDescriptor::new("salary", FieldType::Number).with_roles(["admin"]),
            FieldDescriptor::new("name", FieldType::Text),
        ]);
        for view in [View::Form, View::List] {
            assert_eq!(keys(&select_fields(&m, "staff", view)), ["name"]);
            assert_eq!(keys(&select_fields(&m, "admin", view)), ["salary", "name"]);
        }
    }

    #[test]
    fn disabled_fields_never_render_but_stay_defined() {
        let m = module(vec![
            FieldDescriptor::new("old", FieldType::Text).disabled(),
            FieldDescriptor::new("new", FieldType::Text),
        ]);
        for view in [View::Form, View::List] {
            assert_eq!(keys(&select_fields(&m, "admin", view)), ["new"]);
        }
        assert!(m.field("old").is_some());
    }

    #[test]
    fn view_flags_filter_independently() {
        let m = module(vec![
            FieldDescriptor::new("notes", FieldType::Text).with_visibility(true, false),
            FieldDescriptor::new("total", FieldType::Number).with_visibility(false, true),
        ]);
        assert_eq!(keys(&select_fields(&m, "admin", View::Form)), ["notes"]);
        assert_eq!(keys(&select_fields(&m, "admin", View::List)), ["total"]);
    }

    #[test]
    fn form_value_fallbacks() {
        let text = FieldDescriptor::new("t", FieldType::Text);
        let flag = FieldDescriptor::new("b", FieldType::Boolean);
        let tags = FieldDescriptor::new("m", FieldType::multi_select(vec![]));
        let staff = FieldDescriptor::new("s", FieldType::relation("users", true));
        let status = FieldDescriptor::new("d", FieldType::Text).with_default(json!("open"));

        assert_eq!(form_value(&text, None), json!(""));
        assert_eq!(form_value(&text, Some(&Value::Null)), json!(""));
        assert_eq!(form_value(&text, Some(&json!("hi"))), json!("hi"));
        assert_eq!(form_value(&flag, None), json!(false));
        assert_eq!(form_value(&tags, None), json!([]));
        assert_eq!(form_value(&staff, None), json!([]));
        assert_eq!(form_value(&status, None), json!("open"));
        assert_eq!(form_value(&status, Some(&json!("closed"))), json!("closed"));
    }

    #[test]
    fn dropdown_display_uses_option_label_or_raw() {
        let f = FieldDescriptor::new(
            "mode",
            FieldType::dropdown(vec![SelectOption::new("Cash", "cash")]),
        );
        assert_eq!(display_value(&f, Some(&json!("cash"))), "Cash");
        assert_eq!(display_value(&f, Some(&json!("unknown"))), "unknown");
    }

    #[test]
    fn empty_values_render_em_dash_for_every_non_boolean_type() {
        let fields = [
            FieldDescriptor::new("t", FieldType::Text),
            FieldDescriptor::new("n", FieldType::Number),
            FieldDescriptor::new("d", FieldType::Date),
            FieldDescriptor::new("s", FieldType::dropdown(vec![SelectOption::plain("a")])),
            FieldDescriptor::new("m", FieldType::multi_select(vec![SelectOption::plain("a")])),
            FieldDescriptor::new("r", FieldType::relation("retailer", false)),
        ];
        for f in &fields {
            assert_eq!(display_value(f, None), EMPTY_DISPLAY, "{}", f.key);
            assert_eq!(display_value(f, Some(&Value::Null)), EMPTY_DISPLAY, "{}", f.key);
            assert_eq!(display_value(f, Some(&json!(""))), EMPTY_DISPLAY, "{}", f.key);
        }
        assert_eq!(display_value(&fields[4], Some(&json!([]))), EMPTY_DISPLAY);
    }

    #[test]
    fn multi_select_joins_matched_labels_and_raw_values() {
        let f = FieldDescriptor::new(
            "days",
            FieldType::multi_select(vec![
                SelectOption::new("Monday", "mon"),
                SelectOption::new("Tuesday", "tue"),
            ]),
        );
        assert_eq!(display_value(&f, Some(&json!(["mon", "sun", "tue"]))), "Monday, sun, Tuesday");
    }

    #[test]
    fn relation_display_follows_cardinality() {
        let options = vec![SelectOption::new("Acme Shop", "R1"), SelectOption::new("Corner", "R2")];
        let single = FieldDescriptor::new(
            "retailer",
            FieldType::Relation(RelationSpec {
                target: None,
                multi: false,
                options: options.clone(),
            }),
        );
        let many = FieldDescriptor::new(
            "retailers",
            FieldType::Relation(RelationSpec {
                target: None,
                multi: true,
                options,
            }),
        );
        assert_eq!(display_value(&single, Some(&json!("R2"))), "Corner");
        assert_eq!(display_value(&many, Some(&json!(["R1", "R9"]))), "Acme Shop, R9");
    }

    #[test]
    fn arrays_on_plain_fields_are_joined() {
        let f = FieldDescriptor::new("phones", FieldType::Text);
        assert_eq!(display_value(&f, Some(&json!(["123", 456]))), "123, 456");
        let n = FieldDescriptor::new("qty", FieldType::Number);
        assert_eq!(display_value(&n, Some(&json!(12.5))), "12.5");
    }

    #[test]
    fn boolean_display_and_control() {
        let f = FieldDescriptor::new("paid", FieldType::Boolean);
        assert_eq!(display_value(&f, Some(&json!(true))), "Yes");
        assert_eq!(display_value(&f, Some(&json!(false))), "No");
        assert_eq!(display_value(&f, None), "No");

        let m = module(vec![f.clone()]);
        let paid = json!({"paid": true}).as_object().cloned().unwrap();
        let checked = render_form(&m, "admin", &paid, &FieldErrors::new());
        assert_eq!(checked.fields[0].control, Control::Toggle { checked: true });
        let unchecked = render_form(&m, "admin", &Map::new(), &FieldErrors::new());
        assert_eq!(unchecked.fields[0].control, Control::Toggle { checked: false });
        assert_eq!(unchecked.fields[0].value, json!(false));

        let defaulted = f.with_default(json!(true));
        assert_eq!(display_value(&defaulted, None), "Yes");
    }

    #[test]
    fn errors_attach_to_their_fields() {
        let m = module(vec![
            FieldDescriptor::new("amount", FieldType::Number).required(),
            FieldDescriptor::new("note", FieldType::Text),
        ]);
        let mut errors = FieldErrors::new();
        errors.add("amount", "is required");
        let form = render_form(&m, "admin", &Map::new(), &errors);
        assert_eq!(form.fields[0].error.as_deref(), Some("is required"));
        assert_eq!(form.fields[0].label, "amount *");
        assert!(form.fields[1].error.is_none());
    }

    #[test]
    fn bill_form_for_admin_with_no_data() {
        let m = ModuleDefinition::new(
            "bill",
            "Bill",
            vec![
                FieldDescriptor::new(
                    "retailer",
                    FieldType::Relation(RelationSpec {
                        target: Some(crate::field::RelationTarget::Module("retailer".into())),
                        multi: false,
                        options: vec![SelectOption::new("Acme Shop", "R1")],
                    }),
                )
                .with_order(1),
                FieldDescriptor::new("amount", FieldType::Number).with_order(2).required(),
            ],
        );
        let form = render_form(&m, "admin", &Map::new(), &FieldErrors::new());

        assert_eq!(form.fields.len(), 2);
        assert_eq!(
            form.fields[0].control,
            Control::Select {
                options: vec![SelectOption::new("Acme Shop", "R1")]
            }
        );
        assert_eq!(form.fields[0].value, json!(""));
        assert_eq!(form.fields[1].control, Control::NumberInput);
        assert_eq!(form.fields[1].label, "amount *");
        assert!(form.fields[1].required);
    }

    #[test]
    fn table_has_one_cell_per_column() {
        let m = module(vec![
            FieldDescriptor::new("name", FieldType::Text).with_label("Name"),
            FieldDescriptor::new("paid", FieldType::Boolean),
            FieldDescriptor::new("secret", FieldType::Text).with_roles(["admin"]),
        ]);
        let data = json!({"name": "Acme", "paid": true}).as_object().cloned().unwrap();
        let mut r = Record::new("m", data);
        r.id = "R1".into();
        let stale = Record::new("m", json!({"gone": 1}).as_object().cloned().unwrap());

        let table = render_table(&m, "staff", &[r, stale]);
        assert_eq!(
            table.columns,
            [
                Column { key: "name".into(), label: "Name".into() },
                Column { key: "paid".into(), label: "paid".into() },
            ]
        );
        assert_eq!(table.rows[0].cells, ["Acme", "Yes"]);
        assert_eq!(table.rows[0].label, "Acme");
        assert_eq!(table.rows[1].cells, [EMPTY_DISPLAY, "No"]);
    }

    #[test]
    fn form_field_serializes_control_inline() {
        let m = module(vec![FieldDescriptor::new("when", FieldType::Date)]);
        let form = render_form(&m, "admin", &Map::new(), &FieldErrors::new());
        let json = serde_json::to_value(&form.fields[0]).unwrap();
        assert_eq!(json["control"], "date_picker");
        assert_eq!(json["value"], "");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn hydration_warnings_show_inline_without_hiding_validation_errors() {
        let m = module(vec![
            FieldDescriptor::new("shop", FieldType::relation("retailer", false)).required(),
            FieldDescriptor::new("owner", FieldType::relation("users", false)),
        ]);
        let mut errors = FieldErrors::new();
        errors.add("shop", "is required");
        let warnings = vec![
            HydrationWarning {
                field: "shop".into(),
                message: "timed out after 5s".into(),
            },
            HydrationWarning {
                field: "owner".into(),
                message: "timed out after 5s".into(),
            },
        ];

        let form = render_form(&m, "admin", &Map::new(), &errors).with_warnings(warnings.clone());
        assert_eq!(form.fields[0].error.as_deref(), Some("is required"));
        assert_eq!(
            form.fields[1].error.as_deref(),
            Some("options unavailable: timed out after 5s")
        );
        assert_eq!(form.warnings, warnings);

        let clean = serde_json::to_value(render_form(&m, "admin", &Map::new(), &errors)).unwrap();
        assert!(clean.get("warnings").is_none());
    }
}
