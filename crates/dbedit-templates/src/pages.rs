//! View models handed to the page templates

use dbedit_core::Value;
use dbedit_schema::{ColumnConfig, ColumnKind, InputType};
use serde::Serialize;

/// One row of the list view
#[derive(Debug, Clone, Serialize)]
pub struct ViewRow {
    pub id: String,
    /// Pre-rendered `<td>` cells
    pub cells: String,
    pub edit_url: Option<String>,
    pub delete_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewPage {
    pub prefix: String,
    pub message: Option<String>,
    pub outer_class: Option<String>,
    pub headers: Vec<String>,
    pub show_delete: bool,
    pub delete_header: String,
    pub delete_link: String,
    pub rows: Vec<ViewRow>,
    /// Rendered add snippet, present when rows may be added
    pub add_link: Option<String>,
}

/// One `label: value` line of the delete confirmation
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRow {
    pub label: String,
    pub cell: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteConfirmPage {
    pub prefix: String,
    pub outer_class: Option<String>,
    pub rows: Vec<SummaryRow>,
    pub action_url: String,
    pub handle_param: String,
    pub handle: String,
    pub id_param: String,
    pub row_id: String,
    pub action_param: String,
    pub cancel: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FormPage {
    pub prefix: String,
    pub outer_class: Option<String>,
    pub action_url: String,
    pub fields: Vec<FormField>,
    pub submit_id: Option<String>,
    pub submit_label: String,
    pub submit_value: String,
    pub reset: Option<String>,
    pub cancel: String,
    pub action_param: String,
    pub handle_param: String,
    pub handle: String,
    pub id_param: String,
    pub row_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Control {
    Input,
    Textarea,
    Checkbox,
    Select,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
    pub selected: bool,
}

/// One labelled control of the add or edit form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormField {
    /// `id` and `name` of the control: the attribute prefix plus the field name
    pub id: String,
    pub label: String,
    pub control: Control,
    pub input_type: String,
    pub classes: String,
    pub value: String,
    pub checked: bool,
    pub disabled: bool,
    pub rows: u32,
    pub cols: u32,
    pub step: Option<String>,
    pub options: Vec<SelectOption>,
}

impl FormField {
    /// Control for `column` showing `value`.
    ///
    /// `value` is the stored value on the edit form and the configured default
    /// on the add form.
    pub fn for_column(column: &ColumnConfig, prefix: &str, value: &Value, disabled: bool) -> Self {
        let value = value.to_display_string();
        let mut classes = column.input_classes.clone();
        let mut field = Self {
            id: format!("{}{}", prefix, column.reference_name()),
            label: column.display_label().to_string(),
            control: Control::Input,
            input_type: InputType::Text.as_str().to_string(),
            classes: String::new(),
            value: String::new(),
            checked: false,
            disabled,
            rows: 0,
            cols: 0,
            step: None,
            options: Vec::new(),
        };

        match &column.kind {
            ColumnKind::Textarea { rows, cols } => {
                field.control = Control::Textarea;
                field.rows = *rows;
                field.cols = *cols;
                field.value = value;
            }
            ColumnKind::Checkbox { .. } => {
                field.control = Control::Checkbox;
                field.checked = Value::String(value).is_truthy();
            }
            ColumnKind::Dropdown { options } => {
                field.control = Control::Select;
                let selected = options.iter().position(|option| option.value == value);
                field.options = options
                    .iter()
                    .enumerate()
                    .map(|(idx, option)| SelectOption {
                        label: option.label.clone(),
                        value: option.value.clone(),
                        selected: selected == Some(idx),
                    })
                    .collect();
            }
            ColumnKind::Date(_) => {
                field.input_type = "date".to_string();
                classes.push("date".to_string());
                field.value = value;
            }
            ColumnKind::DateTime(_) => {
                field.input_type = "datetime".to_string();
                classes.push("datetime".to_string());
                field.value = value;
            }
            ColumnKind::Plain { input, step } => {
                field.input_type = input.as_str().to_string();
                if *input == InputType::Time {
                    classes.push("time".to_string());
                }
                if *input == InputType::Number {
                    field.step = step.clone();
                }
                field.value = value;
            }
            ColumnKind::Computed { input, .. } => {
                field.input_type = input.as_str().to_string();
                field.value = value;
            }
        }

        field.classes = classes.join(" ");
        field
    }
}
