//! Declarative column configuration
//!
//! Each column of an editor is described by a [`ColumnConfig`]. The way a
//! column is queried, displayed and edited depends on its [`ColumnKind`]; the
//! remaining attributes (constraints, joins, permissions, display flags) apply
//! to every kind.

use dbedit_core::Value;
use serde::{Deserialize, Serialize};

use crate::error::{SchemaError, SchemaResult};

fn default_true() -> bool {
    true
}

/// HTML input types handled as plain text-like inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    #[default]
    Text,
    Number,
    Email,
    Url,
    Tel,
    Password,
    Search,
    Color,
    Time,
    Month,
    Week,
}

impl InputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Email => "email",
            Self::Url => "url",
            Self::Tel => "tel",
            Self::Password => "password",
            Self::Search => "search",
            Self::Color => "color",
            Self::Time => "time",
            Self::Month => "month",
            Self::Week => "week",
        }
    }
}

/// Options shared by date and date-time columns
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateOptions {
    /// strftime-style format used when displaying the column.
    ///
    /// When set, the value is fetched as a unix timestamp and formatted in the
    /// server's local timezone, so database and server must agree on it.
    #[serde(default)]
    pub format: Option<String>,
    /// strftime-style format that submitted form values are parsed with.
    ///
    /// Without it inputs must already produce `YYYY-MM-DD` (plus `HH:MM:SS`).
    #[serde(default)]
    pub input_format: Option<String>,
}

/// Markup shown for the unchecked and checked state of a checkbox column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckboxLabels {
    #[serde(default = "CheckboxLabels::default_unchecked")]
    pub unchecked: String,
    #[serde(default = "CheckboxLabels::default_checked")]
    pub checked: String,
}

impl CheckboxLabels {
    fn default_unchecked() -> String {
        "No".to_string()
    }

    fn default_checked() -> String {
        "Yes".to_string()
    }

    pub fn new(unchecked: impl Into<String>, checked: impl Into<String>) -> Self {
        Self {
            unchecked: unchecked.into(),
            checked: checked.into(),
        }
    }

    pub fn for_state(&self, checked: bool) -> &str {
        if checked { &self.checked } else { &self.unchecked }
    }
}

impl Default for CheckboxLabels {
    fn default() -> Self {
        Self::new(Self::default_unchecked(), Self::default_checked())
    }
}

/// One `<option>` of a dropdown column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropdownOption {
    pub label: String,
    pub value: String,
}

/// How a column is queried, displayed and edited
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnKind {
    /// Stored value shown as is, edited through an `<input>`
    Plain {
        #[serde(default)]
        input: InputType,
        /// `step` attribute for number inputs
        #[serde(default)]
        step: Option<String>,
    },
    /// Displayed through an SQL expression; edited as a plain input
    Computed {
        sql: String,
        #[serde(default)]
        input: InputType,
    },
    Date(DateOptions),
    DateTime(DateOptions),
    Checkbox {
        #[serde(default)]
        labels: CheckboxLabels,
    },
    Dropdown { options: Vec<DropdownOption> },
    Textarea { rows: u32, cols: u32 },
}

impl Default for ColumnKind {
    fn default() -> Self {
        Self::Plain {
            input: InputType::Text,
            step: None,
        }
    }
}

impl ColumnKind {
    pub fn number() -> Self {
        Self::Plain {
            input: InputType::Number,
            step: None,
        }
    }

    pub fn computed(sql: impl Into<String>) -> Self {
        Self::Computed {
            sql: sql.into(),
            input: InputType::Text,
        }
    }

    pub fn date(format: Option<&str>) -> Self {
        Self::Date(DateOptions {
            format: format.map(str::to_string),
            input_format: None,
        })
    }

    pub fn datetime(format: Option<&str>) -> Self {
        Self::DateTime(DateOptions {
            format: format.map(str::to_string),
            input_format: None,
        })
    }

    pub fn checkbox(unchecked: impl Into<String>, checked: impl Into<String>) -> Self {
        Self::Checkbox {
            labels: CheckboxLabels::new(unchecked, checked),
        }
    }

    pub fn dropdown<L, V>(options: impl IntoIterator<Item = (L, V)>) -> Self
    where
        L: Into<String>,
        V: Into<String>,
    {
        Self::Dropdown {
            options: options
                .into_iter()
                .map(|(label, value)| DropdownOption {
                    label: label.into(),
                    value: value.into(),
                })
                .collect(),
        }
    }

    pub fn textarea(rows: u32, cols: u32) -> Self {
        Self::Textarea { rows, cols }
    }

    /// Date options for date and date-time columns
    pub fn date_options(&self) -> Option<&DateOptions> {
        match self {
            Self::Date(options) | Self::DateTime(options) => Some(options),
            _ => None,
        }
    }

    /// Whether submitted values should be bound as numbers when they look numeric
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Plain {
                input: InputType::Number,
                ..
            } | Self::Computed {
                input: InputType::Number,
                ..
            }
        )
    }
}

/// Join kinds that carry their own `ON` condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

impl JoinKind {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Inner => "INNER",
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
        }
    }
}

/// A table joined in to display a column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinTable {
    pub table: String,
    /// Join condition. Without an explicit `kind` it is moved to the WHERE clause.
    pub on: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub kind: Option<JoinKind>,
}

impl JoinTable {
    pub fn new(table: impl Into<String>, on: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            on: on.into(),
            alias: None,
            kind: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_kind(mut self, kind: JoinKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// A literal value fixed by configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FixedValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl FixedValue {
    pub fn to_value(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Int64(*b as i64),
            Self::Int(i) => Value::Int64(*i),
            Self::Float(f) => Value::Float64(*f),
            Self::Text(s) => Value::String(s.clone()),
        }
    }
}

impl From<i64> for FixedValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for FixedValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Output transforms applied to a rendered cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DisplayOptions {
    #[serde(default)]
    pub bold: bool,
    /// Skip HTML escaping (rich text columns)
    #[serde(default)]
    pub no_escape: bool,
    #[serde(default)]
    pub trim: bool,
    #[serde(default)]
    pub nl2br: bool,
}

/// Configuration of a single editor column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnConfig {
    /// Column name, optionally qualified as `table.column`
    pub field: String,
    /// Column heading and input label
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub kind: ColumnKind,
    /// Shown in the list view
    #[serde(default = "default_true")]
    pub in_view: bool,
    /// Fixed value: never editable, forced on insert, and scopes the rows the
    /// editor works with
    #[serde(default)]
    pub constraint: Option<FixedValue>,
    /// Left out of add and edit forms; defaults come from the database
    #[serde(default)]
    pub extra: bool,
    #[serde(default)]
    pub joins: Vec<JoinTable>,
    /// SQL predicate deciding whether this column may be edited on a row
    #[serde(default)]
    pub allow_edit: Option<String>,
    #[serde(default)]
    pub input_classes: Vec<String>,
    /// Initial value in the add form
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub display: DisplayOptions,
    /// Name of a registered formatter replacing the built-in display logic
    #[serde(default)]
    pub formatter: Option<String>,
    /// Name of a registered formatter run on the resolved value before escaping
    #[serde(default)]
    pub post_formatter: Option<String>,
}

impl ColumnConfig {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            label: None,
            kind: ColumnKind::default(),
            in_view: true,
            constraint: None,
            extra: false,
            joins: Vec::new(),
            allow_edit: None,
            input_classes: Vec::new(),
            default: None,
            display: DisplayOptions::default(),
            formatter: None,
            post_formatter: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_kind(mut self, kind: ColumnKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn hidden_in_view(mut self) -> Self {
        self.in_view = false;
        self
    }

    pub fn with_constraint(mut self, value: impl Into<FixedValue>) -> Self {
        self.constraint = Some(value.into());
        self
    }

    pub fn extra(mut self) -> Self {
        self.extra = true;
        self
    }

    pub fn with_join(mut self, join: JoinTable) -> Self {
        self.joins.push(join);
        self
    }

    pub fn with_allow_edit(mut self, predicate: impl Into<String>) -> Self {
        self.allow_edit = Some(predicate.into());
        self
    }

    pub fn with_input_class(mut self, class: impl Into<String>) -> Self {
        self.input_classes.push(class.into());
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_display(mut self, display: DisplayOptions) -> Self {
        self.display = display;
        self
    }

    pub fn with_formatter(mut self, name: impl Into<String>) -> Self {
        self.formatter = Some(name.into());
        self
    }

    pub fn with_post_formatter(mut self, name: impl Into<String>) -> Self {
        self.post_formatter = Some(name.into());
        self
    }

    /// Name used for the column in result rows and synthetic aliases: the
    /// segment after the last `.` of a qualified field.
    pub fn reference_name(&self) -> &str {
        reference_name(&self.field)
    }

    /// Table prefix of a qualified field
    pub fn qualifier(&self) -> Option<&str> {
        self.field.rsplit_once('.').map(|(table, _)| table)
    }

    /// Fully qualified column expression, using `table` for unqualified fields
    pub fn origin(&self, table: &str) -> String {
        if self.field.contains('.') {
            self.field.clone()
        } else {
            format!("{}.{}", table, self.field)
        }
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.field)
    }

    /// Shown as a list-view or confirmation cell
    pub fn is_displayable(&self) -> bool {
        self.constraint.is_none() && self.in_view
    }

    pub fn is_joined(&self) -> bool {
        !self.joins.is_empty()
    }

    /// Rendered in forms and accepted from submitted form data.
    ///
    /// Only columns of the editor's own table qualify: constraint, extra and
    /// joined columns never do.
    pub fn is_writable(&self, table: &str) -> bool {
        self.constraint.is_none()
            && !self.extra
            && !self.is_joined()
            && self.qualifier().is_none_or(|q| q == table)
    }

    /// Fetched as a unix timestamp for locale-aware display
    pub fn is_timestamp(&self) -> bool {
        self.kind
            .date_options()
            .is_some_and(|options| options.format.is_some())
    }

    pub fn is_checkbox(&self) -> bool {
        matches!(self.kind, ColumnKind::Checkbox { .. })
    }
}

/// Name after the last `.` of a possibly qualified field
pub fn reference_name(field: &str) -> &str {
    field.rsplit_once('.').map(|(_, name)| name).unwrap_or(field)
}

/// Ordered set of column configurations keyed by field name
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<ColumnConfig>", into = "Vec<ColumnConfig>")]
pub struct ColumnSet {
    columns: Vec<ColumnConfig>,
}

impl ColumnSet {
    pub fn new(columns: Vec<ColumnConfig>) -> SchemaResult<Self> {
        for (idx, column) in columns.iter().enumerate() {
            if column.field.trim().is_empty() {
                return Err(SchemaError::EmptyFieldName);
            }
            if columns[..idx].iter().any(|c| c.field == column.field) {
                return Err(SchemaError::DuplicateColumn(column.field.clone()));
            }
        }
        Ok(Self { columns })
    }

    pub fn get(&self, field: &str) -> Option<&ColumnConfig> {
        self.columns.iter().find(|c| c.field == field)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ColumnConfig> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Columns that carry a per-column edit predicate
    pub fn with_edit_predicates(&self) -> impl Iterator<Item = (&ColumnConfig, &str)> {
        self.columns
            .iter()
            .filter_map(|c| c.allow_edit.as_deref().map(|p| (c, p)))
    }

    pub fn constraints(&self) -> impl Iterator<Item = (&ColumnConfig, &FixedValue)> {
        self.columns
            .iter()
            .filter_map(|c| c.constraint.as_ref().map(|v| (c, v)))
    }
}

impl TryFrom<Vec<ColumnConfig>> for ColumnSet {
    type Error = SchemaError;

    fn try_from(columns: Vec<ColumnConfig>) -> SchemaResult<Self> {
        Self::new(columns)
    }
}

impl From<ColumnSet> for Vec<ColumnConfig> {
    fn from(set: ColumnSet) -> Self {
        set.columns
    }
}

impl<'a> IntoIterator for &'a ColumnSet {
    type Item = &'a ColumnConfig;
    type IntoIter = std::slice::Iter<'a, ColumnConfig>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reference_name() {
        assert_eq!(reference_name("name"), "name");
        assert_eq!(reference_name("groups.name"), "name");
        assert_eq!(reference_name("db.groups.name"), "name");
    }

    #[test]
    fn test_origin_qualifies_plain_fields() {
        assert_eq!(ColumnConfig::new("name").origin("users"), "users.name");
        assert_eq!(
            ColumnConfig::new("groups.title").origin("users"),
            "groups.title"
        );
    }

    #[test]
    fn test_writable_excludes_constraint_extra_and_joined() {
        assert!(ColumnConfig::new("name").is_writable("users"));
        assert!(ColumnConfig::new("users.name").is_writable("users"));
        assert!(!ColumnConfig::new("groups.name").is_writable("users"));
        assert!(!ColumnConfig::new("site").with_constraint(3).is_writable("users"));
        assert!(!ColumnConfig::new("created").extra().is_writable("users"));
        assert!(
            !ColumnConfig::new("title")
                .with_join(JoinTable::new("groups", "groups.id = users.group_id"))
                .is_writable("users")
        );
    }

    #[test]
    fn test_displayable() {
        assert!(ColumnConfig::new("name").is_displayable());
        assert!(!ColumnConfig::new("name").hidden_in_view().is_displayable());
        assert!(!ColumnConfig::new("site").with_constraint(1).is_displayable());
    }

    #[test]
    fn test_timestamp_requires_display_format() {
        let with_format =
            ColumnConfig::new("created").with_kind(ColumnKind::date(Some("%d/%m/%Y")));
        let without_format = ColumnConfig::new("created").with_kind(ColumnKind::date(None));
        assert!(with_format.is_timestamp());
        assert!(!without_format.is_timestamp());
    }

    #[test]
    fn test_column_set_rejects_duplicates() {
        let err = ColumnSet::new(vec![ColumnConfig::new("a"), ColumnConfig::new("a")]).unwrap_err();
        assert_eq!(err, SchemaError::DuplicateColumn("a".into()));
        let err = ColumnSet::new(vec![ColumnConfig::new(" ")]).unwrap_err();
        assert_eq!(err, SchemaError::EmptyFieldName);
    }

    #[test]
    fn test_columns_deserialize_from_toml() {
        #[derive(Deserialize)]
        struct Doc {
            columns: ColumnSet,
        }

        let doc: Doc = toml::from_str(indoc! {r#"
            [[columns]]
            field = "name"
            label = "Name"

            [[columns]]
            field = "active"
            kind = { type = "checkbox", labels = { unchecked = "No", checked = "Yes" } }

            [[columns]]
            field = "role"

            [columns.kind]
            type = "dropdown"
            options = [
                { label = "Admin", value = "a" },
                { label = "User", value = "u" },
            ]

            [[columns]]
            field = "site"
            constraint = 7

            [[columns]]
            field = "created"
            kind = { type = "date_time", format = "%d/%m/%Y %H:%M" }
        "#})
        .expect("parse columns");

        let fields: Vec<_> = doc.columns.iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "active", "role", "site", "created"]);
        assert!(doc.columns.get("active").unwrap().is_checkbox());
        assert_eq!(
            doc.columns.get("site").unwrap().constraint,
            Some(FixedValue::Int(7))
        );
        assert!(doc.columns.get("created").unwrap().is_timestamp());
        assert_eq!(doc.columns.get("name").unwrap().kind, ColumnKind::default());
    }
}
