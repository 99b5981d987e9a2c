//! Table-level editor configuration

use serde::{Deserialize, Serialize};

use crate::column::ColumnSet;
use crate::error::{SchemaError, SchemaResult};

/// Add/edit/delete permissions of an editor
///
/// The optional conditions are SQL predicates evaluated per row; a row must
/// satisfy them to be edited or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default)]
    pub allow_add: bool,
    #[serde(default)]
    pub allow_edit: bool,
    #[serde(default)]
    pub edit_condition: Option<String>,
    #[serde(default)]
    pub allow_delete: bool,
    #[serde(default)]
    pub delete_condition: Option<String>,
}

/// Everything needed to rebuild an editor on a later request.
///
/// Holds no live resources, so it can be serialized into a session store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    pub table: String,
    pub primary_key: String,
    pub columns: ColumnSet,
    #[serde(default)]
    pub where_clause: Option<String>,
    #[serde(default)]
    pub order_by: Option<String>,
    #[serde(default)]
    pub permissions: Permissions,
}

impl EditorConfig {
    pub fn new(
        table: impl Into<String>,
        primary_key: impl Into<String>,
        columns: ColumnSet,
    ) -> SchemaResult<Self> {
        let config = Self {
            table: table.into(),
            primary_key: primary_key.into(),
            columns,
            where_clause: None,
            order_by: None,
            permissions: Permissions::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_where(mut self, where_clause: impl Into<String>) -> Self {
        self.where_clause = Some(where_clause.into());
        self
    }

    pub fn with_order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn validate(&self) -> SchemaResult<()> {
        if self.table.trim().is_empty() {
            return Err(SchemaError::EmptyTableName);
        }
        if self.primary_key.trim().is_empty() {
            return Err(SchemaError::EmptyPrimaryKey);
        }
        Ok(())
    }

    /// `table.primary_key`
    pub fn qualified_primary_key(&self) -> String {
        format!("{}.{}", self.table, self.primary_key)
    }
}

/// Type of a column whose value is supplied by the calling code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtherColumnKind {
    Date,
    DateTime,
    Timestamp,
    Number,
    Text,
}

/// Value of an externally supplied column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtherValue {
    /// The database's current date or time, depending on the column kind
    Now,
    Literal(String),
}

/// A column set by the calling code on every row update, never shown in forms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherColumn {
    pub field: String,
    pub kind: OtherColumnKind,
    pub value: OtherValue,
}

impl OtherColumn {
    pub fn now(field: impl Into<String>, kind: OtherColumnKind) -> Self {
        Self {
            field: field.into(),
            kind,
            value: OtherValue::Now,
        }
    }

    pub fn literal(
        field: impl Into<String>,
        kind: OtherColumnKind,
        value: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            kind,
            value: OtherValue::Literal(value.into()),
        }
    }
}
