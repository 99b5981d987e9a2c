//! Runner configuration file (`dbedit.toml`)

use std::path::Path;

use anyhow::Context as _;
use dbedit_schema::{ColumnConfig, ColumnSet, EditorConfig, OtherColumn, Permissions};
use dbedit_services::EditorSettings;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RunnerConfig {
    pub database: DatabaseConfig,
    pub editor: EditorSection,
    pub columns: Vec<ColumnConfig>,
    /// Columns set on every update, never shown in forms
    #[serde(default)]
    pub other_columns: Vec<OtherColumn>,
    #[serde(default)]
    pub settings: EditorSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "DatabaseConfig::default_driver")]
    pub driver: String,
    /// Driver target; a file path for SQLite
    pub path: String,
}

impl DatabaseConfig {
    fn default_driver() -> String {
        "sqlite".to_string()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditorSection {
    pub table: String,
    #[serde(default = "EditorSection::default_primary_key")]
    pub primary_key: String,
    #[serde(default, rename = "where")]
    pub where_clause: Option<String>,
    #[serde(default)]
    pub order: Option<String>,
    /// Prefix of form field names and CSS classes
    #[serde(default)]
    pub prefix: String,
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

impl EditorSection {
    fn default_primary_key() -> String {
        "id".to_string()
    }
}

impl RunnerConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Editor configuration used when a request starts a new instance
    pub fn editor_config(&self) -> anyhow::Result<EditorConfig> {
        let section = &self.editor;
        let columns = ColumnSet::new(self.columns.clone())?;
        let mut config = EditorConfig::new(&section.table, &section.primary_key, columns)?
            .with_permissions(Permissions {
                allow_add: section.allow_add,
                allow_edit: section.allow_edit,
                edit_condition: section.edit_condition.clone(),
                allow_delete: section.allow_delete,
                delete_condition: section.delete_condition.clone(),
            });
        if let Some(where_clause) = &section.where_clause {
            config = config.with_where(where_clause);
        }
        if let Some(order) = &section.order {
            config = config.with_order_by(order);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbedit_schema::{ColumnKind, FixedValue, OtherColumnKind, OtherValue};
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    const CONFIG: &str = indoc! {r#"
        [database]
        path = "/var/lib/app/users.db"

        [editor]
        table = "users"
        where = "users.deleted = 0"
        prefix = "ed-"
        allow_add = true
        allow_edit = true
        allow_delete = true
        delete_condition = "users.active = 0"

        [[columns]]
        field = "name"
        label = "Name"

        [[columns]]
        field = "active"
        label = "Active"
        kind = { type = "checkbox", labels = { unchecked = "No", checked = "Yes" } }

        [[columns]]
        field = "tenant"
        constraint = 7

        [[other_columns]]
        field = "updated_at"
        kind = "datetime"
        value = "now"

        [settings]
        debug = true
    "#};

    #[test]
    fn test_parse_full_config() {
        let config = RunnerConfig::from_toml_str(CONFIG).unwrap();
        assert_eq!(config.database.driver, "sqlite");
        assert_eq!(config.editor.prefix, "ed-");
        assert!(config.settings.debug);
        assert_eq!(
            config.other_columns,
            vec![OtherColumn {
                field: "updated_at".to_string(),
                kind: OtherColumnKind::DateTime,
                value: OtherValue::Now,
            }]
        );

        let editor = config.editor_config().unwrap();
        assert_eq!(editor.table, "users");
        assert_eq!(editor.primary_key, "id");
        assert_eq!(editor.where_clause.as_deref(), Some("users.deleted = 0"));
        assert!(editor.permissions.allow_delete);
        assert_eq!(
            editor.permissions.delete_condition.as_deref(),
            Some("users.active = 0")
        );

        let active = editor.columns.get("active").unwrap();
        assert_eq!(active.kind, ColumnKind::checkbox("No", "Yes"));
        assert!(active.in_view);
        let tenant = editor.columns.get("tenant").unwrap();
        assert_eq!(tenant.constraint, Some(FixedValue::Int(7)));
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let text = indoc! {r#"
            [database]
            path = "db.sqlite"

            [editor]
            table = "users"

            [[columns]]
            field = "name"

            [[columns]]
            field = "name"
        "#};
        let config = RunnerConfig::from_toml_str(text).unwrap();
        assert!(config.editor_config().is_err());
    }

    #[test]
    fn test_load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = RunnerConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
