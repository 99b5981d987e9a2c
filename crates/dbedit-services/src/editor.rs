//! A live editor: stored configuration plus the resources of this request

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dbedit_core::{Connection, QueryResult, StatementResult};
use dbedit_schema::{ColumnSet, EditorConfig, OtherColumn, SqlStatement};
use dbedit_templates::{FormatterRegistry, HtmlTemplates};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::cache::StoredInstance;
use crate::error::{ServiceError, ServiceResult};
use crate::settings::EditorSettings;
use crate::store::{SessionStore, object_key, params_key};

/// Table editor bound to one request.
///
/// Configuration changes made while the editor is new (first request of the
/// instance) become the stored defaults; on later requests they only affect
/// the current request.
pub struct Editor {
    id: String,
    is_new: bool,
    pub(crate) config: EditorConfig,
    created_at: DateTime<Utc>,
    last_access: DateTime<Utc>,
    pub(crate) connection: Arc<dyn Connection>,
    store: Arc<dyn SessionStore>,
    pub(crate) settings: EditorSettings,
    pub(crate) templates: Arc<HtmlTemplates>,
    pub(crate) formatters: FormatterRegistry,
    pub(crate) other_columns: Vec<OtherColumn>,
    pub(crate) sql_log: Vec<String>,
}

impl Editor {
    pub(crate) fn new(
        instance: StoredInstance,
        is_new: bool,
        connection: Arc<dyn Connection>,
        store: Arc<dyn SessionStore>,
        settings: EditorSettings,
        templates: Arc<HtmlTemplates>,
    ) -> Self {
        Self {
            id: instance.id,
            is_new,
            config: instance.config,
            created_at: instance.created_at,
            last_access: instance.last_access,
            connection,
            store,
            settings,
            templates,
            formatters: FormatterRegistry::new(),
            other_columns: Vec::new(),
            sql_log: Vec::new(),
        }
    }

    /// Opaque identifier correlating the requests of this editor
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the instance was created by this request
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut EditorSettings {
        &mut self.settings
    }

    /// Attach the formatters columns refer to; like the connection they are
    /// not stored and must be supplied on every request
    pub fn with_formatters(mut self, formatters: FormatterRegistry) -> Self {
        self.formatters = formatters;
        self
    }

    /// SQL executed so far in this request
    pub fn sql_log(&self) -> &[String] {
        &self.sql_log
    }

    pub fn allow_add(&mut self, allow: bool) -> ServiceResult<()> {
        self.config.permissions.allow_add = allow;
        self.persist()
    }

    /// `condition` is an SQL predicate a row must satisfy to be edited
    pub fn allow_edit(&mut self, allow: bool, condition: Option<&str>) -> ServiceResult<()> {
        self.config.permissions.allow_edit = allow;
        self.config.permissions.edit_condition = condition.map(str::to_string);
        self.persist()
    }

    /// `condition` is an SQL predicate a row must satisfy to be deleted
    pub fn allow_delete(&mut self, allow: bool, condition: Option<&str>) -> ServiceResult<()> {
        self.config.permissions.allow_delete = allow;
        self.config.permissions.delete_condition = condition.map(str::to_string);
        self.persist()
    }

    /// Replace the column set. Ignored unless the editor is new.
    pub fn set_columns(&mut self, columns: ColumnSet) -> ServiceResult<()> {
        if !self.is_new {
            return Ok(());
        }
        self.config.columns = columns;
        self.persist()
    }

    pub fn set_order(&mut self, order_by: impl Into<String>) -> ServiceResult<()> {
        self.config.order_by = Some(order_by.into());
        self.persist()
    }

    /// Columns set by the calling code on every row update of this request
    pub fn set_other_columns(&mut self, columns: Vec<OtherColumn>) {
        self.other_columns = columns;
    }

    /// Store `value` under `name` when the editor is new; afterwards return
    /// what was stored, ignoring `value`.
    pub fn param<T>(&self, name: &str, value: T) -> ServiceResult<Option<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        let key = params_key(&self.id);
        let mut params = match self.store.get(&key)? {
            Some(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };

        if self.is_new {
            params.insert(name.to_string(), serde_json::to_value(&value)?);
            self.store.set(&key, serde_json::Value::Object(params))?;
            return Ok(Some(value));
        }

        match params.remove(name) {
            Some(stored) => Ok(Some(serde_json::from_value(stored)?)),
            None => Ok(None),
        }
    }

    fn persist(&self) -> ServiceResult<()> {
        if !self.is_new {
            return Ok(());
        }
        let instance = StoredInstance {
            id: self.id.clone(),
            config: self.config.clone(),
            created_at: self.created_at,
            last_access: self.last_access,
        };
        self.store
            .set(&object_key(&self.id), serde_json::to_value(&instance)?)
    }

    pub(crate) async fn run_query(&mut self, stmt: &SqlStatement) -> ServiceResult<QueryResult> {
        self.log_sql(stmt);
        self.connection
            .query(&stmt.sql, &stmt.params)
            .await
            .map_err(|err| ServiceError::Query {
                sql: stmt.sql.clone(),
                message: err.to_string(),
            })
    }

    pub(crate) async fn run_statement(&mut self, stmt: &SqlStatement) -> ServiceResult<StatementResult> {
        self.log_sql(stmt);
        let result = self
            .connection
            .execute(&stmt.sql, &stmt.params)
            .await
            .map_err(|err| ServiceError::Query {
                sql: stmt.sql.clone(),
                message: err.to_string(),
            })?;
        tracing::info!(
            table = %self.config.table,
            affected_rows = result.affected_rows,
            "editor statement executed"
        );
        Ok(result)
    }

    fn log_sql(&mut self, stmt: &SqlStatement) {
        tracing::debug!(sql = %stmt.sql, params = stmt.params.len(), "running editor SQL");
        if self.settings.debug {
            self.sql_log.push(stmt.sql.clone());
        }
    }
}
