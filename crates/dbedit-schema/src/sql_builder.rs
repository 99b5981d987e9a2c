//! SQL generation for the editor's reads and mutations
//!
//! Identifiers, join conditions, permission predicates and order clauses come
//! from configuration and are spliced in as trusted fragments. Every value that
//! originates from a request (row ids, submitted form data) and every
//! constraint value is bound as a parameter using the dialect's placeholders.

use dbedit_core::{SqlDialect, Value};

use crate::column::{ColumnConfig, ColumnKind, reference_name};
use crate::editor_config::EditorConfig;

/// Alias of the primary key in list and confirmation queries
pub const PRIMARY_KEY_ALIAS: &str = "dbedit_primary_key";
/// Alias of the row-level delete permission flag
pub const ALLOW_DELETE_ALIAS: &str = "dbedit_allow_del";
/// Alias of the row-level edit permission flag
pub const ALLOW_EDIT_ALIAS: &str = "dbedit_allow_edit";

/// Alias of the display expression of a computed column
pub fn computed_alias(field: &str, suffix: &str) -> String {
    format!("{}_sql{}", reference_name(field), suffix)
}

/// Alias of the unix timestamp projection of a formatted date column
pub fn unixtime_alias(field: &str, suffix: &str) -> String {
    format!("{}_unixtime{}", reference_name(field), suffix)
}

/// Alias of the per-column edit permission flag
pub fn allow_edit_alias(field: &str, suffix: &str) -> String {
    format!("allow_edit_of_{}{}", reference_name(field), suffix)
}

/// A statement ready to be handed to a connection
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Value assigned to a column by an INSERT or UPDATE
#[derive(Debug, Clone, PartialEq)]
pub enum AssignedValue {
    /// Bound as a statement parameter
    Param(Value),
    /// Spliced in verbatim, e.g. the dialect's current timestamp expression
    Expression(String),
}

/// A `column = value` pair of an INSERT or UPDATE
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub value: AssignedValue,
}

impl Assignment {
    pub fn param(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: AssignedValue::Param(value.into()),
        }
    }

    pub fn expression(column: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: AssignedValue::Expression(sql.into()),
        }
    }
}

/// Collects bound values and hands out the matching placeholders
struct ParamBuffer {
    dialect: SqlDialect,
    values: Vec<Value>,
}

impl ParamBuffer {
    fn new(dialect: SqlDialect) -> Self {
        Self {
            dialect,
            values: Vec::new(),
        }
    }

    fn bind(&mut self, value: Value) -> String {
        self.values.push(value);
        self.dialect.placeholder(self.values.len())
    }

    fn assign(&mut self, value: &AssignedValue) -> String {
        match value {
            AssignedValue::Param(value) => self.bind(value.clone()),
            AssignedValue::Expression(sql) => sql.clone(),
        }
    }

    fn finish(self, sql: String) -> SqlStatement {
        SqlStatement {
            sql,
            params: self.values,
        }
    }
}

/// Tables of a read query together with the join conditions moved to WHERE
struct Source {
    tables: String,
    join_conditions: Vec<String>,
}

/// Builds the statements of one editor against one dialect
pub struct SqlBuilder<'a> {
    config: &'a EditorConfig,
    dialect: SqlDialect,
}

impl<'a> SqlBuilder<'a> {
    pub fn new(config: &'a EditorConfig, dialect: SqlDialect) -> Self {
        Self { config, dialect }
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    fn table(&self) -> &str {
        &self.config.table
    }

    fn primary_key(&self) -> String {
        self.config.qualified_primary_key()
    }

    /// Display projections of every non-constraint column.
    ///
    /// Joined columns are only projected when `include_joins` is set.
    pub fn select_fields(&self, suffix: &str, include_joins: bool) -> Vec<String> {
        self.config
            .columns
            .iter()
            .filter(|column| column.constraint.is_none())
            .filter(|column| include_joins || !column.is_joined())
            .map(|column| self.select_field(column, suffix))
            .collect()
    }

    fn select_field(&self, column: &ColumnConfig, suffix: &str) -> String {
        let origin = column.origin(self.table());
        match &column.kind {
            ColumnKind::Computed { sql, .. } => {
                format!("({}) AS {}", sql, computed_alias(&column.field, suffix))
            }
            _ if column.is_timestamp() => format!(
                "{} AS {}",
                self.dialect.unix_timestamp(&origin),
                unixtime_alias(&column.field, suffix)
            ),
            _ => format!("{} AS {}", origin, column.reference_name()),
        }
    }

    /// Base table plus the joins declared by the columns, each emitted once
    fn source(&self, include_joins: bool) -> Source {
        let mut tables = self.table().to_string();
        let mut seen: Vec<String> = Vec::new();
        let mut join_conditions = Vec::new();

        if include_joins {
            for join in self.config.columns.iter().flat_map(|c| c.joins.iter()) {
                let target = match &join.alias {
                    Some(alias) => format!("{} AS {}", join.table, alias),
                    None => join.table.clone(),
                };
                let clause = match join.kind {
                    Some(kind) => format!("{} JOIN {} ON {}", kind.as_sql(), target, join.on),
                    None => format!("{} {}", self.dialect.bare_join(), target),
                };

                let key = format!("{} | {}", clause, join.on);
                if seen.contains(&key) {
                    continue;
                }
                seen.push(key);

                tables.push(' ');
                tables.push_str(&clause);
                if join.kind.is_none() {
                    join_conditions.push(join.on.clone());
                }
            }
        }

        Source {
            tables,
            join_conditions,
        }
    }

    /// `{table}.{field} = ?` for every constraint column
    fn constraint_conditions(&self, params: &mut ParamBuffer) -> Vec<String> {
        self.config
            .columns
            .constraints()
            .map(|(column, value)| {
                let placeholder = params.bind(value.to_value());
                format!("{} = {}", column.origin(self.table()), placeholder)
            })
            .collect()
    }

    fn row_conditions(
        &self,
        params: &mut ParamBuffer,
        id: i64,
        predicate: Option<&str>,
    ) -> Vec<String> {
        let mut conditions = self.constraint_conditions(params);
        let placeholder = params.bind(Value::Int64(id));
        conditions.push(format!("{} = {}", self.primary_key(), placeholder));
        if let Some(predicate) = predicate {
            conditions.push(format!("({})", predicate));
        }
        conditions
    }

    fn read_conditions(&self, source: &Source, params: &mut ParamBuffer) -> Vec<String> {
        let mut conditions = Vec::new();
        if let Some(where_clause) = &self.config.where_clause {
            conditions.push(format!("({})", where_clause));
        }
        conditions.extend(source.join_conditions.iter().cloned());
        conditions.extend(self.constraint_conditions(params));
        conditions
    }

    fn order_by(&self) -> String {
        self.config
            .order_by
            .clone()
            .unwrap_or_else(|| format!("{} ASC", self.primary_key()))
    }

    /// The list view query
    pub fn view_query(&self, suffix: &str) -> SqlStatement {
        let mut params = ParamBuffer::new(self.dialect);
        let source = self.source(true);
        let permissions = &self.config.permissions;

        let mut projections = vec![format!("{} AS {}", self.primary_key(), PRIMARY_KEY_ALIAS)];
        if let Some(predicate) = &permissions.delete_condition {
            projections.push(format!(
                "{} AS {}",
                self.dialect.boolean_flag(predicate),
                ALLOW_DELETE_ALIAS
            ));
        }
        if let Some(predicate) = &permissions.edit_condition {
            projections.push(format!(
                "{} AS {}",
                self.dialect.boolean_flag(predicate),
                ALLOW_EDIT_ALIAS
            ));
        }
        projections.extend(self.select_fields(suffix, true));

        let conditions = self.read_conditions(&source, &mut params);
        let mut sql = format!("SELECT {} FROM {}", projections.join(", "), source.tables);
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY ");
        sql.push_str(&self.order_by());

        tracing::debug!(sql = %sql, "built view query");
        params.finish(sql)
    }

    /// Read-only summary of one row before deletion; joined columns are left out
    pub fn delete_confirm_query(&self, id: i64, suffix: &str) -> SqlStatement {
        let mut params = ParamBuffer::new(self.dialect);
        let source = self.source(false);

        let mut projections = vec![
            format!("{}.*", self.table()),
            format!("{} AS {}", self.primary_key(), PRIMARY_KEY_ALIAS),
        ];
        projections.extend(self.select_fields(suffix, false));

        let mut conditions = Vec::new();
        if let Some(where_clause) = &self.config.where_clause {
            conditions.push(format!("({})", where_clause));
        }
        conditions.extend(self.row_conditions(
            &mut params,
            id,
            self.config.permissions.delete_condition.as_deref(),
        ));

        let sql = format!(
            "SELECT {} FROM {} WHERE {}",
            projections.join(", "),
            source.tables,
            conditions.join(" AND ")
        );
        tracing::debug!(sql = %sql, "built delete confirmation query");
        params.finish(sql)
    }

    /// The stored row plus its per-column edit flags, for the edit form
    pub fn edit_query(&self, id: i64, suffix: &str) -> SqlStatement {
        let mut params = ParamBuffer::new(self.dialect);
        let mut projections = vec![format!("{}.*", self.table())];
        projections.extend(self.edit_flags(suffix));

        let conditions = self.row_conditions(
            &mut params,
            id,
            self.config.permissions.edit_condition.as_deref(),
        );
        let sql = format!(
            "SELECT {} FROM {} WHERE {}",
            projections.join(", "),
            self.table(),
            conditions.join(" AND ")
        );
        tracing::debug!(sql = %sql, "built edit query");
        params.finish(sql)
    }

    fn edit_flags(&self, suffix: &str) -> Vec<String> {
        self.config
            .columns
            .with_edit_predicates()
            .map(|(column, predicate)| {
                format!(
                    "({}) AS {}",
                    predicate,
                    allow_edit_alias(&column.field, suffix)
                )
            })
            .collect()
    }

    /// Per-column edit flags of one row, re-evaluated before an update.
    ///
    /// Without column predicates the query only selects a constant, so an
    /// empty result still means the row-level predicate refused the row.
    /// `None` when neither kind of predicate is configured.
    pub fn edit_permission_query(&self, id: i64) -> Option<SqlStatement> {
        let mut flags = self.edit_flags("");
        if flags.is_empty() {
            self.config.permissions.edit_condition.as_ref()?;
            flags.push(format!("1 AS {}", ALLOW_EDIT_ALIAS));
        }

        let mut params = ParamBuffer::new(self.dialect);
        let conditions = self.row_conditions(
            &mut params,
            id,
            self.config.permissions.edit_condition.as_deref(),
        );
        let sql = format!(
            "SELECT {} FROM {} WHERE {}",
            flags.join(", "),
            self.table(),
            conditions.join(" AND ")
        );
        tracing::debug!(sql = %sql, "built edit permission query");
        Some(params.finish(sql))
    }

    /// `None` when there is nothing to insert
    pub fn insert(&self, assignments: &[Assignment]) -> Option<SqlStatement> {
        if assignments.is_empty() {
            return None;
        }

        let mut params = ParamBuffer::new(self.dialect);
        let columns: Vec<&str> = assignments
            .iter()
            .map(|a| reference_name(&a.column))
            .collect();
        let values: Vec<String> = assignments
            .iter()
            .map(|a| params.assign(&a.value))
            .collect();

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table(),
            columns.join(", "),
            values.join(", ")
        );
        tracing::debug!(sql = %sql, "built insert");
        Some(params.finish(sql))
    }

    /// Update of one row, restricted by the row-level edit predicate.
    ///
    /// `None` when there is nothing to update.
    pub fn update(&self, id: i64, assignments: &[Assignment]) -> Option<SqlStatement> {
        if assignments.is_empty() {
            return None;
        }

        let mut params = ParamBuffer::new(self.dialect);
        let sets: Vec<String> = assignments
            .iter()
            .map(|a| format!("{} = {}", reference_name(&a.column), params.assign(&a.value)))
            .collect();
        let conditions = self.row_conditions(
            &mut params,
            id,
            self.config.permissions.edit_condition.as_deref(),
        );

        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            self.table(),
            sets.join(", "),
            conditions.join(" AND ")
        );
        tracing::debug!(sql = %sql, "built update");
        Some(params.finish(sql))
    }

    /// Delete of one row, restricted by the row-level delete predicate
    pub fn delete(&self, id: i64) -> SqlStatement {
        let mut params = ParamBuffer::new(self.dialect);
        let conditions = self.row_conditions(
            &mut params,
            id,
            self.config.permissions.delete_condition.as_deref(),
        );
        let sql = format!(
            "DELETE FROM {} WHERE {}",
            self.table(),
            conditions.join(" AND ")
        );
        tracing::debug!(sql = %sql, "built delete");
        params.finish(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnSet, JoinKind, JoinTable};
    use crate::editor_config::Permissions;
    use pretty_assertions::assert_eq;

    fn users(columns: Vec<ColumnConfig>) -> EditorConfig {
        EditorConfig::new("users", "id", ColumnSet::new(columns).unwrap()).unwrap()
    }

    #[test]
    fn test_view_query_plain_columns() {
        let config = users(vec![
            ColumnConfig::new("name"),
            ColumnConfig::new("active").with_kind(ColumnKind::checkbox("No", "Yes")),
        ]);
        let stmt = SqlBuilder::new(&config, SqlDialect::Sqlite).view_query("_x");
        assert_eq!(
            stmt.sql,
            "SELECT users.id AS dbedit_primary_key, users.name AS name, users.active AS active \
             FROM users ORDER BY users.id ASC"
        );
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_view_query_synthetic_columns_and_permissions() {
        let config = users(vec![
            ColumnConfig::new("name").with_kind(ColumnKind::computed("UPPER(users.name)")),
            ColumnConfig::new("created").with_kind(ColumnKind::date(Some("%d/%m/%Y"))),
        ])
        .with_permissions(Permissions {
            allow_edit: true,
            edit_condition: Some("users.locked = 0".into()),
            allow_delete: true,
            delete_condition: Some("users.admin = 0".into()),
            ..Permissions::default()
        })
        .with_order_by("users.name DESC");

        let stmt = SqlBuilder::new(&config, SqlDialect::MySql).view_query("_7");
        assert_eq!(
            stmt.sql,
            "SELECT users.id AS dbedit_primary_key, \
             CASE WHEN (users.admin = 0) THEN 1 ELSE 0 END AS dbedit_allow_del, \
             CASE WHEN (users.locked = 0) THEN 1 ELSE 0 END AS dbedit_allow_edit, \
             (UPPER(users.name)) AS name_sql_7, \
             UNIX_TIMESTAMP(users.created) AS created_unixtime_7 \
             FROM users ORDER BY users.name DESC"
        );
    }

    #[test]
    fn test_joins_deduplicated_and_conditions_moved_to_where() {
        let groups = JoinTable::new("groups", "groups.id = users.group_id");
        let config = users(vec![
            ColumnConfig::new("groups.title").with_join(groups.clone()),
            ColumnConfig::new("groups.code").with_join(groups),
            ColumnConfig::new("sites.host").with_join(
                JoinTable::new("sites", "s.id = users.site_id")
                    .with_alias("s")
                    .with_kind(JoinKind::Left),
            ),
        ])
        .with_where("users.deleted = 0");

        let stmt = SqlBuilder::new(&config, SqlDialect::Sqlite).view_query("");
        assert_eq!(
            stmt.sql,
            "SELECT users.id AS dbedit_primary_key, groups.title AS title, groups.code AS code, \
             sites.host AS host \
             FROM users INNER JOIN groups LEFT JOIN sites AS s ON s.id = users.site_id \
             WHERE (users.deleted = 0) AND groups.id = users.group_id \
             ORDER BY users.id ASC"
        );

        let pg = SqlBuilder::new(&config, SqlDialect::Postgres).view_query("");
        assert!(pg.sql.contains("FROM users CROSS JOIN groups LEFT JOIN"));
    }

    #[test]
    fn test_constraints_scope_reads_and_writes() {
        let config = users(vec![
            ColumnConfig::new("name"),
            ColumnConfig::new("site_id").with_constraint(7),
        ]);
        let builder = SqlBuilder::new(&config, SqlDialect::Postgres);

        let view = builder.view_query("");
        assert_eq!(
            view.sql,
            "SELECT users.id AS dbedit_primary_key, users.name AS name FROM users \
             WHERE users.site_id = $1 ORDER BY users.id ASC"
        );
        assert_eq!(view.params, vec![Value::Int64(7)]);

        let delete = builder.delete(12);
        assert_eq!(
            delete.sql,
            "DELETE FROM users WHERE users.site_id = $1 AND users.id = $2"
        );
        assert_eq!(delete.params, vec![Value::Int64(7), Value::Int64(12)]);
    }

    #[test]
    fn test_delete_confirm_excludes_joined_columns() {
        let config = users(vec![
            ColumnConfig::new("name"),
            ColumnConfig::new("groups.title")
                .with_join(JoinTable::new("groups", "groups.id = users.group_id")),
        ])
        .with_permissions(Permissions {
            allow_delete: true,
            delete_condition: Some("users.admin = 0".into()),
            ..Permissions::default()
        });

        let stmt = SqlBuilder::new(&config, SqlDialect::Sqlite).delete_confirm_query(3, "_s");
        assert_eq!(
            stmt.sql,
            "SELECT users.*, users.id AS dbedit_primary_key, users.name AS name FROM users \
             WHERE users.id = ? AND (users.admin = 0)"
        );
        assert_eq!(stmt.params, vec![Value::Int64(3)]);
    }

    #[test]
    fn test_edit_query_projects_column_flags() {
        let config = users(vec![
            ColumnConfig::new("name").with_allow_edit("active = 1"),
            ColumnConfig::new("active"),
        ])
        .with_permissions(Permissions {
            allow_edit: true,
            edit_condition: Some("locked = 0".into()),
            ..Permissions::default()
        });
        let builder = SqlBuilder::new(&config, SqlDialect::Sqlite);

        let edit = builder.edit_query(5, "_t");
        assert_eq!(
            edit.sql,
            "SELECT users.*, (active = 1) AS allow_edit_of_name_t FROM users \
             WHERE users.id = ? AND (locked = 0)"
        );

        let check = builder.edit_permission_query(5).expect("column predicates exist");
        assert_eq!(
            check.sql,
            "SELECT (active = 1) AS allow_edit_of_name FROM users \
             WHERE users.id = ? AND (locked = 0)"
        );
    }

    #[test]
    fn test_edit_permission_query_for_row_condition_only() {
        let config = users(vec![ColumnConfig::new("name")]).with_permissions(Permissions {
            allow_edit: true,
            edit_condition: Some("active = 1".into()),
            ..Permissions::default()
        });

        let check = SqlBuilder::new(&config, SqlDialect::Sqlite)
            .edit_permission_query(2)
            .expect("row condition is configured");
        assert_eq!(
            check.sql,
            "SELECT 1 AS dbedit_allow_edit FROM users WHERE users.id = ? AND (active = 1)"
        );
        assert_eq!(check.params, vec![Value::Int64(2)]);
    }

    #[test]
    fn test_edit_permission_query_absent_without_predicates() {
        let config = users(vec![ColumnConfig::new("name")]);
        assert!(
            SqlBuilder::new(&config, SqlDialect::Sqlite)
                .edit_permission_query(1)
                .is_none()
        );
    }

    #[test]
    fn test_insert_and_update_bind_values() {
        let config = users(vec![ColumnConfig::new("name"), ColumnConfig::new("active")]);
        let builder = SqlBuilder::new(&config, SqlDialect::Postgres);
        let assignments = vec![
            Assignment::param("name", "Alice"),
            Assignment::param("active", 0i64),
            Assignment::expression("updated_at", "LOCALTIMESTAMP"),
        ];

        let insert = builder.insert(&assignments).unwrap();
        assert_eq!(
            insert.sql,
            "INSERT INTO users (name, active, updated_at) VALUES ($1, $2, LOCALTIMESTAMP)"
        );
        assert_eq!(insert.params, vec![Value::from("Alice"), Value::Int64(0)]);

        let update = builder.update(9, &assignments).unwrap();
        assert_eq!(
            update.sql,
            "UPDATE users SET name = $1, active = $2, updated_at = LOCALTIMESTAMP \
             WHERE users.id = $3"
        );
        assert_eq!(update.params.last(), Some(&Value::Int64(9)));

        assert!(builder.insert(&[]).is_none());
        assert!(builder.update(9, &[]).is_none());
    }
}
