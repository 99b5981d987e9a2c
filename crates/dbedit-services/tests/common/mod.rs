//! Common test utilities and mocks

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;

use dbedit_core::{
    Connection, DbEditError, QueryResult, Result, Row, StatementResult, Value,
};
use dbedit_drivers::sqlite::SqliteConnection;
use dbedit_schema::{ColumnConfig, ColumnKind, ColumnSet, EditorConfig, Permissions};
use dbedit_services::{
    EditorCache, EditorRequest, EditorSettings, InitOutcome, MemoryStore, SessionStore,
};

/// Mock connection recording every statement it receives.
///
/// Queries return the first registered response whose pattern is contained
/// in the SQL, then the default result, then an empty result.
pub struct MockConnection {
    pub should_fail: bool,
    pub query_results: Vec<QueryResult>,
    pub query_responses: Vec<(String, QueryResult)>,
    /// Log of all SQL statements, for assertion in tests
    pub query_log: Arc<parking_lot::Mutex<Vec<String>>>,
    /// Parameters of every statement, in the same order as `query_log`
    pub params_log: Arc<parking_lot::Mutex<Vec<Vec<Value>>>>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self {
            should_fail: false,
            query_results: vec![],
            query_responses: vec![],
            query_log: Arc::new(parking_lot::Mutex::new(Vec::new())),
            params_log: Arc::new(parking_lot::Mutex::new(Vec::new())),
        }
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    pub fn with_result(mut self, result: QueryResult) -> Self {
        self.query_results.push(result);
        self
    }

    /// Register a response for queries containing the given SQL pattern.
    pub fn with_query_response(
        mut self,
        sql_contains: impl Into<String>,
        result: QueryResult,
    ) -> Self {
        self.query_responses.push((sql_contains.into(), result));
        self
    }

    pub fn query_log(&self) -> Vec<String> {
        self.query_log.lock().clone()
    }

    fn record(&self, sql: &str, params: &[Value]) {
        self.query_log.lock().push(sql.to_string());
        self.params_log.lock().push(params.to_vec());
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn driver_name(&self) -> &str {
        "mock"
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        self.record(sql, params);
        if self.should_fail {
            return Err(DbEditError::Query("Execute failed".into()));
        }
        Ok(StatementResult {
            affected_rows: 1,
            last_insert_id: None,
        })
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.record(sql, params);
        if self.should_fail {
            return Err(DbEditError::Query("Query failed".into()));
        }

        for (pattern, result) in &self.query_responses {
            if sql.contains(pattern.as_str()) {
                return Ok(result.clone());
            }
        }

        Ok(self
            .query_results
            .first()
            .cloned()
            .unwrap_or_else(QueryResult::empty))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn is_closed(&self) -> bool {
        false
    }
}

/// Result with the given column names and rows
pub fn result(columns: &[&str], rows: Vec<Vec<Value>>) -> QueryResult {
    let names: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
    QueryResult {
        rows: rows
            .into_iter()
            .map(|values| Row::new(names.clone(), values))
            .collect(),
        ..QueryResult::empty()
    }
}

/// In-memory SQLite database with a `users` table and the `roles` it refers to
pub async fn users_db() -> Arc<SqliteConnection> {
    let conn = SqliteConnection::open(":memory:").expect("open in-memory db");
    conn.execute_batch(
        "CREATE TABLE users (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 0,
            tenant INTEGER NOT NULL DEFAULT 0,
            role TEXT,
            born TEXT,
            updated_at TEXT
        );
        INSERT INTO users (id, name, active, tenant, role) VALUES
            (1, 'Alice', 1, 7, 'adm'),
            (2, 'Bob', 0, 7, 'usr'),
            (3, 'Carol', 1, 8, 'usr');
        CREATE TABLE roles (
            code TEXT PRIMARY KEY,
            title TEXT NOT NULL
        );
        INSERT INTO roles (code, title) VALUES
            ('adm', 'Administrator'),
            ('usr', 'User');",
    )
    .await
    .expect("create users table");
    Arc::new(conn)
}

/// `(name, active)` of a user, read straight from the database
pub async fn user(conn: &SqliteConnection, id: i64) -> Option<(String, i64)> {
    let row = conn
        .query(
            "SELECT name, active FROM users WHERE id = ?",
            &[Value::Int64(id)],
        )
        .await
        .expect("select user")
        .into_first_row()?;
    Some((
        row.get_by_name("name")?.to_display_string(),
        row.get_by_name("active")?.as_i64()?,
    ))
}

pub fn name_active_columns() -> ColumnSet {
    ColumnSet::new(vec![
        ColumnConfig::new("name").with_label("Name"),
        ColumnConfig::new("active")
            .with_label("Active")
            .with_kind(ColumnKind::checkbox("No", "Yes")),
    ])
    .expect("valid columns")
}

pub fn users_config(columns: ColumnSet, permissions: Permissions) -> EditorConfig {
    EditorConfig::new("users", "id", columns)
        .expect("valid config")
        .with_permissions(permissions)
}

pub fn all_permissions() -> Permissions {
    Permissions {
        allow_add: true,
        allow_edit: true,
        allow_delete: true,
        ..Permissions::default()
    }
}

pub fn cache(settings: EditorSettings) -> (EditorCache, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let cache = EditorCache::new(store.clone() as Arc<dyn SessionStore>, settings)
        .expect("create cache");
    (cache, store)
}

/// Unwrap a ready editor
pub fn ready(outcome: InitOutcome) -> dbedit_services::Editor {
    match outcome {
        InitOutcome::Ready(editor) => editor,
        InitOutcome::Restart { location } => panic!("unexpected restart to {}", location),
    }
}

/// Create an editor on a first request to `/users`
pub fn new_editor(
    cache: &EditorCache,
    conn: Arc<dyn Connection>,
    config: EditorConfig,
) -> dbedit_services::Editor {
    ready(
        cache
            .init(conn, &EditorRequest::get("/users"), config)
            .expect("init editor"),
    )
}
