//! SQLite connection implementation

use async_trait::async_trait;
use dbedit_core::{
    ColumnMeta, Connection, DbEditError, QueryResult, Result, Row, SqlDialect, StatementResult,
    Value,
};
use parking_lot::Mutex;
use rusqlite::{Connection as RusqliteConnection, OpenFlags, params_from_iter};
use std::sync::Arc;

/// SQLite connection wrapper
pub struct SqliteConnection {
    conn: Arc<Mutex<RusqliteConnection>>,
}

impl SqliteConnection {
    /// Open a SQLite database
    pub fn open(path: &str) -> Result<Self> {
        tracing::info!(path = %path, "opening SQLite database");
        let expanded_path = Self::expand_path(path)?;

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let in_memory = path == ":memory:";
        let conn = if in_memory {
            RusqliteConnection::open_in_memory().map_err(|e| {
                DbEditError::Connection(format!("Failed to open in-memory database: {}", e))
            })?
        } else {
            if !expanded_path.starts_with("file:") {
                let file_path = std::path::Path::new(&expanded_path);
                if let Some(parent) = file_path.parent()
                    && !parent.exists()
                {
                    return Err(DbEditError::Connection(format!(
                        "Parent directory does not exist: {}",
                        parent.display()
                    )));
                }
            }

            RusqliteConnection::open_with_flags(&expanded_path, flags).map_err(|e| {
                DbEditError::Connection(format!(
                    "Failed to open SQLite database at '{}': {}",
                    expanded_path, e
                ))
            })?
        };

        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| DbEditError::Connection(format!("Failed to enable foreign keys: {}", e)))?;

        if !in_memory {
            conn.pragma_update(None, "journal_mode", "WAL")
                .map_err(|e| DbEditError::Connection(format!("Failed to set journal mode: {}", e)))?;
        }

        tracing::info!(path = %expanded_path, "SQLite database connection established");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Expand path to handle ~ (home directory) and relative paths
    fn expand_path(path: &str) -> Result<String> {
        if path == ":memory:" || path.starts_with("file:") {
            return Ok(path.to_string());
        }

        let expanded = if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = std::env::var_os("HOME") {
                let home_path = std::path::PathBuf::from(home);
                home_path.join(rest).to_string_lossy().to_string()
            } else {
                return Err(DbEditError::Configuration(
                    "Unable to determine HOME directory".into(),
                ));
            }
        } else if path.starts_with('~') {
            return Err(DbEditError::Configuration(
                "User-specific home directories (~user) are not supported".into(),
            ));
        } else {
            path.to_string()
        };

        let path_buf = std::path::PathBuf::from(&expanded);
        let result = if path_buf.is_relative() {
            std::env::current_dir()
                .map_err(DbEditError::Io)?
                .join(path_buf)
                .to_string_lossy()
                .to_string()
        } else {
            expanded
        };

        Ok(result)
    }

    /// Execute multiple SQL statements in a batch
    /// This is useful for executing schema changes or running SQL scripts
    pub async fn execute_batch(&self, sql: &str) -> Result<()> {
        tracing::debug!("executing SQL batch");
        let conn = self.conn.lock();
        conn.execute_batch(sql)
            .map_err(|e| DbEditError::Query(format!("Failed to execute batch: {}", e)))
    }
}

#[async_trait]
impl Connection for SqliteConnection {
    fn driver_name(&self) -> &str {
        "sqlite"
    }

    fn dialect(&self) -> SqlDialect {
        SqlDialect::Sqlite
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        let conn = self.conn.lock();
        let rusqlite_params = values_to_rusqlite(params);

        let rows_affected = conn
            .execute(sql, params_from_iter(rusqlite_params.iter()))
            .map_err(|e| DbEditError::Query(format!("Failed to execute statement: {}", e)))?;

        tracing::debug!(affected_rows = rows_affected, "statement executed");
        Ok(StatementResult {
            affected_rows: rows_affected as u64,
            last_insert_id: Some(conn.last_insert_rowid()),
        })
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let start_time = std::time::Instant::now();

        let conn = self.conn.lock();
        let rusqlite_params = values_to_rusqlite(params);

        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| DbEditError::Query(format!("Failed to prepare query: {}", e)))?;

        let column_count = stmt.column_count();
        let mut column_names: Vec<String> = Vec::with_capacity(column_count);
        let mut columns: Vec<ColumnMeta> = Vec::with_capacity(column_count);

        // decl_type is only available for plain table columns
        for (idx, col) in stmt.columns().iter().enumerate() {
            let name = col.name().to_string();
            let data_type = col.decl_type().unwrap_or("DYNAMIC").to_string();

            column_names.push(name.clone());
            columns.push(ColumnMeta {
                name,
                data_type,
                ordinal: idx,
            });
        }

        let mut rows = Vec::new();
        let mut query_rows = stmt
            .query(params_from_iter(rusqlite_params.iter()))
            .map_err(|e| DbEditError::Query(format!("Failed to execute query: {}", e)))?;

        while let Some(row) = query_rows
            .next()
            .map_err(|e| DbEditError::Query(format!("Failed to fetch row: {}", e)))?
        {
            let mut values = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                values.push(rusqlite_to_value(row, i)?);
            }
            rows.push(Row::new(column_names.clone(), values));
        }

        let execution_time_ms = start_time.elapsed().as_millis() as u64;

        tracing::debug!(
            row_count = rows.len(),
            execution_time_ms = execution_time_ms,
            "query executed successfully"
        );
        Ok(QueryResult {
            columns,
            rows,
            execution_time_ms,
        })
    }

    async fn close(&self) -> Result<()> {
        tracing::info!("closing SQLite connection");
        Ok(())
    }

    fn is_closed(&self) -> bool {
        false
    }
}

fn values_to_rusqlite(values: &[Value]) -> Vec<rusqlite::types::Value> {
    values.iter().map(value_to_rusqlite).collect()
}

fn value_to_rusqlite(value: &Value) -> rusqlite::types::Value {
    match value {
        Value::Null => rusqlite::types::Value::Null,
        Value::Bool(b) => rusqlite::types::Value::Integer(if *b { 1 } else { 0 }),
        Value::Int64(i) => rusqlite::types::Value::Integer(*i),
        Value::Float64(f) => rusqlite::types::Value::Real(*f),
        Value::Decimal(d) => rusqlite::types::Value::Text(d.clone()),
        Value::String(s) => rusqlite::types::Value::Text(s.clone()),
        Value::Bytes(b) => rusqlite::types::Value::Blob(b.clone()),
        Value::Date(d) => rusqlite::types::Value::Text(d.to_string()),
        Value::Time(t) => rusqlite::types::Value::Text(t.to_string()),
        Value::DateTime(dt) => {
            rusqlite::types::Value::Text(dt.format("%Y-%m-%d %H:%M:%S").to_string())
        }
    }
}

/// Convert rusqlite row value to our Value type
fn rusqlite_to_value(row: &rusqlite::Row, idx: usize) -> Result<Value> {
    use rusqlite::types::ValueRef;

    let value_ref = row
        .get_ref(idx)
        .map_err(|e| DbEditError::Query(e.to_string()))?;

    let value = match value_ref {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int64(i),
        ValueRef::Real(f) => Value::Float64(f),
        ValueRef::Text(s) => Value::String(String::from_utf8_lossy(s).to_string()),
        // BLOBs written without a declared type are often text
        ValueRef::Blob(b) => match std::str::from_utf8(b) {
            Ok(s) => Value::String(s.to_string()),
            Err(_) => Value::Bytes(b.to_vec()),
        },
    };

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_query_round_trip() {
        let conn = SqliteConnection::open(":memory:").expect("open in-memory db");
        conn.execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, active INTEGER)")
            .await
            .expect("create table");

        let inserted = conn
            .execute(
                "INSERT INTO users (name, active) VALUES (?, ?)",
                &[Value::String("Alice".into()), Value::Int64(1)],
            )
            .await
            .expect("insert");
        assert_eq!(inserted.affected_rows, 1);
        assert_eq!(inserted.last_insert_id, Some(1));

        let result = conn
            .query("SELECT id, name, active FROM users WHERE id = ?", &[Value::Int64(1)])
            .await
            .expect("query");
        assert_eq!(result.row_count(), 1);
        let row = &result.rows[0];
        assert_eq!(row.get_by_name("name"), Some(&Value::String("Alice".into())));
        assert_eq!(row.get_by_name("active"), Some(&Value::Int64(1)));
        assert_eq!(result.columns[1].data_type, "TEXT");
    }

    #[tokio::test]
    async fn test_query_error_is_reported() {
        let conn = SqliteConnection::open(":memory:").expect("open in-memory db");
        let err = conn.query("SELECT * FROM missing", &[]).await.unwrap_err();
        assert!(matches!(err, DbEditError::Query(_)));
    }

    #[tokio::test]
    async fn test_open_file_database() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("editor.db");
        let conn = SqliteConnection::open(path.to_str().unwrap()).expect("open file db");
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY)")
            .await
            .expect("create table");
        assert!(path.exists());
    }

    #[test]
    fn test_open_rejects_missing_parent() {
        let result = SqliteConnection::open("/definitely/not/here/editor.db");
        assert!(matches!(result, Err(DbEditError::Connection(_))));
    }
}
