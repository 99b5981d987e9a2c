//! dbedit Drivers - Database driver implementations
//!
//! This crate provides concrete implementations of the `Connection` trait
//! defined in `dbedit-core`, selected by cargo feature.

#[cfg(feature = "sqlite")]
pub use dbedit_driver_sqlite as sqlite;

use std::sync::Arc;

/// Re-export commonly used types from dbedit-core
pub use dbedit_core::{
    Connection, DbEditError, QueryResult, Result, Row, SqlDialect, StatementResult, Value,
};

/// Open a connection for the named driver.
///
/// `target` is driver specific: a file path (or `:memory:`) for SQLite.
pub fn connect(driver: &str, target: &str) -> Result<Arc<dyn Connection>> {
    tracing::debug!(driver = %driver, "opening connection");
    match driver.to_ascii_lowercase().as_str() {
        #[cfg(feature = "sqlite")]
        "sqlite" => Ok(Arc::new(sqlite::SqliteConnection::open(target)?)),
        other => Err(DbEditError::NotSupported(format!(
            "Driver '{}' is not available in this build",
            other
        ))),
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_sqlite() {
        let conn = connect("sqlite", ":memory:").expect("Failed to open in-memory db");
        assert_eq!(conn.driver_name(), "sqlite");
        assert_eq!(conn.dialect(), SqlDialect::Sqlite);

        conn.execute(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
            &[],
        )
        .await
        .expect("Failed to create table");

        let result = conn
            .query("SELECT * FROM users", &[])
            .await
            .expect("Failed to query");
        assert_eq!(result.rows.len(), 0);
    }

    #[test]
    fn test_connect_unknown_driver() {
        let err = connect("redis", "localhost").err().expect("should fail");
        assert!(matches!(err, DbEditError::NotSupported(_)));
    }
}
