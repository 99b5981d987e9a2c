//! Connection trait

use crate::{QueryResult, Result, SqlDialect, StatementResult, Value};
use async_trait::async_trait;

/// A database connection
///
/// This is the SQL execution primitive the editor consumes. Statements are
/// parameterized; `escape_string` is only needed for fragments that cannot be
/// bound as parameters.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g., "sqlite", "postgresql", "mysql")
    fn driver_name(&self) -> &str;

    /// Dialect used when generating SQL for this connection.
    ///
    /// Defaults to the dialect matching `driver_name`, falling back to SQLite.
    fn dialect(&self) -> SqlDialect {
        SqlDialect::from_driver_name(self.driver_name()).unwrap_or_default()
    }

    /// Execute a statement that modifies data (INSERT/UPDATE/DELETE)
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult>;

    /// Execute a query that returns rows (SELECT)
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Escape a string for inclusion inside a single-quoted SQL literal
    fn escape_string(&self, value: &str) -> String {
        self.dialect().escape_string(value)
    }

    /// Close the connection
    async fn close(&self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;
}
