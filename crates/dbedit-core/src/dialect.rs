//! SQL dialect differences that matter when generating editor statements

use serde::{Deserialize, Serialize};

/// The SQL dialect a connection speaks.
///
/// Only the handful of constructs the editor generates differ between
/// dialects: parameter placeholders, unix timestamp extraction, bare joins and
/// the "now" expressions used for externally supplied columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    #[default]
    Sqlite,
    #[serde(alias = "mariadb")]
    MySql,
    #[serde(alias = "postgresql")]
    Postgres,
}

impl SqlDialect {
    /// Resolve a dialect from a driver name such as `"sqlite"` or `"postgresql"`.
    pub fn from_driver_name(driver: &str) -> Option<Self> {
        match driver.to_ascii_lowercase().as_str() {
            "sqlite" => Some(Self::Sqlite),
            "mysql" | "mariadb" => Some(Self::MySql),
            "postgres" | "postgresql" => Some(Self::Postgres),
            _ => None,
        }
    }

    /// Placeholder for the 1-based parameter index.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Self::Postgres => format!("${}", index),
            Self::Sqlite | Self::MySql => "?".to_string(),
        }
    }

    /// Expression returning seconds since the unix epoch for a date/datetime column.
    ///
    /// Stored values are read as local time, matching how the timestamps are
    /// formatted again for display.
    pub fn unix_timestamp(&self, expr: &str) -> String {
        match self {
            Self::Sqlite => format!("CAST(strftime('%s', {}, 'utc') AS INTEGER)", expr),
            Self::MySql => format!("UNIX_TIMESTAMP({})", expr),
            Self::Postgres => format!(
                "CAST(EXTRACT(EPOCH FROM CAST({} AS TIMESTAMPTZ)) AS BIGINT)",
                expr
            ),
        }
    }

    /// Expression turning a boolean predicate into `1`/`0`.
    pub fn boolean_flag(&self, predicate: &str) -> String {
        format!("CASE WHEN ({}) THEN 1 ELSE 0 END", predicate)
    }

    /// Join keyword used when the join condition is moved to the WHERE clause.
    pub fn bare_join(&self) -> &'static str {
        match self {
            Self::Postgres => "CROSS JOIN",
            Self::Sqlite | Self::MySql => "INNER JOIN",
        }
    }

    /// Expression for the current date.
    pub fn current_date(&self) -> &'static str {
        match self {
            Self::Sqlite => "DATE('now', 'localtime')",
            Self::MySql => "DATE(NOW())",
            Self::Postgres => "CURRENT_DATE",
        }
    }

    /// Expression for the current date and time.
    pub fn current_timestamp(&self) -> &'static str {
        match self {
            Self::Sqlite => "DATETIME('now', 'localtime')",
            Self::MySql => "NOW()",
            Self::Postgres => "LOCALTIMESTAMP",
        }
    }

    /// Escape a string for inclusion inside a single-quoted SQL literal.
    pub fn escape_string(&self, value: &str) -> String {
        match self {
            Self::MySql => value.replace('\\', "\\\\").replace('\'', "''"),
            Self::Sqlite | Self::Postgres => value.replace('\'', "''"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        assert_eq!(SqlDialect::Sqlite.placeholder(3), "?");
        assert_eq!(SqlDialect::MySql.placeholder(1), "?");
        assert_eq!(SqlDialect::Postgres.placeholder(2), "$2");
    }

    #[test]
    fn test_unix_timestamp() {
        assert_eq!(
            SqlDialect::MySql.unix_timestamp("users.created"),
            "UNIX_TIMESTAMP(users.created)"
        );
        assert_eq!(
            SqlDialect::Sqlite.unix_timestamp("users.created"),
            "CAST(strftime('%s', users.created, 'utc') AS INTEGER)"
        );
        assert_eq!(
            SqlDialect::Postgres.unix_timestamp("users.created"),
            "CAST(EXTRACT(EPOCH FROM CAST(users.created AS TIMESTAMPTZ)) AS BIGINT)"
        );
    }

    #[test]
    fn test_from_driver_name() {
        assert_eq!(SqlDialect::from_driver_name("SQLite"), Some(SqlDialect::Sqlite));
        assert_eq!(
            SqlDialect::from_driver_name("postgresql"),
            Some(SqlDialect::Postgres)
        );
        assert_eq!(SqlDialect::from_driver_name("redis"), None);
    }

    #[test]
    fn test_escape_string() {
        assert_eq!(SqlDialect::Sqlite.escape_string("it's"), "it''s");
        assert_eq!(SqlDialect::MySql.escape_string("a\\'b"), "a\\\\''b");
    }
}
