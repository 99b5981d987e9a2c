//! Core types for dbedit

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// A database value that can represent any SQL type the editor reads or writes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// NULL value
    Null,
    /// Boolean
    Bool(bool),
    /// 64-bit signed integer
    Int64(i64),
    /// 64-bit floating point
    Float64(f64),
    /// Decimal/Numeric (stored as string for precision)
    Decimal(String),
    /// UTF-8 string
    String(String),
    /// Binary data
    Bytes(Vec<u8>),
    /// Date (year, month, day)
    Date(NaiveDate),
    /// Time (hour, minute, second, nanosecond)
    Time(NaiveTime),
    /// DateTime without timezone
    DateTime(NaiveDateTime),
}

impl Value {
    /// Check if the value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            Value::Bool(v) => Some(*v as i64),
            Value::Float64(v) if v.fract() == 0.0 => Some(*v as i64),
            Value::String(s) | Value::Decimal(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    /// Interpret the value the way SQL predicates and checkbox columns come back
    /// from the database: zero, empty, `"0"` and NULL are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(v) => *v,
            Value::Int64(v) => *v != 0,
            Value::Float64(v) => *v != 0.0,
            Value::Decimal(s) | Value::String(s) => {
                let s = s.trim();
                !s.is_empty() && s.parse::<f64>().map(|n| n != 0.0).unwrap_or(true)
            }
            Value::Bytes(b) => !b.is_empty(),
            Value::Date(_) | Value::Time(_) | Value::DateTime(_) => true,
        }
    }

    /// Text used when the value is shown to a user or placed in a form input.
    ///
    /// Unlike `Display`, NULL becomes the empty string.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{}", *v as i64),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Value::Date(v) => write!(f, "{}", v),
            Value::Time(v) => write!(f, "{}", v),
            Value::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int64(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

/// A row from a query result
#[derive(Debug, Clone, Default)]
pub struct Row {
    /// Column values
    pub values: Vec<Value>,
    /// Column names
    columns: Vec<String>,
}

impl Row {
    /// Create a new row
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Self { values, columns }
    }

    /// Get a value by column index
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Get a value by column name
    ///
    /// When a name appears more than once (e.g. `SELECT *, x AS id`), the
    /// first occurrence wins.
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == name)
            .and_then(|idx| self.values.get(idx))
    }
}

/// Column metadata
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ColumnMeta {
    /// Column name
    #[serde(default)]
    pub name: String,
    /// Data type (database-specific string)
    #[serde(default)]
    pub data_type: String,
    /// Column ordinal position (0-based)
    #[serde(default)]
    pub ordinal: usize,
}

/// Query result
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    /// Column metadata
    pub columns: Vec<ColumnMeta>,
    /// Result rows
    pub rows: Vec<Row>,
    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Create a new empty query result
    pub fn empty() -> Self {
        Self::default()
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Consume the result, keeping only the first row
    pub fn into_first_row(self) -> Option<Row> {
        self.rows.into_iter().next()
    }
}

/// Result of a data-modifying statement
#[derive(Debug, Clone, Default)]
pub struct StatementResult {
    /// Rows affected
    pub affected_rows: u64,
    /// Row id generated by an INSERT, when the driver reports one
    pub last_insert_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_follows_sql_conventions() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Int64(0).is_truthy());
        assert!(Value::Int64(1).is_truthy());
        assert!(!Value::String("0".into()).is_truthy());
        assert!(!Value::String(String::new()).is_truthy());
        assert!(Value::String("yes".into()).is_truthy());
        assert!(!Value::Float64(0.0).is_truthy());
    }

    #[test]
    fn null_displays_as_empty_text() {
        assert_eq!(Value::Null.to_display_string(), "");
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::Int64(42).to_display_string(), "42");
    }

    #[test]
    fn row_lookup_prefers_first_duplicate() {
        let row = Row::new(
            vec!["id".into(), "name".into(), "id".into()],
            vec![Value::Int64(1), "Alice".into(), Value::Int64(2)],
        );
        assert_eq!(row.get_by_name("id"), Some(&Value::Int64(1)));
        assert_eq!(row.get_by_name("name"), Some(&Value::from("Alice")));
        assert_eq!(row.get_by_name("email"), None);
    }
}
