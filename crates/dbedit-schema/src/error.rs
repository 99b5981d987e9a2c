use thiserror::Error;

pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised while assembling an editor configuration
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("Column '{0}' is configured more than once")]
    DuplicateColumn(String),

    #[error("Column field names must not be empty")]
    EmptyFieldName,

    #[error("Editor table name must not be empty")]
    EmptyTableName,

    #[error("Editor primary key must not be empty")]
    EmptyPrimaryKey,
}
