use dbedit_core::DbEditError;
use dbedit_schema::SchemaError;
use dbedit_templates::TemplateError;
use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors that abort an editor request
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A generated statement was rejected by the database
    #[error("Query failed: {message}")]
    Query { sql: String, message: String },

    #[error("Database error: {0}")]
    Database(#[from] DbEditError),

    #[error("Invalid editor configuration: {0}")]
    Schema(#[from] SchemaError),

    #[error("Rendering failed: {0}")]
    Template(#[from] TemplateError),

    #[error("Session store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid settings: {0}")]
    Settings(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    /// Statement that failed, for errors raised by the database
    pub fn sql(&self) -> Option<&str> {
        match self {
            Self::Query { sql, .. } => Some(sql),
            _ => None,
        }
    }
}
