use thiserror::Error;

pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors raised while rendering editor markup
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template error: {0}")]
    Render(#[from] minijinja::Error),
}
