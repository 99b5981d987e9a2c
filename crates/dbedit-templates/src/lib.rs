//! dbedit Templates - HTML rendering for the table editor
//!
//! - [`CellRenderer`] turns one column of one result row into a `<td>`
//! - [`HtmlTemplates`] renders the list view, the forms and the delete
//!   confirmation from MiniJinja templates with HTML auto-escaping
//! - [`FormatterRegistry`] holds the named formatter hooks columns refer to

mod cell;
mod engine;
mod error;
mod filters;
mod pages;

pub use cell::{CellFormatter, CellRenderer, FormatterContext, FormatterRegistry};
pub use engine::{DELETE_CONFIRM_TEMPLATE, FORM_TEMPLATE, HtmlTemplates, VIEW_TEMPLATE};
pub use error::{TemplateError, TemplateResult};
pub use filters::HtmlFilters;
pub use pages::*;
