//! Declarative column schema and SQL generation for the dbedit table editor
//!
//! - [`ColumnConfig`] / [`ColumnSet`] describe how each column is queried,
//!   displayed and edited
//! - [`EditorConfig`] adds the table, primary key, filters and permissions
//! - [`SqlBuilder`] turns a configuration into parameterized statements
//! - [`input`] converts submitted form data into bound values

mod column;
mod editor_config;
mod error;
pub mod input;
mod sql_builder;

pub use column::*;
pub use editor_config::*;
pub use error::*;
pub use sql_builder::*;
