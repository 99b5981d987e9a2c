//! dbedit Core - Core abstractions shared by the table editor crates
//!
//! This crate provides the fundamental traits and types that all other
//! dbedit crates depend on. It defines:
//!
//! - `Connection` - Trait for the SQL execution primitive (query, execute, escape)
//! - `SqlDialect` - The handful of dialect differences the SQL builder cares about
//! - Common types like `Value`, `Row`, `QueryResult`, etc.

mod connection;
mod dialect;
mod error;
mod types;

pub use connection::*;
pub use dialect::*;
pub use error::*;
pub use types::*;
