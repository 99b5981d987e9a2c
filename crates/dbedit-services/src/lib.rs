//! dbedit service layer
//!
//! Ties the column schema, SQL generation and page templates to requests.
//!
//! # Flow
//!
//! ```text
//! EditorCache::init  (create or restore the instance of this request)
//!     ↓
//! Editor             (configure: permissions, order, params, formatters)
//!     ↓
//! Editor::execute    (dispatch the action, render or redirect)
//! ```
//!
//! # Modules
//!
//! - [`EditorCache`] - Instance persistence and inactivity eviction
//! - [`Editor`] - A configured editor bound to a live connection
//! - [`SessionStore`] - Per-session storage, in memory or on disk
//! - [`EditorUrl`] - Links that keep the caller's query parameters

mod cache;
mod dispatcher;
mod editor;
mod error;
mod request;
mod settings;
mod store;
mod url;

pub use cache::{EditorCache, InitOutcome, StoredInstance};
pub use editor::Editor;
pub use error::{ServiceError, ServiceResult};
pub use request::{Action, EditorRequest, EditorResponse, Method};
pub use settings::{
    DEFAULT_INACTIVITY_TIMEOUT_SECS, EditorSettings, HANDLE_PARAM, MarkupSnippets, Messages,
    OuterClasses, UPDATED_PARAM,
};
pub use store::{FileStore, MemoryStore, SessionStore};
pub use crate::url::EditorUrl;
