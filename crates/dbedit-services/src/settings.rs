//! Editor settings
//!
//! Everything here has a default, so a settings table only needs to name what
//! it changes.

use serde::{Deserialize, Serialize};

use crate::error::ServiceResult;
use crate::request::Action;

/// Request parameter carrying the instance identifier
pub const HANDLE_PARAM: &str = "dbedit";
/// Request parameter carrying the result of the last mutation
pub const UPDATED_PARAM: &str = "updated";

/// Default inactivity period after which stored instances are evicted
pub const DEFAULT_INACTIVITY_TIMEOUT_SECS: u64 = 900;
/// Default age after which the entry URL of an evicted instance is forgotten
pub const DEFAULT_INITIAL_URI_RETENTION_SECS: u64 = 86_400;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Request parameter naming the row
    pub id_param: String,
    /// Request parameter naming the action
    pub action_param: String,
    /// Character set handed to cell formatters
    pub charset: String,
    pub inactivity_timeout_secs: u64,
    /// How long an evicted instance can still restart at its entry URL
    pub initial_uri_retention_secs: u64,
    /// Append the executed SQL to rendered output
    pub debug: bool,
    pub outer_classes: OuterClasses,
    pub markup: MarkupSnippets,
    pub messages: Messages,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            id_param: "id".to_string(),
            action_param: "a".to_string(),
            charset: "UTF-8".to_string(),
            inactivity_timeout_secs: DEFAULT_INACTIVITY_TIMEOUT_SECS,
            initial_uri_retention_secs: DEFAULT_INITIAL_URI_RETENTION_SECS,
            debug: false,
            outer_classes: OuterClasses::default(),
            markup: MarkupSnippets::default(),
            messages: Messages::default(),
        }
    }
}

impl EditorSettings {
    pub fn from_toml_str(text: &str) -> ServiceResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Parameters the editor owns; they are never carried over into its URLs
    pub fn reserved_params(&self) -> [&str; 4] {
        [
            self.action_param.as_str(),
            self.id_param.as_str(),
            UPDATED_PARAM,
            HANDLE_PARAM,
        ]
    }
}

/// Extra CSS classes of the outer element of each page
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OuterClasses {
    pub view: Option<String>,
    pub add: Option<String>,
    pub edit: Option<String>,
    pub delete_confirm: Option<String>,
}

impl OuterClasses {
    /// Classes of `action`'s page with `extra` appended.
    ///
    /// `None` for actions that render no page.
    pub fn for_action(&self, action: Action, extra: &str) -> Option<String> {
        let configured = match action {
            Action::View => &self.view,
            Action::Add => &self.add,
            Action::Edit => &self.edit,
            Action::DeleteConfirm => &self.delete_confirm,
            Action::Insert | Action::Post | Action::Delete => return None,
        };
        Some(match configured.as_deref() {
            Some(classes) if !classes.is_empty() => format!("{} {}", classes, extra),
            _ => extra.to_string(),
        })
    }
}

/// Configurable markup fragments.
///
/// They are MiniJinja snippets: `add_link` receives `add_url`, `cancel`
/// receives `url` and `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkupSnippets {
    pub delete_header: String,
    pub delete_link: String,
    pub add_link: String,
    pub cancel: String,
    pub reset: String,
}

impl Default for MarkupSnippets {
    fn default() -> Self {
        Self {
            delete_header: "Delete".to_string(),
            delete_link: "Delete".to_string(),
            add_link: r#"<a href="{{ add_url }}">Add</a>"#.to_string(),
            cancel: r#"<button type="submit" name="{{ name }}" value="v" onclick="this.type='button'; window.location.href='{{ url }}';">Cancel</button>"#.to_string(),
            reset: r#"<button type="reset">Reset</button>"#.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    pub row_updated: String,
    pub row_not_updated: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            row_updated: "Row updated".to_string(),
            row_not_updated: "Row not updated".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let settings = EditorSettings::default();
        assert_eq!(settings.id_param, "id");
        assert_eq!(settings.action_param, "a");
        assert_eq!(settings.inactivity_timeout_secs, 900);
        assert_eq!(settings.initial_uri_retention_secs, 86_400);
        assert_eq!(settings.reserved_params(), ["a", "id", "updated", "dbedit"]);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = EditorSettings::from_toml_str(indoc! {r#"
            action_param = "do"
            debug = true

            [outer_classes]
            view = "table striped"

            [messages]
            row_updated = "Saved"
        "#})
        .unwrap();

        assert_eq!(settings.action_param, "do");
        assert_eq!(settings.id_param, "id");
        assert!(settings.debug);
        assert_eq!(settings.messages.row_updated, "Saved");
        assert_eq!(settings.messages.row_not_updated, "Row not updated");
        assert_eq!(settings.markup, MarkupSnippets::default());
        assert_eq!(
            settings.outer_classes.for_action(Action::View, "ed-action_v"),
            Some("table striped ed-action_v".to_string())
        );
        assert_eq!(
            settings.outer_classes.for_action(Action::Add, "ed-action_a"),
            Some("ed-action_a".to_string())
        );
        assert_eq!(settings.outer_classes.for_action(Action::Post, "x"), None);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(EditorSettings::from_toml_str("debug = 'yes'").is_err());
    }
}
