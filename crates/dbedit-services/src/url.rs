//! URLs pointing back at the editor

use ::url::form_urlencoded;

use crate::settings::{EditorSettings, HANDLE_PARAM};

/// Builds links to the current page for the next editor request.
///
/// The current path and foreign query parameters are kept; the editor's own
/// parameters are dropped and replaced by the ones being set.
pub struct EditorUrl<'a> {
    uri: &'a str,
    reserved: [&'a str; 4],
    handle: &'a str,
}

impl<'a> EditorUrl<'a> {
    pub fn new(uri: &'a str, settings: &'a EditorSettings, handle: &'a str) -> Self {
        Self {
            uri,
            reserved: settings.reserved_params(),
            handle,
        }
    }

    /// `set` parameters first, then the kept ones, then the instance handle
    /// when `with_handle` is set.
    pub fn build(&self, set: &[(&str, &str)], with_handle: bool) -> String {
        let (path, query) = self.uri.split_once('?').unwrap_or((self.uri, ""));

        let mut pairs: Vec<(String, String)> = set
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        for (name, value) in form_urlencoded::parse(query.as_bytes()) {
            if self.reserved.contains(&name.as_ref())
                || set.iter().any(|(set_name, _)| *set_name == name)
            {
                continue;
            }
            pairs.push((name.into_owned(), value.into_owned()));
        }
        if with_handle && !set.iter().any(|(name, _)| *name == HANDLE_PARAM) {
            pairs.push((HANDLE_PARAM.to_string(), self.handle.to_string()));
        }

        if pairs.is_empty() {
            return path.to_string();
        }
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        format!("{}?{}", path, query)
    }

    /// The current URL without any editor parameter
    pub fn stripped(&self) -> String {
        self.build(&[], false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_foreign_params_and_adds_handle() {
        let settings = EditorSettings::default();
        let url = EditorUrl::new("/admin/users?page=2&a=e&id=5&updated=1", &settings, "h1");
        assert_eq!(url.build(&[("a", "dc"), ("id", "7")], true), "/admin/users?a=dc&id=7&page=2&dbedit=h1");
        assert_eq!(url.build(&[], false), "/admin/users?page=2");
    }

    #[test]
    fn test_handle_replaced_not_duplicated() {
        let settings = EditorSettings::default();
        let url = EditorUrl::new("/users?dbedit=old", &settings, "new");
        assert_eq!(url.build(&[("updated", "1")], true), "/users?updated=1&dbedit=new");
        assert_eq!(url.stripped(), "/users");
    }

    #[test]
    fn test_values_are_encoded() {
        let settings = EditorSettings::default();
        let url = EditorUrl::new("/users?q=a+b%26c", &settings, "h");
        assert_eq!(url.build(&[], false), "/users?q=a+b%26c");
    }

    #[test]
    fn test_custom_param_names_are_reserved() {
        let settings = EditorSettings {
            action_param: "do".to_string(),
            ..EditorSettings::default()
        };
        let url = EditorUrl::new("/users?do=e&a=keep", &settings, "h");
        assert_eq!(url.build(&[], false), "/users?a=keep");
    }
}
