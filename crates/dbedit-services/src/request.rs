//! Request and response model of one editor round trip

use ::url::form_urlencoded;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
}

/// The parts of an HTTP request the editor looks at
#[derive(Debug, Clone, Default)]
pub struct EditorRequest {
    pub method: Method,
    /// Path and query string as requested
    pub uri: String,
    pub query: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
}

fn parse_pairs(text: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(text.as_bytes()).into_owned().collect()
}

impl EditorRequest {
    /// GET request; the query is taken from `uri`
    pub fn get(uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let query = uri
            .split_once('?')
            .map(|(_, query)| parse_pairs(query))
            .unwrap_or_default();
        Self {
            method: Method::Get,
            uri,
            query,
            form: Vec::new(),
        }
    }

    /// POST request with an `application/x-www-form-urlencoded` body
    pub fn post(uri: impl Into<String>, body: &str) -> Self {
        Self {
            method: Method::Post,
            form: parse_pairs(body),
            ..Self::get(uri)
        }
    }

    pub fn with_form_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.method = Method::Post;
        self.form.push((name.into(), value.into()));
        self
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        last_value(&self.query, name)
    }

    pub fn form_value(&self, name: &str) -> Option<&str> {
        last_value(&self.form, name)
    }

    pub fn has_form_field(&self, name: &str) -> bool {
        self.form.iter().any(|(key, _)| key == name)
    }

    /// Form value, falling back to the query string
    pub fn param(&self, name: &str) -> Option<&str> {
        self.form_value(name).or_else(|| self.query_param(name))
    }
}

fn last_value<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .rev()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

/// What the editor was asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    Add,
    Insert,
    Edit,
    Post,
    DeleteConfirm,
    Delete,
}

impl Action {
    /// Accepts the short and the long spelling of every action
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "v" | "view" => Some(Self::View),
            "a" | "add" => Some(Self::Add),
            "i" | "insert" => Some(Self::Insert),
            "e" | "edit" => Some(Self::Edit),
            "p" | "post" => Some(Self::Post),
            "dc" | "deleteconfirm" => Some(Self::DeleteConfirm),
            "d" | "delete" => Some(Self::Delete),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::View => "v",
            Self::Add => "a",
            Self::Insert => "i",
            Self::Edit => "e",
            Self::Post => "p",
            Self::DeleteConfirm => "dc",
            Self::Delete => "d",
        }
    }
}

/// Result of running the editor for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorResponse {
    /// Markup to embed in the calling page
    Html(String),
    /// The request mutated data; the client must be sent here
    Redirect(String),
}

impl EditorResponse {
    pub fn html(&self) -> Option<&str> {
        match self {
            Self::Html(html) => Some(html),
            Self::Redirect(_) => None,
        }
    }

    pub fn location(&self) -> Option<&str> {
        match self {
            Self::Redirect(location) => Some(location),
            Self::Html(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_parsed_from_uri() {
        let request = EditorRequest::get("/users?page=2&q=a%20b&dbedit=abc");
        assert_eq!(request.query_param("page"), Some("2"));
        assert_eq!(request.query_param("q"), Some("a b"));
        assert_eq!(request.param("dbedit"), Some("abc"));
        assert_eq!(request.param("missing"), None);
    }

    #[test]
    fn test_form_takes_precedence() {
        let request = EditorRequest::post("/users?a=v", "a=i&ed-name=Alice+Smith");
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.param("a"), Some("i"));
        assert_eq!(request.form_value("ed-name"), Some("Alice Smith"));
        assert!(!request.has_form_field("ed-active"));
    }

    #[test]
    fn test_action_codes() {
        assert_eq!(Action::parse("dc"), Some(Action::DeleteConfirm));
        assert_eq!(Action::parse("deleteconfirm"), Some(Action::DeleteConfirm));
        assert_eq!(Action::parse("view"), Some(Action::View));
        assert_eq!(Action::parse("x"), None);
        assert_eq!(Action::Post.code(), "p");
    }
}
