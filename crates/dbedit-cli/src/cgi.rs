//! CGI request decoding and response encoding

use std::collections::HashMap;
use std::io::Write;

use dbedit_services::{EditorRequest, EditorResponse, Method};
use dbedit_templates::HtmlFilters;

/// Cookie carrying the browser session the editor state is stored under
pub const SESSION_COOKIE: &str = "dbedit_session";

/// CGI meta-variables of one request
pub struct CgiEnv<'a> {
    vars: &'a HashMap<String, String>,
}

impl<'a> CgiEnv<'a> {
    pub fn new(vars: &'a HashMap<String, String>) -> Self {
        Self { vars }
    }

    fn var(&self, name: &str) -> Option<&'a str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn method(&self) -> Method {
        match self.var("REQUEST_METHOD") {
            Some(method) if method.eq_ignore_ascii_case("POST") => Method::Post,
            _ => Method::Get,
        }
    }

    /// Bytes of request body announced by the server
    pub fn content_length(&self) -> usize {
        self.var("CONTENT_LENGTH")
            .and_then(|len| len.trim().parse().ok())
            .unwrap_or(0)
    }

    /// `REQUEST_URI`, rebuilt from the script path and query when missing
    pub fn uri(&self) -> String {
        if let Some(uri) = self.var("REQUEST_URI").filter(|uri| !uri.is_empty()) {
            return uri.to_string();
        }
        let path = format!(
            "{}{}",
            self.var("SCRIPT_NAME").unwrap_or_default(),
            self.var("PATH_INFO").unwrap_or_default()
        );
        let path = if path.is_empty() { "/".to_string() } else { path };
        match self.var("QUERY_STRING").filter(|query| !query.is_empty()) {
            Some(query) => format!("{}?{}", path, query),
            None => path,
        }
    }

    pub fn request(&self, body: &str) -> EditorRequest {
        match self.method() {
            Method::Post => EditorRequest::post(self.uri(), body),
            Method::Get => EditorRequest::get(self.uri()),
        }
    }

    /// Session id from the request cookies, if it is well formed
    pub fn session_id(&self) -> Option<String> {
        self.var("HTTP_COOKIE")?
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .map(|(_, value)| value.trim().to_string())
            .filter(|id| {
                !id.is_empty()
                    && id
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            })
    }

    /// Error details are only shown to local development hosts
    pub fn is_local_host(&self) -> bool {
        self.var("SERVER_NAME")
            .is_some_and(|name| name.ends_with("localhost"))
    }
}

/// Response written to stdout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CgiResponse {
    pub status: Option<&'static str>,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CgiResponse {
    /// Editor markup wrapped into a standalone page
    pub fn page(title: &str, charset: &str, fragment: &str) -> Self {
        Self {
            status: None,
            headers: vec![(
                "Content-Type".to_string(),
                format!("text/html; charset={}", charset),
            )],
            body: format!(
                "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"{}\" />\n<title>{}</title>\n</head>\n<body>\n{}\n</body>\n</html>\n",
                HtmlFilters::escape_html(charset),
                HtmlFilters::escape_html(title),
                fragment
            ),
        }
    }

    pub fn redirect(location: &str) -> Self {
        Self {
            status: Some("302 Found"),
            headers: vec![("Location".to_string(), location.to_string())],
            body: String::new(),
        }
    }

    pub fn from_editor(response: EditorResponse, title: &str, charset: &str) -> Self {
        match response {
            EditorResponse::Html(html) => Self::page(title, charset, &html),
            EditorResponse::Redirect(location) => Self::redirect(&location),
        }
    }

    /// 500 page; `details` is shown verbatim (escaped) when present
    pub fn server_error(details: Option<&str>) -> Self {
        Self {
            status: Some("500 Internal Server Error"),
            headers: vec![(
                "Content-Type".to_string(),
                "text/html; charset=UTF-8".to_string(),
            )],
            body: details
                .map(|details| format!("<pre>{}</pre>\n", HtmlFilters::escape_html(details)))
                .unwrap_or_default(),
        }
    }

    pub fn with_session_cookie(mut self, session_id: &str) -> Self {
        self.headers.push((
            "Set-Cookie".to_string(),
            format!(
                "{}={}; Path=/; HttpOnly; SameSite=Lax",
                SESSION_COOKIE, session_id
            ),
        ));
        self
    }

    pub fn write_to(&self, out: &mut impl Write) -> std::io::Result<()> {
        if let Some(status) = self.status {
            write!(out, "Status: {}\r\n", status)?;
        }
        for (name, value) in &self.headers {
            write!(out, "{}: {}\r\n", name, value)?;
        }
        write!(out, "\r\n{}", self.body)?;
        out.flush()
    }
}
