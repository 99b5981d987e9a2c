//! HTML text filters applied during cell rendering

/// HTML-specific filters
pub struct HtmlFilters;

impl HtmlFilters {
    /// Escape text for HTML element content and quoted attribute values
    pub fn escape_html(value: &str) -> String {
        let mut escaped = String::with_capacity(value.len());
        for ch in value.chars() {
            match ch {
                '&' => escaped.push_str("&amp;"),
                '<' => escaped.push_str("&lt;"),
                '>' => escaped.push_str("&gt;"),
                '"' => escaped.push_str("&quot;"),
                '\'' => escaped.push_str("&#039;"),
                other => escaped.push(other),
            }
        }
        escaped
    }

    /// Insert `<br />` before every line break, keeping the break itself
    pub fn nl2br(value: &str) -> String {
        let mut converted = String::with_capacity(value.len());
        let mut chars = value.chars().peekable();
        while let Some(ch) = chars.next() {
            match ch {
                '\r' if chars.peek() == Some(&'\n') => {
                    chars.next();
                    converted.push_str("<br />\r\n");
                }
                '\n' | '\r' => {
                    converted.push_str("<br />");
                    converted.push(ch);
                }
                other => converted.push(other),
            }
        }
        converted
    }
}
