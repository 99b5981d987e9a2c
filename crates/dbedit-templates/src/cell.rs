//! Rendering of a single table cell
//!
//! The raw text of a cell is resolved in a fixed order: a configured formatter
//! replaces everything else, then the computed expression, the formatted
//! timestamp, checkbox labels, dropdown labels and finally the stored value.
//! The optional post-formatter, HTML escaping, trimming and line-break
//! conversion are applied on top.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{Local, TimeZone};
use dbedit_core::{Row, Value};
use dbedit_schema::{
    ColumnConfig, ColumnKind, PRIMARY_KEY_ALIAS, computed_alias, unixtime_alias,
};

use crate::filters::HtmlFilters;

/// Everything a formatter may look at besides the text it receives
pub struct FormatterContext<'a> {
    pub primary_key: Option<&'a Value>,
    pub row: &'a Row,
    /// Suffix appended to synthetic column aliases in this render pass
    pub suffix: &'a str,
    pub field: &'a str,
    pub column: &'a ColumnConfig,
    pub charset: &'a str,
}

/// Named hook that produces or alters the displayed text of a cell.
///
/// Used as a column's `formatter` it receives the stored value and its result
/// replaces the built-in display logic; used as a `post_formatter` it
/// receives the resolved text before escaping.
pub trait CellFormatter: Send + Sync {
    fn format(&self, text: &str, ctx: &FormatterContext<'_>) -> String;
}

impl<F> CellFormatter for F
where
    F: Fn(&str, &FormatterContext<'_>) -> String + Send + Sync,
{
    fn format(&self, text: &str, ctx: &FormatterContext<'_>) -> String {
        self(text, ctx)
    }
}

/// Formatters available to column configurations, looked up by name
#[derive(Clone, Default)]
pub struct FormatterRegistry {
    formatters: HashMap<String, Arc<dyn CellFormatter>>,
}

impl FormatterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, formatter: impl CellFormatter + 'static) {
        self.formatters.insert(name.into(), Arc::new(formatter));
    }

    pub fn with(mut self, name: impl Into<String>, formatter: impl CellFormatter + 'static) -> Self {
        self.register(name, formatter);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn CellFormatter>> {
        self.formatters.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.formatters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for FormatterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatterRegistry")
            .field("formatters", &self.names())
            .finish()
    }
}

/// Text resolved for a cell before the output transforms
struct Resolved {
    text: String,
    /// Already markup; never escaped
    markup: bool,
    /// Unix timestamp carried as the cell's sort key
    order: Option<String>,
}

impl Resolved {
    fn text(text: String) -> Self {
        Self {
            text,
            markup: false,
            order: None,
        }
    }
}

pub struct CellRenderer<'a> {
    formatters: &'a FormatterRegistry,
}

impl<'a> CellRenderer<'a> {
    pub fn new(formatters: &'a FormatterRegistry) -> Self {
        Self { formatters }
    }

    /// `<td>` for `column` of `row`; empty for columns that are not displayed
    pub fn render_cell(
        &self,
        row: &Row,
        suffix: &str,
        column: &ColumnConfig,
        charset: &str,
    ) -> String {
        if !column.is_displayable() {
            return String::new();
        }

        let ctx = FormatterContext {
            primary_key: row.get_by_name(PRIMARY_KEY_ALIAS),
            row,
            suffix,
            field: &column.field,
            column,
            charset,
        };

        let mut resolved = self.resolve(&ctx);

        if let Some(formatter) = self.lookup(column.post_formatter.as_deref()) {
            resolved.text = formatter.format(&resolved.text, &ctx);
        }

        let mut output = if resolved.markup || column.display.no_escape {
            resolved.text
        } else {
            HtmlFilters::escape_html(&resolved.text)
        };
        if column.display.trim {
            output = output.trim().to_string();
        }
        if column.display.nl2br {
            output = HtmlFilters::nl2br(&output);
        }
        if column.display.bold {
            output = format!("<strong>{}</strong>", output);
        }

        match resolved.order {
            Some(order) => format!(
                r#"<td data-order="{}">{}</td>"#,
                HtmlFilters::escape_html(&order),
                output
            ),
            None => format!("<td>{}</td>", output),
        }
    }

    fn lookup(&self, name: Option<&str>) -> Option<&Arc<dyn CellFormatter>> {
        let name = name?;
        let formatter = self.formatters.get(name);
        if formatter.is_none() {
            tracing::warn!(formatter = %name, "unknown cell formatter");
        }
        formatter
    }

    fn resolve(&self, ctx: &FormatterContext<'_>) -> Resolved {
        let column = ctx.column;
        let stored = display_value(ctx.row, column.reference_name());

        if let Some(formatter) = self.lookup(column.formatter.as_deref()) {
            return Resolved::text(formatter.format(&stored, ctx));
        }

        match &column.kind {
            ColumnKind::Computed { .. } => Resolved::text(display_value(
                ctx.row,
                &computed_alias(&column.field, ctx.suffix),
            )),
            ColumnKind::Date(options) | ColumnKind::DateTime(options)
                if options.format.is_some() =>
            {
                let format = options.format.as_deref().unwrap_or_default();
                let alias = unixtime_alias(&column.field, ctx.suffix);
                let timestamp = ctx.row.get_by_name(&alias).and_then(Value::as_i64);
                Resolved {
                    text: timestamp
                        .map(|ts| format_timestamp(ts, format))
                        .unwrap_or_default(),
                    markup: false,
                    order: Some(timestamp.map(|ts| ts.to_string()).unwrap_or_default()),
                }
            }
            ColumnKind::Checkbox { labels } => {
                let checked = ctx
                    .row
                    .get_by_name(column.reference_name())
                    .is_some_and(Value::is_truthy);
                Resolved {
                    text: labels.for_state(checked).to_string(),
                    markup: true,
                    order: None,
                }
            }
            ColumnKind::Dropdown { options } => Resolved::text(
                options
                    .iter()
                    .find(|option| option.value == stored)
                    .map(|option| option.label.clone())
                    .unwrap_or_default(),
            ),
            _ => Resolved::text(stored),
        }
    }
}

fn display_value(row: &Row, name: &str) -> String {
    row.get_by_name(name)
        .map(Value::to_display_string)
        .unwrap_or_default()
}

/// Format a unix timestamp in the server's local timezone
fn format_timestamp(timestamp: i64, format: &str) -> String {
    let Some(local) = Local.timestamp_opt(timestamp, 0).single() else {
        return String::new();
    };
    let mut text = String::new();
    if write!(text, "{}", local.format(format)).is_err() {
        tracing::warn!(format = %format, "invalid date display format");
        return String::new();
    }
    text
}
