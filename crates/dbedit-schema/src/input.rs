//! Conversion of submitted form data into bound column values

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use dbedit_core::{SqlDialect, Value};
use regex::Regex;

use crate::column::{ColumnConfig, ColumnKind};
use crate::editor_config::{OtherColumn, OtherColumnKind, OtherValue};
use crate::sql_builder::Assignment;

static NUMERIC_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?\s*$").expect("valid regex")
});

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Checkboxes submit nothing when unchecked, so presence is the value
pub fn checkbox_value(present: bool) -> Value {
    Value::Int64(present as i64)
}

/// Bind a numeric-looking string as an integer or float
pub fn numeric_value(text: &str) -> Option<Value> {
    if !NUMERIC_REGEX.is_match(text) {
        return None;
    }
    let text = text.trim();
    if let Ok(int) = text.parse::<i64>() {
        return Some(Value::Int64(int));
    }
    text.parse::<f64>().ok().map(Value::Float64)
}

/// Value written for a submitted, non-checkbox form field
pub fn submitted_value(column: &ColumnConfig, submitted: &str) -> Value {
    match &column.kind {
        ColumnKind::Date(options) => match &options.input_format {
            Some(format) => parse_input_date(&column.field, submitted, format, false),
            None => Value::from(submitted),
        },
        ColumnKind::DateTime(options) => match &options.input_format {
            Some(format) => parse_input_date(&column.field, submitted, format, true),
            None => Value::from(submitted),
        },
        kind if kind.is_numeric() => {
            numeric_value(submitted).unwrap_or_else(|| Value::from(submitted))
        }
        _ => Value::from(submitted),
    }
}

/// Reformat a date typed in `format` the way the database expects it.
///
/// Input that does not match the format is passed through unchanged.
fn parse_input_date(field: &str, submitted: &str, format: &str, with_time: bool) -> Value {
    let parsed = if with_time {
        NaiveDateTime::parse_from_str(submitted, format)
            .or_else(|_| {
                NaiveDate::parse_from_str(submitted, format)
                    .map(|date| date.and_time(NaiveTime::MIN))
            })
            .map(|dt| dt.format(DATETIME_FORMAT).to_string())
    } else {
        NaiveDate::parse_from_str(submitted, format).map(|d| d.format(DATE_FORMAT).to_string())
    };

    match parsed {
        Ok(text) => Value::String(text),
        Err(err) => {
            tracing::warn!(
                field = %field,
                value = %submitted,
                format = %format,
                error = %err,
                "submitted date does not match the input format"
            );
            Value::from(submitted)
        }
    }
}

/// Assignment for a column supplied by the calling code.
///
/// `Now` only has a meaning for date-like kinds; for other kinds it is skipped.
pub fn other_column_assignment(other: &OtherColumn, dialect: SqlDialect) -> Option<Assignment> {
    match (&other.value, other.kind) {
        (OtherValue::Now, OtherColumnKind::Date) => {
            Some(Assignment::expression(&other.field, dialect.current_date()))
        }
        (OtherValue::Now, OtherColumnKind::DateTime | OtherColumnKind::Timestamp) => {
            Some(Assignment::expression(&other.field, dialect.current_timestamp()))
        }
        (OtherValue::Now, OtherColumnKind::Number | OtherColumnKind::Text) => None,
        (OtherValue::Literal(text), OtherColumnKind::Number) => Some(Assignment::param(
            &other.field,
            numeric_value(text).unwrap_or_else(|| Value::from(text.as_str())),
        )),
        (OtherValue::Literal(text), _) => Some(Assignment::param(&other.field, text.as_str())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::DateOptions;
    use crate::sql_builder::AssignedValue;

    #[test]
    fn test_numeric_detection() {
        assert_eq!(numeric_value("42"), Some(Value::Int64(42)));
        assert_eq!(numeric_value("-1.5"), Some(Value::Float64(-1.5)));
        assert_eq!(numeric_value("1e3"), Some(Value::Float64(1000.0)));
        assert_eq!(numeric_value("12abc"), None);
        assert_eq!(numeric_value(""), None);
    }

    #[test]
    fn test_number_inputs_bound_as_numbers() {
        let qty = ColumnConfig::new("qty").with_kind(ColumnKind::number());
        assert_eq!(submitted_value(&qty, "3"), Value::Int64(3));
        assert_eq!(submitted_value(&qty, "three"), Value::from("three"));

        let name = ColumnConfig::new("name");
        assert_eq!(submitted_value(&name, "3"), Value::from("3"));
    }

    #[test]
    fn test_input_dates_reformatted() {
        let born = ColumnConfig::new("born").with_kind(ColumnKind::Date(DateOptions {
            format: None,
            input_format: Some("%d/%m/%Y".into()),
        }));
        assert_eq!(submitted_value(&born, "31/12/1999"), Value::from("1999-12-31"));
        assert_eq!(submitted_value(&born, "yesterday"), Value::from("yesterday"));

        let seen = ColumnConfig::new("seen").with_kind(ColumnKind::DateTime(DateOptions {
            format: None,
            input_format: Some("%d/%m/%Y %H:%M".into()),
        }));
        assert_eq!(
            submitted_value(&seen, "01/02/2024 09:30"),
            Value::from("2024-02-01 09:30:00")
        );
    }

    #[test]
    fn test_checkbox_value() {
        assert_eq!(checkbox_value(true), Value::Int64(1));
        assert_eq!(checkbox_value(false), Value::Int64(0));
    }

    #[test]
    fn test_other_columns() {
        let touched = OtherColumn::now("touched", OtherColumnKind::Timestamp);
        assert_eq!(
            other_column_assignment(&touched, SqlDialect::MySql),
            Some(Assignment::expression("touched", "NOW()"))
        );

        let day = OtherColumn::now("day", OtherColumnKind::Date);
        let assignment = other_column_assignment(&day, SqlDialect::Postgres).unwrap();
        assert_eq!(
            assignment.value,
            AssignedValue::Expression("CURRENT_DATE".into())
        );

        let count = OtherColumn::literal("edits", OtherColumnKind::Number, "5");
        assert_eq!(
            other_column_assignment(&count, SqlDialect::Sqlite),
            Some(Assignment::param("edits", 5i64))
        );

        let note = OtherColumn::now("note", OtherColumnKind::Text);
        assert_eq!(other_column_assignment(&note, SqlDialect::Sqlite), None);
    }
}
