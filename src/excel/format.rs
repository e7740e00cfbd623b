//! Cell value formatting

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::OnceLock;

use super::workbook::Cell;
use crate::types::{Column, ColumnType, Row, Value};

/// Render one field of `row` for `column`.
///
/// Missing values become an empty string. A custom formatter wins over the
/// column type; `date` and `number` columns get locale rendering, anything
/// else passes through unchanged.
pub fn format_value(row: &Row, column: &Column) -> Cell {
    let value = row.get(&column.prop);

    if value.is_null() {
        return Cell::Text(String::new());
    }

    if let Some(formatter) = column.formatter() {
        return Cell::Text(formatter(value, row));
    }

    match (column.kind, value) {
        (Some(ColumnType::Date), Value::Text(s)) if s.contains('T') => {
            match parse_iso_date(s) {
                Some(date) => Cell::Text(format_date(date)),
                None => Cell::Text(s.clone()),
            }
        }
        (Some(ColumnType::Date), Value::Date(dt)) => Cell::Text(format_date(dt.date())),
        (Some(ColumnType::Number), Value::Number(n)) => Cell::Text(format_number(*n)),
        _ => Cell::from_value(value),
    }
}

fn iso_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})T").ok())
        .as_ref()
}

/// Calendar date of an ISO-like timestamp, taken as written (no zone shift)
pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    let captures = iso_pattern()?.captures(s.trim())?;
    let year = captures.get(1)?.as_str().parse().ok()?;
    let month = captures.get(2)?.as_str().parse().ok()?;
    let day = captures.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Locale date: `2024/3/5`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y/%-m/%-d").to_string()
}

/// Locale date for a native timestamp
pub fn format_datetime(dt: &NaiveDateTime) -> String {
    format_date(dt.date())
}

/// Locale number: thousands separators, at most three fraction digits
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "∞" } else { "-∞" }.to_string();
    }

    let rounded = (n.abs() * 1000.0).round() / 1000.0;
    let fixed = format!("{:.3}", rounded);
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.iter().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*ch);
    }

    let sign = if n < 0.0 && rounded != 0.0 { "-" } else { "" };
    if frac_part.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{}", sign, grouped, frac_part)
    }
}
