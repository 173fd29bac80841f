//! Shared parsing utilities for raw source records.
//!
//! Socrata exports encode most values as strings, including numbers, and
//! intermediate stores keep them as text. These helpers turn that text
//! into typed values.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Parses a Socrata floating timestamp (ISO 8601 with optional fractional
/// seconds). Space-separated timestamps and bare dates (taken as
/// midnight) are accepted too.
#[must_use]
pub fn parse_socrata_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Parses a coordinate from optional text. Returns `None` if missing or
/// unparseable.
#[must_use]
pub fn parse_coordinate(value: Option<&str>) -> Option<f64> {
    value?.trim().parse::<f64>().ok()
}

/// Renders a JSON scalar as text. Strings are returned as-is, numbers and
/// booleans are formatted, and `null`, arrays, and objects yield `None`.
#[must_use]
pub fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Serde helper that accepts a string, number, boolean, or `null` and
/// yields optional text.
///
/// # Errors
///
/// Returns the deserializer's error if the input is not valid JSON.
pub fn deserialize_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_text))
}

/// Returns the trimmed text, or `None` if it is missing or blank.
#[must_use]
pub fn non_blank(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}
