use std::fmt;

use anyhow::{Result, anyhow};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Fallback used when a row has no usable category.
pub const CATEGORY_FALLBACK: &str = "SIN CATEGORÍA";
/// Fallback used when a row has no usable brand.
pub const BRAND_FALLBACK: &str = "SIN MARCA";
/// Query token that selects rows carrying [`BRAND_FALLBACK`].
pub const NO_BRAND_SENTINEL: &str = "SIN_MARCA";

const MISSING_TEXT_TOKENS: &[&str] = &["nan", "none", "null", "nat"];

/// A single spreadsheet cell as handed over by the ingestion layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub enum Value {
    #[default]
    Null,
    String(String),
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    /// Wraps a raw text cell, mapping blank input to [`Value::Null`].
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Value::Null
        } else {
            Value::String(trimmed.to_string())
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_display(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => {
                if f.fract() == 0.0 && f.is_finite() {
                    (*f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::from_raw(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

/// Numeric view of a cell. Anything that is not a finite number becomes `0.0`.
pub fn coerce_f64(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Integer(i)) => *i as f64,
        Some(Value::Float(f)) => *f,
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    finite_or_zero(parsed)
}

/// Integer view of a cell, truncating fractional quantities toward zero.
pub fn coerce_i64(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Integer(i)) => *i,
        other => coerce_f64(other).trunc() as i64,
    }
}

pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// True for absent cells, blank strings and textual null markers such as `nan`.
pub fn is_missing_text(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            trimmed.is_empty()
                || MISSING_TEXT_TOKENS
                    .iter()
                    .any(|token| trimmed.eq_ignore_ascii_case(token))
        }
        Some(Value::Float(f)) => f.is_nan(),
        _ => false,
    }
}

/// Trimmed display text of a cell, or `fallback` when the cell is missing.
pub fn normalize_text(value: Option<&Value>, fallback: &str) -> String {
    if is_missing_text(value) {
        return fallback.to_string();
    }
    value
        .map(|v| v.as_display().trim().to_string())
        .unwrap_or_else(|| fallback.to_string())
}

/// Like [`normalize_text`] but keeps the distinction between present and missing.
pub fn optional_text(value: Option<&Value>) -> Option<String> {
    if is_missing_text(value) {
        None
    } else {
        value.map(|v| v.as_display().trim().to_string())
    }
}

/// Parses dates the way the inventory exports write them: day first.
pub fn parse_naive_date(value: &str) -> Result<NaiveDate> {
    const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y"];
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as date"))
}

pub fn parse_naive_datetime(value: &str) -> Result<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &[
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as datetime"))
}

/// Timestamp view of a cell for date ordering; `None` when it cannot be read as a date.
pub fn value_to_datetime(value: Option<&Value>) -> Option<NaiveDateTime> {
    match value? {
        Value::Date(d) => d.and_hms_opt(0, 0, 0),
        Value::DateTime(dt) => Some(*dt),
        Value::String(s) => {
            let trimmed = s.trim();
            parse_naive_datetime(trimmed)
                .ok()
                .or_else(|| parse_naive_date(trimmed).ok().and_then(|d| d.and_hms_opt(0, 0, 0)))
        }
        _ => None,
    }
}

pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}
