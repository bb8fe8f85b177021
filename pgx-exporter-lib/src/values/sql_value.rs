use super::CoercionError;
use chrono::{DateTime, Utc};

const LOG_TARGET: &str = "    values";

/// A single value decoded from a query result row.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
}

impl SqlValue {
    /// Returns the value as text when it is textual, without any numeric formatting.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Bytes(b) => core::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    /// Short type name used in diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Timestamp(_) => "timestamp",
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Convert a row value into a sample value.
///
/// `NULL` becomes `NaN` and is treated as a success.
#[expect(clippy::cast_precision_loss, reason = "metric samples are f64 by definition")]
pub fn to_f64(value: &SqlValue) -> Result<f64, CoercionError> {
    match value {
        SqlValue::Null => Ok(f64::NAN),
        SqlValue::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        SqlValue::Int(i) => Ok(*i as f64),
        SqlValue::Float(f) => Ok(*f),
        SqlValue::Timestamp(ts) => Ok(ts.timestamp() as f64),
        SqlValue::Text(s) => parse_float(s),
        SqlValue::Bytes(b) => match core::str::from_utf8(b) {
            Ok(s) => parse_float(s),
            Err(_) => Err(CoercionError::Unparsable {
                text: String::from_utf8_lossy(b).into_owned(),
            }),
        },
    }
}

/// Convert a row value into a label value.
///
/// `NULL` becomes the empty string. Byte strings that are not valid UTF-8 cannot
/// be used as labels.
pub fn to_label(value: &SqlValue) -> Result<String, CoercionError> {
    match value {
        SqlValue::Null => Ok(String::new()),
        SqlValue::Bool(b) => Ok(if *b { "true" } else { "false" }.to_string()),
        SqlValue::Int(i) => Ok(i.to_string()),
        SqlValue::Float(f) => Ok(f.to_string()),
        SqlValue::Timestamp(ts) => Ok(ts.timestamp().to_string()),
        SqlValue::Text(s) => Ok(s.clone()),
        SqlValue::Bytes(b) => String::from_utf8(b.clone()).map_err(|_| CoercionError::UnsupportedType { type_name: "bytes" }),
    }
}

fn parse_float(text: &str) -> Result<f64, CoercionError> {
    text.trim().parse::<f64>().map_err(|e| {
        log::debug!(target: LOG_TARGET, "Could not parse '{text}' as a number: {e}");
        CoercionError::Unparsable { text: text.to_string() }
    })
}
