use crate::values::{CoercionError, SqlValue, to_f64};
use core::time::Duration;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use strum::Display;

const LOG_TARGET: &str = "   mapping";

/// Kind of value a sample carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Counter,
    Gauge,
    Untyped,
}

/// How raw values of a column are turned into sample values.
#[derive(Debug, Clone, PartialEq)]
pub enum Conversion {
    /// The column is not emitted. Conversion always yields `NaN`.
    Discard,

    /// Plain numeric coercion.
    Numeric,

    /// Text looked up in a value table.
    Mapped(Arc<BTreeMap<String, f64>>),

    /// Textual duration reported in milliseconds. `-1` means the value is unknown.
    Duration,
}

/// Compiled, version-specific mapping of one column to a metric.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDescriptor {
    name: String,
    help: String,
    kind: ValueKind,
    conversion: Conversion,
}

impl MetricDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>, help: impl Into<String>, kind: ValueKind, conversion: Conversion) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            kind,
            conversion,
        }
    }

    #[must_use]
    pub const fn discard() -> Self {
        Self {
            name: String::new(),
            help: String::new(),
            kind: ValueKind::Untyped,
            conversion: Conversion::Discard,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn help(&self) -> &str {
        &self.help
    }

    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        self.kind
    }

    #[must_use]
    pub const fn conversion(&self) -> &Conversion {
        &self.conversion
    }

    #[must_use]
    pub const fn is_discard(&self) -> bool {
        matches!(self.conversion, Conversion::Discard)
    }

    /// Convert a raw row value into a sample value.
    pub fn convert(&self, value: &SqlValue) -> Result<f64, CoercionError> {
        match &self.conversion {
            Conversion::Discard => Ok(f64::NAN),
            Conversion::Numeric => to_f64(value),
            Conversion::Mapped(table) => {
                let text = value
                    .as_text()
                    .ok_or(CoercionError::UnsupportedType { type_name: value.type_name() })?;
                table
                    .get(text)
                    .copied()
                    .ok_or_else(|| CoercionError::Unmapped { text: text.to_string() })
            }
            Conversion::Duration => {
                let text = value
                    .as_text()
                    .ok_or(CoercionError::UnsupportedType { type_name: value.type_name() })?;
                if text == "-1" {
                    return Err(CoercionError::Unknown);
                }

                parse_duration_ms(text).map_err(|e| {
                    log::error!(target: LOG_TARGET, "Failed converting '{text}' for metric '{}': {e}", self.name);
                    CoercionError::Unparsable { text: text.to_string() }
                })
            }
        }
    }
}

fn parse_duration_ms(text: &str) -> Result<f64, humantime::DurationError> {
    let duration: Duration = humantime::parse_duration(text.trim())?;
    Ok(duration.as_secs_f64() * 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn duration_descriptor() -> MetricDescriptor {
        MetricDescriptor::new("pg_x_wait_milliseconds", "wait", ValueKind::Gauge, Conversion::Duration)
    }

    #[test]
    fn test_discard_yields_nan() {
        let d = MetricDescriptor::discard();
        assert!(d.is_discard());
        assert!(d.convert(&SqlValue::Int(5)).unwrap().is_nan());
    }

    #[test]
    fn test_numeric() {
        let d = MetricDescriptor::new("pg_x_y", "y", ValueKind::Counter, Conversion::Numeric);
        assert_eq!(d.convert(&SqlValue::Int(12)).unwrap(), 12.0);
        assert!(d.convert(&SqlValue::from("nope")).is_err());
    }

    #[test]
    fn test_mapped() {
        let table: BTreeMap<String, f64> = [("streaming".to_string(), 1.0), ("catchup".to_string(), 2.0)].into_iter().collect();
        let d = MetricDescriptor::new("pg_x_state", "state", ValueKind::Gauge, Conversion::Mapped(Arc::new(table)));
        assert_eq!(d.convert(&SqlValue::from("catchup")).unwrap(), 2.0);
        assert_eq!(
            d.convert(&SqlValue::from("backup")).unwrap_err(),
            CoercionError::Unmapped { text: "backup".to_string() }
        );
        assert_eq!(
            d.convert(&SqlValue::Int(1)).unwrap_err(),
            CoercionError::UnsupportedType { type_name: "int" }
        );
    }

    #[test]
    fn test_duration() {
        let d = duration_descriptor();
        assert_eq!(d.convert(&SqlValue::from("2s")).unwrap(), 2000.0);
        assert_eq!(d.convert(&SqlValue::from("1m 30s")).unwrap(), 90_000.0);
        assert_eq!(d.convert(&SqlValue::Bytes(b"250ms".to_vec())).unwrap(), 250.0);
    }

    #[test]
    fn test_duration_sentinel_is_unknown() {
        assert_eq!(duration_descriptor().convert(&SqlValue::from("-1")).unwrap_err(), CoercionError::Unknown);
    }

    #[test]
    fn test_duration_unparsable() {
        let err = duration_descriptor().convert(&SqlValue::from("soon")).unwrap_err();
        assert!(matches!(err, CoercionError::Unparsable { .. }));
    }

    #[test]
    fn test_value_kind_display() {
        assert_eq!(ValueKind::Counter.to_string(), "counter");
        assert_eq!(ValueKind::Untyped.to_string(), "untyped");
    }
}
