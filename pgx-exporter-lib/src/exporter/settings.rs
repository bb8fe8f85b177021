use super::{Labels, MetricSample, Session, ValueError};
use crate::Result;
use crate::mapping::ValueKind;
use crate::values::{CoercionError, SqlValue, to_label};
use ohno::{IntoAppError, bail};

const LOG_TARGET: &str = "  settings";

/// Name of the pseudo-view under which settings failures are reported.
pub const SETTINGS_NAMESPACE: &str = "pg_settings";

const SETTINGS_QUERY: &str =
    "SELECT name, setting, COALESCE(unit, ''), short_desc, vartype FROM pg_settings WHERE vartype IN ('bool', 'integer', 'real');";

/// One runtime setting as returned by `pg_settings`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting {
    pub name: String,
    pub setting: String,
    pub unit: String,
    pub short_desc: String,
    pub vartype: String,
}

impl Setting {
    /// Build the gauge for this setting, normalizing time units to seconds and size units to bytes.
    pub fn sample(&self, labels: &Labels) -> Result<MetricSample, CoercionError> {
        let mut name = self.name.replace('.', "_");
        let mut help = self.short_desc.clone();

        let value = match self.vartype.as_str() {
            "bool" => {
                if self.setting == "on" {
                    1.0
                } else {
                    0.0
                }
            }
            "integer" | "real" => {
                let (value, unit) = self.normalize()?;
                if let Some(unit) = unit {
                    name = format!("{name}_{unit}");
                    help = format!("{help} [Units converted to {unit}.]");
                }
                value
            }
            _ => return Err(CoercionError::Unparsable { text: self.vartype.clone() }),
        };

        Ok(MetricSample::new(format!("pg_settings_{name}"), help, ValueKind::Gauge, value).with_labels(labels))
    }

    fn normalize(&self) -> Result<(f64, Option<&'static str>), CoercionError> {
        let value: f64 = self.setting.trim().parse().map_err(|_| CoercionError::Unparsable {
            text: self.setting.clone(),
        })?;

        let (unit, factor) = match self.unit.as_str() {
            "" => return Ok((value, None)),
            "ms" => ("seconds", 1.0 / 1000.0),
            "s" => ("seconds", 1.0),
            "min" => ("seconds", 60.0),
            "h" => ("seconds", 60.0 * 60.0),
            "d" => ("seconds", 60.0 * 60.0 * 24.0),
            "B" => ("bytes", 1.0),
            "kB" => ("bytes", 1024.0),
            "MB" => ("bytes", 1024.0 * 1024.0),
            "GB" => ("bytes", 1024.0 * 1024.0 * 1024.0),
            "TB" => ("bytes", 1024.0 * 1024.0 * 1024.0 * 1024.0),
            "8kB" => ("bytes", 8.0 * 1024.0),
            "16kB" => ("bytes", 16.0 * 1024.0),
            "32kB" => ("bytes", 32.0 * 1024.0),
            "16MB" => ("bytes", 16.0 * 1024.0 * 1024.0),
            "32MB" => ("bytes", 32.0 * 1024.0 * 1024.0),
            "64MB" => ("bytes", 64.0 * 1024.0 * 1024.0),
            other => return Err(CoercionError::Unparsable { text: format!("unit '{other}'") }),
        };

        // -1 means "disabled" or "use the default" and is never scaled.
        if (value + 1.0).abs() < f64::EPSILON {
            return Ok((value, Some(unit)));
        }

        Ok((value * factor, Some(unit)))
    }
}

/// Query `pg_settings` and build one gauge per numeric or boolean setting.
///
/// A failed query is returned as an error. Settings with unknown units or values are
/// reported as value errors and skipped.
pub async fn collect_settings<S: Session>(session: &S, labels: &Labels) -> Result<(Vec<MetricSample>, Vec<ValueError>)> {
    let result = session.query(SETTINGS_QUERY).await.into_app_err("querying pg_settings")?;

    let mut samples = Vec::with_capacity(result.rows.len());
    let mut errors = Vec::new();

    for row in &result.rows {
        let [name, setting, unit, short_desc, vartype] = row.as_slice() else {
            bail!("unexpected pg_settings row shape: {} columns", row.len());
        };

        let setting = Setting {
            name: text(name),
            setting: text(setting),
            unit: text(unit),
            short_desc: text(short_desc),
            vartype: text(vartype),
        };

        match setting.sample(labels) {
            Ok(sample) => samples.push(sample),
            Err(error) => {
                log::warn!(target: LOG_TARGET, "Skipping setting '{}': {error}", setting.name);
                errors.push(ValueError::new(SETTINGS_NAMESPACE, setting.name, error));
            }
        }
    }

    Ok((samples, errors))
}

fn text(value: &SqlValue) -> String {
    to_label(value).unwrap_or_default()
}
