use super::common::format_value;
use crate::Result;
use crate::exporter::{MetricSample, ScrapeResult, Snapshot};
use core::fmt::Write;
use serde_json::json;

#[expect(unused_results, reason = "Map::insert intentionally overwrites values")]
pub fn generate<W: Write>(snapshot: &Snapshot, writer: &mut W) -> Result<()> {
    let mut targets = Vec::with_capacity(snapshot.results.len());

    for result in &snapshot.results {
        let mut target_obj = serde_json::Map::new();
        target_obj.insert("target".to_string(), json!(result.target));
        target_obj.insert("connected".to_string(), json!(result.connected()));
        target_obj.insert("errors".to_string(), errors_to_json(result));
        target_obj.insert("samples".to_string(), samples_to_json(&result.samples));
        targets.push(json!(target_obj));
    }

    let output = json!({
        "targets": targets,
        "operational": samples_to_json(&snapshot.operational),
    });

    write!(writer, "{}", serde_json::to_string_pretty(&output)?)?;
    Ok(())
}

#[expect(unused_results, reason = "Map::insert intentionally overwrites values")]
fn errors_to_json(result: &ScrapeResult) -> serde_json::Value {
    let mut errors = serde_json::Map::new();

    if let Some(e) = &result.connection_error {
        errors.insert("connection".to_string(), json!(e.to_string()));
    }

    if let Some(e) = &result.version_error {
        errors.insert("version".to_string(), json!(e.to_string()));
    }

    if !result.namespace_errors.is_empty() {
        let namespaces: serde_json::Map<_, _> = result
            .namespace_errors
            .iter()
            .map(|e| (e.namespace.clone(), json!(e.error.to_string())))
            .collect();
        errors.insert("namespaces".to_string(), json!(namespaces));
    }

    if !result.value_errors.is_empty() {
        let values: Vec<_> = result.value_errors.iter().map(ToString::to_string).collect();
        errors.insert("values".to_string(), json!(values));
    }

    json!(errors)
}

fn samples_to_json(samples: &[MetricSample]) -> serde_json::Value {
    json!(
        samples
            .iter()
            .map(|sample| {
                let labels: serde_json::Map<_, _> = sample.labels.iter().map(|(k, v)| (k.clone(), json!(v))).collect();

                // NaN and infinities have no JSON representation
                let value = if sample.value.is_finite() {
                    json!(sample.value)
                } else {
                    json!(format_value(sample.value))
                };

                json!({
                    "name": sample.name,
                    "help": sample.help,
                    "kind": sample.kind.to_string(),
                    "labels": labels,
                    "value": value,
                })
            })
            .collect::<Vec<_>>()
    )
}
