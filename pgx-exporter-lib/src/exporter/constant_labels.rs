use std::collections::BTreeMap;

const LOG_TARGET: &str = "  exporter";

/// Parse constant labels written as `name=value, name=value`.
///
/// Entries that are not a single `name=value` pair are logged and skipped. Entries with
/// an empty name or value are skipped silently.
#[must_use]
pub fn parse_constant_labels(text: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();

    let text = text.trim();
    if text.is_empty() {
        return labels;
    }

    for part in text.split(',') {
        let pieces: Vec<&str> = part.trim().split('=').collect();
        let [key, value] = pieces.as_slice() else {
            log::error!(target: LOG_TARGET, "Wrong constant labels format '{part}', should be 'key=value'");
            continue;
        };

        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() || value.is_empty() {
            continue;
        }

        let _ = labels.insert(key.to_string(), value.to_string());
    }

    labels
}
