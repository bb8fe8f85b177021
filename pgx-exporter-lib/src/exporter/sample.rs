use crate::mapping::ValueKind;
use serde::Serialize;

/// An ordered set of label name/value pairs.
pub type Labels = Vec<(String, String)>;

/// One metric value, ready to be rendered in any exposition format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSample {
    pub name: String,
    pub help: String,
    pub labels: Labels,
    pub value: f64,
    pub kind: ValueKind,
}

impl MetricSample {
    #[must_use]
    pub fn new(name: impl Into<String>, help: impl Into<String>, kind: ValueKind, value: f64) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            labels: Vec::new(),
            value,
            kind,
        }
    }

    #[must_use]
    pub fn with_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_labels<'a>(mut self, labels: impl IntoIterator<Item = &'a (String, String)>) -> Self {
        self.labels.extend(labels.into_iter().cloned());
        self
    }

    #[must_use]
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }
}
