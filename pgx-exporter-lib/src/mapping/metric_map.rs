use super::{Conversion, MetricDescriptor, ValueKind};
use crate::catalog::{ColumnDeclaration, Role};
use semver::Version;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

const LOG_TARGET: &str = "   mapping";

/// Descriptors for the columns of one view, plus the view's label columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamespaceMap {
    labels: Vec<String>,
    columns: HashMap<String, MetricDescriptor>,
}

impl NamespaceMap {
    /// Label column names, in the order label values are attached to samples.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&MetricDescriptor> {
        self.columns.get(name)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &MetricDescriptor)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Compiled descriptors for every view, for one server version.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricMap {
    namespaces: BTreeMap<String, NamespaceMap>,
}

impl MetricMap {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    #[must_use]
    pub fn get(&self, namespace: &str) -> Option<&NamespaceMap> {
        self.namespaces.get(namespace)
    }

    #[must_use]
    pub fn contains(&self, namespace: &str) -> bool {
        self.namespaces.contains_key(namespace)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NamespaceMap)> {
        self.namespaces.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Insert or replace a whole view, returning the replaced entry.
    pub fn insert(&mut self, namespace: impl Into<String>, map: NamespaceMap) -> Option<NamespaceMap> {
        self.namespaces.insert(namespace.into(), map)
    }
}

impl IntoIterator for MetricMap {
    type Item = (String, NamespaceMap);
    type IntoIter = std::collections::btree_map::IntoIter<String, NamespaceMap>;

    fn into_iter(self) -> Self::IntoIter {
        self.namespaces.into_iter()
    }
}

/// Compile column declarations into descriptors for the given server version.
///
/// Columns whose version range rejects `version` are forced to discard so their
/// absence from the output is deliberate.
pub fn build_metric_map<'a, I>(namespaces: I, version: &Version) -> MetricMap
where
    I: IntoIterator<Item = (&'a str, &'a [ColumnDeclaration])>,
{
    let mut map = MetricMap::default();
    for (namespace, columns) in namespaces {
        let _ = map.insert(namespace, build_namespace(namespace, columns, version));
    }

    map
}

fn build_namespace(namespace: &str, columns: &[ColumnDeclaration], version: &Version) -> NamespaceMap {
    let labels = columns
        .iter()
        .filter(|c| c.role == Role::Label)
        .map(|c| c.name.clone())
        .collect();

    let columns = columns
        .iter()
        .map(|column| (column.name.clone(), build_descriptor(namespace, column, version)))
        .collect();

    NamespaceMap { labels, columns }
}

fn build_descriptor(namespace: &str, column: &ColumnDeclaration, version: &Version) -> MetricDescriptor {
    if let Some(range) = &column.versions
        && !range.matches(version)
    {
        log::debug!(
            target: LOG_TARGET,
            "{namespace}.{} is being forced to discard due to version incompatibility ({range} does not match {version})",
            column.name
        );
        return MetricDescriptor::discard();
    }

    let name = format!("{namespace}_{}", column.name);
    match column.role {
        Role::Discard | Role::Label => MetricDescriptor::discard(),
        Role::Counter => MetricDescriptor::new(name, &column.description, ValueKind::Counter, Conversion::Numeric),
        Role::Gauge => MetricDescriptor::new(name, &column.description, ValueKind::Gauge, Conversion::Numeric),
        Role::MappedEnum => {
            let table = column.mapping.as_ref().map_or_else(|| Arc::new(BTreeMap::new()), Arc::clone);
            MetricDescriptor::new(name, &column.description, ValueKind::Gauge, Conversion::Mapped(table))
        }
        Role::Duration => MetricDescriptor::new(
            format!("{name}_milliseconds"),
            &column.description,
            ValueKind::Gauge,
            Conversion::Duration,
        ),
    }
}
