use super::{Role, VersionRange};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Static description of one column of an introspection view.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDeclaration {
    pub name: String,
    pub role: Role,
    pub description: String,

    /// Value table used by [`Role::MappedEnum`] columns.
    pub mapping: Option<Arc<BTreeMap<String, f64>>>,

    /// Versions on which the column exists. `None` means all versions.
    pub versions: Option<VersionRange>,
}

impl ColumnDeclaration {
    #[must_use]
    pub fn new(name: impl Into<String>, role: Role, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role,
            description: description.into(),
            mapping: None,
            versions: None,
        }
    }

    #[must_use]
    pub fn with_versions(mut self, versions: VersionRange) -> Self {
        self.versions = Some(versions);
        self
    }

    #[must_use]
    pub fn with_mapping<I, K>(mut self, mapping: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        self.mapping = Some(Arc::new(mapping.into_iter().map(|(k, v)| (k.into(), v)).collect()));
        self
    }
}

/// Alternate SQL for a view, used on the versions its range accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideDeclaration {
    pub versions: VersionRange,
    pub query: String,
}

impl OverrideDeclaration {
    #[must_use]
    pub fn new(versions: VersionRange, query: impl Into<String>) -> Self {
        Self {
            versions,
            query: query.into(),
        }
    }
}
