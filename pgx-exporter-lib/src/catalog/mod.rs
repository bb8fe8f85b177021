//! Declaration tables for introspection views
//!
//! A [`Catalog`] holds two tables, both keyed by view name:
//!
//! - column declarations, describing the [`Role`] of each column of a view and
//!   the versions on which the column exists
//! - query overrides, listing alternate SQL bodies for a view together with the
//!   versions each body applies to
//!
//! The built-in catalog is constructed once with [`Catalog::builtin`] and passed
//! explicitly to the map builder. Tests build alternate catalogs with
//! [`Catalog::with_namespace`] and [`Catalog::with_overrides`].

mod builtin;
mod declarations;
mod role;
mod version_range;

pub use declarations::{ColumnDeclaration, OverrideDeclaration};
pub use role::Role;
pub use version_range::{Comparator, Op, VersionRange};

use std::collections::BTreeMap;

/// Immutable set of column and override declarations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    namespaces: BTreeMap<String, Vec<ColumnDeclaration>>,
    overrides: BTreeMap<String, Vec<OverrideDeclaration>>,
}

impl Catalog {
    /// An empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The declarations shipped with the exporter.
    #[must_use]
    pub fn builtin() -> Self {
        builtin::catalog()
    }

    /// Adds or replaces the column declarations of a view.
    #[must_use]
    pub fn with_namespace(mut self, name: impl Into<String>, columns: impl IntoIterator<Item = ColumnDeclaration>) -> Self {
        let _ = self.namespaces.insert(name.into(), columns.into_iter().collect());
        self
    }

    /// Adds or replaces the query overrides of a view. Order is significant: the first match wins.
    #[must_use]
    pub fn with_overrides(mut self, name: impl Into<String>, overrides: impl IntoIterator<Item = OverrideDeclaration>) -> Self {
        let _ = self.overrides.insert(name.into(), overrides.into_iter().collect());
        self
    }

    pub fn namespaces(&self) -> impl Iterator<Item = (&str, &[ColumnDeclaration])> {
        self.namespaces.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn overrides(&self) -> impl Iterator<Item = (&str, &[OverrideDeclaration])> {
        self.overrides.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    #[must_use]
    pub fn namespace(&self, name: &str) -> Option<&[ColumnDeclaration]> {
        self.namespaces.get(name).map(Vec::as_slice)
    }

    #[must_use]
    pub fn overrides_for(&self, name: &str) -> Option<&[OverrideDeclaration]> {
        self.overrides.get(name).map(Vec::as_slice)
    }
}
