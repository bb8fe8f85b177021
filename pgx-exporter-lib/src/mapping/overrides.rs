use crate::catalog::OverrideDeclaration;
use semver::Version;
use std::collections::BTreeMap;

const LOG_TARGET: &str = "   mapping";

/// Resolved SQL per view for one server version.
///
/// An entry holding the empty string disables the view. Views without an entry are
/// queried with `SELECT * FROM <view>;`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOverrideMap {
    queries: BTreeMap<String, String>,
}

/// The query to run for a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewQuery<'a> {
    /// Nothing sensible can be queried for this view on this version.
    Disabled,

    /// An override supplies the SQL.
    Override(&'a str),

    /// No override exists; select every column of the view.
    Default,
}

impl ViewQuery<'_> {
    /// Returns the SQL to execute, or `None` when the view is disabled.
    #[must_use]
    pub fn sql(&self, namespace: &str) -> Option<String> {
        match self {
            Self::Disabled => None,
            Self::Override(sql) => Some((*sql).to_string()),
            Self::Default => Some(format!("SELECT * FROM {namespace};")),
        }
    }
}

impl QueryOverrideMap {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    #[must_use]
    pub fn get(&self, namespace: &str) -> Option<&str> {
        self.queries.get(namespace).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.queries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Insert or replace the query of a view, returning the replaced query.
    pub fn insert(&mut self, namespace: impl Into<String>, query: impl Into<String>) -> Option<String> {
        self.queries.insert(namespace.into(), query.into())
    }

    /// Decide what to run for a view.
    #[must_use]
    pub fn query_for(&self, namespace: &str) -> ViewQuery<'_> {
        match self.queries.get(namespace) {
            Some(sql) if sql.is_empty() => ViewQuery::Disabled,
            Some(sql) => ViewQuery::Override(sql),
            None => ViewQuery::Default,
        }
    }
}

/// Pick one SQL body per view for the given version.
///
/// The first declaration whose range accepts `version` wins. When none does, the view
/// is disabled with a warning. Overlapping ranges are not detected here.
pub fn resolve_overrides<'a, I>(overrides: I, version: &Version) -> QueryOverrideMap
where
    I: IntoIterator<Item = (&'a str, &'a [OverrideDeclaration])>,
{
    let mut map = QueryOverrideMap::default();
    for (namespace, declarations) in overrides {
        let resolved = resolve_one(declarations, version);
        if resolved.is_none() {
            log::warn!(target: LOG_TARGET, "No query matched override for {namespace} - disabling metric space");
        }

        let _ = map.insert(namespace, resolved.unwrap_or_default());
    }

    map
}

fn resolve_one(declarations: &[OverrideDeclaration], version: &Version) -> Option<String> {
    declarations
        .iter()
        .find(|d| d.versions.matches(version))
        .map(|d| d.query.clone())
}
