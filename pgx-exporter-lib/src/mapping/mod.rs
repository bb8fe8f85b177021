//! Version-aware compilation of declarations
//!
//! Given the version of the connected server, this module turns a
//! [`Catalog`](crate::catalog::Catalog) into the two tables the scraper works from:
//!
//! - a [`MetricMap`], holding one [`MetricDescriptor`] per view column, built by
//!   [`build_metric_map`]
//! - a [`QueryOverrideMap`], holding the resolved SQL per view, built by
//!   [`resolve_overrides`]
//!
//! Both are rebuilt wholesale whenever the version changes and are never patched
//! in place.

mod descriptor;
mod metric_map;
mod overrides;
mod version;

pub use descriptor::{Conversion, MetricDescriptor, ValueKind};
pub use metric_map::{MetricMap, NamespaceMap, build_metric_map};
pub use overrides::{QueryOverrideMap, ViewQuery, resolve_overrides};
pub use version::parse_version;
