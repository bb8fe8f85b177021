//! Connecting to servers and turning their views into samples
//!
//! A scrape cycle runs through these pieces in order:
//!
//! - [`discover_databases`] optionally expands each configured connection string
//!   into one string per database on the server
//! - the [`Registry`] hands out one validated [`Connection`] per string
//! - [`refresh_maps`] probes the server version and rebuilds the connection's
//!   maps when the version or the extension document changed
//! - the [`Exporter`] runs every enabled view under the connection's shared lock
//!   and converts each value, recording failures in a [`ScrapeResult`]
//!
//! The database is reached through the [`Connector`] and [`Session`] traits.
//! [`PgConnector`] implements them over a `deadpool-postgres` pool.

mod connection;
mod constant_labels;
mod discovery;
mod extension;
mod gate;
mod options;
mod postgres;
mod registry;
mod sample;
mod scrape;
mod session;
mod settings;
mod target;

pub use connection::{Connection, MapState, SERVER_LABEL};
pub use constant_labels::parse_constant_labels;
pub use discovery::discover_databases;
pub use extension::{ExtensionColumn, ExtensionContent, ExtensionDocument, ExtensionLoader, ExtensionNamespace, LoadStatus, hashsum};
pub use gate::{STATIC_METRIC, build_maps, refresh_maps};
pub use options::{DEFAULT_MIN_SUPPORTED_VERSION, ExporterOptions};
pub use postgres::{PgConnector, PgSession};
pub use registry::Registry;
pub use sample::{Labels, MetricSample};
pub use scrape::{Exporter, NamespaceError, ScrapeResult, Snapshot, ValueError};
pub use session::{Connector, QueryResult, Session};
pub use settings::{SETTINGS_NAMESPACE, Setting, collect_settings};
pub use target::{DEFAULT_PORT, DEFAULT_SOCKET_HOST, Target, fingerprint, loggable_dsn, with_database};
