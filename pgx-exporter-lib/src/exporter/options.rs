use camino::Utf8PathBuf;
use semver::Version;
use std::collections::BTreeMap;

/// Oldest server version the built-in declarations are written for.
pub const DEFAULT_MIN_SUPPORTED_VERSION: Version = Version::new(9, 1, 0);

/// Knobs controlling what a scrape collects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExporterOptions {
    /// Skip the built-in declarations; only extension entries are scraped.
    pub disable_default_metrics: bool,

    /// Skip the `pg_settings` gauges.
    pub disable_settings_metrics: bool,

    /// Expand every target into one target per database on the server.
    pub auto_discover_databases: bool,

    /// Databases never added by discovery.
    pub exclude_databases: Vec<String>,

    /// Emit columns without a declaration as untyped samples.
    pub emit_untyped_columns: bool,

    /// Servers older than this get a compatibility warning.
    pub min_supported_version: Version,

    /// Labels attached to every sample.
    pub constant_labels: BTreeMap<String, String>,

    /// Extension document merged into the maps on every rebuild.
    pub extend_query_path: Option<Utf8PathBuf>,
}

impl Default for ExporterOptions {
    fn default() -> Self {
        Self {
            disable_default_metrics: false,
            disable_settings_metrics: false,
            auto_discover_databases: false,
            exclude_databases: Vec::new(),
            emit_untyped_columns: true,
            min_supported_version: DEFAULT_MIN_SUPPORTED_VERSION,
            constant_labels: BTreeMap::new(),
            extend_query_path: None,
        }
    }
}
