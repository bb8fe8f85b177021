use super::{
    Connector, ExporterOptions, ExtensionLoader, Labels, LoadStatus, MetricSample, Registry, SETTINGS_NAMESPACE, Session,
    collect_settings, discover_databases, loggable_dsn, refresh_maps,
};
use crate::Result;
use crate::catalog::Catalog;
use crate::mapping::{NamespaceMap, ValueKind};
use crate::values::{CoercionError, to_f64, to_label};
use core::fmt::{Debug, Display, Formatter};
use core::sync::atomic::{AtomicU64, Ordering};
use ohno::{AppError, IntoAppError, bail};
use std::time::Instant;

const LOG_TARGET: &str = "    scrape";

/// A value that could not be converted. Never aborts the row or the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueError {
    pub namespace: String,
    pub column: String,
    pub error: CoercionError,
}

impl ValueError {
    #[must_use]
    pub fn new(namespace: impl Into<String>, column: impl Into<String>, error: CoercionError) -> Self {
        Self {
            namespace: namespace.into(),
            column: column.into(),
            error,
        }
    }
}

impl Display for ValueError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}: {}", self.namespace, self.column, self.error)
    }
}

/// A view whose query or rows failed for one pass.
#[derive(Debug)]
pub struct NamespaceError {
    pub namespace: String,
    pub error: AppError,
}

/// What one pass over one target produced.
#[derive(Debug)]
pub struct ScrapeResult {
    /// The target's connection string, with any password removed.
    pub target: String,
    pub samples: Vec<MetricSample>,
    pub namespace_errors: Vec<NamespaceError>,
    pub value_errors: Vec<ValueError>,

    /// Set when no connection could be acquired; nothing else was attempted.
    pub connection_error: Option<AppError>,

    /// Set when the version probe failed; the previous maps were used.
    pub version_error: Option<AppError>,
}

impl ScrapeResult {
    fn new(target: String) -> Self {
        Self {
            target,
            samples: Vec::new(),
            namespace_errors: Vec::new(),
            value_errors: Vec::new(),
            connection_error: None,
            version_error: None,
        }
    }

    #[must_use]
    pub const fn connected(&self) -> bool {
        self.connection_error.is_none()
    }

    /// Whether the pass hit a connection, version, or view failure. Value errors do not count.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.connection_error.is_some() || self.version_error.is_some() || !self.namespace_errors.is_empty()
    }
}

/// Everything one scrape cycle produced.
#[derive(Debug)]
pub struct Snapshot {
    pub results: Vec<ScrapeResult>,

    /// The exporter's own gauges and counters.
    pub operational: Vec<MetricSample>,
}

impl Snapshot {
    /// Every sample of the cycle: target samples first, then the operational ones.
    pub fn samples(&self) -> impl Iterator<Item = &MetricSample> {
        self.results.iter().flat_map(|r| r.samples.iter()).chain(self.operational.iter())
    }
}

/// Scrapes a fixed set of targets with one catalog.
pub struct Exporter<C: Connector> {
    registry: Registry<C>,
    catalog: Catalog,
    options: ExporterOptions,
    dsns: Vec<String>,
    extension: Option<ExtensionLoader>,
    constant_labels: Labels,
    scrapes_total: AtomicU64,
    value_errors_total: AtomicU64,
}

impl<C: Connector> Exporter<C> {
    #[must_use]
    pub fn new(connector: C, catalog: Catalog, dsns: Vec<String>, options: ExporterOptions) -> Self {
        let extension = options.extend_query_path.clone().map(ExtensionLoader::new);
        let constant_labels = options.constant_labels.iter().map(|(k, v)| (k.clone(), v.clone())).collect();

        Self {
            registry: Registry::new(connector, options.constant_labels.clone()),
            catalog,
            options,
            dsns,
            extension,
            constant_labels,
            scrapes_total: AtomicU64::new(0),
            value_errors_total: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn dsns(&self) -> &[String] {
        &self.dsns
    }

    #[must_use]
    pub const fn registry(&self) -> &Registry<C> {
        &self.registry
    }

    /// Outcome of the most recent extension document load, if a document is configured.
    #[must_use]
    pub fn extension_status(&self) -> Option<LoadStatus> {
        self.extension.as_ref().and_then(ExtensionLoader::status)
    }

    /// Run one scrape cycle over every effective target.
    pub async fn scrape(&self) -> Snapshot {
        let start = Instant::now();

        let targets = if self.options.auto_discover_databases {
            discover_databases(&self.registry, &self.dsns, &self.options.exclude_databases).await
        } else {
            self.dsns.clone()
        };

        let mut results = Vec::with_capacity(targets.len());
        for dsn in &targets {
            results.push(self.scrape_one(dsn).await);
        }

        let connected = results.iter().filter(|r| r.connected()).count();
        let failed = results.iter().any(ScrapeResult::has_errors);
        let value_errors: usize = results.iter().map(|r| r.value_errors.len()).sum();

        let scrapes_total = self.scrapes_total.fetch_add(1, Ordering::Relaxed) + 1;
        let value_errors_total = self.value_errors_total.fetch_add(value_errors as u64, Ordering::Relaxed) + value_errors as u64;

        log::debug!(
            target: LOG_TARGET,
            "Scraped {} target(s), {connected} connected, {value_errors} value error(s)",
            targets.len()
        );

        let mut operational = vec![
            self.operational(
                "pg_up",
                "Whether the last scrape of metrics from PostgreSQL was able to connect to the server (1 for yes, 0 for no).",
                ValueKind::Gauge,
                bool_value(connected > 0),
            ),
            self.operational(
                "pg_exporter_last_scrape_error",
                "Whether the last scrape of metrics from PostgreSQL resulted in an error (1 for error, 0 for success).",
                ValueKind::Gauge,
                bool_value(failed),
            ),
            self.operational(
                "pg_exporter_last_scrape_duration_seconds",
                "Duration of the last scrape of metrics from PostgreSQL.",
                ValueKind::Gauge,
                start.elapsed().as_secs_f64(),
            ),
            self.operational(
                "pg_exporter_scrapes_total",
                "Total number of times PostgreSQL was scraped for metrics.",
                ValueKind::Counter,
                counter_value(scrapes_total),
            ),
            self.operational(
                "pg_exporter_value_errors_total",
                "Total number of column values that could not be converted to a sample.",
                ValueKind::Counter,
                counter_value(value_errors_total),
            ),
        ];

        if let Some(status) = self.extension_status() {
            operational.push(
                self.operational(
                    "pg_exporter_user_queries_load_error",
                    "Whether the user queries file was loaded and parsed successfully (1 for error, 0 for success).",
                    ValueKind::Gauge,
                    bool_value(status.failed),
                )
                .with_label("filename", status.path.as_str())
                .with_label("hashsum", status.hashsum),
            );
        }

        Snapshot { results, operational }
    }

    /// Scrape one target. Failures are recorded in the result, never returned.
    pub async fn scrape_one(&self, dsn: &str) -> ScrapeResult {
        let mut result = ScrapeResult::new(loggable_dsn(dsn));

        let connection = match self.registry.get_or_create(dsn).await {
            Ok(connection) => connection,
            Err(e) => {
                log::error!(target: LOG_TARGET, "Error opening connection to database ({}): {e}", result.target);
                result.connection_error = Some(e);
                return result;
            }
        };

        match refresh_maps(&connection, &self.catalog, &self.options, self.extension.as_ref()).await {
            Ok(Some(sample)) => result.samples.push(sample),
            Ok(None) => {}
            Err(e) => {
                log::error!(target: LOG_TARGET, "Error refreshing maps for '{}': {e}", connection.target());
                result.version_error = Some(e);
            }
        }

        if !self.options.disable_settings_metrics {
            match collect_settings(connection.session(), connection.labels()).await {
                Ok((samples, errors)) => {
                    result.samples.extend(samples);
                    result.value_errors.extend(errors);
                }
                Err(error) => {
                    log::error!(target: LOG_TARGET, "Error retrieving settings from '{}': {error}", connection.target());
                    result.namespace_errors.push(NamespaceError {
                        namespace: SETTINGS_NAMESPACE.to_string(),
                        error,
                    });
                }
            }
        }

        let state = connection.state().read().await;
        for (namespace, map) in state.metric_map.iter() {
            let Some(sql) = state.overrides.query_for(namespace).sql(namespace) else {
                log::debug!(target: LOG_TARGET, "Collecting namespace {namespace} skipped: disabled on this version");
                continue;
            };

            let view = View {
                namespace,
                map,
                labels: connection.labels(),
                emit_untyped: self.options.emit_untyped_columns,
            };

            if let Err(error) = view.scrape(connection.session(), &sql, &mut result).await {
                log::error!(target: LOG_TARGET, "Error scraping namespace {namespace} on '{}': {error}", connection.target());
                result.namespace_errors.push(NamespaceError {
                    namespace: namespace.to_string(),
                    error,
                });
            }
        }

        result
    }

    /// Close every cached connection.
    pub async fn close(&self) {
        self.registry.close_all().await;
    }

    fn operational(&self, name: &str, help: &str, kind: ValueKind, value: f64) -> MetricSample {
        MetricSample::new(name, help, kind, value).with_labels(&self.constant_labels)
    }
}

impl<C: Connector + Debug> Debug for Exporter<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Exporter")
            .field("registry", &self.registry)
            .field("options", &self.options)
            .field("dsns", &self.dsns.iter().map(|dsn| loggable_dsn(dsn)).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// One view of one target during a pass.
struct View<'a> {
    namespace: &'a str,
    map: &'a NamespaceMap,
    labels: &'a Labels,
    emit_untyped: bool,
}

impl View<'_> {
    /// Run the view's query and convert every row.
    ///
    /// An error means the whole view failed. Samples of rows read before the failure are kept.
    async fn scrape<S: Session>(&self, session: &S, sql: &str, out: &mut ScrapeResult) -> Result<()> {
        let rows = session
            .query(sql)
            .await
            .into_app_err_with(|| format!("running query on namespace {}", self.namespace))?;

        let label_positions: Vec<_> = self
            .map
            .labels()
            .iter()
            .map(|label| rows.columns.iter().position(|column| column == label))
            .collect();

        for row in &rows.rows {
            if row.len() != rows.columns.len() {
                bail!(
                    "row of namespace {} has {} values for {} columns",
                    self.namespace,
                    row.len(),
                    rows.columns.len()
                );
            }

            let mut labels = self.labels.clone();
            for (label, position) in self.map.labels().iter().zip(&label_positions) {
                let value = position
                    .and_then(|i| row.get(i))
                    .and_then(|value| to_label(value).ok())
                    .unwrap_or_default();
                labels.push((label.clone(), value));
            }

            for (column, value) in rows.columns.iter().zip(row) {
                match self.map.column(column) {
                    Some(descriptor) if descriptor.is_discard() => {}
                    Some(descriptor) => match descriptor.convert(value) {
                        Ok(v) => out
                            .samples
                            .push(MetricSample::new(descriptor.name(), descriptor.help(), descriptor.kind(), v).with_labels(&labels)),
                        Err(CoercionError::Unknown) => {
                            log::debug!(target: LOG_TARGET, "Value of {}.{column} is unknown", self.namespace);
                        }
                        Err(error) => self.value_error(column, error, out),
                    },
                    None if !self.emit_untyped => {}
                    None => match to_f64(value) {
                        Ok(v) => out.samples.push(
                            MetricSample::new(
                                format!("{}_{column}", self.namespace),
                                format!("Unknown metric from {}", self.namespace),
                                ValueKind::Untyped,
                                v,
                            )
                            .with_labels(&labels),
                        ),
                        Err(error) => self.value_error(column, error, out),
                    },
                }
            }
        }

        Ok(())
    }

    fn value_error(&self, column: &str, error: CoercionError, out: &mut ScrapeResult) {
        log::warn!(target: LOG_TARGET, "Unexpected error parsing column {}.{column}: {error}", self.namespace);
        out.value_errors.push(ValueError::new(self.namespace, column, error));
    }
}

const fn bool_value(flag: bool) -> f64 {
    if flag { 1.0 } else { 0.0 }
}

#[expect(clippy::cast_precision_loss, reason = "counters stay far below 2^52")]
const fn counter_value(count: u64) -> f64 {
    count as f64
}
