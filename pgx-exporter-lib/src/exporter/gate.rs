use super::{Connection, ExporterOptions, ExtensionDocument, ExtensionLoader, MapState, MetricSample, Session};
use crate::Result;
use crate::catalog::Catalog;
use crate::mapping::{MetricMap, QueryOverrideMap, ValueKind, build_metric_map, parse_version, resolve_overrides};
use crate::values::to_label;
use ohno::{IntoAppError, app_err};
use semver::Version;

const LOG_TARGET: &str = "      gate";

const VERSION_QUERY: &str = "SELECT version();";

/// Name of the version presence metric.
pub const STATIC_METRIC: &str = "pg_static";

/// Probe the server version and rebuild the connection's maps when needed.
///
/// The maps are rebuilt when they were never built, when the version differs from the one
/// they were built for, or when the extension document's content changed. The rebuild
/// holds the connection's exclusive lock for its whole duration.
///
/// Returns the version presence sample, or `None` when default metrics are disabled.
/// A failure leaves the previous maps in place.
pub async fn refresh_maps<S: Session>(
    connection: &Connection<S>,
    catalog: &Catalog,
    options: &ExporterOptions,
    extension: Option<&ExtensionLoader>,
) -> Result<Option<MetricSample>> {
    let result = connection.session().query(VERSION_QUERY).await.into_app_err("querying server version")?;
    let raw = result
        .first_value()
        .and_then(|value| to_label(value).ok())
        .filter(|text| !text.is_empty())
        .ok_or_else(|| app_err!("server returned no version string"))?;
    let version = parse_version(&raw).into_app_err_with(|| format!("parsing version string '{raw}'"))?;

    if !options.disable_default_metrics && version < options.min_supported_version {
        log::warn!(
            target: LOG_TARGET,
            "PostgreSQL version {version} on '{}' is lower than the minimum supported version {}",
            connection.target(),
            options.min_supported_version
        );
    }

    let content = extension.map(ExtensionLoader::read);
    let extension_hash = content.as_ref().and_then(|c| c.hashsum().map(str::to_string));

    if needs_rebuild(&*connection.state().read().await, &version, extension_hash.as_ref()) {
        let mut state = connection.state().write().await;

        // Another pass may have rebuilt while this one waited for the lock.
        if needs_rebuild(&state, &version, extension_hash.as_ref()) {
            if state.version.as_ref() != Some(&version) {
                log::info!(target: LOG_TARGET, "Semantic version changed on '{}': {version}", connection.target());
            }

            let document = match (extension, &content) {
                (Some(loader), Some(content)) => loader.load(content),
                _ => None,
            };

            let (metric_map, overrides) = build_maps(catalog, options, &version, document.as_deref());
            *state = MapState {
                version: Some(version.clone()),
                metric_map,
                overrides,
                extension_hash,
            };
        }
    }

    if options.disable_default_metrics {
        return Ok(None);
    }

    let short_version = version.to_string();
    Ok(Some(
        MetricSample::new(STATIC_METRIC, "Version string as reported by postgres", ValueKind::Untyped, 1.0)
            .with_labels(connection.labels())
            .with_label("short_version", short_version)
            .with_label("version", raw),
    ))
}

fn needs_rebuild(state: &MapState, version: &Version, extension_hash: Option<&String>) -> bool {
    state.version.as_ref() != Some(version) || state.extension_hash.as_ref() != extension_hash
}

/// Compile the catalog for `version` and merge the extension document over it.
///
/// Extension entries replace built-in entries of the same name.
pub fn build_maps(
    catalog: &Catalog,
    options: &ExporterOptions,
    version: &Version,
    document: Option<&ExtensionDocument>,
) -> (MetricMap, QueryOverrideMap) {
    let (mut metric_map, mut overrides) = if options.disable_default_metrics {
        (MetricMap::default(), QueryOverrideMap::default())
    } else {
        (build_metric_map(catalog.namespaces(), version), resolve_overrides(catalog.overrides(), version))
    };

    let Some(document) = document else {
        return (metric_map, overrides);
    };

    let declared = document.namespaces();
    let extension_map = build_metric_map(declared.iter().map(|(name, columns)| (name.as_str(), columns.as_slice())), version);
    for (namespace, map) in extension_map {
        if metric_map.insert(namespace.as_str(), map).is_some() {
            log::info!(target: LOG_TARGET, "Overriding metric {namespace} from extension document");
        } else {
            log::info!(target: LOG_TARGET, "Adding new metric {namespace} from extension document");
        }
    }

    for (namespace, query) in document.queries() {
        if overrides.insert(namespace, query).is_some() {
            log::info!(target: LOG_TARGET, "Overriding query override for {namespace} from extension document");
        } else {
            log::info!(target: LOG_TARGET, "Adding new query override for {namespace} from extension document");
        }
    }

    (metric_map, overrides)
}
