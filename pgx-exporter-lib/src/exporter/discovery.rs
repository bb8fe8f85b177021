use super::{Connector, Registry, Session, loggable_dsn, with_database};
use crate::Result;
use crate::values::to_label;
use ohno::IntoAppError;
use std::collections::HashSet;

const LOG_TARGET: &str = " discovery";

const DATABASES_QUERY: &str = "SELECT datname FROM pg_database WHERE datallowconn = true AND datistemplate = false";

/// Expand each base connection string into one connection string per reachable database.
///
/// Base strings are always kept. Databases named in `exclude` are skipped. A failure on
/// one base string is logged and does not affect the others. The result has no
/// duplicates and keeps first-seen order.
pub async fn discover_databases<C: Connector>(registry: &Registry<C>, bases: &[String], exclude: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut result = Vec::new();
    let mut push = |dsn: String| {
        if seen.insert(dsn.clone()) {
            result.push(dsn);
        }
    };

    for base in bases {
        push(base.clone());

        let names = match list_databases(registry, base).await {
            Ok(names) => names,
            Err(e) => {
                log::error!(target: LOG_TARGET, "Error discovering databases ({}): {e}", loggable_dsn(base));
                continue;
            }
        };

        for name in names {
            if exclude.contains(&name) {
                log::debug!(target: LOG_TARGET, "Database is being excluded: {name}");
                continue;
            }

            match with_database(base, &name) {
                Ok(dsn) => push(dsn),
                Err(e) => log::error!(target: LOG_TARGET, "Unable to derive connection string for database '{name}': {e}"),
            }
        }
    }

    result
}

async fn list_databases<C: Connector>(registry: &Registry<C>, dsn: &str) -> Result<Vec<String>> {
    let connection = registry.get_or_create(dsn).await?;
    let result = connection
        .session()
        .query(DATABASES_QUERY)
        .await
        .into_app_err("retrieving databases")?;

    Ok(result
        .rows
        .iter()
        .filter_map(|row| row.first())
        .filter_map(|value| to_label(value).ok())
        .filter(|name| !name.is_empty())
        .collect())
}
