use crate::Result;
use core::fmt::{Display, Formatter};
use ohno::{IntoAppError, app_err};
use regex::Regex;
use std::sync::LazyLock;
use tokio_postgres::config::Host;

/// Host reported when a connection string names no host; the driver then connects through a local socket.
pub const DEFAULT_SOCKET_HOST: &str = "/tmp";

/// Port reported when a connection string names no port.
pub const DEFAULT_PORT: u16 = 5432;

const PASSWORD_REMOVED: &str = "PASSWORD_REMOVED";

static KV_PASSWORD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(password\s*=\s*)('(?:[^'\\]|\\.)*'|\S+)").expect("invalid regex"));

static KV_DBNAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|\s)dbname\s*=\s*('(?:[^'\\]|\\.)*'|\S+)").expect("invalid regex"));

/// One database endpoint, identified by its connection string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    dsn: String,
    fingerprint: String,
}

impl Target {
    /// Parse a connection string, in either URL or `key=value` form.
    pub fn parse(dsn: impl Into<String>) -> Result<Self> {
        let dsn = dsn.into();
        let fingerprint = fingerprint(&dsn)?;
        Ok(Self { dsn, fingerprint })
    }

    #[must_use]
    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    /// Normalized `host:port` of the target.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// The connection string with any password masked.
    #[must_use]
    pub fn loggable(&self) -> String {
        loggable_dsn(&self.dsn)
    }

    pub fn pg_config(&self) -> Result<tokio_postgres::Config> {
        parse_config(&self.dsn)
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.fingerprint)
    }
}

fn parse_config(dsn: &str) -> Result<tokio_postgres::Config> {
    dsn.parse::<tokio_postgres::Config>()
        .into_app_err_with(|| format!("cannot parse '{}'", loggable_dsn(dsn)))
}

/// Derive the `host:port` fingerprint of a connection string.
///
/// A missing host becomes [`DEFAULT_SOCKET_HOST`] and a missing port becomes [`DEFAULT_PORT`].
pub fn fingerprint(dsn: &str) -> Result<String> {
    let config = parse_config(dsn)?;

    let host = match config.get_hosts().first() {
        None => DEFAULT_SOCKET_HOST.to_string(),
        Some(Host::Tcp(name)) => name.clone(),
        #[cfg(unix)]
        Some(Host::Unix(path)) => path.display().to_string(),
    };

    let port = config.get_ports().first().copied().unwrap_or(DEFAULT_PORT);

    if host.is_empty() {
        return Err(app_err!("connection string '{}' has an empty host", loggable_dsn(dsn)));
    }

    if port == 0 {
        return Err(app_err!("connection string '{}' has an invalid port 0", loggable_dsn(dsn)));
    }

    Ok(format!("{host}:{port}"))
}

fn is_url(dsn: &str) -> bool {
    dsn.starts_with("postgres://") || dsn.starts_with("postgresql://")
}

/// Mask the password of a connection string so it can be logged.
#[must_use]
pub fn loggable_dsn(dsn: &str) -> String {
    if is_url(dsn) {
        return match url::Url::parse(dsn) {
            Ok(mut parsed) => {
                if parsed.password().is_some() {
                    let _ = parsed.set_password(Some(PASSWORD_REMOVED));
                }
                parsed.to_string()
            }
            Err(_) => "could not parse connection string".to_string(),
        };
    }

    KV_PASSWORD_REGEX
        .replace_all(dsn, format!("${{1}}{PASSWORD_REMOVED}"))
        .into_owned()
}

/// Build a connection string identical to `dsn` except for the database it selects.
pub fn with_database(dsn: &str, database: &str) -> Result<String> {
    if is_url(dsn) {
        let mut parsed = url::Url::parse(dsn).into_app_err_with(|| format!("cannot parse '{}'", loggable_dsn(dsn)))?;
        parsed.set_path(&format!("/{database}"));
        return Ok(parsed.to_string());
    }

    let value = quote_kv_value(database);
    if KV_DBNAME_REGEX.is_match(dsn) {
        let replaced = KV_DBNAME_REGEX.replace(dsn, |caps: &regex::Captures<'_>| format!("{}dbname={value}", &caps[1]));
        return Ok(replaced.into_owned());
    }

    let dsn = dsn.trim_end();
    if dsn.is_empty() {
        Ok(format!("dbname={value}"))
    } else {
        Ok(format!("{dsn} dbname={value}"))
    }
}

fn quote_kv_value(value: &str) -> String {
    if !value.is_empty() && !value.contains(|c: char| c.is_whitespace() || c == '\'' || c == '\\') {
        return value.to_string();
    }

    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}
