use crate::Result;
use crate::exporter::{DEFAULT_MIN_SUPPORTED_VERSION, ExporterOptions, SERVER_LABEL};
use camino::{Utf8Path, Utf8PathBuf};
use core::time::Duration;
use ohno::{IntoAppError, app_err};
use regex::Regex;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::sync::LazyLock;

/// The default configuration TOML content, embedded from `default_config.toml`
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../default_config.toml");

/// File looked up in the working directory when no configuration path is given
pub const DEFAULT_CONFIG_FILE: &str = "pgx-exporter.toml";

static LABEL_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("invalid regex"));

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Servers older than this version get a compatibility warning
    #[serde(default = "default_min_supported_version")]
    pub min_supported_version: Version,

    /// Scrape every database of each server, not just the configured ones
    #[serde(default)]
    pub auto_discover_databases: bool,

    /// Databases never added by discovery
    #[serde(default)]
    pub exclude_databases: Vec<String>,

    /// Skip the built-in view declarations
    #[serde(default)]
    pub disable_default_metrics: bool,

    /// Skip the `pg_settings` gauges
    #[serde(default)]
    pub disable_settings_metrics: bool,

    /// Emit columns without a declaration as untyped samples
    #[serde(default = "default_true")]
    pub emit_untyped_columns: bool,

    /// Labels attached to every sample
    #[serde(default)]
    pub constant_labels: BTreeMap<String, String>,

    /// YAML document with additional view declarations and queries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extend_query_path: Option<Utf8PathBuf>,

    /// Upper bound of pooled connections per target
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: usize,

    /// How long to wait for a connection to be established
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,
}

const fn default_min_supported_version() -> Version {
    DEFAULT_MIN_SUPPORTED_VERSION
}

const fn default_true() -> bool {
    true
}

const fn default_pool_max_size() -> usize {
    3
}

const fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Config {
    /// Load configuration from a file or use defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load(base_dir: &Utf8Path, config_path: Option<&Utf8PathBuf>) -> Result<Self> {
        let (final_path, text) = if let Some(path) = config_path {
            let text = fs::read_to_string(path).into_app_err_with(|| format!("reading pgx-exporter configuration file '{path}'"))?;
            (path.clone(), text)
        } else {
            let path = base_dir.join(DEFAULT_CONFIG_FILE);
            match fs::read_to_string(&path) {
                Ok(text) => (path, text),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    // No config file found, use defaults
                    return Ok(Self::default());
                }
                Err(e) => return Err(e).into_app_err_with(|| format!("reading pgx-exporter configuration file '{path}'")),
            }
        };

        let config: Self = toml::from_str(&text).into_app_err_with(|| format!("parsing configuration file '{final_path}'"))?;
        config.validate()?;

        Ok(config)
    }

    /// Save the default configuration to a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save_default(output_path: &Utf8Path) -> Result<()> {
        fs::write(output_path, DEFAULT_CONFIG_TOML).into_app_err_with(|| format!("writing default configuration to {output_path}"))?;
        Ok(())
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error if the pool size is zero or a constant label name is unusable
    pub fn validate(&self) -> Result<()> {
        if self.pool_max_size == 0 {
            return Err(app_err!("pool_max_size must be at least 1"));
        }

        for name in self.constant_labels.keys() {
            if !LABEL_NAME_REGEX.is_match(name) {
                return Err(app_err!("constant label name '{name}' is not a valid label name"));
            }

            if name == SERVER_LABEL {
                return Err(app_err!("constant label name '{name}' is reserved"));
            }
        }

        Ok(())
    }

    /// The scrape options this configuration describes.
    #[must_use]
    pub fn exporter_options(&self) -> ExporterOptions {
        ExporterOptions {
            disable_default_metrics: self.disable_default_metrics,
            disable_settings_metrics: self.disable_settings_metrics,
            auto_discover_databases: self.auto_discover_databases,
            exclude_databases: self.exclude_databases.clone(),
            emit_untyped_columns: self.emit_untyped_columns,
            min_supported_version: self.min_supported_version.clone(),
            constant_labels: self.constant_labels.clone(),
            extend_query_path: self.extend_query_path.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG_TOML).expect("default_config.toml should be valid TOML that deserializes to Config")
    }
}
