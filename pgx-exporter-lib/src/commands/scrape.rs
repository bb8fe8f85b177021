use super::Host;
use super::common::{ColorMode, LogLevel, OutputFormat, init_logging};
use super::config::Config;
use super::datasource::data_sources_from_env;
use crate::Result;
use crate::catalog::Catalog;
use crate::exporter::{Connector, Exporter, PgConnector, parse_constant_labels};
use crate::reports::{generate_console, generate_json};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use core::time::Duration;
use ohno::bail;
use std::io::Write;

const LOG_TARGET: &str = "    scrape";

#[derive(Parser, Debug)]
pub struct ScrapeArgs {
    /// Connection string of a target; repeat for several targets (default is read from `DATA_SOURCE_NAME` and related variables)
    #[arg(long = "data-source", value_name = "DSN")]
    pub data_sources: Vec<String>,

    /// Path to configuration file (default is `pgx-exporter.toml`)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// How each snapshot is rendered
    #[arg(long, value_name = "FORMAT", default_value = "console")]
    pub format: OutputFormat,

    /// Keep scraping, pausing this long between cycles (e.g. `15s`)
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub interval: Option<Duration>,

    /// Stop after this many cycles
    #[arg(long, value_name = "COUNT", requires = "interval")]
    pub count: Option<u64>,

    /// Scrape every database on each target
    #[arg(long, env = "PG_EXPORTER_AUTO_DISCOVER_DATABASES")]
    pub auto_discover_databases: bool,

    /// Databases that discovery never adds (comma-separated)
    #[arg(long, value_name = "NAMES", value_delimiter = ',', env = "PG_EXPORTER_EXCLUDE_DATABASES")]
    pub exclude_databases: Vec<String>,

    /// Skip the built-in view declarations
    #[arg(long, env = "PG_EXPORTER_DISABLE_DEFAULT_METRICS")]
    pub disable_default_metrics: bool,

    /// Skip the `pg_settings` gauges
    #[arg(long, env = "PG_EXPORTER_DISABLE_SETTINGS_METRICS")]
    pub disable_settings_metrics: bool,

    /// Drop view columns that have no declaration instead of emitting them as untyped samples
    #[arg(long)]
    pub no_untyped_columns: bool,

    /// YAML document with additional view declarations and queries
    #[arg(long, value_name = "PATH", env = "PG_EXPORTER_EXTEND_QUERY_PATH")]
    pub extend_query_path: Option<Utf8PathBuf>,

    /// Labels attached to every sample (format: `name=value,name=value`)
    #[arg(long, value_name = "LABELS", env = "PG_EXPORTER_CONSTANT_LABELS")]
    pub constant_labels: Option<String>,

    /// Control when to use colored output
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    pub color: ColorMode,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    pub log_level: LogLevel,
}

/// How the scrape loop runs and renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeLoop {
    pub format: OutputFormat,
    pub use_colors: bool,

    /// Pause between cycles. `None` runs a single cycle.
    pub interval: Option<Duration>,

    /// Number of cycles to run when an interval is set. `None` runs forever.
    pub count: Option<u64>,
}

pub async fn process_scrape<H: Host>(host: &mut H, args: &ScrapeArgs) -> Result<()> {
    init_logging(args.log_level);

    let config = apply_overrides(Config::load(Utf8Path::new("."), args.config.as_ref())?, args)?;

    let dsns = if args.data_sources.is_empty() {
        data_sources_from_env(|name| std::env::var(name).ok())?
    } else {
        args.data_sources.clone()
    };

    if dsns.is_empty() {
        let _ = writeln!(
            host.error(),
            "❌ No data source configured: pass --data-source or set DATA_SOURCE_NAME or DATA_SOURCE_URI"
        );
        host.exit(1);
        bail!("no data source configured");
    }

    log::info!(target: LOG_TARGET, "Scraping {} configured target(s)", dsns.len());

    let connector = PgConnector::new(config.pool_max_size, config.connect_timeout);
    let exporter = Exporter::new(connector, Catalog::builtin(), dsns, config.exporter_options());

    let scrape_loop = ScrapeLoop {
        format: args.format,
        use_colors: args.color.use_colors(),
        interval: args.interval,
        count: args.count,
    };

    let result = run_scrape_loop(host, &exporter, scrape_loop).await;
    exporter.close().await;
    result
}

/// Scrape and render snapshots until the loop's cycle budget is spent.
pub async fn run_scrape_loop<C: Connector, H: Host>(host: &mut H, exporter: &Exporter<C>, scrape_loop: ScrapeLoop) -> Result<()> {
    let mut cycles = 0_u64;

    loop {
        let snapshot = exporter.scrape().await;

        let mut output = String::new();
        match scrape_loop.format {
            OutputFormat::Console => generate_console(&snapshot, scrape_loop.use_colors, &mut output)?,
            OutputFormat::Json => {
                generate_json(&snapshot, &mut output)?;
                output.push('\n');
            }
        }

        let _ = write!(host.output(), "{output}");
        cycles += 1;

        let Some(interval) = scrape_loop.interval else {
            return Ok(());
        };

        if scrape_loop.count.is_some_and(|count| cycles >= count) {
            return Ok(());
        }

        tokio::time::sleep(interval).await;
    }
}

fn apply_overrides(mut config: Config, args: &ScrapeArgs) -> Result<Config> {
    config.auto_discover_databases |= args.auto_discover_databases;
    config.disable_default_metrics |= args.disable_default_metrics;
    config.disable_settings_metrics |= args.disable_settings_metrics;

    if args.no_untyped_columns {
        config.emit_untyped_columns = false;
    }

    if !args.exclude_databases.is_empty() {
        config.exclude_databases.clone_from(&args.exclude_databases);
    }

    if let Some(path) = &args.extend_query_path {
        config.extend_query_path = Some(path.clone());
    }

    if let Some(labels) = &args.constant_labels {
        config.constant_labels.extend(parse_constant_labels(labels));
    }

    config.validate()?;
    Ok(config)
}
