//! Command-line interface for pgx-exporter
//!
//! This module parses arguments, loads configuration, resolves connection strings,
//! and drives the [`exporter`](crate::exporter) and [`reports`](crate::reports)
//! modules.
//!
//! # Commands
//!
//! - **scrape**: Resolve the targets, run one or more scrape cycles, and print each
//!   snapshot to the console or as JSON
//! - **dump-maps**: Print the built-in declarations and query overrides without
//!   connecting anywhere
//! - **init**: Generate a default configuration file
//! - **validate**: Check the configuration file and the extension document
//!
//! # Configuration
//!
//! Settings come from a TOML file (`pgx-exporter.toml` by default) whose defaults
//! are embedded from `default_config.toml`. Flags of the `scrape` command override
//! the file. Connection strings come from `--data-source` flags or, failing that,
//! from the `DATA_SOURCE_*` environment variables.

mod common;
mod config;
mod datasource;
mod dump_maps;
mod host;
mod init;
mod run;
mod scrape;
mod validate;

#[cfg(debug_assertions)]
pub use config::Config;

pub use common::{ColorMode, LogLevel, OutputFormat};
pub use datasource::data_sources_from_env;
pub use dump_maps::{DumpMapsArgs, dump_maps};
pub use host::Host;
pub use init::{InitArgs, init_config};
pub use run::run;
pub use scrape::{ScrapeArgs, ScrapeLoop, process_scrape, run_scrape_loop};
pub use validate::{ValidateArgs, validate_config};
