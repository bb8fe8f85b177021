//! Command dispatch logic for pgx-exporter

use super::{DumpMapsArgs, InitArgs, ScrapeArgs, ValidateArgs, dump_maps, init_config, process_scrape, validate_config};
use crate::{Host, Result};
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "pgx-exporter", author, version, long_about = None)]
#[command(about = "Publish PostgreSQL introspection views as versioned metrics")]
#[command(styles = CLAP_STYLES)]
struct Args {
    #[command(subcommand)]
    command: ExporterSubcommand,
}

#[derive(Subcommand, Debug)]
enum ExporterSubcommand {
    /// Scrape the configured targets and print the metric snapshot
    Scrape(Box<ScrapeArgs>),
    /// Print the built-in declarations and query overrides
    DumpMaps(DumpMapsArgs),
    /// Generate a default configuration file
    Init(InitArgs),
    /// Validate a configuration file and extension document
    Validate(ValidateArgs),
}

/// Dispatch command-line arguments to the appropriate handler
///
/// This function parses the command-line arguments and executes the corresponding
/// subcommand. It's designed to be called from main.rs with the program arguments.
///
/// # Arguments
///
/// * `args` - An iterator of command-line arguments (typically from `std::env::args()`)
///
/// # Errors
///
/// Returns an error if command parsing fails or if the executed command fails
pub async fn run<I, T, H>(host: &mut H, args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
    H: Host,
{
    let args = Args::parse_from(args);

    match &args.command {
        ExporterSubcommand::Scrape(scrape_args) => process_scrape(host, scrape_args).await,
        ExporterSubcommand::DumpMaps(dump_args) => dump_maps(host, dump_args),
        ExporterSubcommand::Init(init_args) => init_config(host, init_args),
        ExporterSubcommand::Validate(validate_args) => validate_config(host, validate_args),
    }
}
