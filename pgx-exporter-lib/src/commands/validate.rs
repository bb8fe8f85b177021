use super::Host;
use super::config::Config;
use crate::Result;
use crate::catalog::Catalog;
use crate::exporter::{ExporterOptions, ExtensionDocument, build_maps};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use ohno::IntoAppError;
use std::fs;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file (default is `pgx-exporter.toml`)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Extension document to check (default is the one named by the configuration)
    #[arg(long, value_name = "PATH")]
    pub extend_query_path: Option<Utf8PathBuf>,
}

/// Validates a configuration file and, if one is named, the extension document
///
/// # Errors
///
/// Returns an error if the config file cannot be loaded or parsed, or if the extension document is unusable
fn validate_config_inner(base_dir: &Utf8Path, config_path: Option<&Utf8PathBuf>, extension: Option<&Utf8PathBuf>) -> Result<Option<Utf8PathBuf>> {
    let config = Config::load(base_dir, config_path)?;

    let Some(path) = extension.or(config.extend_query_path.as_ref()) else {
        return Ok(None);
    };

    let text = fs::read_to_string(path).into_app_err_with(|| format!("reading extension document '{path}'"))?;
    let document = ExtensionDocument::parse(&text).into_app_err_with(|| format!("validating extension document '{path}'"))?;

    // Compile the document against the minimum version to surface declaration problems early.
    let options = ExporterOptions {
        disable_default_metrics: config.disable_default_metrics,
        ..ExporterOptions::default()
    };
    let _ = build_maps(&Catalog::builtin(), &options, &config.min_supported_version, Some(&document));

    Ok(Some(path.clone()))
}

pub fn validate_config<H: Host>(host: &mut H, args: &ValidateArgs) -> Result<()> {
    let base_dir = Utf8PathBuf::from(".");
    let config_path = args.config.as_ref();

    match validate_config_inner(&base_dir, config_path, args.extend_query_path.as_ref()) {
        Ok(extension) => {
            let _ = writeln!(host.output(), "Configuration file is valid");
            if let Some(path) = config_path {
                let _ = writeln!(host.output(), "Config file: {path}");
            } else {
                let _ = writeln!(host.output(), "Using default configuration (no config file given)");
            }

            if let Some(path) = extension {
                let _ = writeln!(host.output(), "Extension document: {path}");
            }

            Ok(())
        }
        Err(e) => {
            let _ = writeln!(host.error(), "❌ Configuration validation failed: {e}");
            host.exit(1);
            Err(e)
        }
    }
}
