use super::common::{format_labels, format_value};
use crate::Result;
use crate::exporter::{MetricSample, ScrapeResult, Snapshot};
use core::fmt::Write;
use owo_colors::OwoColorize;

pub fn generate<W: Write>(snapshot: &Snapshot, use_colors: bool, writer: &mut W) -> Result<()> {
    for result in &snapshot.results {
        write_result(result, use_colors, writer)?;
        writeln!(writer)?;
    }

    if use_colors {
        writeln!(writer, "{}", "Exporter".bold())?;
    } else {
        writeln!(writer, "Exporter")?;
    }

    write_samples(&snapshot.operational, use_colors, writer)
}

fn write_result<W: Write>(result: &ScrapeResult, use_colors: bool, writer: &mut W) -> Result<()> {
    if use_colors {
        writeln!(writer, "{}", result.target.bold())?;
    } else {
        writeln!(writer, "{}", result.target)?;
    }

    if let Some(e) = &result.connection_error {
        write_failure(writer, use_colors, &format!("connection failed: {e}"))?;
        return Ok(());
    }

    if let Some(e) = &result.version_error {
        write_failure(writer, use_colors, &format!("version check failed: {e}"))?;
    }

    for error in &result.namespace_errors {
        write_failure(writer, use_colors, &format!("namespace {} failed: {}", error.namespace, error.error))?;
    }

    for error in &result.value_errors {
        let line = format!("  ⚠ {error}");
        if use_colors {
            writeln!(writer, "{}", line.yellow())?;
        } else {
            writeln!(writer, "{line}")?;
        }
    }

    write_samples(&result.samples, use_colors, writer)
}

fn write_failure<W: Write>(writer: &mut W, use_colors: bool, message: &str) -> Result<()> {
    let line = format!("  🗙 {message}");
    if use_colors {
        writeln!(writer, "{}", line.red())?;
    } else {
        writeln!(writer, "{line}")?;
    }

    Ok(())
}

fn write_samples<W: Write>(samples: &[MetricSample], use_colors: bool, writer: &mut W) -> Result<()> {
    for sample in samples {
        let labels = format_labels(&sample.labels);
        let value = format_value(sample.value);
        if use_colors {
            writeln!(writer, "  {}{labels} {value}", sample.name.cyan())?;
        } else {
            writeln!(writer, "  {}{labels} {value}", sample.name)?;
        }
    }

    Ok(())
}
