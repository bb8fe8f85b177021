use super::Host;
use crate::Result;
use crate::catalog::Catalog;
use crate::reports::generate_maps;
use clap::Parser;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct DumpMapsArgs;

/// Print the built-in declarations and their query overrides without connecting anywhere.
pub fn dump_maps<H: Host>(host: &mut H, _args: &DumpMapsArgs) -> Result<()> {
    let mut output = String::new();
    generate_maps(&Catalog::builtin(), &mut output)?;
    let _ = write!(host.output(), "{output}");
    Ok(())
}
