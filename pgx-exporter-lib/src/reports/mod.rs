//! Rendering of scrape snapshots and declaration tables
//!
//! Two renderings of a [`Snapshot`](crate::exporter::Snapshot) are provided, each
//! reached through a `generate` function writing to any [`core::fmt::Write`]:
//!
//! - **Console**: one block per target listing its failures and samples, with
//!   optional ANSI colors
//! - **JSON**: machine-readable structured data
//!
//! A third generator dumps a [`Catalog`](crate::catalog::Catalog) together with its
//! override table. It performs no network I/O and backs the `dump-maps` command.
//!
//! Neither rendering is a metrics exposition format; they exist for inspection.

mod common;
mod console;
mod json;
mod maps;

pub use console::generate as generate_console;
pub use json::generate as generate_json;
pub use maps::generate as generate_maps;
