#![doc(hidden)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core library for pgx-exporter
//!
//! This library holds all functionality of the pgx-exporter tool, which samples a
//! PostgreSQL server's introspection views and republishes them as metric samples
//! whose shape adapts to the server's version.
//!
//! # Module Organization
//!
//! - [`commands`]: Command-line interface and orchestration
//! - [`values`]: Row values and their coercion into numbers and labels
//! - [`catalog`]: Static declarations of views, columns, and query overrides
//! - [`mapping`]: Version-aware compilation of declarations into descriptors
//! - [`exporter`]: Connections, version gating, discovery, and scraping
//! - [`reports`]: Rendering of snapshots and declaration tables

pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

#[cfg(any(debug_assertions, test))]
pub mod commands;
#[cfg(not(any(debug_assertions, test)))]
mod commands;

pub mod catalog;
pub mod exporter;
pub mod mapping;
pub mod values;

#[cfg(any(debug_assertions, test))]
pub mod reports;
#[cfg(not(any(debug_assertions, test)))]
mod reports;

pub use crate::commands::{Host, run};
