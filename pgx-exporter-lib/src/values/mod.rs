//! Row value model and coercion into metric-safe numbers and label strings
//!
//! Every value read from an introspection view is decoded by the driver into a
//! [`SqlValue`]. Two coercions are defined over it:
//!
//! - [`to_f64`] produces a sample value. `NULL` maps to `NaN` and counts as a
//!   successful conversion, so an absent value is reported rather than flagged.
//! - [`to_label`] produces a label value. `NULL` maps to the empty string.
//!
//! Failures are reported as [`CoercionError`], which is a *soft* error: callers
//! record it and move on to the next value.

mod coercion_error;
mod sql_value;

pub use coercion_error::CoercionError;
pub use sql_value::{SqlValue, to_f64, to_label};
