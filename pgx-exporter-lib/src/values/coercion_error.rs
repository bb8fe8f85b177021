use core::fmt::{Display, Formatter};

/// A per-value conversion failure.
///
/// These never abort row or view processing; they are collected and logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoercionError {
    /// Text that could not be parsed into the expected shape.
    Unparsable { text: String },

    /// A mapped-enum value with no entry in the column's value table.
    Unmapped { text: String },

    /// The source reported the value as unknown (e.g. the `-1` duration sentinel).
    Unknown,

    /// The value's type cannot be used for this conversion.
    UnsupportedType { type_name: &'static str },
}

impl Display for CoercionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Unparsable { text } => write!(f, "could not parse '{text}'"),
            Self::Unmapped { text } => write!(f, "no mapping for value '{text}'"),
            Self::Unknown => write!(f, "value is unknown"),
            Self::UnsupportedType { type_name } => write!(f, "unsupported value type '{type_name}'"),
        }
    }
}

impl core::error::Error for CoercionError {}
