use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// How a column of an introspection view is treated when it is mapped to metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, Deserialize, Serialize)]
pub enum Role {
    /// Ignore this column
    #[strum(serialize = "DISCARD")]
    #[serde(rename = "DISCARD")]
    Discard,

    /// Use this column as a label
    #[strum(serialize = "LABEL")]
    #[serde(rename = "LABEL")]
    Label,

    /// Use this column as a counter
    #[strum(serialize = "COUNTER")]
    #[serde(rename = "COUNTER")]
    Counter,

    /// Use this column as a gauge
    #[strum(serialize = "GAUGE")]
    #[serde(rename = "GAUGE")]
    Gauge,

    /// Use this column with a value table that maps text to numbers
    #[strum(serialize = "MAPPEDMETRIC")]
    #[serde(rename = "MAPPEDMETRIC")]
    MappedEnum,

    /// Parse this column as a textual duration and report milliseconds
    #[strum(serialize = "DURATION")]
    #[serde(rename = "DURATION")]
    Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_display_and_parse_agree() {
        for role in Role::iter() {
            assert_eq!(Role::from_str(&role.to_string()).unwrap(), role);
        }
    }

    #[test]
    fn test_mapped_enum_name() {
        assert_eq!(Role::MappedEnum.to_string(), "MAPPEDMETRIC");
        assert!(Role::from_str("mapped").is_err());
    }
}
