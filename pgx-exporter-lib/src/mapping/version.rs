use crate::Result;
use ohno::{IntoAppError, app_err};
use regex::Regex;
use semver::Version;
use std::sync::LazyLock;

// A `major[.minor[.patch]]` token directly after the leading product name.
static VERSION_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\S+\s+(\d+)(?:\.(\d+))?(?:\.(\d+))?").expect("invalid regex"));

/// Extract a server version from the text returned by `SELECT version()`.
///
/// The version must directly follow the product name. Missing minor or patch components are
/// treated as zero, and any components past the third are ignored, so `EnterpriseDB 9.6.5.10`
/// parses as `9.6.5`.
pub fn parse_version(text: &str) -> Result<Version> {
    let captures = VERSION_REGEX
        .captures(text)
        .ok_or_else(|| app_err!("no version number found in '{text}'"))?;

    let component = |index: usize| -> Result<u64> {
        captures.get(index).map_or(Ok(0), |m| {
            m.as_str()
                .parse::<u64>()
                .into_app_err_with(|| format!("version component '{}' in '{text}' is out of range", m.as_str()))
        })
    };

    Ok(Version::new(component(1)?, component(2)?, component(3)?))
}
