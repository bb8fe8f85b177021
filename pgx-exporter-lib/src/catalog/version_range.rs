use crate::Result;
use core::fmt::{Display, Formatter};
use core::str::FromStr;
use ohno::{IntoAppError, app_err};
use semver::Version;

/// Comparison operator of a single version bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl Op {
    const fn symbol(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "=",
        }
    }
}

/// One bound of a version range, such as `>=9.2.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Comparator {
    pub op: Op,
    pub version: Version,
}

impl Comparator {
    #[must_use]
    pub const fn new(op: Op, major: u64, minor: u64, patch: u64) -> Self {
        Self {
            op,
            version: Version::new(major, minor, patch),
        }
    }

    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        let ord = cmp_release(version, &self.version);
        match self.op {
            Op::Lt => ord.is_lt(),
            Op::Le => ord.is_le(),
            Op::Gt => ord.is_gt(),
            Op::Ge => ord.is_ge(),
            Op::Eq => ord.is_eq(),
        }
    }
}

impl Display for Comparator {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}{}", self.op.symbol(), self.version)
    }
}

// Server versions never carry pre-release or build metadata, so only the release triple is compared.
fn cmp_release(a: &Version, b: &Version) -> core::cmp::Ordering {
    (a.major, a.minor, a.patch).cmp(&(b.major, b.minor, b.patch))
}

/// A conjunction of version bounds, written as `>=9.2.0 <10.0.0`.
///
/// Ranges are plain data so they can be compared and printed; [`VersionRange::matches`]
/// is the only interpretation of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionRange {
    comparators: Vec<Comparator>,
}

impl VersionRange {
    #[must_use]
    pub fn new(comparators: impl IntoIterator<Item = Comparator>) -> Self {
        Self {
            comparators: comparators.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn comparators(&self) -> &[Comparator] {
        &self.comparators
    }

    /// Returns `true` when every bound accepts the version. An empty range accepts everything.
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        self.comparators.iter().all(|c| c.matches(version))
    }
}

impl Display for VersionRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        for (i, c) in self.comparators.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl FromStr for VersionRange {
    type Err = ohno::AppError;

    fn from_str(s: &str) -> Result<Self> {
        let comparators = s.split_whitespace().map(parse_comparator).collect::<Result<Vec<_>>>()?;
        if comparators.is_empty() {
            return Err(app_err!("empty version range"));
        }

        Ok(Self { comparators })
    }
}

fn parse_comparator(text: &str) -> Result<Comparator> {
    let (op, rest) = if let Some(rest) = text.strip_prefix(">=") {
        (Op::Ge, rest)
    } else if let Some(rest) = text.strip_prefix("<=") {
        (Op::Le, rest)
    } else if let Some(rest) = text.strip_prefix('>') {
        (Op::Gt, rest)
    } else if let Some(rest) = text.strip_prefix('<') {
        (Op::Lt, rest)
    } else if let Some(rest) = text.strip_prefix('=') {
        (Op::Eq, rest)
    } else {
        (Op::Eq, text)
    };

    let mut parts = [0_u64; 3];
    let mut count = 0;
    for part in rest.split('.') {
        if count == parts.len() {
            return Err(app_err!("too many components in version bound '{text}'"));
        }
        parts[count] = part.parse::<u64>().into_app_err_with(|| format!("invalid version bound '{text}'"))?;
        count += 1;
    }

    Ok(Comparator::new(op, parts[0], parts[1], parts[2]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(s: &str) -> VersionRange {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        let r = range(">=9.2.0 <10.0.0");
        assert_eq!(r.comparators().len(), 2);
        assert_eq!(r.comparators()[0], Comparator::new(Op::Ge, 9, 2, 0));
        assert_eq!(r.to_string(), ">=9.2.0 <10.0.0");
    }

    #[test]
    fn test_short_versions_are_padded() {
        assert_eq!(range("<9.2").to_string(), "<9.2.0");
        assert_eq!(range(">10").to_string(), ">10.0.0");
    }

    #[test]
    fn test_matches() {
        let r = range(">=9.2.0 <10.0.0");
        assert!(r.matches(&Version::new(9, 2, 0)));
        assert!(r.matches(&Version::new(9, 6, 5)));
        assert!(!r.matches(&Version::new(10, 0, 0)));
        assert!(!r.matches(&Version::new(9, 1, 9)));
    }

    #[test]
    fn test_strictly_greater() {
        let r = range(">0.0.1");
        assert!(!r.matches(&Version::new(0, 0, 1)));
        assert!(r.matches(&Version::new(0, 0, 2)));
    }

    #[test]
    fn test_invalid_ranges() {
        assert!("".parse::<VersionRange>().is_err());
        assert!(">=a.b".parse::<VersionRange>().is_err());
        assert!(">=1.2.3.4".parse::<VersionRange>().is_err());
    }
}
