//! Version strings and version ranges.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An artifact version string.
///
/// Every version string maps to the same kind of key, so mixed notations
/// (semver, OSGi style `1.2.3.qualifier`, two-part `1.0`) share one total
/// order:
///
/// - The release part (up to the first `-`, build metadata after `+` ignored)
///   compares segment by segment, numeric segments numerically and below
///   text segments. Missing segments count as `0`.
/// - A `-pre.release` suffix sorts below the bare release, and pre-releases
///   compare like semver identifiers.
///
/// The raw string breaks remaining ties so the ordering stays consistent with
/// equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    /// Create a new version from the given string (stored as-is).
    pub fn new(v: &str) -> Self {
        Self(v.to_string())
    }

    /// Return the version string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a_release, a_pre) = split_version(&self.0);
        let (b_release, b_pre) = split_version(&other.0);
        compare_release(&a_release, &b_release)
            .then_with(|| match (a_pre, b_pre) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(&b),
            })
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for Version {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for Version {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Version {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<str> for Version {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Version {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// One dot or dash separated piece of a version. Numbers sort before text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Segment<'a> {
    Number(u64),
    Text(&'a str),
}

impl<'a> Segment<'a> {
    fn parse(s: &'a str) -> Self {
        s.parse().map_or(Self::Text(s), Self::Number)
    }
}

/// Split into release segments and optional pre-release segments.
fn split_version(v: &str) -> (Vec<Segment<'_>>, Option<Vec<Segment<'_>>>) {
    let v = v.split_once('+').map_or(v, |(head, _)| head);
    let (release, pre) = match v.split_once('-') {
        Some((release, pre)) => (release, Some(pre)),
        None => (v, None),
    };
    (
        release.split('.').map(Segment::parse).collect(),
        pre.map(|p| p.split(['.', '-']).map(Segment::parse).collect()),
    )
}

/// Compare release segments, padding the shorter side with zeros, so `1.0`
/// and `1.0.0` compare equal here (the caller's string tie-break keeps them
/// distinct).
fn compare_release(a: &[Segment<'_>], b: &[Segment<'_>]) -> Ordering {
    const ZERO: Segment<'static> = Segment::Number(0);
    for i in 0..a.len().max(b.len()) {
        let x = a.get(i).unwrap_or(&ZERO);
        let y = b.get(i).unwrap_or(&ZERO);
        let ordering = x.cmp(y);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Errors raised while parsing a [`VersionRange`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    /// An interval such as `[1.0,2.0)` is missing its bounds or comma.
    #[error("Malformed version interval: '{0}'")]
    MalformedInterval(String),
}

/// A version constraint used by `find`.
///
/// Accepted notations:
/// - `*`, `latest` or the empty string: any version
/// - OSGi intervals: `[1.0,2.0)`, `(1.0,2.0]`, `[1.0,)`
/// - semver requirements: `^1.2`, `>=1.0, <2`
/// - anything else: segment prefix, so `1.2` matches `1.2.7` but not `1.20`
///
/// # Example
///
/// ```
/// use depot_schema::{Version, VersionRange};
///
/// let range: VersionRange = "[1.0,2.0)".parse().unwrap();
/// assert!(range.matches(&Version::new("1.5.0")));
/// assert!(!range.matches(&Version::new("2.0.0")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRange {
    /// Matches every version.
    Any,
    /// A bounded or half-open interval.
    Interval {
        /// Lower bound.
        low: Version,
        /// Whether `low` itself is included.
        low_inclusive: bool,
        /// Upper bound, `None` for unbounded.
        high: Option<Version>,
        /// Whether `high` itself is included.
        high_inclusive: bool,
    },
    /// A semver requirement.
    Requirement(semver::VersionReq),
    /// Dot-separated prefix match.
    Prefix(String),
}

impl VersionRange {
    /// Check whether `version` satisfies the range.
    pub fn matches(&self, version: &Version) -> bool {
        match self {
            Self::Any => true,
            Self::Interval {
                low,
                low_inclusive,
                high,
                high_inclusive,
            } => {
                let above_low = match version.cmp(low) {
                    Ordering::Greater => true,
                    Ordering::Equal => *low_inclusive,
                    Ordering::Less => false,
                };
                let below_high = match high {
                    None => true,
                    Some(high) => match version.cmp(high) {
                        Ordering::Less => true,
                        Ordering::Equal => *high_inclusive,
                        Ordering::Greater => false,
                    },
                };
                above_low && below_high
            }
            Self::Requirement(req) => match semver::Version::parse(version.as_str()) {
                Ok(parsed) => req.matches(&parsed),
                Err(_) => false,
            },
            Self::Prefix(prefix) => matches_segments(version.as_str(), prefix),
        }
    }
}

impl std::str::FromStr for VersionRange {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == "*" || s == "latest" {
            return Ok(Self::Any);
        }

        if s.starts_with('[') || s.starts_with('(') {
            return parse_interval(s);
        }

        if let Ok(req) = semver::VersionReq::parse(s) {
            return Ok(Self::Requirement(req));
        }

        Ok(Self::Prefix(s.to_string()))
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Interval {
                low,
                low_inclusive,
                high,
                high_inclusive,
            } => {
                let open = if *low_inclusive { '[' } else { '(' };
                let close = if *high_inclusive { ']' } else { ')' };
                let high = high.as_ref().map(Version::as_str).unwrap_or_default();
                write!(f, "{open}{low},{high}{close}")
            }
            Self::Requirement(req) => write!(f, "{req}"),
            Self::Prefix(prefix) => f.write_str(prefix),
        }
    }
}

fn parse_interval(s: &str) -> Result<VersionRange, RangeError> {
    let malformed = || RangeError::MalformedInterval(s.to_string());

    let low_inclusive = s.starts_with('[');
    let high_inclusive = match s.chars().last() {
        Some(']') => true,
        Some(')') => false,
        _ => return Err(malformed()),
    };

    let inner = &s[1..s.len() - 1];
    let (low, high) = inner.split_once(',').ok_or_else(malformed)?;
    let (low, high) = (low.trim(), high.trim());
    if low.is_empty() {
        return Err(malformed());
    }

    Ok(VersionRange::Interval {
        low: Version::new(low),
        low_inclusive,
        high: (!high.is_empty()).then(|| Version::new(high)),
        high_inclusive,
    })
}

/// "0.2" matches "0.2.0", "0.2.1" but NOT "0.20.0"
fn matches_segments(version: &str, requirement: &str) -> bool {
    let v_parts: Vec<&str> = version.split('.').collect();
    let r_parts: Vec<&str> = requirement.split('.').collect();

    if r_parts.len() > v_parts.len() {
        return false;
    }

    r_parts.iter().zip(v_parts.iter()).all(|(r, v)| r == v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::new(s)
    }

    #[test]
    fn semver_ordering() {
        assert!(v("1.2.10") > v("1.2.9"));
        assert!(v("1.0.0") > v("1.0.0-beta"));
    }

    #[test]
    fn osgi_ordering() {
        assert!(v("1.10.0.v2020") > v("1.9.0.v2021"));
        assert!(v("2.0") > v("1.9.9"));
        assert!(v("1.0.0.qualifier") > v("1.0.0"));
    }

    #[test]
    fn ordering_is_total_and_consistent_with_eq() {
        assert_ne!(v("1.0"), v("1.0.0"));
        assert_ne!(v("1.0").cmp(&v("1.0.0")), Ordering::Equal);
        assert_eq!(v("1.0").cmp(&v("1.0")), Ordering::Equal);
    }

    #[test]
    fn mixed_notations_order_transitively() {
        assert!(v("1.0.0-alpha") < v("1.0.0"));
        assert!(v("1.0.0") < v("1.0.0.0"));
        assert!(v("1.0.0-alpha") < v("1.0.0.0"));

        let versions = [
            "1.0.0-alpha",
            "1.0.0-alpha.1",
            "1.0.0-beta",
            "1.0.0",
            "1.0.0.0",
            "1.0",
            "1.0.0.qualifier",
            "1.0.0+build.5",
            "1.0.1",
            "1.2.0.v2020-01",
            "2",
            "release",
        ];
        for a in versions {
            for b in versions {
                assert_eq!(v(a).cmp(&v(b)), v(b).cmp(&v(a)).reverse(), "{a} vs {b}");
                for c in versions {
                    if v(a) < v(b) && v(b) < v(c) {
                        assert!(v(a) < v(c), "{a} < {b} < {c} but not {a} < {c}");
                    }
                }
            }
        }
    }

    #[test]
    fn pre_release_identifiers_follow_semver() {
        let mut versions = vec![
            v("1.0.0"),
            v("1.0.0-rc.1"),
            v("1.0.0-beta.11"),
            v("1.0.0-beta.2"),
            v("1.0.0-alpha.beta"),
            v("1.0.0-alpha.1"),
            v("1.0.0-alpha"),
        ];
        versions.sort();
        let sorted: Vec<&str> = versions.iter().map(Version::as_str).collect();
        assert_eq!(
            sorted,
            [
                "1.0.0-alpha",
                "1.0.0-alpha.1",
                "1.0.0-alpha.beta",
                "1.0.0-beta.2",
                "1.0.0-beta.11",
                "1.0.0-rc.1",
                "1.0.0",
            ]
        );
    }

    #[test]
    fn sort_versions() {
        let mut versions = vec![v("1.10.0"), v("1.2.0"), v("1.9.1"), v("0.9")];
        versions.sort();
        let sorted: Vec<&str> = versions.iter().map(Version::as_str).collect();
        assert_eq!(sorted, ["0.9", "1.2.0", "1.9.1", "1.10.0"]);
    }

    #[test]
    fn range_any() {
        for s in ["", "*", "latest"] {
            let range: VersionRange = s.parse().unwrap();
            assert_eq!(range, VersionRange::Any);
            assert!(range.matches(&v("0.0.1")));
        }
    }

    #[test]
    fn range_interval() {
        let range: VersionRange = "[1.0,2.0)".parse().unwrap();
        assert!(range.matches(&v("1.0")));
        assert!(range.matches(&v("1.9.9")));
        assert!(!range.matches(&v("2.0")));
        assert!(!range.matches(&v("0.9")));

        let open_low: VersionRange = "(1.0,2.0]".parse().unwrap();
        assert!(!open_low.matches(&v("1.0")));
        assert!(open_low.matches(&v("2.0")));

        let unbounded: VersionRange = "[1.5,)".parse().unwrap();
        assert!(unbounded.matches(&v("99.0")));
        assert!(!unbounded.matches(&v("1.4")));
    }

    #[test]
    fn range_interval_malformed() {
        assert!("[1.0".parse::<VersionRange>().is_err());
        assert!("[,2.0)".parse::<VersionRange>().is_err());
        assert!("[1.0]".parse::<VersionRange>().is_err());
    }

    #[test]
    fn range_semver_requirement() {
        let range: VersionRange = ">=1.2.0, <1.4.0".parse().unwrap();
        assert!(range.matches(&v("1.3.5")));
        assert!(!range.matches(&v("1.4.0")));
        assert!(!range.matches(&v("1.3.5.qualifier")));
    }

    #[test]
    fn range_prefix_fallback() {
        let range = VersionRange::Prefix("1.2".to_string());
        assert!(range.matches(&v("1.2.7.v2020")));
        assert!(!range.matches(&v("1.20.0")));
    }

    #[test]
    fn range_display_round_trip() {
        let range: VersionRange = "[1.0,2.0)".parse().unwrap();
        assert_eq!(range.to_string(), "[1.0,2.0)");
    }
}
