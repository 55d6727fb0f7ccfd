//! Version compatibility gating.
//!
//! Bounds are inclusive and compared as `major.minor.patch`; partial versions
//! such as `2.5` or `3` are padded with zeros. A missing reference version
//! (e.g. a serverless deployment) is always compatible.

use std::{cmp::Ordering, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    descriptor::ToolDescriptor,
    error::{RegistryError, RegistryResult},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    /// Pre-release tag, e.g. `rc1` in `3.0.0-rc1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre: Option<String>,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
        }
    }

    /// Parse a full or partial version. Build metadata (`+...`) is dropped.
    pub fn parse(input: &str) -> Result<Self, String> {
        let trimmed = input.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let core = trimmed.split('+').next().unwrap_or_default();
        let (numbers, pre) = match core.split_once('-') {
            Some((numbers, pre)) => {
                validate_prerelease(pre)?;
                (numbers, Some(pre.to_string()))
            }
            None => (core, None),
        };

        let parts: Vec<&str> = numbers.split('.').collect();
        if parts.is_empty() || parts.len() > 3 {
            return Err(format!("expected MAJOR[.MINOR[.PATCH]], got '{}'", input));
        }

        let mut components = [0u64; 3];
        for (slot, part) in components.iter_mut().zip(&parts) {
            if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
                return Err(format!("'{}' is not a numeric version component", part));
            }
            if has_leading_zero(part) {
                return Err(format!("'{}' has a leading zero", part));
            }
            *slot = part
                .parse::<u64>()
                .map_err(|e| format!("'{}' is out of range: {}", part, e))?;
        }

        Ok(Self {
            major: components[0],
            minor: components[1],
            patch: components[2],
            pre,
        })
    }
}

impl FromStr for Version {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{}", pre)?;
        }
        Ok(())
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.pre, &other.pre) {
                // A pre-release sorts before its release.
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => compare_prerelease(a, b),
            })
    }
}

fn has_leading_zero(numeric: &str) -> bool {
    numeric.len() > 1 && numeric.starts_with('0')
}

fn validate_prerelease(pre: &str) -> Result<(), String> {
    if pre.is_empty() {
        return Err("empty pre-release tag".to_string());
    }
    for ident in pre.split('.') {
        if ident.is_empty() {
            return Err(format!("empty identifier in pre-release tag '{}'", pre));
        }
        if !ident.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(format!("invalid character in pre-release identifier '{}'", ident));
        }
        if ident.chars().all(|c| c.is_ascii_digit()) && has_leading_zero(ident) {
            return Err(format!("pre-release identifier '{}' has a leading zero", ident));
        }
    }
    Ok(())
}

/// Dot-separated identifiers compared left to right. Numeric identifiers
/// compare as numbers and rank below alphanumeric ones; a shorter tag that is
/// a prefix of a longer one ranks lower.
fn compare_prerelease(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        let ordering = match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => compare_identifier(x, y),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
}

fn compare_identifier(a: &str, b: &str) -> Ordering {
    let numeric = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    match (numeric(a), numeric(b)) {
        // Without leading zeros, a longer digit string is the larger number.
        (true, true) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.cmp(b),
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn parse_bound(bound: &'static str, value: Option<&str>) -> RegistryResult<Option<Version>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => Version::parse(raw)
            .map(Some)
            .map_err(|reason| RegistryError::InvalidVersion {
                bound,
                value: raw.to_string(),
                reason,
            }),
    }
}

/// Decide whether `reference` lies within `[min_version, max_version]`.
///
/// Returns an error if a declared bound is not a valid version, even when the
/// reference version is unknown.
pub fn is_compatible(
    reference: Option<&Version>,
    min_version: Option<&str>,
    max_version: Option<&str>,
) -> RegistryResult<bool> {
    let min = parse_bound("minimum", min_version)?;
    let max = parse_bound("maximum", max_version)?;

    let Some(version) = reference else {
        return Ok(true);
    };

    if min.as_ref().is_some_and(|min| version < min) {
        return Ok(false);
    }
    if max.as_ref().is_some_and(|max| version > max) {
        return Ok(false);
    }
    Ok(true)
}

/// Check that a tool's declared bounds parse, independent of any reference
/// version.
pub fn validate_bounds(tool: &ToolDescriptor) -> RegistryResult<()> {
    parse_bound("minimum", tool.min_version.as_deref())?;
    parse_bound("maximum", tool.max_version.as_deref())?;
    Ok(())
}

pub fn is_tool_compatible(reference: Option<&Version>, tool: &ToolDescriptor) -> RegistryResult<bool> {
    is_compatible(
        reference,
        tool.min_version.as_deref(),
        tool.max_version.as_deref(),
    )
}

/// Invocation-time check: fail with a user-facing message when the connected
/// cluster is outside the tool's supported range.
pub fn ensure_compatible(reference: Option<&Version>, tool: &ToolDescriptor) -> RegistryResult<()> {
    if is_tool_compatible(reference, tool)? {
        return Ok(());
    }

    let current = reference
        .map(ToString::to_string)
        .unwrap_or_else(|| "unknown".to_string());
    let mut message = format!(
        "Tool '{}' is not supported for this OpenSearch version (current version: {}).",
        tool.display_name, current
    );
    let range = match (tool.min_version.as_deref(), tool.max_version.as_deref()) {
        (Some(min), Some(max)) => Some(format!("{} to {}", min, max)),
        (Some(min), None) => Some(format!("{} or later", min)),
        (None, Some(max)) => Some(format!("up to {}", max)),
        (None, None) => None,
    };
    if let Some(range) = range {
        message.push_str(&format!(" Supported version: {}.", range));
    }
    Err(RegistryError::IncompatibleTool(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_version_within_range() {
        assert!(is_compatible(Some(&v("2.5.0")), Some("2.0.0"), Some("3.0.0")).unwrap());
        assert!(!is_compatible(Some(&v("2.5.0")), Some("3.0.0"), None).unwrap());
    }

    #[test]
    fn test_bounds_are_inclusive() {
        assert!(is_compatible(Some(&v("1.0.0")), Some("1.0.0"), Some("3.0.0")).unwrap());
        assert!(is_compatible(Some(&v("3.0.0")), Some("1.0.0"), Some("3.0.0")).unwrap());
        assert!(!is_compatible(Some(&v("2.1.0")), Some("1.0.0"), Some("2.0.0")).unwrap());
        assert!(!is_compatible(Some(&v("1.5.0")), Some("2.0.0"), Some("3.0.0")).unwrap());
    }

    #[test]
    fn test_partial_bounds_are_padded() {
        assert!(is_compatible(Some(&v("2.5.1")), Some("2.5"), Some("3")).unwrap());
        assert!(is_compatible(Some(&v("2.15.0")), Some("2.5"), Some("3")).unwrap());
        assert!(is_compatible(Some(&v("3.0.0")), Some("2.5"), Some("3")).unwrap());
        assert!(!is_compatible(Some(&v("3.0.1")), Some("2.5"), Some("3")).unwrap());
    }

    #[test]
    fn test_no_bounds_accepts_anything() {
        for version in ["0.0.1", "1.2.3", "99.0.0"] {
            assert!(is_compatible(Some(&v(version)), None, None).unwrap());
        }
    }

    #[test]
    fn test_missing_reference_always_compatible() {
        assert!(is_compatible(None, Some("99.0.0"), Some("99.1.0")).unwrap());
    }

    #[test]
    fn test_invalid_bound_is_error() {
        let err = is_compatible(Some(&v("1.0.0")), Some("not_a_version"), None).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidVersion { bound: "minimum", .. }));
        let err = is_compatible(Some(&v("1.0.0")), None, Some("not_a_version")).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidVersion { bound: "maximum", .. }));
        // still rejected without a reference version
        assert!(is_compatible(None, Some("1.x"), None).is_err());
    }

    #[test]
    fn test_validate_bounds() {
        let good = ToolDescriptor::new("A", "a").with_min_version("2.5").with_max_version("3.0.0");
        assert!(validate_bounds(&good).is_ok());

        let bad = ToolDescriptor::new("B", "b").with_max_version("garbage");
        let err = validate_bounds(&bad).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidVersion { bound: "maximum", .. }));
    }

    #[test]
    fn test_parse_variants() {
        assert_eq!(v("v2.11.1"), Version::new(2, 11, 1));
        assert_eq!(v("2.19.0+build.7"), Version::new(2, 19, 0));
        assert_eq!(v("3.0.0-rc1").pre.as_deref(), Some("rc1"));
        assert!(v("3.0.0-rc1") < v("3.0.0"));
        assert!(Version::parse("1.2.3.4").is_err());
        assert!(Version::parse("").is_err());
        assert!(Version::parse("1..2").is_err());
    }

    #[test]
    fn test_prerelease_identifier_ordering() {
        assert!(v("3.0.0-beta.11") > v("3.0.0-beta.2"));
        assert!(is_compatible(Some(&v("3.0.0-beta.11")), Some("3.0.0-beta.2"), None).unwrap());

        let ordered = [
            "1.0.0-alpha",
            "1.0.0-alpha.1",
            "1.0.0-alpha.beta",
            "1.0.0-beta",
            "1.0.0-beta.2",
            "1.0.0-beta.11",
            "1.0.0-rc.1",
            "1.0.0",
        ];
        for pair in ordered.windows(2) {
            assert!(v(pair[0]) < v(pair[1]), "{} < {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_leading_zeros_rejected() {
        assert!(Version::parse("01.02.03").is_err());
        assert!(Version::parse("1.02").is_err());
        assert!(Version::parse("1.0.0-alpha.01").is_err());
        assert!(Version::parse("1.0.0-").is_err());
        assert!(Version::parse("1.0.0-alpha..1").is_err());
        assert_eq!(v("0.0.0"), Version::new(0, 0, 0));
        assert_eq!(v("1.0.0-0a").pre.as_deref(), Some("0a"));
    }

    #[test]
    fn test_display_round_trips_padding() {
        assert_eq!(v("2.5").to_string(), "2.5.0");
    }
}
