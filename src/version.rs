// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

//! Dotted version strings ("6.0.1", "4.0") and the threshold checks that change how a cluster is
//! brought up.

use std::{cmp::Ordering, fmt, str::FromStr};

use crate::error::{Error, Result};

/// MapR versions from 6.0.0 onwards run on CentOS 7, which needs extra volume mounts and
/// systemd, and accept a license file.
pub const EARLIEST_MAPR_VERSION_WITH_LICENSE_AND_CENTOS_7: &[u64] = &[6, 0, 0];

/// From MEP 4.0 onwards the setup-mapr script needs MAPR_MEP_VERSION in its environment.
pub const EARLIEST_MEP_VERSION_FOR_SETUP_MAPR_SCRIPT: &[u64] = &[4, 0];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    components: Vec<u64>,
}

impl Version {
    pub fn parse(input: &str) -> Result<Self> {
        let fail = |reason: String| Error::VersionFormat {
            input: input.to_string(),
            reason,
        };

        if input.is_empty() {
            return Err(fail("empty version string".to_string()));
        }

        let components = input
            .split('.')
            .map(|part| {
                part.parse::<u64>()
                    .map_err(|_| fail(format!("component '{part}' is not a non-negative integer")))
            })
            .collect::<Result<Vec<u64>>>()?;

        Ok(Version { components })
    }

    pub fn components(&self) -> &[u64] {
        &self.components
    }

    pub fn major(&self) -> u64 {
        self.components[0]
    }

    /// The first digit of the version as written: `4` for "4.1.0", `1` for "10.0".
    pub fn leading_digit(&self) -> char {
        self.major()
            .to_string()
            .chars()
            .next()
            .unwrap_or('0')
    }

    /// Is this version at or above `threshold`?
    ///
    /// A version that ties with the threshold on every component it has, but has fewer
    /// components than the threshold, cannot be compared and is reported as not meeting it.
    pub fn at_least(&self, threshold: &[u64]) -> bool {
        match compare(&self.components, threshold) {
            Some(Ordering::Less) => false,
            Some(_) => true,
            None => self.components.len() > threshold.len(),
        }
    }

    /// The first `n` components joined with `_`, as used in package names ("6_1").
    pub fn underscored(&self, n: usize) -> String {
        self.joined(n, "_")
    }

    /// The first `n` components joined with `.`.
    pub fn truncated(&self, n: usize) -> String {
        self.joined(n, ".")
    }

    fn joined(&self, n: usize, sep: &str) -> String {
        self.components
            .iter()
            .take(n)
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(sep)
    }
}

/// Lexicographic comparison limited to the precision both sides supply. Returns `None` when the
/// common prefix is equal but the lengths differ.
pub fn compare(a: &[u64], b: &[u64]) -> Option<Ordering> {
    for (x, y) in a.iter().zip(b.iter()) {
        match x.cmp(y) {
            Ordering::Equal => {}
            other => return Some(other),
        }
    }

    if a.len() == b.len() {
        Some(Ordering::Equal)
    } else {
        None
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        compare(&self.components, &other.components)
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.joined(self.components.len(), "."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn ordering() {
        assert!(v("6.0.0") > v("5.9.9"));
        assert!(v("5.2.2") < v("6.0.0"));
        assert!(!v("5.2.2").at_least(EARLIEST_MAPR_VERSION_WITH_LICENSE_AND_CENTOS_7));
        assert!(v("6.0.0").at_least(EARLIEST_MAPR_VERSION_WITH_LICENSE_AND_CENTOS_7));
        assert!(v("6.1.0").at_least(EARLIEST_MAPR_VERSION_WITH_LICENSE_AND_CENTOS_7));
        assert_eq!(v("6.0").partial_cmp(&v("6.0.0")), None);
    }

    #[test]
    fn precision() {
        // More precise than the threshold is fine.
        assert!(v("4.0.0").at_least(EARLIEST_MEP_VERSION_FOR_SETUP_MAPR_SCRIPT));
        assert!(v("4.1").at_least(EARLIEST_MEP_VERSION_FOR_SETUP_MAPR_SCRIPT));
        assert!(!v("3.0.1").at_least(EARLIEST_MEP_VERSION_FOR_SETUP_MAPR_SCRIPT));

        // Less precise and tied: undefined, so not met.
        assert!(!v("6.0").at_least(EARLIEST_MAPR_VERSION_WITH_LICENSE_AND_CENTOS_7));
        // Less precise but already decided by the prefix.
        assert!(v("7").at_least(EARLIEST_MAPR_VERSION_WITH_LICENSE_AND_CENTOS_7));
    }

    #[test]
    fn bad_versions() {
        for input in ["", "6.x.0", "6..0", "-1.0", "3.5.0-RC1"] {
            assert!(
                matches!(Version::parse(input), Err(Error::VersionFormat { .. })),
                "'{input}' should not parse"
            );
        }
    }

    #[test]
    fn formatting() {
        let version = v("6.0.1");
        assert_eq!(version.underscored(2), "6_0");
        assert_eq!(version.truncated(3), "6.0.1");
        assert_eq!(version.to_string(), "6.0.1");
        assert_eq!(version.major(), 6);
    }
}
