//! Migration version numbers.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A dotted sequence of non-negative integers such as `1`, `1.2` or `2.0.1`.
///
/// Segments compare numerically and trailing zero segments are insignificant,
/// so `1`, `1.0` and `1.0.0` are the same version. `Eq`, `Ord` and `Hash` all
/// agree on that.
#[derive(Debug, Clone)]
pub struct Version {
    segments: Vec<u64>,
}

impl Version {
    /// Parse a version, accepting `.` or `_` as the segment separator.
    pub fn parse(input: &str) -> CoreResult<Self> {
        let invalid = |reason: &str| CoreError::InvalidVersion {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        if input.is_empty() {
            return Err(invalid("version is empty"));
        }

        let segments = input
            .split(['.', '_'])
            .map(|part| {
                if part.is_empty() {
                    return Err(invalid("empty version segment"));
                }
                if !part.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid("version segments must be numeric"));
                }
                part.parse::<u64>()
                    .map_err(|_| invalid("version segment out of range"))
            })
            .collect::<CoreResult<Vec<_>>>()?;

        Ok(Self { segments })
    }

    /// Segments without trailing zeros; `0` keeps a single segment.
    fn significant(&self) -> &[u64] {
        let len = self
            .segments
            .iter()
            .rposition(|s| *s != 0)
            .map(|i| i + 1)
            .unwrap_or(0);
        &self.segments[..len]
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let significant = self.significant();
        if significant.is_empty() {
            return f.write_str("0");
        }
        let parts: Vec<String> = significant.iter().map(u64::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

impl FromStr for Version {
    type Err = CoreError;
    fn from_str(s: &str) -> CoreResult<Self> {
        Self::parse(s)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.significant() == other.significant()
    }
}

impl Eq for Version {}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        // Slice ordering is lexicographic with shorter-prefix-first, which is
        // numeric segment order once trailing zeros are gone.
        self.significant().cmp(other.significant())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant().hash(state);
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct VersionVisitor;

impl serde::de::Visitor<'_> for VersionVisitor {
    type Value = Version;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a version such as 3 or \"1.2\"")
    }

    fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Version, E> {
        Ok(Version { segments: vec![v] })
    }

    fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Version, E> {
        u64::try_from(v)
            .map(|v| Version { segments: vec![v] })
            .map_err(|_| E::custom("version must not be negative"))
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Version, E> {
        Version::parse(v).map_err(E::custom)
    }
}

// Accepts bare integers so `target: 3` works in YAML without quoting.
impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(VersionVisitor)
    }
}

#[cfg(test)]
#[path = "version_test.rs"]
mod tests;
