//! Strongly-typed shard identifier.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

/// Identity of a shard.
///
/// Non-empty and limited to ASCII letters, digits, `_`, `-` and `.` so that
/// ids are safe to print in reports and to use as ledger keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShardId(String);

impl ShardId {
    /// Create a new `ShardId`, panicking if the id is invalid.
    ///
    /// Prefer [`try_new`](Self::try_new) when handling untrusted input.
    pub fn new(id: impl Into<String>) -> Self {
        match Self::try_new(id) {
            Ok(id) => id,
            Err(reason) => panic!("{reason}"),
        }
    }

    /// Try to create a new `ShardId`.
    pub fn try_new(id: impl Into<String>) -> Result<Self, &'static str> {
        let s = id.into();
        if s.is_empty() {
            return Err("ShardId must not be empty");
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            return Err("ShardId may only contain ASCII letters, digits, '_', '-' and '.'");
        }
        Ok(Self(s))
    }

    /// Return the underlying id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner `String`.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ShardId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for ShardId {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ShardId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ShardId {
    type Error = &'static str;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::try_new(s)
    }
}

impl TryFrom<&str> for ShardId {
    type Error = &'static str;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::try_new(s)
    }
}

impl From<ShardId> for String {
    fn from(id: ShardId) -> Self {
        id.0
    }
}

impl PartialEq<str> for ShardId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ShardId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_id_creation() {
        let id = ShardId::new("shard_01");
        assert_eq!(id.as_str(), "shard_01");
        assert_eq!(id, "shard_01");
    }

    #[test]
    fn test_shard_id_rejects_empty() {
        assert!(ShardId::try_new("").is_err());
    }

    #[test]
    fn test_shard_id_rejects_whitespace_and_quotes() {
        assert!(ShardId::try_new("shard 1").is_err());
        assert!(ShardId::try_new("shard'1").is_err());
    }

    #[test]
    fn test_shard_id_borrow_lookup() {
        use std::collections::HashMap;
        let mut map: HashMap<ShardId, i32> = HashMap::new();
        map.insert(ShardId::new("eu-west.1"), 7);
        assert_eq!(map.get("eu-west.1"), Some(&7));
    }

    #[test]
    fn test_shard_id_serde_rejects_invalid() {
        let ok: ShardId = serde_json::from_str(r#""alpha""#).unwrap();
        assert_eq!(ok, "alpha");
        assert!(serde_json::from_str::<ShardId>(r#""""#).is_err());
        assert_eq!(serde_json::to_string(&ok).unwrap(), r#""alpha""#);
    }
}
