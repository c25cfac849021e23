//! Migration scripts and their identifiers.

use crate::checksum::compute_checksum;
use crate::error::{CoreError, CoreResult};
use crate::version::Version;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

static FILE_NAME_RE: OnceLock<Regex> = OnceLock::new();

/// File names must look like `V1_2__add_users.sql`.
fn file_name_re() -> &'static Regex {
    FILE_NAME_RE
        .get_or_init(|| Regex::new(r"^V([0-9][0-9._]*)__(.+)\.sql$").expect("valid regex"))
}

/// Which folder a migration came from.
///
/// `Core` sorts before `Shard`, so for equal versions core migrations apply
/// first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Applied identically to the shared schema of every shard
    Core,
    /// Applied to each shard's own schema
    Shard,
}

impl Scope {
    /// Lowercase name, as stored in the ledger.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Core => "core",
            Scope::Shard => "shard",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = CoreError;
    fn from_str(s: &str) -> CoreResult<Self> {
        match s {
            "core" => Ok(Scope::Core),
            "shard" => Ok(Scope::Shard),
            other => Err(CoreError::ConfigInvalid {
                message: format!("unknown migration scope '{other}'"),
            }),
        }
    }
}

/// Identity of a migration: its scope plus version.
///
/// Ordered by version first and scope second, which is the apply order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MigrationId {
    pub scope: Scope,
    pub version: Version,
}

impl MigrationId {
    pub fn new(scope: Scope, version: Version) -> Self {
        Self { scope, version }
    }
}

impl Ord for MigrationId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.version
            .cmp(&other.version)
            .then(self.scope.cmp(&other.scope))
    }
}

impl PartialOrd for MigrationId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for MigrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:V{}", self.scope, self.version)
    }
}

/// A versioned migration loaded from one of the two folders.
///
/// Immutable once loaded; the checksum is computed from `content` at
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationScript {
    id: MigrationId,
    description: String,
    file_name: String,
    checksum: String,
    content: String,
}

impl MigrationScript {
    /// Build a script from a file name and its content.
    pub fn from_file(scope: Scope, file_name: &str, content: String) -> CoreResult<Self> {
        let (version, description) = parse_file_name(file_name)?;
        Ok(Self {
            id: MigrationId::new(scope, version),
            description,
            file_name: file_name.to_string(),
            checksum: compute_checksum(&content),
            content,
        })
    }

    pub fn id(&self) -> &MigrationId {
        &self.id
    }

    pub fn scope(&self) -> Scope {
        self.id.scope
    }

    pub fn version(&self) -> &Version {
        &self.id.version
    }

    /// Human-readable description taken from the file name.
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    /// The SQL to execute.
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Split `V<version>__<description>.sql` into its version and description.
///
/// Underscores in the description become spaces.
pub fn parse_file_name(file_name: &str) -> CoreResult<(Version, String)> {
    let malformed = |reason: String| CoreError::MalformedMigrationName {
        name: file_name.to_string(),
        reason,
    };

    let caps = file_name_re().captures(file_name).ok_or_else(|| {
        malformed("expected V<version>__<description>.sql".to_string())
    })?;

    let version = Version::parse(&caps[1]).map_err(|e| malformed(e.to_string()))?;
    let description = caps[2].replace('_', " ").trim().to_string();
    if description.is_empty() {
        return Err(malformed("description must not be empty".to_string()));
    }
    Ok((version, description))
}

#[cfg(test)]
#[path = "script_test.rs"]
mod tests;
