//! Validated locations of the core and shard migration folders.

use crate::error::{CoreError, CoreResult};
use std::path::{Path, PathBuf};

const CORE_FOLDER: &str = "core migrations folder";
const SHARD_FOLDER: &str = "shard migrations folder";

/// The pair of folders a catalog is loaded from.
///
/// Both paths are checked at construction: each must be supplied, exist, and
/// be a directory. A `MigrationPaths` value therefore always refers to two
/// directories that existed when it was built. The stored paths are kept
/// exactly as given (no canonicalisation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPaths {
    core: PathBuf,
    shard: PathBuf,
}

impl MigrationPaths {
    /// Build from any path-like values.
    pub fn new(core: impl AsRef<Path>, shard: impl AsRef<Path>) -> CoreResult<Self> {
        let core = validate_dir(core.as_ref(), CORE_FOLDER)?;
        let shard = validate_dir(shard.as_ref(), SHARD_FOLDER)?;
        Ok(Self { core, shard })
    }

    /// Build from string paths.
    pub fn from_strs(core: &str, shard: &str) -> CoreResult<Self> {
        Self::new(Path::new(core), Path::new(shard))
    }

    /// Build from paths that may be absent, as read from configuration.
    pub fn from_options(core: Option<PathBuf>, shard: Option<PathBuf>) -> CoreResult<Self> {
        let core = core.ok_or(CoreError::PathNotProvided { which: CORE_FOLDER })?;
        let core = validate_dir(&core, CORE_FOLDER)?;
        let shard = shard.ok_or(CoreError::PathNotProvided {
            which: SHARD_FOLDER,
        })?;
        let shard = validate_dir(&shard, SHARD_FOLDER)?;
        Ok(Self { core, shard })
    }

    /// Folder holding migrations applied to every shard's core schema.
    pub fn core_path(&self) -> &Path {
        &self.core
    }

    /// Folder holding per-shard migrations.
    pub fn shard_path(&self) -> &Path {
        &self.shard
    }
}

fn validate_dir(path: &Path, which: &'static str) -> CoreResult<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(CoreError::PathNotProvided { which });
    }
    if !path.exists() {
        return Err(CoreError::PathNotFound {
            path: path.display().to_string(),
        });
    }
    if !path.is_dir() {
        return Err(CoreError::NotADirectory {
            path: path.display().to_string(),
        });
    }
    Ok(path.to_path_buf())
}

#[cfg(test)]
#[path = "paths_test.rs"]
mod tests;
