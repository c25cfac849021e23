//! Configuration types and parsing for shardway.yml

use crate::error::{CoreError, CoreResult};
use crate::paths::MigrationPaths;
use crate::shard_id::ShardId;
use crate::version::Version;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Connection path that keeps a shard in memory for the life of the process.
pub const IN_MEMORY_PATH: &str = ":memory:";

/// Main project configuration from shardway.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Folder with core migrations, relative to the project directory
    #[serde(default)]
    pub core_path: Option<String>,

    /// Folder with shard migrations, relative to the project directory
    #[serde(default)]
    pub shard_path: Option<String>,

    /// Number of shards migrated concurrently
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Upper bound on how long opening a shard connection may take
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Upper bound on how long to wait for another run's shard lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    /// Delay between lock acquisition attempts
    #[serde(default = "default_lock_poll_interval_ms")]
    pub lock_poll_interval_ms: u64,

    /// Only migrate up to and including this version
    #[serde(default)]
    pub target: Option<Version>,

    /// Shards to migrate
    #[serde(default)]
    pub shards: Vec<ShardConfig>,
}

/// One shard and how to reach it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShardConfig {
    /// Shard identity, used as the ledger key
    pub id: ShardId,

    /// DuckDB database path, relative to the project directory, or `:memory:`
    pub path: String,
}

/// A shard with its connection path resolved against the project directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardDescriptor {
    pub id: ShardId,
    pub path: String,
}

impl ShardDescriptor {
    pub fn new(id: ShardId, path: impl Into<String>) -> Self {
        Self {
            id,
            path: path.into(),
        }
    }

    pub fn in_memory(id: ShardId) -> Self {
        Self::new(id, IN_MEMORY_PATH)
    }

    pub fn is_in_memory(&self) -> bool {
        self.path == IN_MEMORY_PATH
    }
}

fn default_threads() -> usize {
    4
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_lock_timeout_ms() -> u64 {
    10_000
}

fn default_lock_poll_interval_ms() -> u64 {
    100
}

impl Default for Config {
    fn default() -> Self {
        Self {
            core_path: None,
            shard_path: None,
            threads: default_threads(),
            connect_timeout_ms: default_connect_timeout_ms(),
            lock_timeout_ms: default_lock_timeout_ms(),
            lock_poll_interval_ms: default_lock_poll_interval_ms(),
            target: None,
            shards: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| CoreError::ConfigParseError {
                message: format!("{}: {e}", path.display()),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory, looking for
    /// shardway.yml and then shardway.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let yml_path = dir.join("shardway.yml");
        let yaml_path = dir.join("shardway.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Err(CoreError::ConfigNotFound {
                path: yml_path.display().to_string(),
            })
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> CoreResult<()> {
        if self.threads == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "threads must be at least 1".to_string(),
            });
        }
        let bounds = [
            ("connect_timeout_ms", self.connect_timeout_ms),
            ("lock_timeout_ms", self.lock_timeout_ms),
            ("lock_poll_interval_ms", self.lock_poll_interval_ms),
        ];
        if let Some((name, _)) = bounds.iter().find(|(_, ms)| *ms == 0) {
            return Err(CoreError::ConfigInvalid {
                message: format!("{name} must be at least 1"),
            });
        }

        let mut seen = HashSet::new();
        for shard in &self.shards {
            if shard.path.trim().is_empty() {
                return Err(CoreError::ConfigInvalid {
                    message: format!("shard '{}' has an empty path", shard.id),
                });
            }
            if !seen.insert(shard.id.as_str()) {
                return Err(CoreError::ConfigInvalid {
                    message: format!("duplicate shard id '{}'", shard.id),
                });
            }
        }
        Ok(())
    }

    /// Resolve and validate the two migration folders against `root`.
    pub fn migration_paths(&self, root: &Path) -> CoreResult<MigrationPaths> {
        let resolve = |p: &Option<String>| p.as_ref().map(|p| root.join(p));
        MigrationPaths::from_options(resolve(&self.core_path), resolve(&self.shard_path))
    }

    /// Shards with relative database paths resolved against `root`.
    pub fn shard_descriptors(&self, root: &Path) -> Vec<ShardDescriptor> {
        self.shards
            .iter()
            .map(|s| {
                let path = if s.path == IN_MEMORY_PATH {
                    s.path.clone()
                } else {
                    resolve_path(root, &s.path).display().to_string()
                };
                ShardDescriptor::new(s.id.clone(), path)
            })
            .collect()
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn lock_poll_interval(&self) -> Duration {
        Duration::from_millis(self.lock_poll_interval_ms)
    }
}

fn resolve_path(root: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        root.join(p)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
