//! Migration catalog: loads, validates, and orders migration scripts.
//!
//! The catalog never touches the filesystem directly. Scripts are listed
//! through a [`CatalogSource`], so the ordering and validation logic can be
//! exercised against in-memory fixtures.

use crate::error::{CoreError, CoreResult};
use crate::paths::MigrationPaths;
use crate::script::{MigrationId, MigrationScript, Scope};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// A file as listed by a [`CatalogSource`], before name parsing.
#[derive(Debug, Clone)]
pub struct RawScript {
    pub file_name: String,
    pub content: String,
}

impl RawScript {
    pub fn new(file_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }
}

/// Capability that lists the raw migration files of one scope.
pub trait CatalogSource {
    /// List every candidate migration file of `scope`, in any order.
    fn list(&self, scope: Scope) -> CoreResult<Vec<RawScript>>;
}

/// Lists migrations from the two validated folders.
///
/// Each folder is read non-recursively. Subdirectories and hidden entries
/// (names starting with `.`) are skipped; every other file is returned and
/// must follow the naming convention.
#[derive(Debug, Clone)]
pub struct FsCatalogSource {
    paths: MigrationPaths,
}

impl FsCatalogSource {
    pub fn new(paths: MigrationPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &MigrationPaths {
        &self.paths
    }

    fn read_dir(dir: &Path) -> CoreResult<Vec<RawScript>> {
        let io_err = |path: &Path, source: std::io::Error| CoreError::IoWithPath {
            path: path.display().to_string(),
            source,
        };

        let mut scripts = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
            let entry = entry.map_err(|e| io_err(dir, e))?;
            let path = entry.path();
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if file_name.starts_with('.') {
                continue;
            }
            if path.is_dir() {
                log::debug!("Skipping subdirectory {}", path.display());
                continue;
            }
            let content = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
            scripts.push(RawScript { file_name, content });
        }
        Ok(scripts)
    }
}

impl CatalogSource for FsCatalogSource {
    fn list(&self, scope: Scope) -> CoreResult<Vec<RawScript>> {
        match scope {
            Scope::Core => Self::read_dir(self.paths.core_path()),
            Scope::Shard => Self::read_dir(self.paths.shard_path()),
        }
    }
}

/// Fixed set of scripts held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogSource {
    core: Vec<RawScript>,
    shard: Vec<RawScript>,
}

impl InMemoryCatalogSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a script to `scope`, builder style.
    pub fn with(mut self, scope: Scope, file_name: &str, content: &str) -> Self {
        self.add(scope, file_name, content);
        self
    }

    pub fn add(&mut self, scope: Scope, file_name: &str, content: &str) {
        let raw = RawScript::new(file_name, content);
        match scope {
            Scope::Core => self.core.push(raw),
            Scope::Shard => self.shard.push(raw),
        }
    }
}

impl CatalogSource for InMemoryCatalogSource {
    fn list(&self, scope: Scope) -> CoreResult<Vec<RawScript>> {
        Ok(match scope {
            Scope::Core => self.core.clone(),
            Scope::Shard => self.shard.clone(),
        })
    }
}

/// The validated, ordered set of migrations for a run.
///
/// Scripts are shared behind `Arc` so per-shard plans can reference them
/// without copying content.
#[derive(Debug, Clone)]
pub struct MigrationCatalog {
    core: Vec<Arc<MigrationScript>>,
    shard: Vec<Arc<MigrationScript>>,
    sequence: Vec<Arc<MigrationScript>>,
}

impl MigrationCatalog {
    /// Load and validate both scopes from `source`.
    ///
    /// Fails with `MalformedMigrationName` on the first non-conforming file
    /// and with `DuplicateVersion` when two files of one scope share a
    /// version.
    pub fn load(source: &dyn CatalogSource) -> CoreResult<Self> {
        let core = load_scope(source, Scope::Core)?;
        let shard = load_scope(source, Scope::Shard)?;

        let mut sequence: Vec<Arc<MigrationScript>> =
            core.iter().chain(shard.iter()).cloned().collect();
        sequence.sort_by(|a, b| a.id().cmp(b.id()));

        log::debug!(
            "Loaded catalog: {} core, {} shard migrations",
            core.len(),
            shard.len()
        );
        Ok(Self {
            core,
            shard,
            sequence,
        })
    }

    /// Load from the two folders on disk.
    pub fn from_paths(paths: &MigrationPaths) -> CoreResult<Self> {
        Self::load(&FsCatalogSource::new(paths.clone()))
    }

    /// Core migrations in ascending version order.
    pub fn all_core_scripts(&self) -> &[Arc<MigrationScript>] {
        &self.core
    }

    /// Shard migrations in ascending version order.
    pub fn all_shard_scripts(&self) -> &[Arc<MigrationScript>] {
        &self.shard
    }

    /// Every migration in apply order: ascending version, core before shard
    /// for equal versions.
    pub fn apply_sequence(&self) -> &[Arc<MigrationScript>] {
        &self.sequence
    }

    /// Look up a migration by id.
    pub fn get(&self, id: &MigrationId) -> Option<&Arc<MigrationScript>> {
        let scripts = match id.scope {
            Scope::Core => &self.core,
            Scope::Shard => &self.shard,
        };
        scripts
            .binary_search_by(|s| s.version().cmp(&id.version))
            .ok()
            .map(|i| &scripts[i])
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

fn load_scope(source: &dyn CatalogSource, scope: Scope) -> CoreResult<Vec<Arc<MigrationScript>>> {
    let mut raw = source.list(scope)?;
    // Sort by name so error reporting is deterministic regardless of listing order
    raw.sort_by(|a, b| a.file_name.cmp(&b.file_name));

    let mut seen: HashMap<MigrationId, String> = HashMap::with_capacity(raw.len());
    let mut scripts = Vec::with_capacity(raw.len());
    for RawScript { file_name, content } in raw {
        let script = MigrationScript::from_file(scope, &file_name, content)?;
        if let Some(first) = seen.insert(script.id().clone(), file_name.clone()) {
            return Err(CoreError::DuplicateVersion {
                scope: scope.to_string(),
                version: script.version().to_string(),
                first,
                second: file_name,
            });
        }
        scripts.push(Arc::new(script));
    }
    scripts.sort_by(|a, b| a.version().cmp(b.version()));
    Ok(scripts)
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
