//! Runtime context for CLI commands

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sw_core::{Config, MigrationCatalog, Version};
use sw_db::DuckDbConnector;
use sw_migrate::{MigrateError, MigrateOptions, Orchestrator, ShardRegistry};

use crate::cli::GlobalArgs;

/// Loaded configuration, catalog, and shard registry
pub(crate) struct RuntimeContext {
    pub config: Config,
    pub catalog: Arc<MigrationCatalog>,
    pub registry: ShardRegistry,
}

impl RuntimeContext {
    /// Create a new runtime context from global arguments.
    ///
    /// Fails before any shard is touched if the configuration, either
    /// migration folder, or any migration file name is invalid.
    pub fn load(args: &GlobalArgs) -> Result<Self> {
        let root = PathBuf::from(&args.project_dir);

        // Load config from custom path or project directory
        let config = if let Some(config_path) = &args.config {
            Config::load(Path::new(config_path)).context("Failed to load configuration file")?
        } else {
            Config::load_from_dir(&root).context("Failed to load project configuration")?
        };

        let paths = config
            .migration_paths(&root)
            .context("Invalid migration folders")?;
        let catalog = MigrationCatalog::from_paths(&paths).context("Failed to load migrations")?;
        log::debug!(
            "Loaded {} core and {} shard migrations",
            catalog.all_core_scripts().len(),
            catalog.all_shard_scripts().len()
        );

        let registry = ShardRegistry::from_descriptors(
            config.shard_descriptors(&root),
            Arc::new(DuckDbConnector::new()),
        )?;
        if registry.is_empty() {
            return Err(MigrateError::NoShards.into());
        }

        Ok(Self {
            config,
            catalog: Arc::new(catalog),
            registry,
        })
    }

    /// Build an orchestrator over the selected shards, applying CLI
    /// overrides on top of the configuration.
    pub fn orchestrator(
        &self,
        shards: &Option<String>,
        threads: Option<usize>,
        target: Option<&str>,
    ) -> Result<Orchestrator> {
        let registry = match shards {
            Some(list) => self.registry.select(&parse_list(list))?,
            None => self.registry.clone(),
        };

        let mut options = MigrateOptions::from_config(&self.config);
        if let Some(threads) = threads {
            anyhow::ensure!(threads >= 1, "--threads must be at least 1");
            options.threads = threads;
        }
        if let Some(target) = target {
            options.target =
                Some(Version::parse(target).context("Invalid --target version")?);
        }

        Ok(Orchestrator::new(Arc::clone(&self.catalog), registry, options))
    }
}

/// Split a comma-separated list, dropping blanks
pub(crate) fn parse_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
