//! sw-core - Core library for Shardway
//!
//! This crate provides the validated migration folder pair, migration
//! versions and scripts, the migration catalog, ledger entry records, and
//! project configuration shared by the database layer, the orchestrator, and
//! the CLI.

pub mod catalog;
pub mod checksum;
pub mod config;
pub mod error;
pub mod ledger_entry;
pub mod paths;
pub mod script;
pub mod shard_id;
pub mod version;

pub use catalog::{CatalogSource, FsCatalogSource, InMemoryCatalogSource, MigrationCatalog, RawScript};
pub use checksum::compute_checksum;
pub use config::{Config, ShardConfig, ShardDescriptor};
pub use error::{CoreError, CoreResult};
pub use ledger_entry::LedgerEntry;
pub use paths::MigrationPaths;
pub use script::{MigrationId, MigrationScript, Scope};
pub use shard_id::ShardId;
pub use version::Version;
