//! sw-migrate - Migration orchestrator for Shardway
//!
//! Brings a registry of shards up to date with a migration catalog. Each
//! shard is locked, planned against its own ledger, and migrated one script
//! at a time, with shards running in parallel on a bounded worker pool.

pub mod error;
pub mod orchestrator;
pub mod plan;
pub mod registry;
pub mod report;

pub use error::{AcquireResource, MigrateError, MigrateResult, ShardError};
pub use orchestrator::{CancelFlag, MigrateOptions, Orchestrator, ProgressFn, ShardOutcome};
pub use plan::{ApplyPlan, MigrationState, MigrationStatus, ShardInfo};
pub use registry::{RegisteredShard, ShardRegistry};
pub use report::{RunReport, ShardReport, ShardStatus};
