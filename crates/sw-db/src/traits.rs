//! Shard database trait definitions

use crate::error::DbResult;
use async_trait::async_trait;
use std::sync::Arc;
use sw_core::{LedgerEntry, ShardDescriptor, ShardId};

/// Basic statement execution against a shard
#[async_trait]
pub trait ShardExecutor: Send + Sync {
    /// Execute multiple SQL statements outside any ledger bookkeeping
    async fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Check if a table or view exists (schema-qualified names allowed)
    async fn relation_exists(&self, name: &str) -> DbResult<bool>;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;
}

/// Durable record of the migrations applied to a shard
#[async_trait]
pub trait VersionLedger: Send + Sync {
    /// Create the ledger and lock tables if they do not exist
    async fn ensure_ledger(&self) -> DbResult<()>;

    /// Whether the ledger tables have been created on this shard
    async fn ledger_exists(&self) -> DbResult<bool>;

    /// All entries recorded for `shard`, in apply order
    async fn recorded_versions(&self, shard: &ShardId) -> DbResult<Vec<LedgerEntry>>;

    /// Execute `sql` and append `entry` in one transaction.
    ///
    /// Either both the script's effects and the entry are committed, or
    /// neither is. A failure of the script itself is reported as
    /// [`DbError::ExecutionError`](crate::DbError::ExecutionError).
    async fn append_applied(&self, shard: &ShardId, sql: &str, entry: &LedgerEntry)
        -> DbResult<()>;
}

/// Per-shard mutual exclusion between migration runs
#[async_trait]
pub trait AdvisoryLock: Send + Sync {
    /// Try once to take the lock for `owner`.
    ///
    /// Returns `Ok(false)` if another owner holds it. Re-acquiring a lock
    /// already held by `owner` succeeds.
    async fn try_lock(&self, shard: &ShardId, owner: &str) -> DbResult<bool>;

    /// Release the lock if `owner` holds it
    async fn unlock(&self, shard: &ShardId, owner: &str) -> DbResult<()>;

    /// Current lock holder, if any
    async fn lock_owner(&self, shard: &ShardId) -> DbResult<Option<String>>;

    /// Remove the lock regardless of owner. Returns whether a lock was held.
    async fn break_lock(&self, shard: &ShardId) -> DbResult<bool>;
}

/// Combined trait for everything the orchestrator needs from a shard
pub trait ShardDatabase: ShardExecutor + VersionLedger + AdvisoryLock {}

impl<T: ShardExecutor + VersionLedger + AdvisoryLock> ShardDatabase for T {}

/// Opens connections to shards from their descriptors
#[async_trait]
pub trait ShardConnector: Send + Sync {
    async fn connect(&self, shard: &ShardDescriptor) -> DbResult<Arc<dyn ShardDatabase>>;
}
