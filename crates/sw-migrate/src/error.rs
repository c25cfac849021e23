//! Error types for sw-migrate

use serde::Serialize;
use std::fmt;
use sw_core::{CoreError, MigrationId, ShardId};
use thiserror::Error;

/// What a shard was waiting for when an [`ShardError::AcquireTimeout`] fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AcquireResource {
    Connection,
    Lock,
}

impl fmt::Display for AcquireResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquireResource::Connection => write!(f, "connection"),
            AcquireResource::Lock => write!(f, "lock"),
        }
    }
}

/// Failure of a single shard. Other shards in the same run are unaffected.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShardError {
    /// S001: An applied migration no longer matches its script
    #[error("[S001] Drift detected on shard {shard}: {migration} was applied with checksum {recorded} but the script now has checksum {current}")]
    DriftDetected {
        shard: ShardId,
        migration: MigrationId,
        recorded: String,
        current: String,
    },

    /// S002: Connection or lock not obtained within its bound
    #[error("[S002] Timed out after {waited_ms}ms waiting for the {resource} of shard {shard}{}", holder_suffix(.holder))]
    AcquireTimeout {
        shard: ShardId,
        resource: AcquireResource,
        waited_ms: u64,
        holder: Option<String>,
    },

    /// S003: A migration script failed and was rolled back
    #[error("[S003] Migration {migration} failed on shard {shard}: {message}")]
    ScriptExecutionFailure {
        shard: ShardId,
        migration: MigrationId,
        message: String,
    },

    /// S004: The shard database could not be opened
    #[error("[S004] Could not connect to shard {shard}: {message}")]
    ConnectionFailed { shard: ShardId, message: String },

    /// S005: Reading or writing the ledger or lock tables failed
    #[error("[S005] Ledger failure on shard {shard}: {message}")]
    LedgerFailure { shard: ShardId, message: String },

    /// S006: The shard's worker task ended abnormally
    #[error("[S006] Internal error on shard {shard}: {message}")]
    Internal { shard: ShardId, message: String },
}

fn holder_suffix(holder: &Option<String>) -> String {
    match holder {
        Some(owner) => format!(" (held by {owner})"),
        None => String::new(),
    }
}

impl ShardError {
    /// The shard this error belongs to
    pub fn shard(&self) -> &ShardId {
        match self {
            ShardError::DriftDetected { shard, .. }
            | ShardError::AcquireTimeout { shard, .. }
            | ShardError::ScriptExecutionFailure { shard, .. }
            | ShardError::ConnectionFailed { shard, .. }
            | ShardError::LedgerFailure { shard, .. }
            | ShardError::Internal { shard, .. } => shard,
        }
    }

    /// Short code used in reports
    pub fn code(&self) -> &'static str {
        match self {
            ShardError::DriftDetected { .. } => "S001",
            ShardError::AcquireTimeout { .. } => "S002",
            ShardError::ScriptExecutionFailure { .. } => "S003",
            ShardError::ConnectionFailed { .. } => "S004",
            ShardError::LedgerFailure { .. } => "S005",
            ShardError::Internal { .. } => "S006",
        }
    }

    /// Whether running again without changing anything may succeed.
    ///
    /// Drift needs an operator to reconcile the script with the ledger.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ShardError::DriftDetected { .. })
    }
}

/// Orchestrator setup errors. These abort before any shard is touched.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// R001: A shard named on the command line is not configured
    #[error("[R001] Unknown shard '{0}'")]
    UnknownShard(String),

    /// R002: Two shards registered with the same id
    #[error("[R002] Shard '{0}' is registered more than once")]
    DuplicateShard(ShardId),

    /// R003: No shards left to migrate
    #[error("[R003] No shards configured")]
    NoShards,

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Shard(#[from] ShardError),
}

/// Result type alias for MigrateError
pub type MigrateResult<T> = Result<T, MigrateError>;
