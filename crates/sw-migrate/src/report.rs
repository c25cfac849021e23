//! Run results

use crate::error::ShardError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use sw_core::{MigrationId, ShardId};

/// Final state of one shard after a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShardStatus {
    /// Every pending migration was applied (possibly none)
    Succeeded,
    Failed,
    /// The run was cancelled before this shard finished
    Cancelled,
}

impl fmt::Display for ShardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShardStatus::Succeeded => write!(f, "succeeded"),
            ShardStatus::Failed => write!(f, "failed"),
            ShardStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Outcome of one shard
#[derive(Debug, Clone, Serialize)]
pub struct ShardReport {
    pub shard: ShardId,
    pub status: ShardStatus,
    /// Migrations committed during this run, in order
    pub applied: Vec<MigrationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ShardError>,
    pub duration_ms: u64,
}

impl ShardReport {
    pub fn succeeded(shard: ShardId, applied: Vec<MigrationId>, duration_ms: u64) -> Self {
        Self {
            shard,
            status: ShardStatus::Succeeded,
            applied,
            error: None,
            duration_ms,
        }
    }

    pub fn failed(
        shard: ShardId,
        applied: Vec<MigrationId>,
        error: ShardError,
        duration_ms: u64,
    ) -> Self {
        Self {
            shard,
            status: ShardStatus::Failed,
            applied,
            error: Some(error),
            duration_ms,
        }
    }

    pub fn cancelled(shard: ShardId, applied: Vec<MigrationId>, duration_ms: u64) -> Self {
        Self {
            shard,
            status: ShardStatus::Cancelled,
            applied,
            error: None,
            duration_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ShardStatus::Succeeded
    }
}

/// Aggregate result of one orchestrator run, one report per shard in
/// registry order.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub shards: Vec<ShardReport>,
}

impl RunReport {
    /// Whether every shard succeeded
    pub fn is_success(&self) -> bool {
        self.shards.iter().all(ShardReport::is_success)
    }

    pub fn count(&self, status: ShardStatus) -> usize {
        self.shards.iter().filter(|s| s.status == status).count()
    }

    /// Total migrations committed across all shards
    pub fn total_applied(&self) -> usize {
        self.shards.iter().map(|s| s.applied.len()).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ShardReport> {
        self.shards
            .iter()
            .filter(|s| s.status == ShardStatus::Failed)
    }

    pub fn get(&self, shard: &str) -> Option<&ShardReport> {
        self.shards.iter().find(|s| s.shard.as_str() == shard)
    }
}
