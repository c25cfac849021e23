//! Per-shard apply plans and migration state.

use crate::error::ShardError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use sw_core::{LedgerEntry, MigrationCatalog, MigrationId, MigrationScript, ShardId, Version};

/// The scripts still to be applied to one shard, in apply order.
#[derive(Debug, Clone)]
pub struct ApplyPlan {
    shard: ShardId,
    pending: Vec<Arc<MigrationScript>>,
    unknown: Vec<MigrationId>,
}

impl ApplyPlan {
    /// Compare the catalog with what `shard` has recorded.
    ///
    /// Any recorded entry whose checksum differs from its script fails the
    /// whole plan with `DriftDetected`, so nothing is applied to a drifted
    /// shard. Scripts above `target` are left out. Entries with no script in
    /// the catalog are logged and otherwise ignored.
    pub fn compute(
        shard: &ShardId,
        catalog: &MigrationCatalog,
        recorded: &[LedgerEntry],
        target: Option<&Version>,
    ) -> Result<Self, ShardError> {
        let by_id: HashMap<&MigrationId, &LedgerEntry> =
            recorded.iter().map(|e| (&e.id, e)).collect();

        let mut pending = Vec::new();
        for script in catalog.apply_sequence() {
            match by_id.get(script.id()) {
                Some(entry) if !entry.matches(script) => {
                    return Err(ShardError::DriftDetected {
                        shard: shard.clone(),
                        migration: script.id().clone(),
                        recorded: entry.checksum.clone(),
                        current: script.checksum().to_string(),
                    });
                }
                Some(_) => {}
                None if is_above(script.version(), target) => {}
                None => pending.push(Arc::clone(script)),
            }
        }

        let unknown = unknown_entries(catalog, recorded);
        for id in &unknown {
            log::warn!("Shard {shard} has ledger entry {id} with no matching script");
        }

        Ok(Self {
            shard: shard.clone(),
            pending,
            unknown,
        })
    }

    pub fn shard(&self) -> &ShardId {
        &self.shard
    }

    /// Scripts to apply, in order
    pub fn pending(&self) -> &[Arc<MigrationScript>] {
        &self.pending
    }

    /// Ledger entries not present in the catalog
    pub fn unknown(&self) -> &[MigrationId] {
        &self.unknown
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

fn is_above(version: &Version, target: Option<&Version>) -> bool {
    target.is_some_and(|t| version > t)
}

fn unknown_entries(catalog: &MigrationCatalog, recorded: &[LedgerEntry]) -> Vec<MigrationId> {
    recorded
        .iter()
        .filter(|e| catalog.get(&e.id).is_none())
        .map(|e| e.id.clone())
        .collect()
}

/// State of one migration on one shard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationState {
    /// Recorded in the ledger with a matching checksum
    Applied,
    /// Not yet recorded
    Pending,
    /// Recorded with a checksum the script no longer has
    Drifted,
    /// Not recorded, and beyond the run's target version
    AboveTarget,
    /// Recorded, but no such script exists any more
    Missing,
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MigrationState::Applied => "applied",
            MigrationState::Pending => "pending",
            MigrationState::Drifted => "drifted",
            MigrationState::AboveTarget => "above target",
            MigrationState::Missing => "missing",
        };
        f.write_str(s)
    }
}

/// One row of [`ShardInfo`]
#[derive(Debug, Clone, Serialize)]
pub struct MigrationStatus {
    pub id: MigrationId,
    pub description: String,
    pub state: MigrationState,
    /// Checksum of the script, or of the ledger entry for missing scripts
    pub checksum: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<DateTime<Utc>>,
}

/// Every catalog migration and ledger entry of one shard, in apply order.
#[derive(Debug, Clone, Serialize)]
pub struct ShardInfo {
    pub shard: ShardId,
    pub migrations: Vec<MigrationStatus>,
}

impl ShardInfo {
    pub fn build(
        shard: &ShardId,
        catalog: &MigrationCatalog,
        recorded: &[LedgerEntry],
        target: Option<&Version>,
    ) -> Self {
        let by_id: HashMap<&MigrationId, &LedgerEntry> =
            recorded.iter().map(|e| (&e.id, e)).collect();

        let mut migrations: Vec<MigrationStatus> = catalog
            .apply_sequence()
            .iter()
            .map(|script| {
                let entry = by_id.get(script.id());
                let state = match entry {
                    Some(e) if e.matches(script) => MigrationState::Applied,
                    Some(_) => MigrationState::Drifted,
                    None if is_above(script.version(), target) => MigrationState::AboveTarget,
                    None => MigrationState::Pending,
                };
                MigrationStatus {
                    id: script.id().clone(),
                    description: script.description().to_string(),
                    state,
                    checksum: script.checksum().to_string(),
                    applied_at: entry.map(|e| e.applied_at),
                }
            })
            .collect();

        migrations.extend(
            recorded
                .iter()
                .filter(|e| catalog.get(&e.id).is_none())
                .map(|e| MigrationStatus {
                    id: e.id.clone(),
                    description: e.description.clone(),
                    state: MigrationState::Missing,
                    checksum: e.checksum.clone(),
                    applied_at: Some(e.applied_at),
                }),
        );
        migrations.sort_by(|a, b| a.id.cmp(&b.id));

        Self {
            shard: shard.clone(),
            migrations,
        }
    }

    pub fn count(&self, state: MigrationState) -> usize {
        self.migrations.iter().filter(|m| m.state == state).count()
    }

    /// The first drifted migration, if any
    pub fn first_drift(&self) -> Option<&MigrationStatus> {
        self.migrations
            .iter()
            .find(|m| m.state == MigrationState::Drifted)
    }
}

#[cfg(test)]
#[path = "plan_test.rs"]
mod tests;
