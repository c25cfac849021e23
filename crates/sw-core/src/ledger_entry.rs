//! Ledger records of applied migrations.

use crate::script::{MigrationId, MigrationScript, Scope};
use crate::shard_id::ShardId;
use crate::version::Version;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// One applied migration, as recorded in a shard's ledger.
///
/// Entries are written once and never updated. `applied_at` is kept at
/// microsecond precision, the resolution of the ledger table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub shard: ShardId,
    pub id: MigrationId,
    pub description: String,
    pub checksum: String,
    pub applied_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Record for `script` applied to `shard` now.
    pub fn for_script(shard: &ShardId, script: &MigrationScript) -> Self {
        Self::for_script_at(shard, script, Utc::now())
    }

    pub fn for_script_at(shard: &ShardId, script: &MigrationScript, at: DateTime<Utc>) -> Self {
        Self {
            shard: shard.clone(),
            id: script.id().clone(),
            description: script.description().to_string(),
            checksum: script.checksum().to_string(),
            applied_at: at.trunc_subsecs(6),
        }
    }

    pub fn scope(&self) -> Scope {
        self.id.scope
    }

    pub fn version(&self) -> &Version {
        &self.id.version
    }

    /// Whether the recorded checksum still matches `script`.
    pub fn matches(&self, script: &MigrationScript) -> bool {
        self.checksum == script.checksum()
    }
}
