//! DuckDB shard backend implementation

use crate::error::{is_file_lock, DbError, DbResult};
use crate::ledger;
use crate::traits::{AdvisoryLock, ShardConnector, ShardDatabase, ShardExecutor, VersionLedger};
use async_trait::async_trait;
use duckdb::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use sw_core::{LedgerEntry, ShardDescriptor, ShardId};

/// A single shard backed by a DuckDB database
pub struct DuckDbShard {
    conn: Mutex<Connection>,
}

impl DuckDbShard {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self::from_connection(conn))
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path).map_err(|e| {
            if is_file_lock(&e) {
                DbError::FileLocked(e.to_string())
            } else {
                DbError::ConnectionError(format!("{e}: {}", path.display()))
            }
        })?;
        Ok(Self::from_connection(conn))
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == sw_core::config::IN_MEMORY_PATH {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Open a second connection to the same database.
    ///
    /// Used to model two independent runs against one shard.
    pub fn try_clone(&self) -> DbResult<Self> {
        let conn = self.lock()?;
        let cloned = conn
            .try_clone()
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self::from_connection(cloned))
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    /// Execute `body` within a `BEGIN` / `COMMIT` transaction, rolling back on
    /// error.
    fn transaction<F, T>(&self, body: F) -> DbResult<T>
    where
        F: FnOnce(&Connection) -> DbResult<T>,
    {
        let conn = self.lock()?;
        conn.execute_batch("BEGIN TRANSACTION")
            .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {e}")))?;

        let result = body(&conn);

        match &result {
            Ok(_) => {
                if let Err(commit_err) = conn.execute_batch("COMMIT") {
                    let _ = conn.execute_batch("ROLLBACK");
                    return Err(DbError::TransactionError(format!(
                        "COMMIT failed: {commit_err}"
                    )));
                }
            }
            Err(_) => {
                if let Err(rollback_err) = conn.execute_batch("ROLLBACK") {
                    log::warn!("ROLLBACK failed: {rollback_err}");
                }
            }
        }
        result
    }

    /// Check if relation exists synchronously
    fn relation_exists_sync(&self, name: &str) -> DbResult<bool> {
        let conn = self.lock()?;

        // Handle schema-qualified names
        let (schema, table) = match name.rsplit_once('.') {
            Some((schema, table)) => (schema, table),
            None => ("main", name),
        };

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = ? AND table_name = ?",
                duckdb::params![schema, table],
                |row| row.get(0),
            )
            .map_err(|e| DbError::ExecutionError(e.to_string()))?;

        Ok(count > 0)
    }
}

#[async_trait]
impl ShardExecutor for DuckDbShard {
    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)
            .map_err(|e| DbError::ExecutionError(e.to_string()))
    }

    async fn relation_exists(&self, name: &str) -> DbResult<bool> {
        self.relation_exists_sync(name)
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

#[async_trait]
impl VersionLedger for DuckDbShard {
    async fn ensure_ledger(&self) -> DbResult<()> {
        let conn = self.lock()?;
        ledger::ensure_ledger_tables(&conn)
    }

    async fn ledger_exists(&self) -> DbResult<bool> {
        let conn = self.lock()?;
        ledger::ledger_exists(&conn)
    }

    async fn recorded_versions(&self, shard: &ShardId) -> DbResult<Vec<LedgerEntry>> {
        let conn = self.lock()?;
        ledger::recorded_versions(&conn, shard)
    }

    async fn append_applied(
        &self,
        shard: &ShardId,
        sql: &str,
        entry: &LedgerEntry,
    ) -> DbResult<()> {
        debug_assert_eq!(&entry.shard, shard);
        self.transaction(|conn| {
            conn.execute_batch(sql)
                .map_err(|e| DbError::ExecutionError(e.to_string()))?;
            ledger::append(conn, entry)
        })
    }
}

#[async_trait]
impl AdvisoryLock for DuckDbShard {
    async fn try_lock(&self, shard: &ShardId, owner: &str) -> DbResult<bool> {
        let conn = self.lock()?;
        ledger::try_lock(&conn, shard, owner)
    }

    async fn unlock(&self, shard: &ShardId, owner: &str) -> DbResult<()> {
        let conn = self.lock()?;
        ledger::unlock(&conn, shard, owner)
    }

    async fn lock_owner(&self, shard: &ShardId) -> DbResult<Option<String>> {
        let conn = self.lock()?;
        ledger::lock_owner(&conn, shard)
    }

    async fn break_lock(&self, shard: &ShardId) -> DbResult<bool> {
        let conn = self.lock()?;
        ledger::break_lock(&conn, shard)
    }
}

/// Opens DuckDB shards by path.
///
/// Opening runs on the blocking pool so a slow filesystem cannot stall the
/// async workers and a connect timeout can fire.
#[derive(Debug, Default, Clone)]
pub struct DuckDbConnector;

impl DuckDbConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ShardConnector for DuckDbConnector {
    async fn connect(&self, shard: &ShardDescriptor) -> DbResult<Arc<dyn ShardDatabase>> {
        let path = shard.path.clone();
        let db = tokio::task::spawn_blocking(move || DuckDbShard::new(&path))
            .await
            .map_err(|e| DbError::Internal(format!("connect task failed: {e}")))??;
        log::debug!("Connected to shard {} ({})", shard.id, shard.path);
        Ok(Arc::new(db))
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
