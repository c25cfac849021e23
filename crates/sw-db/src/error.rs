//! Error types for sw-db

use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Migration script execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// Ledger read or write error (D003)
    #[error("[D003] Version ledger error: {0}")]
    LedgerError(String),

    /// Transaction management error (D004)
    #[error("[D004] Transaction failed: {0}")]
    TransactionError(String),

    /// Lock table error (D005)
    #[error("[D005] Shard lock error: {0}")]
    LockError(String),

    /// Mutex poisoned (D006)
    #[error("[D006] Database mutex poisoned: {0}")]
    MutexPoisoned(String),

    /// Internal error (D007)
    #[error("[D007] Internal database error: {0}")]
    Internal(String),

    /// Database file held open by another process (D008)
    #[error("[D008] Database file is locked by another process: {0}")]
    FileLocked(String),
}

impl DbError {
    /// The process holding the file lock, as reported by DuckDB.
    ///
    /// `None` for every variant other than `FileLocked`, and when the message
    /// does not name a holder.
    pub fn file_lock_holder(&self) -> Option<String> {
        match self {
            DbError::FileLocked(msg) => msg
                .split_once(LOCK_HOLDER_MARKER)
                .map(|(_, holder)| holder.trim().to_string())
                .filter(|holder| !holder.is_empty()),
            _ => None,
        }
    }
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

const LOCK_HOLDER_MARKER: &str = "Conflicting lock is held in";

/// Returns `true` when DuckDB could not open a database file because another
/// process holds its file lock.
pub(crate) fn is_file_lock(err: &duckdb::Error) -> bool {
    is_file_lock_message(&err.to_string())
}

fn is_file_lock_message(msg: &str) -> bool {
    msg.contains("Could not set lock on file") || msg.contains(LOCK_HOLDER_MARKER)
}

/// Returns `true` when a DuckDB error comes from a write-write conflict or a
/// key violation, i.e. another writer got there first.
///
/// duckdb::Error does not expose structured variants, so the message is the
/// only signal available.
pub(crate) fn is_conflict(err: &duckdb::Error) -> bool {
    let msg = err.to_string();
    msg.contains("Conflict") || msg.contains("conflict") || msg.contains("Duplicate key")
}
