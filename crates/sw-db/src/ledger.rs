//! Version ledger and shard lock tables.
//!
//! Both tables live in the `sw_ledger` schema of each shard's own database.
//! Ledger rows are only ever inserted; nothing in this crate updates or
//! deletes them.

use crate::error::{is_conflict, DbError, DbResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use duckdb::Connection;
use sw_core::{LedgerEntry, MigrationId, Scope, ShardId, Version};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const LEDGER_DDL: &str = "
CREATE SCHEMA IF NOT EXISTS sw_ledger;
CREATE TABLE IF NOT EXISTS sw_ledger.applied_migrations (
    shard_id    VARCHAR   NOT NULL,
    scope       VARCHAR   NOT NULL,
    version     VARCHAR   NOT NULL,
    description VARCHAR   NOT NULL,
    checksum    VARCHAR   NOT NULL,
    applied_at  TIMESTAMP NOT NULL,
    PRIMARY KEY (shard_id, scope, version)
);
CREATE TABLE IF NOT EXISTS sw_ledger.shard_locks (
    shard_id    VARCHAR   PRIMARY KEY,
    owner       VARCHAR   NOT NULL,
    acquired_at TIMESTAMP NOT NULL
);";

fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.naive_utc().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

fn parse_timestamp(raw: &str) -> DbResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| DbError::LedgerError(format!("invalid applied_at '{raw}': {e}")))
}

/// Ensure the `sw_ledger` schema and its tables exist.
pub fn ensure_ledger_tables(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(LEDGER_DDL)
        .map_err(|e| DbError::LedgerError(format!("failed to create ledger tables: {e}")))
}

/// Whether the ledger table has been created in this database.
pub fn ledger_exists(conn: &Connection) -> DbResult<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM information_schema.tables
             WHERE table_schema = 'sw_ledger' AND table_name = 'applied_migrations'",
            [],
            |row| row.get(0),
        )
        .map_err(|e| DbError::LedgerError(format!("failed to inspect ledger: {e}")))?;
    Ok(count > 0)
}

/// Read every entry recorded for `shard`, sorted in apply order.
///
/// A database that has never been migrated has no ledger table yet; that
/// reads as an empty ledger rather than an error.
pub fn recorded_versions(conn: &Connection, shard: &ShardId) -> DbResult<Vec<LedgerEntry>> {
    let read_err = |e: duckdb::Error| DbError::LedgerError(format!("failed to read ledger: {e}"));

    if !ledger_exists(conn)? {
        return Ok(Vec::new());
    }

    let mut stmt = conn
        .prepare(
            "SELECT scope, version, description, checksum, CAST(applied_at AS VARCHAR)
             FROM sw_ledger.applied_migrations
             WHERE shard_id = ?",
        )
        .map_err(read_err)?;

    let rows = stmt
        .query_map(duckdb::params![shard.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })
        .map_err(read_err)?;

    let mut entries = Vec::new();
    for row in rows {
        let (scope, version, description, checksum, applied_at) = row.map_err(read_err)?;
        let scope: Scope = scope
            .parse()
            .map_err(|e| DbError::LedgerError(format!("corrupt ledger row: {e}")))?;
        let version = Version::parse(&version)
            .map_err(|e| DbError::LedgerError(format!("corrupt ledger row: {e}")))?;
        entries.push(LedgerEntry {
            shard: shard.clone(),
            id: MigrationId::new(scope, version),
            description,
            checksum,
            applied_at: parse_timestamp(&applied_at)?,
        });
    }
    entries.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(entries)
}

/// Insert one ledger entry. Callers run this inside the migration's
/// transaction.
pub fn append(conn: &Connection, entry: &LedgerEntry) -> DbResult<()> {
    conn.execute(
        "INSERT INTO sw_ledger.applied_migrations
             (shard_id, scope, version, description, checksum, applied_at)
         VALUES (?, ?, ?, ?, ?, CAST(? AS TIMESTAMP))",
        duckdb::params![
            entry.shard.as_str(),
            entry.id.scope.as_str(),
            entry.id.version.to_string(),
            entry.description,
            entry.checksum,
            format_timestamp(&entry.applied_at),
        ],
    )
    .map_err(|e| DbError::LedgerError(format!("failed to record {}: {e}", entry.id)))?;
    Ok(())
}

/// Take the lock row for `shard` if nobody holds it.
pub fn try_lock(conn: &Connection, shard: &ShardId, owner: &str) -> DbResult<bool> {
    let inserted = conn.execute(
        "INSERT INTO sw_ledger.shard_locks (shard_id, owner, acquired_at)
         VALUES (?, ?, CAST(? AS TIMESTAMP))
         ON CONFLICT DO NOTHING",
        duckdb::params![shard.as_str(), owner, format_timestamp(&Utc::now())],
    );
    match inserted {
        Ok(1) => Ok(true),
        Ok(_) => Ok(lock_owner(conn, shard)?.as_deref() == Some(owner)),
        // A concurrent writer inserted the same row first
        Err(e) if is_conflict(&e) => Ok(false),
        Err(e) => Err(DbError::LockError(format!("failed to lock {shard}: {e}"))),
    }
}

/// Delete the lock row for `shard` if `owner` holds it.
pub fn unlock(conn: &Connection, shard: &ShardId, owner: &str) -> DbResult<()> {
    conn.execute(
        "DELETE FROM sw_ledger.shard_locks WHERE shard_id = ? AND owner = ?",
        duckdb::params![shard.as_str(), owner],
    )
    .map_err(|e| DbError::LockError(format!("failed to unlock {shard}: {e}")))?;
    Ok(())
}

/// The current holder of the lock for `shard`.
pub fn lock_owner(conn: &Connection, shard: &ShardId) -> DbResult<Option<String>> {
    let lock_err = |e: duckdb::Error| DbError::LockError(format!("failed to read lock: {e}"));
    let mut stmt = conn
        .prepare("SELECT owner FROM sw_ledger.shard_locks WHERE shard_id = ?")
        .map_err(lock_err)?;
    let mut rows = stmt
        .query_map(duckdb::params![shard.as_str()], |row| row.get::<_, String>(0))
        .map_err(lock_err)?;
    rows.next().transpose().map_err(lock_err)
}

/// Delete the lock row for `shard` whoever holds it.
pub fn break_lock(conn: &Connection, shard: &ShardId) -> DbResult<bool> {
    let deleted = conn
        .execute(
            "DELETE FROM sw_ledger.shard_locks WHERE shard_id = ?",
            duckdb::params![shard.as_str()],
        )
        .map_err(|e| DbError::LockError(format!("failed to break lock on {shard}: {e}")))?;
    Ok(deleted > 0)
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
