//! sw-db - Database layer for Shardway
//!
//! This crate provides the shard traits (`ShardExecutor`, `VersionLedger`,
//! `AdvisoryLock`, and their union `ShardDatabase`), the `ShardConnector`
//! used by the shard registry, and the DuckDB implementation of all of them.

pub mod duckdb;
pub mod error;
pub mod ledger;
pub mod traits;

pub use duckdb::{DuckDbConnector, DuckDbShard};
pub use error::{DbError, DbResult};
pub use traits::{AdvisoryLock, ShardConnector, ShardDatabase, ShardExecutor, VersionLedger};
