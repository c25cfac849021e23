//! Drives migrations across every registered shard.
//!
//! Shards run concurrently on a bounded worker pool; migrations within one
//! shard run strictly in order. Each shard is isolated: whatever happens to
//! it ends up in its own [`ShardReport`] and never stops the others.

use crate::error::{AcquireResource, MigrateError, MigrateResult, ShardError};
use crate::plan::{ApplyPlan, ShardInfo};
use crate::registry::{RegisteredShard, ShardRegistry};
use crate::report::{RunReport, ShardReport};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use sw_core::{Config, LedgerEntry, MigrationCatalog, MigrationId, ShardId, Version};
use sw_db::{DbError, ShardDatabase};
use tokio::sync::Semaphore;
use tokio::time::Instant;

/// Tuning for a run
#[derive(Debug, Clone)]
pub struct MigrateOptions {
    /// Maximum number of shards migrated at once
    pub threads: usize,
    pub connect_timeout: Duration,
    pub lock_timeout: Duration,
    pub lock_poll_interval: Duration,
    /// Apply nothing above this version
    pub target: Option<Version>,
}

impl Default for MigrateOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl MigrateOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            threads: config.threads,
            connect_timeout: config.connect_timeout(),
            lock_timeout: config.lock_timeout(),
            lock_poll_interval: config.lock_poll_interval(),
            target: config.target.clone(),
        }
    }
}

/// Shared cancellation signal for a run.
///
/// Shards check it before each migration. A migration already executing
/// finishes or rolls back normally.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Called once per shard as soon as its report is final
pub type ProgressFn = Arc<dyn Fn(&ShardReport) + Send + Sync>;

/// Result of a read-only operation on one shard
#[derive(Debug)]
pub struct ShardOutcome<T> {
    pub shard: ShardId,
    pub result: Result<T, ShardError>,
}

/// State shared by every shard task of one run
struct RunContext {
    catalog: Arc<MigrationCatalog>,
    options: MigrateOptions,
    run_id: String,
    cancel: CancelFlag,
}

enum Completion {
    Finished,
    Cancelled,
}

pub struct Orchestrator {
    catalog: Arc<MigrationCatalog>,
    registry: ShardRegistry,
    options: MigrateOptions,
    progress: Option<ProgressFn>,
}

impl Orchestrator {
    pub fn new(catalog: Arc<MigrationCatalog>, registry: ShardRegistry, options: MigrateOptions) -> Self {
        Self {
            catalog,
            registry,
            options,
            progress: None,
        }
    }

    pub fn with_progress<F>(mut self, progress: F) -> Self
    where
        F: Fn(&ShardReport) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(progress));
        self
    }

    pub fn catalog(&self) -> &MigrationCatalog {
        &self.catalog
    }

    pub fn registry(&self) -> &ShardRegistry {
        &self.registry
    }

    pub fn options(&self) -> &MigrateOptions {
        &self.options
    }

    /// Migrate every registered shard.
    ///
    /// Never fails as a whole; per-shard failures are in the report.
    pub async fn run(&self, cancel: &CancelFlag) -> RunReport {
        let run_id = format!("sw-{}", uuid::Uuid::new_v4());
        let started_at = Utc::now();
        let threads = self.options.threads.max(1);
        log::info!(
            "Run {run_id}: {} migrations across {} shards ({threads} threads)",
            self.catalog.len(),
            self.registry.len()
        );

        let ctx = Arc::new(RunContext {
            catalog: Arc::clone(&self.catalog),
            options: self.options.clone(),
            run_id: run_id.clone(),
            cancel: cancel.clone(),
        });

        // Create a semaphore to limit concurrent shards
        let semaphore = Arc::new(Semaphore::new(threads));
        let mut handles = Vec::with_capacity(self.registry.len());

        for shard in self.registry.iter() {
            let shard = Arc::clone(shard);
            let ctx = Arc::clone(&ctx);
            let semaphore = Arc::clone(&semaphore);
            let progress = self.progress.clone();
            let id = shard.id().clone();

            let handle = tokio::spawn(async move {
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    // Semaphore was closed -- treat as cancellation
                    Err(_) => return ShardReport::cancelled(shard.id().clone(), Vec::new(), 0),
                };

                let report = migrate_shard(&ctx, &shard).await;
                if let Some(ref progress) = progress {
                    progress(&report);
                }
                report
            });
            handles.push((id, handle));
        }

        let mut shards = Vec::with_capacity(handles.len());
        for (id, handle) in handles {
            match handle.await {
                Ok(report) => shards.push(report),
                Err(e) => {
                    log::error!("Shard {id}: task join error: {e}");
                    let error = ShardError::Internal {
                        shard: id.clone(),
                        message: e.to_string(),
                    };
                    shards.push(ShardReport::failed(id, Vec::new(), error, 0));
                }
            }
        }

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            shards,
        };
        log::info!(
            "Run {}: {} applied, {} shards failed",
            report.run_id,
            report.total_applied(),
            report.failures().count()
        );
        report
    }

    /// Compute each shard's plan without applying anything. No lock is taken.
    pub async fn plan(&self) -> Vec<ShardOutcome<ApplyPlan>> {
        let target = self.options.target.as_ref();
        self.read_ledgers()
            .await
            .into_iter()
            .map(|(shard, recorded)| {
                let result = recorded
                    .and_then(|r| ApplyPlan::compute(&shard, &self.catalog, &r, target));
                ShardOutcome { shard, result }
            })
            .collect()
    }

    /// State of every migration on every shard
    pub async fn inspect(&self) -> Vec<ShardOutcome<ShardInfo>> {
        let target = self.options.target.as_ref();
        self.read_ledgers()
            .await
            .into_iter()
            .map(|(shard, recorded)| {
                let result = recorded.map(|r| ShardInfo::build(&shard, &self.catalog, &r, target));
                ShardOutcome { shard, result }
            })
            .collect()
    }

    /// Check every shard for drift. Pending migrations are not an error.
    pub async fn validate(&self) -> Vec<ShardOutcome<()>> {
        self.plan()
            .await
            .into_iter()
            .map(|outcome| ShardOutcome {
                shard: outcome.shard,
                result: outcome.result.map(|_| ()),
            })
            .collect()
    }

    /// Remove a stale lock from `shard`, returning who held it.
    pub async fn unlock(&self, shard: &str) -> MigrateResult<Option<String>> {
        let entry = self
            .registry
            .get(shard)
            .ok_or_else(|| MigrateError::UnknownShard(shard.to_string()))?;
        let id = entry.id();
        let db = entry
            .connection(self.options.connect_timeout, self.options.lock_poll_interval)
            .await?;
        let ledger_err = |e: DbError| ledger_failure(id, e);

        if !db.ledger_exists().await.map_err(ledger_err)? {
            log::info!("Shard {id}: no ledger, nothing to unlock");
            return Ok(None);
        }
        let holder = db.lock_owner(id).await.map_err(ledger_err)?;
        if db.break_lock(id).await.map_err(ledger_err)? {
            log::warn!(
                "Shard {id}: broke lock held by {}",
                holder.as_deref().unwrap_or("unknown")
            );
        }
        Ok(holder)
    }

    async fn read_ledgers(&self) -> Vec<(ShardId, Result<Vec<LedgerEntry>, ShardError>)> {
        let timeout = self.options.connect_timeout;
        let retry = self.options.lock_poll_interval;
        stream::iter(self.registry.iter())
            .map(|shard| async move {
                let recorded = read_ledger(shard, timeout, retry).await;
                (shard.id().clone(), recorded)
            })
            .buffered(self.options.threads.max(1))
            .collect()
            .await
    }
}

async fn read_ledger(
    shard: &RegisteredShard,
    timeout: Duration,
    retry_interval: Duration,
) -> Result<Vec<LedgerEntry>, ShardError> {
    let db = shard.connection(timeout, retry_interval).await?;
    db.recorded_versions(shard.id())
        .await
        .map_err(|e| ledger_failure(shard.id(), e))
}

fn ledger_failure(shard: &ShardId, e: DbError) -> ShardError {
    ShardError::LedgerFailure {
        shard: shard.clone(),
        message: e.to_string(),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

/// Run one shard from connection to lock release
async fn migrate_shard(ctx: &RunContext, shard: &RegisteredShard) -> ShardReport {
    let started = Instant::now();
    let id = shard.id();

    if ctx.cancel.is_cancelled() {
        log::info!("Shard {id}: cancelled before start");
        return ShardReport::cancelled(id.clone(), Vec::new(), 0);
    }

    let db = match shard
        .connection(ctx.options.connect_timeout, ctx.options.lock_poll_interval)
        .await
    {
        Ok(db) => db,
        Err(e) => return fail(id, Vec::new(), e, started),
    };
    if let Err(e) = db.ensure_ledger().await {
        return fail(id, Vec::new(), ledger_failure(id, e), started);
    }
    if let Err(e) = acquire_lock(db.as_ref(), id, &ctx.run_id, &ctx.options).await {
        return fail(id, Vec::new(), e, started);
    }

    let (applied, outcome) = apply_locked(ctx, db.as_ref(), id).await;

    if let Err(e) = db.unlock(id, &ctx.run_id).await {
        log::warn!("Shard {id}: failed to release lock: {e}");
    }

    match outcome {
        Ok(Completion::Finished) => {
            log::info!(
                "Shard {id}: applied {} migrations in {}ms",
                applied.len(),
                elapsed_ms(started)
            );
            ShardReport::succeeded(id.clone(), applied, elapsed_ms(started))
        }
        Ok(Completion::Cancelled) => {
            log::info!("Shard {id}: cancelled after {} migrations", applied.len());
            ShardReport::cancelled(id.clone(), applied, elapsed_ms(started))
        }
        Err(e) => fail(id, applied, e, started),
    }
}

fn fail(id: &ShardId, applied: Vec<MigrationId>, error: ShardError, started: Instant) -> ShardReport {
    log::warn!("Shard {id}: {error}");
    ShardReport::failed(id.clone(), applied, error, elapsed_ms(started))
}

/// Poll the shard lock until it is ours or `lock_timeout` has passed
async fn acquire_lock(
    db: &dyn ShardDatabase,
    shard: &ShardId,
    owner: &str,
    options: &MigrateOptions,
) -> Result<(), ShardError> {
    let started = Instant::now();
    let deadline = started + options.lock_timeout;
    loop {
        match db.try_lock(shard, owner).await {
            Ok(true) => {
                log::debug!("Shard {shard}: lock acquired by {owner}");
                return Ok(());
            }
            Ok(false) => {}
            Err(e) => return Err(ledger_failure(shard, e)),
        }

        let now = Instant::now();
        if now >= deadline {
            let holder = db.lock_owner(shard).await.ok().flatten();
            return Err(ShardError::AcquireTimeout {
                shard: shard.clone(),
                resource: AcquireResource::Lock,
                waited_ms: elapsed_ms(started),
                holder,
            });
        }
        tokio::time::sleep(options.lock_poll_interval.min(deadline - now)).await;
    }
}

/// Plan and apply while holding the shard lock
async fn apply_locked(
    ctx: &RunContext,
    db: &dyn ShardDatabase,
    shard: &ShardId,
) -> (Vec<MigrationId>, Result<Completion, ShardError>) {
    let mut applied = Vec::new();

    let recorded = match db.recorded_versions(shard).await {
        Ok(recorded) => recorded,
        Err(e) => return (applied, Err(ledger_failure(shard, e))),
    };
    let plan = match ApplyPlan::compute(shard, &ctx.catalog, &recorded, ctx.options.target.as_ref()) {
        Ok(plan) => plan,
        Err(e) => return (applied, Err(e)),
    };
    if plan.is_empty() {
        log::info!("Shard {shard}: up to date");
    }

    for script in plan.pending() {
        if ctx.cancel.is_cancelled() {
            return (applied, Ok(Completion::Cancelled));
        }

        log::debug!("Shard {shard}: applying {} ({})", script.id(), script.file_name());
        let entry = LedgerEntry::for_script(shard, script);
        match db.append_applied(shard, script.content(), &entry).await {
            Ok(()) => applied.push(script.id().clone()),
            Err(DbError::ExecutionError(message)) => {
                let error = ShardError::ScriptExecutionFailure {
                    shard: shard.clone(),
                    migration: script.id().clone(),
                    message,
                };
                return (applied, Err(error));
            }
            Err(e) => {
                let error = ShardError::LedgerFailure {
                    shard: shard.clone(),
                    message: format!("{}: {e}", script.id()),
                };
                return (applied, Err(error));
            }
        }
    }
    (applied, Ok(Completion::Finished))
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
