//! Shard registry: descriptors plus lazily opened, cached connections.

use crate::error::{AcquireResource, MigrateError, MigrateResult, ShardError};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use sw_core::{ShardDescriptor, ShardId};
use sw_db::{DbError, ShardConnector, ShardDatabase};
use tokio::sync::OnceCell;
use tokio::time::Instant;

/// Path reported for shards registered with an already open connection.
const ATTACHED_PATH: &str = "<attached>";

/// Retry interval used by `ShardRegistry::ledger_for` unless overridden.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// One shard known to the registry.
///
/// The connection is opened on first use and cached for the rest of the
/// process. A failed attempt is not cached, so a later call retries.
pub struct RegisteredShard {
    descriptor: ShardDescriptor,
    connector: Option<Arc<dyn ShardConnector>>,
    connection: OnceCell<Arc<dyn ShardDatabase>>,
}

impl RegisteredShard {
    fn lazy(descriptor: ShardDescriptor, connector: Arc<dyn ShardConnector>) -> Self {
        Self {
            descriptor,
            connector: Some(connector),
            connection: OnceCell::new(),
        }
    }

    fn attached(id: ShardId, db: Arc<dyn ShardDatabase>) -> Self {
        Self {
            descriptor: ShardDescriptor::new(id, ATTACHED_PATH),
            connector: None,
            connection: OnceCell::new_with(Some(db)),
        }
    }

    pub fn id(&self) -> &ShardId {
        &self.descriptor.id
    }

    pub fn descriptor(&self) -> &ShardDescriptor {
        &self.descriptor
    }

    /// Whether a connection has been opened already
    pub fn is_connected(&self) -> bool {
        self.connection.initialized()
    }

    /// Resolve the shard's connection, waiting at most `timeout`.
    ///
    /// A database file held open by another process is retried every
    /// `retry_interval` until the deadline, then reported as a lock timeout
    /// naming the holder.
    pub async fn connection(
        &self,
        timeout: Duration,
        retry_interval: Duration,
    ) -> Result<Arc<dyn ShardDatabase>, ShardError> {
        if let Some(db) = self.connection.get() {
            return Ok(Arc::clone(db));
        }
        let Some(connector) = self.connector.as_ref() else {
            return Err(ShardError::ConnectionFailed {
                shard: self.id().clone(),
                message: "no connector configured".to_string(),
            });
        };

        let started = Instant::now();
        let deadline = started + timeout;
        let mut file_lock: Option<DbError> = None;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let init = self
                .connection
                .get_or_try_init(|| connector.connect(&self.descriptor));
            match tokio::time::timeout(remaining, init).await {
                Ok(Ok(db)) => return Ok(Arc::clone(db)),
                Ok(Err(e @ DbError::FileLocked(_))) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(self.lock_timeout(started, Some(e)));
                    }
                    log::debug!("Shard {} is held by another process, retrying", self.id());
                    file_lock = Some(e);
                    tokio::time::sleep(retry_interval.min(remaining)).await;
                }
                Ok(Err(e)) => {
                    return Err(ShardError::ConnectionFailed {
                        shard: self.id().clone(),
                        message: e.to_string(),
                    })
                }
                Err(_) if file_lock.is_some() => {
                    return Err(self.lock_timeout(started, file_lock));
                }
                Err(_) => {
                    return Err(ShardError::AcquireTimeout {
                        shard: self.id().clone(),
                        resource: AcquireResource::Connection,
                        waited_ms: timeout.as_millis() as u64,
                        holder: None,
                    })
                }
            }
        }
    }

    fn lock_timeout(&self, started: Instant, last: Option<DbError>) -> ShardError {
        ShardError::AcquireTimeout {
            shard: self.id().clone(),
            resource: AcquireResource::Lock,
            waited_ms: started.elapsed().as_millis() as u64,
            holder: last.and_then(|e| e.file_lock_holder()),
        }
    }
}

/// The set of shards a run operates on, in registration order.
#[derive(Clone)]
pub struct ShardRegistry {
    shards: Vec<Arc<RegisteredShard>>,
    retry_interval: Duration,
}

impl Default for ShardRegistry {
    fn default() -> Self {
        Self {
            shards: Vec::new(),
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

impl ShardRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interval between open attempts on a shard held by another process
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Build a registry whose connections are opened through `connector`.
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = ShardDescriptor>,
        connector: Arc<dyn ShardConnector>,
    ) -> MigrateResult<Self> {
        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.register(descriptor, Arc::clone(&connector))?;
        }
        Ok(registry)
    }

    /// Register a shard to be opened lazily
    pub fn register(
        &mut self,
        descriptor: ShardDescriptor,
        connector: Arc<dyn ShardConnector>,
    ) -> MigrateResult<()> {
        self.ensure_unique(&descriptor.id)?;
        self.shards
            .push(Arc::new(RegisteredShard::lazy(descriptor, connector)));
        Ok(())
    }

    /// Register a shard with an already open connection
    pub fn register_connected(
        &mut self,
        id: ShardId,
        db: Arc<dyn ShardDatabase>,
    ) -> MigrateResult<()> {
        self.ensure_unique(&id)?;
        self.shards.push(Arc::new(RegisteredShard::attached(id, db)));
        Ok(())
    }

    fn ensure_unique(&self, id: &ShardId) -> MigrateResult<()> {
        if self.get(id.as_str()).is_some() {
            return Err(MigrateError::DuplicateShard(id.clone()));
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<RegisteredShard>> {
        self.shards.iter()
    }

    pub fn for_each<F>(&self, f: F)
    where
        F: FnMut(&Arc<RegisteredShard>),
    {
        self.shards.iter().for_each(f);
    }

    pub fn get(&self, id: &str) -> Option<&Arc<RegisteredShard>> {
        self.shards.iter().find(|s| s.id().as_str() == id)
    }

    pub fn ids(&self) -> Vec<ShardId> {
        self.shards.iter().map(|s| s.id().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    /// Restrict the registry to the named shards, keeping registration order.
    ///
    /// Cached connections are shared with `self`.
    pub fn select<S: AsRef<str>>(&self, ids: &[S]) -> MigrateResult<Self> {
        let wanted: HashSet<&str> = ids.iter().map(|s| s.as_ref()).collect();
        if let Some(unknown) = ids.iter().find(|id| self.get(id.as_ref()).is_none()) {
            return Err(MigrateError::UnknownShard(unknown.as_ref().to_string()));
        }
        Ok(Self {
            shards: self
                .shards
                .iter()
                .filter(|s| wanted.contains(s.id().as_str()))
                .cloned()
                .collect(),
            retry_interval: self.retry_interval,
        })
    }

    /// Resolve the connection of the shard named `id`, bounded by `timeout`.
    pub async fn ledger_for(
        &self,
        id: &ShardId,
        timeout: Duration,
    ) -> Result<Arc<dyn ShardDatabase>, ShardError> {
        match self.get(id.as_str()) {
            Some(shard) => shard.connection(timeout, self.retry_interval).await,
            None => Err(ShardError::ConnectionFailed {
                shard: id.clone(),
                message: "shard is not registered".to_string(),
            }),
        }
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
