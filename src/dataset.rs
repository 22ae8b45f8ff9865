// Dataset handle - async access to a blocking TransactionStore
//
// Every store call runs on the blocking pool with a timeout. A read/write
// gate keeps imports and aggregations apart: an import holds the write
// side for its whole batch, an aggregation holds the read side for all of
// its reads, so it never sees a half-imported dataset and all of its reads
// see the same state.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{info, warn};

use crate::db::{ImportRecord, ListQuery, StoreError, StoreResult, Transaction, TransactionStore};

#[derive(Error, Debug)]
pub enum QueryError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Store read timed out after {0:?}")]
    Timeout(Duration),
    #[error("Store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type QueryResult<T> = Result<T, QueryError>;

/// Shared read guard held for the duration of one aggregation
pub type Snapshot<'a> = RwLockReadGuard<'a, ()>;

#[derive(Clone)]
pub struct Dataset {
    store: Arc<dyn TransactionStore>,
    gate: Arc<RwLock<()>>,
    read_timeout: Duration,
}

impl Dataset {
    pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self::with_read_timeout(store, Self::DEFAULT_READ_TIMEOUT)
    }

    pub fn with_read_timeout(store: Arc<dyn TransactionStore>, read_timeout: Duration) -> Self {
        Self {
            store,
            gate: Arc::new(RwLock::new(())),
            read_timeout,
        }
    }

    /// Take the read side of the gate. Not re-entrant: a queued import
    /// would block a second acquisition from the same task.
    pub async fn snapshot(&self) -> Snapshot<'_> {
        self.gate.read().await
    }

    /// Run one blocking store call. Callers must already hold a snapshot
    /// (or the write side) when consistency across calls matters.
    pub async fn run<T, F>(&self, op: F) -> QueryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn TransactionStore) -> StoreResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let task = tokio::task::spawn_blocking(move || op(store.as_ref()));

        match tokio::time::timeout(self.read_timeout, task).await {
            Ok(joined) => Ok(joined??),
            Err(_) => {
                warn!(timeout = ?self.read_timeout, "Store read timed out");
                Err(QueryError::Timeout(self.read_timeout))
            }
        }
    }

    pub async fn list(&self, query: ListQuery) -> QueryResult<Vec<Transaction>> {
        let _snapshot = self.snapshot().await;
        self.run(move |store| store.list(&query)).await
    }

    pub async fn count(&self) -> QueryResult<u64> {
        let _snapshot = self.snapshot().await;
        self.run(|store| store.count()).await
    }

    /// Insert a batch under the write side of the gate.
    /// Returns the number of newly inserted records.
    pub async fn import(&self, records: Vec<Transaction>, source: &str) -> QueryResult<usize> {
        let _exclusive = self.gate.write().await;
        let received = records.len();

        // imports are not bounded by the read timeout
        let store = Arc::clone(&self.store);
        let source_name = source.to_string();
        let inserted = tokio::task::spawn_blocking(move || {
            let inserted = store.insert_many(&records)?;
            store.record_import(&ImportRecord::new(&source_name, received, inserted))?;
            Ok::<_, StoreError>(inserted)
        })
        .await??;

        info!(source, received, inserted, skipped = received - inserted, "Import complete");
        Ok(inserted)
    }
}
