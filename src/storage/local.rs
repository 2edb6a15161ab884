//! Shared handle over the SQLite backend
//!
//! `LocalStore` is what the rest of the crate holds: a cloneable handle that
//! serializes access to one [`SqliteStorage`] and publishes a revision number
//! after every write so watchers know when to re-query.

use crate::state::ScanStatus;
use crate::storage::watch::{QueryDescriptor, QueryWatch};
use crate::storage::{
    Comment, ContainerStats, ItemMetadata, SqliteStorage, Storage, StorageError, StorageResult,
};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::watch;

/// Cloneable, thread-safe handle to the comment store
#[derive(Clone)]
pub struct LocalStore {
    inner: Arc<Mutex<SqliteStorage>>,
    revision: Arc<watch::Sender<u64>>,
}

impl LocalStore {
    /// Wraps an opened backend
    pub fn new(storage: SqliteStorage) -> Self {
        let (revision, _rx) = watch::channel(0);
        Self {
            inner: Arc::new(Mutex::new(storage)),
            revision: Arc::new(revision),
        }
    }

    /// Opens (or creates) the database file at `path`
    pub fn open(path: &Path) -> StorageResult<Self> {
        Ok(Self::new(SqliteStorage::new(path)?))
    }

    /// Opens a private in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        Ok(Self::new(SqliteStorage::new_in_memory()?))
    }

    fn read<T>(&self, f: impl FnOnce(&SqliteStorage) -> StorageResult<T>) -> StorageResult<T> {
        let storage = self.inner.lock().map_err(|_| StorageError::LockPoisoned)?;
        f(&storage)
    }

    fn write<T>(&self, f: impl FnOnce(&mut SqliteStorage) -> StorageResult<T>) -> StorageResult<T> {
        let result = {
            let mut storage = self.inner.lock().map_err(|_| StorageError::LockPoisoned)?;
            f(&mut storage)?
        };
        self.revision.send_modify(|rev| *rev += 1);
        Ok(result)
    }

    /// Number of writes completed through this store
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Subscribes to re-evaluations of `descriptor` after each write
    pub fn watch(&self, descriptor: QueryDescriptor) -> QueryWatch {
        QueryWatch::new(
            Arc::downgrade(&self.inner),
            self.revision.subscribe(),
            descriptor,
        )
    }

    pub(crate) fn run_query(
        storage: &Weak<Mutex<SqliteStorage>>,
        descriptor: &QueryDescriptor,
    ) -> StorageResult<Vec<Comment>> {
        let storage = storage.upgrade().ok_or(StorageError::Closed)?;
        let storage = storage.lock().map_err(|_| StorageError::LockPoisoned)?;
        descriptor.run(&*storage)
    }

    // ===== Writes =====

    pub fn upsert_comments(&self, batch: &[Comment]) -> StorageResult<usize> {
        if batch.is_empty() {
            return Ok(0);
        }
        self.write(|s| s.upsert_comments(batch))
    }

    pub fn put_item_metadata(&self, meta: &ItemMetadata) -> StorageResult<()> {
        self.write(|s| s.put_item_metadata(meta))
    }

    pub fn mark_replies_fetched(&self, comment_id: &str) -> StorageResult<()> {
        self.write(|s| s.mark_replies_fetched(comment_id))
    }

    pub fn record_scan_outcome(
        &self,
        container_id: &str,
        status: ScanStatus,
        at: DateTime<Utc>,
    ) -> StorageResult<()> {
        self.write(|s| s.record_scan_outcome(container_id, status, at))
    }

    pub fn reset_container(&self, container_id: &str) -> StorageResult<usize> {
        self.write(|s| s.reset_container(container_id))
    }

    // ===== Reads =====

    pub fn comment(&self, id: &str) -> StorageResult<Option<Comment>> {
        self.read(|s| s.get_comment(id))
    }

    pub fn replies(&self, parent_id: &str) -> StorageResult<Vec<Comment>> {
        self.read(|s| s.get_replies(parent_id))
    }

    pub fn item_metadata(&self, container_id: &str) -> StorageResult<Option<ItemMetadata>> {
        self.read(|s| s.get_item_metadata(container_id))
    }

    pub fn candidates(&self, container_id: &str, limit: usize) -> StorageResult<Vec<Comment>> {
        self.read(|s| s.candidates(container_id, limit))
    }

    pub fn top_liked(&self, container_id: &str) -> StorageResult<Vec<Comment>> {
        self.read(|s| s.top_liked(container_id))
    }

    pub fn search(&self, container_id: &str, query: &str) -> StorageResult<Vec<Comment>> {
        self.read(|s| s.search(container_id, query))
    }

    pub fn unexpanded_threads(
        &self,
        container_id: &str,
        min_score: Option<u8>,
    ) -> StorageResult<Vec<Comment>> {
        self.read(|s| s.unexpanded_threads(container_id, min_score))
    }

    pub fn container_stats(&self, container_id: &str) -> StorageResult<ContainerStats> {
        self.read(|s| s.container_stats(container_id))
    }
}
