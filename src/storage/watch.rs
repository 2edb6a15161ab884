//! Change subscriptions over the bounded query shapes
//!
//! The store does not push result sets. It bumps a revision after each write;
//! a [`QueryWatch`] waits for that bump and re-runs its one-shot query.

use crate::storage::{Comment, LocalStore, SqliteStorage, Storage, StorageResult};
use std::sync::{Mutex, Weak};
use tokio::sync::watch;

/// One of the bounded read shapes, with its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryDescriptor {
    Candidates { container_id: String, limit: usize },
    TopLiked { container_id: String },
    Search { container_id: String, query: String },
}

impl QueryDescriptor {
    pub(crate) fn run(&self, storage: &SqliteStorage) -> StorageResult<Vec<Comment>> {
        match self {
            Self::Candidates {
                container_id,
                limit,
            } => storage.candidates(container_id, *limit),
            Self::TopLiked { container_id } => storage.top_liked(container_id),
            Self::Search {
                container_id,
                query,
            } => storage.search(container_id, query),
        }
    }
}

/// A restartable stream of result snapshots for one query
///
/// Holds only a weak reference to the store; once every [`LocalStore`] handle
/// is dropped, [`QueryWatch::next`] returns `None`.
pub struct QueryWatch {
    storage: Weak<Mutex<SqliteStorage>>,
    revision: watch::Receiver<u64>,
    descriptor: QueryDescriptor,
}

impl QueryWatch {
    pub(crate) fn new(
        storage: Weak<Mutex<SqliteStorage>>,
        revision: watch::Receiver<u64>,
        descriptor: QueryDescriptor,
    ) -> Self {
        Self {
            storage,
            revision,
            descriptor,
        }
    }

    pub fn descriptor(&self) -> &QueryDescriptor {
        &self.descriptor
    }

    /// Runs the query now and marks the current revision as seen
    pub fn snapshot(&mut self) -> StorageResult<Vec<Comment>> {
        self.revision.borrow_and_update();
        LocalStore::run_query(&self.storage, &self.descriptor)
    }

    /// Waits for the next write, then returns a fresh snapshot
    ///
    /// Several writes landing between two calls yield a single snapshot.
    pub async fn next(&mut self) -> Option<StorageResult<Vec<Comment>>> {
        self.revision.changed().await.ok()?;
        Some(self.snapshot())
    }
}
