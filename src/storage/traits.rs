//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::state::ScanStatus;
use crate::storage::{Comment, ContainerStats, ItemMetadata};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Comment not found: {0}")]
    CommentNotFound(String),

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Storage has been closed")]
    Closed,

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Reads reflect every write that completed before them on the same handle.
/// There is no ordering guarantee between independent handles.
pub trait Storage {
    // ===== Comments =====

    /// Inserts or updates a batch of comments in one transaction
    ///
    /// Keyed by comment id. The last write wins on every field except
    /// `replies_fetched`, which only ever goes from false to true.
    ///
    /// # Returns
    ///
    /// The number of comments written
    fn upsert_comments(&mut self, batch: &[Comment]) -> StorageResult<usize>;

    /// Gets a comment by id
    fn get_comment(&self, id: &str) -> StorageResult<Option<Comment>>;

    /// Gets the stored replies of a thread, oldest first
    fn get_replies(&self, parent_id: &str) -> StorageResult<Vec<Comment>>;

    /// Flags a thread as fully expanded
    fn mark_replies_fetched(&mut self, comment_id: &str) -> StorageResult<()>;

    // ===== Item Metadata =====

    /// Stores item metadata, replacing any existing row for the container
    fn put_item_metadata(&mut self, meta: &ItemMetadata) -> StorageResult<()>;

    /// Gets the metadata row for a container
    fn get_item_metadata(&self, container_id: &str) -> StorageResult<Option<ItemMetadata>>;

    /// Stamps the outcome of a scan run on an existing metadata row
    ///
    /// Does nothing if the container has no metadata row.
    fn record_scan_outcome(
        &mut self,
        container_id: &str,
        status: ScanStatus,
        at: DateTime<Utc>,
    ) -> StorageResult<()>;

    // ===== Reset =====

    /// Deletes every comment and the metadata row of a container
    ///
    /// # Returns
    ///
    /// The number of comments deleted
    fn reset_container(&mut self, container_id: &str) -> StorageResult<usize>;

    // ===== Bounded Queries =====

    /// Comments scoring 1..=100, highest score first, at most `limit`
    fn candidates(&self, container_id: &str, limit: usize) -> StorageResult<Vec<Comment>>;

    /// Most liked comments first, at most [`crate::storage::BROWSE_PAGE_SIZE`]
    fn top_liked(&self, container_id: &str) -> StorageResult<Vec<Comment>>;

    /// Case-insensitive substring search over `original_text`
    ///
    /// Queries shorter than [`crate::storage::MIN_SEARCH_LEN`] return nothing.
    /// At most [`crate::storage::SEARCH_LIMIT`] results.
    fn search(&self, container_id: &str, query: &str) -> StorageResult<Vec<Comment>>;

    /// Top-level comments with replies still to fetch
    ///
    /// When `min_score` is given only threads scoring strictly above it are
    /// returned. Highest score first, then oldest first.
    fn unexpanded_threads(
        &self,
        container_id: &str,
        min_score: Option<u8>,
    ) -> StorageResult<Vec<Comment>>;

    // ===== Statistics =====

    /// Row counts for a container
    fn container_stats(&self, container_id: &str) -> StorageResult<ContainerStats>;
}
