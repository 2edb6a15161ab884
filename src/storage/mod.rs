//! Storage module for persisting crawl results
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Idempotent comment upserts keyed by comment id
//! - Item metadata rows, replaced wholesale on re-fetch
//! - The bounded read shapes used by the scan controller and by consumers
//! - Change subscriptions over those read shapes

mod local;
mod schema;
mod sqlite;
mod traits;
mod watch;

pub use local::LocalStore;
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};
pub use watch::{QueryDescriptor, QueryWatch};

use crate::state::ScanStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Upper bound for like-ordered browsing
pub const BROWSE_PAGE_SIZE: usize = 100;

/// Upper bound for keyword search results
pub const SEARCH_LIMIT: usize = 50;

/// Shortest query (in chars, after trimming) keyword search will run
pub const MIN_SEARCH_LEN: usize = 2;

/// A stored comment, either a thread's top-level comment or one of its replies
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub id: String,

    /// None for top-level comments
    pub parent_id: Option<String>,

    /// The item this comment belongs to
    pub container_id: String,
    pub author_name: String,
    pub author_avatar_url: String,
    pub display_text: String,

    /// Plain text, used for scoring and search
    pub original_text: String,
    pub like_count: u64,

    /// Reported reply total; only meaningful on top-level comments
    pub reply_count: u64,
    pub published_at: DateTime<Utc>,
    pub pinned: bool,

    /// Every reply of this thread has been stored. Never reset by an upsert.
    pub replies_fetched: bool,

    /// Relevance score, 0..=100
    pub score: u8,
}

impl Comment {
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Details of one content item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemMetadata {
    pub container_id: String,
    pub title: String,
    pub thumbnail_url: String,
    pub total_comment_count: u64,
    pub last_scanned_at: Option<DateTime<Utc>>,
    #[serde(serialize_with = "serialize_status")]
    pub scan_status: ScanStatus,
}

fn serialize_status<S: serde::Serializer>(status: &ScanStatus, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(status.to_db_string())
}

/// Row counts for one container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ContainerStats {
    pub total_comments: u64,
    pub top_level: u64,
    pub replies: u64,
    /// Threads whose replies are fully stored
    pub expanded_threads: u64,
    /// Threads with replies still to fetch
    pub pending_threads: u64,
    /// Comments with a score above zero
    pub candidates: u64,
}
