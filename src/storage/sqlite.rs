//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::state::ScanStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    Comment, ContainerStats, ItemMetadata, BROWSE_PAGE_SIZE, MIN_SEARCH_LEN, SEARCH_LIMIT,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const COMMENT_COLUMNS: &str = "id, parent_id, container_id, author_name, author_avatar_url,
     display_text, original_text, like_count, reply_count, published_at, pinned,
     replies_fetched, score";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA mmap_size = 268435456;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn query_comments<P: rusqlite::Params>(&self, sql: &str, params: P) -> StorageResult<Vec<Comment>> {
        let mut stmt = self.conn.prepare(sql)?;
        let comments = stmt
            .query_map(params, comment_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(comments)
    }
}

fn format_time(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_time(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    let published_at: String = row.get(9)?;
    Ok(Comment {
        id: row.get(0)?,
        parent_id: row.get(1)?,
        container_id: row.get(2)?,
        author_name: row.get(3)?,
        author_avatar_url: row.get(4)?,
        display_text: row.get(5)?,
        original_text: row.get(6)?,
        like_count: row.get::<_, i64>(7)?.max(0) as u64,
        reply_count: row.get::<_, i64>(8)?.max(0) as u64,
        published_at: parse_time(9, &published_at)?,
        pinned: row.get(10)?,
        replies_fetched: row.get(11)?,
        score: row.get::<_, i64>(12)?.clamp(0, 100) as u8,
    })
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<ItemMetadata> {
    let last_scanned_at: Option<String> = row.get(4)?;
    let status: String = row.get(5)?;
    Ok(ItemMetadata {
        container_id: row.get(0)?,
        title: row.get(1)?,
        thumbnail_url: row.get(2)?,
        total_comment_count: row.get::<_, i64>(3)?.max(0) as u64,
        last_scanned_at: last_scanned_at
            .map(|raw| parse_time(4, &raw))
            .transpose()?,
        scan_status: ScanStatus::from_db_string(&status).unwrap_or_default(),
    })
}

fn to_sql_count(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

impl Storage for SqliteStorage {
    // ===== Comments =====

    fn upsert_comments(&mut self, batch: &[Comment]) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO comments (id, parent_id, container_id, author_name, author_avatar_url,
                 display_text, original_text, search_text, like_count, reply_count, published_at,
                 pinned, replies_fetched, score)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                 ON CONFLICT(id) DO UPDATE SET
                    parent_id = excluded.parent_id,
                    container_id = excluded.container_id,
                    author_name = excluded.author_name,
                    author_avatar_url = excluded.author_avatar_url,
                    display_text = excluded.display_text,
                    original_text = excluded.original_text,
                    search_text = excluded.search_text,
                    like_count = excluded.like_count,
                    reply_count = excluded.reply_count,
                    published_at = excluded.published_at,
                    pinned = excluded.pinned,
                    replies_fetched = MAX(replies_fetched, excluded.replies_fetched),
                    score = excluded.score",
            )?;

            for comment in batch {
                // Reply counts and expansion flags only exist on top-level rows
                let (reply_count, replies_fetched) = if comment.is_top_level() {
                    (comment.reply_count, comment.replies_fetched)
                } else {
                    (0, false)
                };

                stmt.execute(params![
                    comment.id,
                    comment.parent_id,
                    comment.container_id,
                    comment.author_name,
                    comment.author_avatar_url,
                    comment.display_text,
                    comment.original_text,
                    comment.original_text.to_lowercase(),
                    to_sql_count(comment.like_count),
                    to_sql_count(reply_count),
                    format_time(&comment.published_at),
                    comment.pinned,
                    replies_fetched,
                    i64::from(comment.score.min(100)),
                ])?;
            }
        }
        tx.commit()?;

        Ok(batch.len())
    }

    fn get_comment(&self, id: &str) -> StorageResult<Option<Comment>> {
        let comment = self
            .conn
            .query_row(
                &format!("SELECT {} FROM comments WHERE id = ?1", COMMENT_COLUMNS),
                params![id],
                comment_from_row,
            )
            .optional()?;
        Ok(comment)
    }

    fn get_replies(&self, parent_id: &str) -> StorageResult<Vec<Comment>> {
        self.query_comments(
            &format!(
                "SELECT {} FROM comments WHERE parent_id = ?1 ORDER BY published_at ASC, id ASC",
                COMMENT_COLUMNS
            ),
            params![parent_id],
        )
    }

    fn mark_replies_fetched(&mut self, comment_id: &str) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE comments SET replies_fetched = 1 WHERE id = ?1 AND parent_id IS NULL",
            params![comment_id],
        )?;

        if updated == 0 {
            return Err(StorageError::CommentNotFound(comment_id.to_string()));
        }
        Ok(())
    }

    // ===== Item Metadata =====

    fn put_item_metadata(&mut self, meta: &ItemMetadata) -> StorageResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO items
             (container_id, title, thumbnail_url, total_comment_count, last_scanned_at, scan_status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                meta.container_id,
                meta.title,
                meta.thumbnail_url,
                to_sql_count(meta.total_comment_count),
                meta.last_scanned_at.as_ref().map(format_time),
                meta.scan_status.to_db_string(),
            ],
        )?;
        Ok(())
    }

    fn get_item_metadata(&self, container_id: &str) -> StorageResult<Option<ItemMetadata>> {
        let item = self
            .conn
            .query_row(
                "SELECT container_id, title, thumbnail_url, total_comment_count, last_scanned_at,
                 scan_status FROM items WHERE container_id = ?1",
                params![container_id],
                item_from_row,
            )
            .optional()?;
        Ok(item)
    }

    fn record_scan_outcome(
        &mut self,
        container_id: &str,
        status: ScanStatus,
        at: DateTime<Utc>,
    ) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE items SET scan_status = ?1, last_scanned_at = ?2 WHERE container_id = ?3",
            params![status.to_db_string(), format_time(&at), container_id],
        )?;
        Ok(())
    }

    // ===== Reset =====

    fn reset_container(&mut self, container_id: &str) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;
        let deleted = tx.execute(
            "DELETE FROM comments WHERE container_id = ?1",
            params![container_id],
        )?;
        tx.execute(
            "DELETE FROM items WHERE container_id = ?1",
            params![container_id],
        )?;
        tx.commit()?;
        Ok(deleted)
    }

    // ===== Bounded Queries =====

    fn candidates(&self, container_id: &str, limit: usize) -> StorageResult<Vec<Comment>> {
        self.query_comments(
            &format!(
                "SELECT {} FROM comments
                 WHERE container_id = ?1 AND score BETWEEN 1 AND 100
                 ORDER BY score DESC, like_count DESC, id ASC
                 LIMIT ?2",
                COMMENT_COLUMNS
            ),
            params![container_id, to_sql_count(limit as u64)],
        )
    }

    fn top_liked(&self, container_id: &str) -> StorageResult<Vec<Comment>> {
        self.query_comments(
            &format!(
                "SELECT {} FROM comments
                 WHERE container_id = ?1
                 ORDER BY like_count DESC, published_at DESC, id ASC
                 LIMIT ?2",
                COMMENT_COLUMNS
            ),
            params![container_id, BROWSE_PAGE_SIZE as i64],
        )
    }

    fn search(&self, container_id: &str, query: &str) -> StorageResult<Vec<Comment>> {
        let needle = query.trim();
        if needle.chars().count() < MIN_SEARCH_LEN {
            return Ok(Vec::new());
        }

        // search_text holds the lowercased original, so instr() is a plain
        // substring test with no LIKE wildcards to escape
        self.query_comments(
            &format!(
                "SELECT {} FROM comments
                 WHERE container_id = ?1 AND instr(search_text, ?2) > 0
                 ORDER BY score DESC, like_count DESC, id ASC
                 LIMIT ?3",
                COMMENT_COLUMNS
            ),
            params![container_id, needle.to_lowercase(), SEARCH_LIMIT as i64],
        )
    }

    fn unexpanded_threads(
        &self,
        container_id: &str,
        min_score: Option<u8>,
    ) -> StorageResult<Vec<Comment>> {
        let floor = min_score.map(i64::from).unwrap_or(-1);
        self.query_comments(
            &format!(
                "SELECT {} FROM comments
                 WHERE container_id = ?1
                   AND parent_id IS NULL
                   AND replies_fetched = 0
                   AND reply_count > 0
                   AND score > ?2
                 ORDER BY score DESC, published_at ASC, id ASC",
                COMMENT_COLUMNS
            ),
            params![container_id, floor],
        )
    }

    // ===== Statistics =====

    fn container_stats(&self, container_id: &str) -> StorageResult<ContainerStats> {
        let stats = self.conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(parent_id IS NULL), 0),
                    COALESCE(SUM(parent_id IS NOT NULL), 0),
                    COALESCE(SUM(parent_id IS NULL AND replies_fetched = 1), 0),
                    COALESCE(SUM(parent_id IS NULL AND replies_fetched = 0 AND reply_count > 0), 0),
                    COALESCE(SUM(score > 0), 0)
             FROM comments WHERE container_id = ?1",
            params![container_id],
            |row| {
                Ok(ContainerStats {
                    total_comments: row.get::<_, i64>(0)? as u64,
                    top_level: row.get::<_, i64>(1)? as u64,
                    replies: row.get::<_, i64>(2)? as u64,
                    expanded_threads: row.get::<_, i64>(3)? as u64,
                    pending_threads: row.get::<_, i64>(4)? as u64,
                    candidates: row.get::<_, i64>(5)? as u64,
                })
            },
        )?;
        Ok(stats)
    }
}
