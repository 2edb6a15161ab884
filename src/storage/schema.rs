//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Comment-Sleuth database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Every comment of every scanned container, top-level and replies alike
CREATE TABLE IF NOT EXISTS comments (
    id TEXT PRIMARY KEY,
    parent_id TEXT,
    container_id TEXT NOT NULL,
    author_name TEXT NOT NULL,
    author_avatar_url TEXT NOT NULL,
    display_text TEXT NOT NULL,
    original_text TEXT NOT NULL,
    search_text TEXT NOT NULL,
    like_count INTEGER NOT NULL DEFAULT 0,
    reply_count INTEGER NOT NULL DEFAULT 0,
    published_at TEXT NOT NULL,
    pinned INTEGER NOT NULL DEFAULT 0,
    replies_fetched INTEGER NOT NULL DEFAULT 0,
    score INTEGER NOT NULL DEFAULT 0 CHECK (score BETWEEN 0 AND 100)
);

-- Candidate ranking: (container_id, score)
CREATE INDEX IF NOT EXISTS idx_comments_container_score ON comments(container_id, score);

-- Like-ordered browsing: (container_id, like_count)
CREATE INDEX IF NOT EXISTS idx_comments_container_likes ON comments(container_id, like_count);

-- Thread expansion: top-level rows still waiting for replies
CREATE INDEX IF NOT EXISTS idx_comments_threads
    ON comments(container_id, parent_id, replies_fetched);

CREATE INDEX IF NOT EXISTS idx_comments_parent ON comments(parent_id);

-- One row per content item
CREATE TABLE IF NOT EXISTS items (
    container_id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    thumbnail_url TEXT NOT NULL,
    total_comment_count INTEGER NOT NULL DEFAULT 0,
    last_scanned_at TEXT,
    scan_status TEXT NOT NULL
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
