//! Comment-Sleuth: a resumable, rate-limited comment crawler
//!
//! This crate crawls the comment threads of a content item (top-level comments
//! plus their replies), scores every comment with deterministic text
//! heuristics, and persists the results incrementally so a paused crawl can be
//! picked up again without repeating completed work.

pub mod analytics;
pub mod config;
pub mod crawler;
pub mod output;
pub mod scoring;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Comment-Sleuth operations
#[derive(Debug, Error)]
pub enum SleuthError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Remote source error: {0}")]
    Source(#[from] crawler::SourceError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("A scan is already running for {container_id}")]
    ScanInProgress { container_id: String },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for SleuthError {
    fn from(err: rusqlite::Error) -> Self {
        SleuthError::Storage(storage::StorageError::Sqlite(err))
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("No API key configured (set [api].key or {0})")]
    MissingKey(&'static str),
}

/// Result type alias for Comment-Sleuth operations
pub type Result<T> = std::result::Result<T, SleuthError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, ValidatedKey};
pub use crawler::{CommentSource, RequestQueue, ScanController};
pub use scoring::{analyze, Analysis, Highlight, HighlightKind};
pub use state::{CancelToken, ScanMode, ScanState, ScanStatus};
pub use storage::{Comment, ItemMetadata, LocalStore};
