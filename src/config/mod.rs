//! Configuration module for Comment-Sleuth
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! and resolving the API key handed to the crawler.
//!
//! # Example
//!
//! ```no_run
//! use comment_sleuth::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sleuth.toml")).unwrap();
//! println!("Requests spaced by {}ms", config.queue.min_interval_ms);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ApiConfig, Config, OutputConfig, QueueConfig, ScanConfig, ValidatedKey, API_KEY_ENV,
    DEFAULT_BASE_URL, DEFAULT_MIN_INTERVAL_MS, DEFAULT_PROMISING_SCORE,
};

// Re-export parser functions
pub use parser::{load_config, parse_config, resolve_key};
