//! Crawler module for comment fetching and scan orchestration
//!
//! This module contains the core crawling logic, including:
//! - The paced request queue every remote call goes through
//! - The remote comment source and its wire format
//! - Scan control (smart and deep algorithms, cancellation, state)

mod controller;
mod queue;
mod source;
mod wire;

pub use controller::{ScanController, ScanSettings};
pub use queue::{QueueError, RequestQueue, Ticket};
pub use source::{
    build_http_client, CommentPage, CommentSource, ReplyPage, SourceError, ThreadPage, PAGE_SIZE,
};

use crate::analytics::AnalyticsSink;
use crate::config::Config;
use crate::storage::LocalStore;
use crate::SleuthError;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Wires a controller from configuration
///
/// Builds the HTTP client and request queue, and opens the database named in
/// `[output]`. Must be called from within a tokio runtime.
///
/// # Returns
///
/// * `Ok(ScanController)` - Ready to scan
/// * `Err(SleuthError)` - The client could not be built or the database opened
pub fn build_controller(
    config: &Config,
    sink: Arc<dyn AnalyticsSink>,
) -> Result<ScanController, SleuthError> {
    let store = LocalStore::open(Path::new(&config.output.database_path))?;
    let queue = RequestQueue::new(Duration::from_millis(config.queue.min_interval_ms));
    let source = CommentSource::new(build_http_client()?, config.api.base_url.clone(), queue)
        .with_sink(Arc::clone(&sink));

    let settings = ScanSettings {
        promising_score: config.scan.promising_score,
    };

    Ok(ScanController::new(Arc::new(source), store, sink, settings))
}
