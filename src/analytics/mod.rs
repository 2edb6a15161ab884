//! Usage and lifecycle notifications
//!
//! The crawler reports API calls, fetched batches and scan lifecycle events to
//! an [`AnalyticsSink`]. Delivery is best-effort: sinks must not block, and
//! callers drop any error a sink returns after logging it.

use crate::state::ScanMode;
use thiserror::Error;

/// Errors a sink may report; callers never act on them
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Analytics sink unavailable: {0}")]
    Unavailable(String),
}

pub type AnalyticsResult = Result<(), AnalyticsError>;

/// Receiver of crawl usage and lifecycle events
pub trait AnalyticsSink: Send + Sync {
    /// One outbound request was dispatched
    fn record_api_call(&self, endpoint: &str, container_id: &str) -> AnalyticsResult;

    /// A batch of comments was written
    fn record_comments_fetched(&self, container_id: &str, count: u64) -> AnalyticsResult;

    fn record_scan_started(&self, container_id: &str, mode: ScanMode) -> AnalyticsResult;

    fn record_scan_completed(&self, container_id: &str, mode: ScanMode, fetched: u64)
        -> AnalyticsResult;

    fn record_scan_paused(&self, container_id: &str, mode: ScanMode, fetched: u64)
        -> AnalyticsResult;

    /// A scan failed, or (with `thread_id`) one thread's expansion was skipped
    fn record_scan_error(
        &self,
        container_id: &str,
        thread_id: Option<&str>,
        message: &str,
    ) -> AnalyticsResult;
}

/// Logs a sink failure and moves on
pub(crate) fn swallow(event: &str, result: AnalyticsResult) {
    if let Err(e) = result {
        tracing::debug!(event, error = %e, "Analytics sink rejected event");
    }
}

/// Sink that discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl AnalyticsSink for NoopSink {
    fn record_api_call(&self, _endpoint: &str, _container_id: &str) -> AnalyticsResult {
        Ok(())
    }

    fn record_comments_fetched(&self, _container_id: &str, _count: u64) -> AnalyticsResult {
        Ok(())
    }

    fn record_scan_started(&self, _container_id: &str, _mode: ScanMode) -> AnalyticsResult {
        Ok(())
    }

    fn record_scan_completed(&self, _: &str, _: ScanMode, _: u64) -> AnalyticsResult {
        Ok(())
    }

    fn record_scan_paused(&self, _: &str, _: ScanMode, _: u64) -> AnalyticsResult {
        Ok(())
    }

    fn record_scan_error(&self, _: &str, _: Option<&str>, _: &str) -> AnalyticsResult {
        Ok(())
    }
}

/// Sink that turns events into structured `tracing` records
///
/// Uses the `analytics` target so the events can be filtered or routed
/// separately from crawler logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl AnalyticsSink for TracingSink {
    fn record_api_call(&self, endpoint: &str, container_id: &str) -> AnalyticsResult {
        tracing::trace!(target: "analytics", endpoint, container_id, "api_call");
        Ok(())
    }

    fn record_comments_fetched(&self, container_id: &str, count: u64) -> AnalyticsResult {
        tracing::debug!(target: "analytics", container_id, count, "comments_fetched");
        Ok(())
    }

    fn record_scan_started(&self, container_id: &str, mode: ScanMode) -> AnalyticsResult {
        tracing::info!(target: "analytics", container_id, mode = %mode, "scan_started");
        Ok(())
    }

    fn record_scan_completed(
        &self,
        container_id: &str,
        mode: ScanMode,
        fetched: u64,
    ) -> AnalyticsResult {
        tracing::info!(target: "analytics", container_id, mode = %mode, fetched, "scan_completed");
        Ok(())
    }

    fn record_scan_paused(&self, container_id: &str, mode: ScanMode, fetched: u64) -> AnalyticsResult {
        tracing::info!(target: "analytics", container_id, mode = %mode, fetched, "scan_paused");
        Ok(())
    }

    fn record_scan_error(
        &self,
        container_id: &str,
        thread_id: Option<&str>,
        message: &str,
    ) -> AnalyticsResult {
        tracing::warn!(target: "analytics", container_id, thread_id, message, "scan_error");
        Ok(())
    }
}
