//! Container statistics
//!
//! This module provides functionality for collecting and displaying what
//! the store holds for one container.

use crate::storage::{ContainerStats, ItemMetadata, LocalStore, StorageResult};
use serde::Serialize;
use std::fmt::Write;

/// Stored details and row counts for one container
#[derive(Debug, Clone, Serialize)]
pub struct ContainerReport {
    pub container_id: String,

    /// None until item details have been loaded
    pub metadata: Option<ItemMetadata>,
    pub stats: ContainerStats,
}

impl ContainerReport {
    /// Share of the remote comment count already stored, if known
    pub fn coverage(&self) -> Option<f64> {
        let total = self.metadata.as_ref()?.total_comment_count;
        if total == 0 {
            return None;
        }
        Some((self.stats.total_comments as f64 / total as f64 * 100.0).min(100.0))
    }
}

/// Loads the report for `container_id`
pub fn load_report(store: &LocalStore, container_id: &str) -> StorageResult<ContainerReport> {
    Ok(ContainerReport {
        container_id: container_id.to_string(),
        metadata: store.item_metadata(container_id)?,
        stats: store.container_stats(container_id)?,
    })
}

/// Renders a report as plain text
pub fn format_report(report: &ContainerReport) -> String {
    let mut out = String::new();
    let stats = &report.stats;

    let _ = writeln!(out, "=== Container {} ===\n", report.container_id);

    match &report.metadata {
        Some(meta) => {
            let _ = writeln!(out, "Item:");
            let _ = writeln!(out, "  Title: {}", meta.title);
            let _ = writeln!(out, "  Remote comment count: {}", meta.total_comment_count);
            let _ = writeln!(out, "  Scan status: {}", meta.scan_status);
            match meta.last_scanned_at {
                Some(at) => {
                    let _ = writeln!(out, "  Last scanned: {}", at.to_rfc3339());
                }
                None => {
                    let _ = writeln!(out, "  Last scanned: never");
                }
            }
        }
        None => {
            let _ = writeln!(out, "Item: details not loaded");
        }
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Stored Comments:");
    let _ = writeln!(out, "  Total: {}", stats.total_comments);
    let _ = writeln!(out, "  Top-level: {}", stats.top_level);
    let _ = writeln!(out, "  Replies: {}", stats.replies);
    if let Some(coverage) = report.coverage() {
        let _ = writeln!(out, "  Coverage: {:.1}%", coverage);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Threads:");
    let _ = writeln!(out, "  Expanded: {}", stats.expanded_threads);
    let _ = writeln!(out, "  Pending: {}", stats.pending_threads);
    let _ = writeln!(out);

    let _ = write!(out, "Candidates: {}", stats.candidates);
    out
}

/// Prints a report to stdout
pub fn print_report(report: &ContainerReport) {
    println!("{}", format_report(report));
}
