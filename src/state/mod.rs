//! State module for tracking scan progress
//!
//! # Components
//!
//! - `ScanStatus` / `ScanMode`: lifecycle and strategy of a scan
//! - `ScanState`: the transient snapshot a controller reports for one container
//! - `CancelToken`: cooperative cancellation shared with queued requests

mod cancel;
mod scan_state;

// Re-export main types
pub use cancel::CancelToken;
pub use scan_state::{ScanMode, ScanState, ScanStatus};
