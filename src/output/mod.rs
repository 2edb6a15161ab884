//! Output module for presenting stored results
//!
//! This module handles:
//! - Container reports (item details plus row counts)
//! - Comment listings with highlighted spans
//! - JSON export of listings

mod listing;
pub mod stats;

pub use listing::{comments_to_json, format_comment, mark_highlights, print_comments, CommentView};
pub use stats::{format_report, load_report, print_report, ContainerReport};
