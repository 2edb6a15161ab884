//! Comment listings for the terminal and for JSON consumers

use crate::scoring::{analyze, Highlight};
use crate::storage::Comment;
use serde::Serialize;

const MARK_OPEN: &str = "\u{ab}";
const MARK_CLOSE: &str = "\u{bb}";

/// Wraps highlighted spans of `text` in guillemets
///
/// Highlights must be sorted by start. A span that begins inside one already
/// rendered is dropped.
pub fn mark_highlights(text: &str, highlights: &[Highlight]) -> String {
    let mut out = String::with_capacity(text.len() + highlights.len() * 4);
    let mut cursor = 0;

    for h in highlights {
        if h.start < cursor || text.get(h.start..h.end).is_none() {
            continue;
        }
        out.push_str(&text[cursor..h.start]);
        out.push_str(MARK_OPEN);
        out.push_str(&text[h.start..h.end]);
        out.push_str(MARK_CLOSE);
        cursor = h.end;
    }
    out.push_str(&text[cursor..]);
    out
}

/// One listing line: score, likes, author and the marked-up text
pub fn format_comment(comment: &Comment) -> String {
    let analysis = analyze(&comment.original_text);
    let text = mark_highlights(&comment.original_text, &analysis.highlights);
    let text = text.replace(['\r', '\n'], " ");
    let kind = if comment.is_top_level() { "" } else { "  \u{21b3} " };

    format!(
        "{}[{:>3}] {:>6} likes  {}: {}",
        kind, comment.score, comment.like_count, comment.author_name, text
    )
}

/// Prints a titled listing to stdout
pub fn print_comments(title: &str, comments: &[Comment]) {
    println!("=== {} ({}) ===\n", title, comments.len());
    if comments.is_empty() {
        println!("  (none)");
        return;
    }
    for comment in comments {
        println!("{}", format_comment(comment));
    }
}

/// A comment with its highlight spans, as emitted in JSON
#[derive(Debug, Serialize)]
pub struct CommentView<'a> {
    #[serde(flatten)]
    pub comment: &'a Comment,
    pub highlights: Vec<Highlight>,
}

impl<'a> CommentView<'a> {
    pub fn new(comment: &'a Comment) -> Self {
        Self {
            comment,
            highlights: analyze(&comment.original_text).highlights,
        }
    }
}

/// Serializes a listing as a pretty JSON array
pub fn comments_to_json(comments: &[Comment]) -> serde_json::Result<String> {
    let views: Vec<CommentView<'_>> = comments.iter().map(CommentView::new).collect();
    serde_json::to_string_pretty(&views)
}
