//! Relevance scoring for comment text
//!
//! [`analyze`] is a pure function: it keeps no state between calls, so the same
//! text always yields the same score and highlights. Four heuristics run in a
//! fixed order against the whole text and their weights add up:
//!
//! | Heuristic | Shape | Weight | Highlight |
//! |-----------|-------|--------|-----------|
//! | Source | `name: value` (name, source, title, track, song, movie, anime) | 80 | value |
//! | Helper | `it's Capitalized Words` | 50 | the words |
//! | Bracket | first `[...]` | 40 | whole span |
//! | Question | `what ... ?` / `source?` | 10 | none |
//!
//! The total is clamped to `0..=100`.

mod patterns;

use serde::Serialize;

/// Highest score [`analyze`] can return
pub const MAX_SCORE: u8 = 100;

/// Which heuristic produced a highlight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightKind {
    Source,
    Helper,
    Bracket,
}

/// A byte range of the analyzed text
///
/// `start..end` always falls on char boundaries. Spans from different
/// heuristics may overlap; choosing precedence is left to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Highlight {
    pub start: usize,
    pub end: usize,
    pub kind: HighlightKind,
}

impl Highlight {
    /// The highlighted slice of `text`, or "" if `text` is not the analyzed string
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        text.get(self.start..self.end).unwrap_or("")
    }
}

/// Score and highlights for one text
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Analysis {
    pub score: u8,
    /// Sorted by start offset
    pub highlights: Vec<Highlight>,
}

impl Analysis {
    /// Returns true if any heuristic fired
    pub fn is_candidate(&self) -> bool {
        self.score > 0
    }
}

/// Scores `text` and collects highlight spans
///
/// # Example
///
/// ```
/// use comment_sleuth::scoring::{analyze, HighlightKind};
///
/// let text = "source: My Anime Name";
/// let analysis = analyze(text);
/// assert_eq!(analysis.score, 80);
/// assert_eq!(analysis.highlights[0].kind, HighlightKind::Source);
/// assert_eq!(analysis.highlights[0].slice(text), "My Anime Name");
/// ```
pub fn analyze(text: &str) -> Analysis {
    if text.trim().is_empty() {
        return Analysis::default();
    }

    let hits = [
        patterns::source(text),
        patterns::helper(text),
        patterns::bracket(text),
        patterns::question(text),
    ];

    let mut total: u32 = 0;
    let mut highlights = Vec::new();
    for hit in hits.into_iter().flatten() {
        total += u32::from(hit.weight);
        highlights.extend(hit.highlight);
    }

    // Stable sort keeps heuristic order for spans sharing a start
    highlights.sort_by_key(|h| h.start);

    Analysis {
        score: total.min(u32::from(MAX_SCORE)) as u8,
        highlights,
    }
}
