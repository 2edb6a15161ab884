//! Compiled relevance patterns
//!
//! Each heuristic is one regex compiled on first use. The `regex` crate
//! matches in time linear in the haystack, so arbitrary user text cannot
//! trigger catastrophic backtracking.

use crate::scoring::{Highlight, HighlightKind};
use regex::Regex;
use std::sync::LazyLock;

pub const SOURCE_WEIGHT: u8 = 80;
pub const HELPER_WEIGHT: u8 = 50;
pub const BRACKET_WEIGHT: u8 = 40;
pub const QUESTION_WEIGHT: u8 = 10;

/// `label: value`; group 1 is the value through end of line.
static SOURCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:name|source|title|track|song|movie|anime)[ \t]*:[ \t]*(\S[^\r\n]*)")
        .expect("valid regex")
});

/// `it's` followed by one or more capitalized words; group 1 is the words.
static HELPER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i:\bit['’]?s)[ \t]+(\p{Lu}[\p{L}\p{N}'’\-]*(?:[ \t]+\p{Lu}[\p{L}\p{N}'’\-]*)*)",
    )
    .expect("valid regex")
});

/// First single-line, non-empty `[...]`.
static BRACKET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]\r\n]+\]").expect("valid regex"));

/// what/name/source with a question mark later on the same line.
static QUESTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:what|name|source)\b[^?\r\n]*\?").expect("valid regex")
});

/// Outcome of one heuristic
pub struct Hit {
    pub weight: u8,
    pub highlight: Option<Highlight>,
}

pub fn source(text: &str) -> Option<Hit> {
    let value = SOURCE_RE.captures(text)?.get(1)?;
    let trimmed = value.as_str().trim_end();
    Some(Hit {
        weight: SOURCE_WEIGHT,
        highlight: Some(Highlight {
            start: value.start(),
            end: value.start() + trimmed.len(),
            kind: HighlightKind::Source,
        }),
    })
}

pub fn helper(text: &str) -> Option<Hit> {
    let words = HELPER_RE.captures(text)?.get(1)?;
    Some(Hit {
        weight: HELPER_WEIGHT,
        highlight: Some(Highlight {
            start: words.start(),
            end: words.end(),
            kind: HighlightKind::Helper,
        }),
    })
}

pub fn bracket(text: &str) -> Option<Hit> {
    let span = BRACKET_RE.find(text)?;
    Some(Hit {
        weight: BRACKET_WEIGHT,
        highlight: Some(Highlight {
            start: span.start(),
            end: span.end(),
            kind: HighlightKind::Bracket,
        }),
    })
}

pub fn question(text: &str) -> Option<Hit> {
    QUESTION_RE.is_match(text).then_some(Hit {
        weight: QUESTION_WEIGHT,
        highlight: None,
    })
}
