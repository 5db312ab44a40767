//! Tag extraction from model completions.
//!
//! Completions and gold answers embed their structured fields as
//! `<think>`, `<label>`, `<answer>` and `<query>` spans inside free text.
//! This module pulls the content of a single span out of a text blob;
//! everything downstream (format checking, label matching, judge grading)
//! builds on it.

use once_cell::sync::Lazy;
use regex::Regex;

static ANSWER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<answer>(.*?)</answer>").unwrap());
static QUERY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<query>(.*?)</query>").unwrap());
// Label markers match case-insensitively; models drift on capitalization here.
static LABEL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<label>(.*?)</label>").unwrap());
static THINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<think>(.*?)</think>").unwrap());

/// The four structured tags a completion may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Think,
    Label,
    Answer,
    Query,
}

/// Probe order when no expected kind is given: `answer` before `query`, so
/// a text carrying both is treated as an answer. Kept explicit rather than
/// derived from any map ordering.
pub const PROBE_ORDER: [TagKind; 4] = [
    TagKind::Answer,
    TagKind::Query,
    TagKind::Label,
    TagKind::Think,
];

impl TagKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagKind::Think => "think",
            TagKind::Label => "label",
            TagKind::Answer => "answer",
            TagKind::Query => "query",
        }
    }

    fn pattern(&self) -> &'static Regex {
        match self {
            TagKind::Think => &THINK_RE,
            TagKind::Label => &LABEL_RE,
            TagKind::Answer => &ANSWER_RE,
            TagKind::Query => &QUERY_RE,
        }
    }
}

impl std::fmt::Display for TagKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tag span pulled out of a text blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub kind: TagKind,
    /// Trimmed text between the opening and closing markers.
    pub content: String,
}

/// Extract the first occurrence of a tag from `text`.
///
/// With `expected = Some(kind)` only that kind is searched. With
/// `expected = None` all four kinds are probed in [`PROBE_ORDER`] and the
/// first hit wins. Returns `None` when nothing matches.
pub fn extract(text: &str, expected: Option<TagKind>) -> Option<Extracted> {
    match expected {
        Some(kind) => extract_kind(text, kind),
        None => PROBE_ORDER.iter().find_map(|&kind| extract_kind(text, kind)),
    }
}

fn extract_kind(text: &str, kind: TagKind) -> Option<Extracted> {
    kind.pattern().captures(text).map(|caps| Extracted {
        kind,
        content: caps[1].trim().to_string(),
    })
}
