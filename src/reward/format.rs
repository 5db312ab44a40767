//! Format validation of tag-structured completions.
//!
//! A well-formed completion is exactly
//! `<think>…</think><label>able|unable</label>` followed by `<answer>…</answer>`
//! when the label is `able` or `<query>…</query>` when it is `unable`, with
//! nothing but whitespace outside the tags. The checks run as an ordered
//! chain and stop at the first violation; the chain order is part of the
//! contract because it decides which reason is reported when several rules
//! fail at once.

use once_cell::sync::Lazy;
use regex::Regex;

use super::FormatVerdict;

static THINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<think>(.*?)</think>").unwrap());
static ANSWER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<answer>(.*?)</answer>").unwrap());
static QUERY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<query>(.*?)</query>").unwrap());
// The strict form only matches a valid label value; a label tag carrying
// anything else is caught separately for the diagnostic.
static LABEL_STRICT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<label>\s*(able|unable)\s*</label>").unwrap());
static LABEL_ANY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<label>(.*?)</label>").unwrap());

// Span-removal patterns for the residual-text check.
static STRIP_RES: Lazy<[Regex; 4]> = Lazy::new(|| {
    [
        Regex::new(r"(?is)<think>.*?</think>").unwrap(),
        Regex::new(r"(?is)<label>.*?</label>").unwrap(),
        Regex::new(r"(?is)<answer>.*?</answer>").unwrap(),
        Regex::new(r"(?is)<query>.*?</query>").unwrap(),
    ]
});

/// Validate the tag structure of a completion.
pub fn format_reward(completion: &str) -> FormatVerdict {
    let completion = completion.trim();

    let think = THINK_RE.captures(completion);
    let label = LABEL_STRICT_RE.captures(completion);
    let answer = ANSWER_RE.captures(completion);
    let query = QUERY_RE.captures(completion);

    let think = match think {
        None => return FormatVerdict::fail("missing <think> tag"),
        Some(m) => m,
    };
    if think.get(1).map_or(true, |c| c.as_str().trim().is_empty()) {
        return FormatVerdict::fail("<think> tag is empty");
    }

    let label = match label {
        None => {
            // Distinguish a badly-valued label from an absent one.
            if let Some(any) = LABEL_ANY_RE.captures(completion) {
                let content = any[1].trim().to_lowercase();
                return FormatVerdict::fail(format!("invalid label content: {}", content));
            }
            return FormatVerdict::fail("missing <label> tag");
        }
        Some(m) => m,
    };
    let label_content = label[1].trim().to_lowercase();

    let think_start = think.get(0).map(|m| m.start()).unwrap_or(0);
    let label_start = label.get(0).map(|m| m.start()).unwrap_or(0);
    if think_start >= label_start {
        return FormatVerdict::fail("<think> must come before <label>");
    }

    let (required, required_name, forbidden, forbidden_name) = if label_content == "able" {
        (answer, "answer", query, "query")
    } else {
        (query, "query", answer, "answer")
    };

    let required = match required {
        None => {
            return FormatVerdict::fail(format!(
                "label '{}' requires a <{}> tag",
                label_content, required_name
            ))
        }
        Some(m) => m,
    };
    if required.get(1).map_or(true, |c| c.as_str().trim().is_empty()) {
        return FormatVerdict::fail(format!("<{}> tag is empty", required_name));
    }
    if forbidden.is_some() {
        return FormatVerdict::fail(format!(
            "label '{}' must not carry a <{}> tag",
            label_content, forbidden_name
        ));
    }
    let required_start = required.get(0).map(|m| m.start()).unwrap_or(0);
    if label_start >= required_start {
        return FormatVerdict::fail(format!("<label> must come before <{}>", required_name));
    }

    // All tag spans removed, only whitespace may remain.
    let mut residue = completion.to_string();
    for re in STRIP_RES.iter() {
        residue = re.replace_all(&residue, "").into_owned();
    }
    let residue = residue.trim();
    if !residue.is_empty() {
        let preview: String = residue.chars().take(50).collect();
        return FormatVerdict::fail(format!("stray text outside tags: {}...", preview));
    }

    FormatVerdict::pass()
}
