//! Resolution of stored compiler suggestions against live document text.
//!
//! A suggestion's range was computed when the file was last compiled. The
//! document may have changed since, so the replacement is normalised and the
//! range adjusted by looking at what currently follows it.

use std::sync::LazyLock;

use lsp_types::{Position, Range, TextEdit};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::text;

/// Characters inspected after the target range.
const LOOKAHEAD_CHARS: usize = 10;

static WHITESPACE_BEFORE_NEWLINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s+\n").expect("valid whitespace-before-newline regex")
});

static TRAILING_NEWLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*$").expect("valid trailing newline regex"));

/// A pending text substitution, resolved only when applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
    pub replacement: String,
    pub range: Range,
}

impl Replacement {
    #[must_use]
    pub fn new(replacement: impl Into<String>, range: Range) -> Self {
        Self {
            replacement: replacement.into(),
            range,
        }
    }
}

/// Compute the edit for `replacement` against the current `text`.
#[must_use]
pub fn resolve(text: &str, replacement: &Replacement) -> TextEdit {
    let range = replacement.range;
    let after = text::lookahead(text, range.end, LOOKAHEAD_CHARS);

    let mut new_text = WHITESPACE_BEFORE_NEWLINE
        .replace_all(&replacement.replacement, "\n")
        .trim()
        .to_string();
    if TRAILING_NEWLINE.is_match(&replacement.replacement) && !after.is_empty() {
        new_text.push('\n');
    }

    let range = if new_text.is_empty() && after.is_empty() {
        Range::new(range.start, Position::new(range.end.line + 1, 0))
    } else {
        range
    };

    TextEdit { range, new_text }
}
