//! Detection and extraction of cell-edit instructions.
//!
//! Recognised shapes:
//!
//! ```text
//! Replace R2C1 with 32
//! set r3 c4 to "Paris"
//! update row second column third to Hello
//! change the cell in row 4, col 2 as Done.
//! ```

use std::sync::LazyLock;

use regex::Regex;

use super::model::{MAX_EDIT_COLS, MAX_EDIT_ROWS};

static ACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:replace|update|change|set)\b").expect("edit action regex")
});
static COMPACT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bR(\d+)\s*C(\d+)\b").expect("compact coordinate regex"));
static ROW_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\brows?\b").expect("row word regex"));
static COL_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:col|column)s?\b").expect("column word regex"));
static ROW_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\brow\s+({ORDINAL_OR_NUMBER})\b")).expect("row reference regex")
});
static COL_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\bcol(?:umn)?\s+({ORDINAL_OR_NUMBER})\b"))
        .expect("column reference regex")
});
static VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:to|by|as|with)\s+(.+)").expect("edit value regex"));
static SENTENCE_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.(?:\s|$)").expect("sentence break regex"));

const ORDINAL_OR_NUMBER: &str =
    r"first|second|third|fourth|fifth|sixth|seventh|eighth|ninth|tenth|\d+";

const ORDINALS: [&str; 10] = [
    "first", "second", "third", "fourth", "fifth", "sixth", "seventh", "eighth", "ninth", "tenth",
];

/// A single cell overwrite: 1-based body row and column, plus the new text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditInstruction {
    pub row: usize,
    pub col: usize,
    pub value: String,
}

/// Whether `text` is shaped like a cell edit: an action verb plus either a
/// compact `R<row>C<col>` token or both a row and a column reference.
pub fn looks_like_table_edit(text: &str) -> bool {
    if !ACTION_RE.is_match(text) {
        return false;
    }
    COMPACT_RE.is_match(text) || (ROW_WORD_RE.is_match(text) && COL_WORD_RE.is_match(text))
}

/// Extract `(row, col, value)` from an edit instruction.
///
/// Coordinates come from a compact `R2C1` token, or else from
/// `row <ref> ... column <ref>` where `<ref>` is digits or an ordinal word
/// (first..tenth). The value is whatever follows the first "to", "by",
/// "as" or "with", up to a sentence break. Returns `None` if any part is
/// missing, or a coordinate is zero or past [`MAX_EDIT_ROWS`] /
/// [`MAX_EDIT_COLS`].
pub fn extract_edit_instruction(text: &str) -> Option<EditInstruction> {
    let text = text.trim();

    let (mut row, mut col) = match COMPACT_RE.captures(text) {
        Some(c) => (c[1].parse().ok(), c[2].parse().ok()),
        None => (None, None),
    };
    if row.is_none() || col.is_none() {
        if let (Some(r), Some(c)) = (ROW_REF_RE.captures(text), COL_REF_RE.captures(text)) {
            row = word_to_index(&r[1]);
            col = word_to_index(&c[1]);
        }
    }

    let value = extract_value(text)?;
    let row = row.filter(|r| (1..=MAX_EDIT_ROWS).contains(r))?;
    let col = col.filter(|c| (1..=MAX_EDIT_COLS).contains(c))?;
    Some(EditInstruction { row, col, value })
}

fn extract_value(text: &str) -> Option<String> {
    let caps = VALUE_RE.captures(text)?;
    let raw = &caps[1];
    let raw = match SENTENCE_BREAK_RE.find(raw) {
        Some(m) => &raw[..m.start()],
        None => raw,
    };
    let value = unquote(raw.trim());
    (!value.is_empty()).then(|| value.to_owned())
}

fn unquote(s: &str) -> &str {
    for (open, close) in [('"', '"'), ('\'', '\''), ('\u{201c}', '\u{201d}')] {
        if let Some(inner) = s.strip_prefix(open).and_then(|r| r.strip_suffix(close)) {
            return inner.trim();
        }
    }
    s
}

fn word_to_index(token: &str) -> Option<usize> {
    if let Ok(n) = token.parse() {
        return Some(n);
    }
    let lower = token.to_ascii_lowercase();
    ORDINALS.iter().position(|w| *w == lower).map(|i| i + 1)
}
