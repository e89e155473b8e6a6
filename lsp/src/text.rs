//! Position arithmetic over document text.
//!
//! Editor positions count UTF-16 code units within a line; lines are split
//! on `\n` and a trailing `\r` belongs to the line it ends.

use lsp_types::{Position, Range};

/// Text of line `line`, without its `\n`. `None` past the last line.
#[must_use]
pub fn line_at(text: &str, line: u32) -> Option<&str> {
    text.split('\n').nth(line as usize)
}

/// Byte offset of `character` (UTF-16 units) within `line`, clamped to the line end.
fn byte_offset_in_line(line: &str, character: u32) -> usize {
    let mut units = 0u32;
    for (idx, ch) in line.char_indices() {
        if units >= character {
            return idx;
        }
        units += u32::try_from(ch.len_utf16()).unwrap_or(2);
    }
    line.len()
}

fn utf16_len(s: &str) -> u32 {
    s.chars()
        .map(|c| u32::try_from(c.len_utf16()).unwrap_or(2))
        .sum()
}

/// Up to `max_chars` characters following `pos` on the same line, with `\r` removed.
#[must_use]
pub fn lookahead(text: &str, pos: Position, max_chars: usize) -> String {
    let Some(line) = line_at(text, pos.line) else {
        return String::new();
    };
    let start = byte_offset_in_line(line, pos.character);
    line[start..]
        .chars()
        .filter(|c| *c != '\r')
        .take(max_chars)
        .collect()
}

/// Position just past the last character of the document.
#[must_use]
pub fn end_position(text: &str) -> Position {
    let mut lines = 0u32;
    let mut last = text;
    for (idx, line) in text.split('\n').enumerate() {
        lines = u32::try_from(idx).unwrap_or(u32::MAX);
        last = line;
    }
    Position::new(lines, utf16_len(last))
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '\''
}

/// The identifier touching `pos`, and its range.
#[must_use]
pub fn identifier_at(text: &str, pos: Position) -> Option<(String, Range)> {
    let line = line_at(text, pos.line)?;
    let cursor = byte_offset_in_line(line, pos.character);

    let start = line[..cursor]
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_identifier_char(*c))
        .last()
        .map_or(cursor, |(idx, _)| idx);
    let end = line[cursor..]
        .char_indices()
        .find(|(_, c)| !is_identifier_char(*c))
        .map_or(line.len(), |(idx, _)| cursor + idx);

    if start == end {
        return None;
    }
    let range = Range::new(
        Position::new(pos.line, utf16_len(&line[..start])),
        Position::new(pos.line, utf16_len(&line[..end])),
    );
    Some((line[start..end].to_string(), range))
}

/// Name of the module declared by `module X where`, if any.
#[must_use]
pub fn module_name(text: &str) -> Option<&str> {
    text.lines().find_map(|line| {
        let rest = line.strip_prefix("module ")?;
        rest.split_whitespace().next()
    })
}
