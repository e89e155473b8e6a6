use lsp_types::{Position, Range};
use serde::{Deserialize, Serialize};

/// A source span as reported by the compiler.
///
/// All four coordinates are 1-indexed. Editor ranges are 0-indexed, see
/// [`CompilerPosition::to_range`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerPosition {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl CompilerPosition {
    #[must_use]
    pub const fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    /// Convert to a 0-indexed editor range by subtracting one from each coordinate.
    ///
    /// A zero coordinate (never emitted by a well-behaved compiler) stays at zero.
    #[must_use]
    pub fn to_range(&self) -> Range {
        Range {
            start: Position::new(
                self.start_line.saturating_sub(1),
                self.start_column.saturating_sub(1),
            ),
            end: Position::new(
                self.end_line.saturating_sub(1),
                self.end_column.saturating_sub(1),
            ),
        }
    }

    /// Whether the start precedes or equals the end, comparing (line, column).
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        (self.start_line, self.start_column) <= (self.end_line, self.end_column)
    }
}
