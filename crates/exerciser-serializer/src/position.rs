//! Locating error offsets in an edited buffer

use serde::{Deserialize, Serialize};

/// 1-based line, column position in a text buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// Resolve a character offset into a line and column
///
/// Scanning starts at character 1: a newline bumps the line and resets the
/// column to 0, any other character advances the column.
pub fn resolve_position(buffer: &str, offset: usize) -> Position {
    let chars: Vec<char> = buffer.chars().collect();
    let mut line = 1;
    let mut column = 1;
    // past the end of the buffer every position counts as a column
    for position in 1..offset {
        if chars.get(position) == Some(&'\n') {
            line += 1;
            column = 0;
        } else {
            column += 1;
        }
    }
    Position { line, column }
}

/// Range of the one-character marker for an error at `offset`
pub fn marker_range(buffer: &str, offset: usize) -> (Position, Position) {
    let start = offset + 1;
    (resolve_position(buffer, start), resolve_position(buffer, start + 1))
}
