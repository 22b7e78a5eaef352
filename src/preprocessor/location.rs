//! Source locations, tracked through the main scan and through macro rescans.

use derive_more::Display;

/// A position in a source file, or in a macro replacement text being
/// rescanned (in which case `file` names the macro call site instead of a
/// real file).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Display, Debug)]
#[display("{file}:{line}:{column}")]
pub struct Location {
    pub file: usize,
    pub line: u32,
    pub column: u32,
    /// Byte offset of the start of the current line, used to recompute
    /// `column` after a bulk advance (e.g. skipping a multi-line comment).
    pub begin_of_line_offset: usize,
}

impl Location {
    pub fn start(file: usize) -> Self {
        Location {
            file,
            line: 1,
            column: 1,
            begin_of_line_offset: 0,
        }
    }

    /// Advances past `text`, updating `line`/`column`/`begin_of_line_offset`
    /// for every newline it contains.
    pub fn advance(&mut self, text: &str, byte_offset: usize) {
        for (idx, ch) in text.char_indices() {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
                self.begin_of_line_offset = byte_offset + idx + 1;
            } else {
                self.column += 1;
            }
        }
    }
}
