//! Position conversion utilities.
//!
//! Tokens and nodes only carry byte offsets. Line and column are derived on
//! demand when an error is rendered.

/// Line/column view of a byte offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Byte offset in source
    pub byte: usize,
    /// Line number (0-indexed)
    pub line: usize,
    /// Column number (0-indexed, in characters)
    pub col: usize,
}

impl Position {
    /// Locate a byte offset in `source`. Offsets past the end are clamped,
    /// offsets inside a multi-byte character snap back to its first byte.
    pub fn locate(source: &str, byte_offset: usize) -> Self {
        let mut byte = byte_offset.min(source.len());
        while !source.is_char_boundary(byte) {
            byte -= 1;
        }

        let before = &source[..byte];
        let line = before.matches('\n').count();
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let col = source[line_start..byte].chars().count();

        Self { byte, line, col }
    }
}
