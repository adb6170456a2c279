//! Shared types for efus
//!
//! This crate provides the source position types used across the efus
//! workspace: byte spans into a source text and their line/column view.

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// Byte range into a source text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Human facing position: 1-based line, 0-based column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineCol {
    pub line: usize,
    pub column: usize,
}

impl LineCol {
    /// Locate a byte offset inside `source`.
    ///
    /// The column counts grapheme clusters from the start of the line, so a
    /// caret drawn with that many spaces lines up under the offending text.
    pub fn locate(source: &str, offset: usize) -> Self {
        let offset = clamp_to_boundary(source, offset);
        let line_start = line_start(source, offset);
        Self {
            line: source[..offset].matches('\n').count() + 1,
            column: source[line_start..offset].graphemes(true).count(),
        }
    }
}

/// Text of the line containing `offset`, without its newline
pub fn line_text(source: &str, offset: usize) -> &str {
    let offset = clamp_to_boundary(source, offset);
    let start = line_start(source, offset);
    let end = source[offset..]
        .find('\n')
        .map(|pos| offset + pos)
        .unwrap_or(source.len());
    source[start..end].trim_end_matches('\r')
}

fn line_start(source: &str, offset: usize) -> usize {
    source[..offset].rfind('\n').map(|pos| pos + 1).unwrap_or(0)
}

fn clamp_to_boundary(source: &str, offset: usize) -> usize {
    let mut offset = offset.min(source.len());
    while !source.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_first_line() {
        let pos = LineCol::locate("box width=10", 4);
        assert_eq!(pos, LineCol { line: 1, column: 4 });
    }

    #[test]
    fn test_locate_later_line() {
        let source = "box\n  label text=?";
        let pos = LineCol::locate(source, source.len() - 1);
        assert_eq!(pos.line, 2);
        assert_eq!(pos.column, 13);
        assert_eq!(line_text(source, source.len() - 1), "  label text=?");
    }

    #[test]
    fn test_offset_past_end() {
        let pos = LineCol::locate("ab", 10);
        assert_eq!(pos, LineCol { line: 1, column: 2 });
        assert_eq!(line_text("ab", 10), "ab");
    }

    #[test]
    fn test_line_text_drops_carriage_return() {
        let source = "box\r\n  label text=?\r\n";
        let offset = source.find('?').unwrap();
        assert_eq!(line_text(source, offset), "  label text=?");
        assert_eq!(LineCol::locate(source, offset), LineCol { line: 2, column: 13 });
    }
}
