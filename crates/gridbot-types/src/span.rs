use serde::{Deserialize, Serialize};
use std::fmt;

/// A region of program text.
///
/// Lines and columns are 1-based. A statement's `line` is what the stepping
/// engine reports to the driver, so every AST node keeps one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub line: u32,
    pub column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl Span {
    pub fn new(line: u32, column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            line,
            column,
            end_line,
            end_column,
        }
    }

    /// A zero-width span at one position.
    pub fn point(line: u32, column: u32) -> Self {
        Self::new(line, column, line, column)
    }

    /// Extend `self` up to the end of `later`.
    ///
    /// Spans are produced left to right, so the start of `self` is kept
    /// and only the end is taken from whichever span finishes last.
    pub fn to(self, later: Span) -> Span {
        let (end_line, end_column) = if (later.end_line, later.end_column)
            > (self.end_line, self.end_column)
        {
            (later.end_line, later.end_column)
        } else {
            (self.end_line, self.end_column)
        };
        Span::new(self.line, self.column, end_line, end_column)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Program text plus a line index for error context.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub source: String,
    /// Byte offset where each line starts.
    line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        let source = source.into();
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            name: name.into(),
            source,
            line_starts,
        }
    }

    /// The text of a 1-based line without its terminator, if it exists.
    pub fn line(&self, number: u32) -> Option<&str> {
        let idx = number.checked_sub(1)? as usize;
        let start = *self.line_starts.get(idx)?;
        let end = match self.line_starts.get(idx + 1) {
            Some(next) => next - 1,
            None => self.source.len(),
        };
        Some(self.source[start..end].trim_end_matches('\r'))
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_to_keeps_start_and_takes_latest_end() {
        let head = Span::new(2, 5, 2, 9);
        let tail = Span::new(4, 1, 4, 12);
        assert_eq!(head.to(tail), Span::new(2, 5, 4, 12));
        // An earlier-ending span never shrinks the result.
        assert_eq!(tail.to(head), Span::new(4, 1, 4, 12));
    }

    #[test]
    fn span_display_is_line_colon_column() {
        assert_eq!(Span::point(7, 3).to_string(), "7:3");
    }

    #[test]
    fn source_lines_are_one_based() {
        let src = SourceFile::new("program.py", "right()\nright()\npaint()");
        assert_eq!(src.line(0), None);
        assert_eq!(src.line(1), Some("right()"));
        assert_eq!(src.line(3), Some("paint()"));
        assert_eq!(src.line(4), None);
        assert_eq!(src.line_count(), 3);
    }

    #[test]
    fn source_lines_strip_carriage_returns() {
        let src = SourceFile::new("program.py", "up()\r\ndown()\r\n");
        assert_eq!(src.line(1), Some("up()"));
        assert_eq!(src.line(2), Some("down()"));
        assert_eq!(src.line(3), Some(""));
    }
}
