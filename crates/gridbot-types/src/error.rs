use crate::Span;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum number of syntax errors kept before the rest are only counted.
pub const MAX_ERRORS: usize = 20;

/// Numeric syntax error code (E100–E199).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Tokens (E100–E109) ──
    pub const UNEXPECTED_CHARACTER: Self = Self(100);
    pub const UNEXPECTED_TOKEN: Self = Self(101);
    pub const UNTERMINATED_STRING: Self = Self(102);
    pub const INVALID_NUMBER: Self = Self(103);
    pub const UNSUPPORTED_SYNTAX: Self = Self(104);

    // ── Indentation (E110–E119) ──
    pub const INCONSISTENT_DEDENT: Self = Self(110);
    pub const UNEXPECTED_INDENT: Self = Self(111);
    pub const EXPECTED_INDENT: Self = Self(112);

    // ── Statement placement (E120–E129) ──
    pub const OUTSIDE_LOOP: Self = Self(120);
    pub const OUTSIDE_FUNCTION: Self = Self(121);

    // ── Limits (E130–E139) ──
    pub const NESTING_TOO_DEEP: Self = Self(130);
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// A malformed-program error from the lexer or parser.
///
/// Hosts render these directly; the message is never parsed back.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{span}: {code} {message}")]
pub struct SyntaxError {
    pub code: ErrorCode,
    pub message: String,
    pub span: Span,
    /// The offending source line, for display next to the message.
    pub source_line: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl SyntaxError {
    pub fn new(
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        source_line: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            span,
            source_line: source_line.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Syntax errors collected across one lexing or parsing pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    pub errors: Vec<SyntaxError>,
    /// Every error seen, including the ones dropped past [`MAX_ERRORS`].
    pub total: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        self.total > 0
    }

    /// True once enough errors were seen that scanning should stop.
    pub fn is_full(&self) -> bool {
        self.total >= MAX_ERRORS
    }

    pub fn push(&mut self, error: SyntaxError) {
        if self.errors.len() < MAX_ERRORS {
            self.errors.push(error);
        }
        self.total += 1;
    }

    /// Append another pass's errors after this one's.
    pub fn extend(&mut self, other: Diagnostics) {
        let dropped = other.total - other.errors.len();
        for error in other.errors {
            self.push(error);
        }
        self.total += dropped;
    }

    /// The error that appears earliest in the source.
    pub fn first(&self) -> Option<&SyntaxError> {
        self.errors
            .iter()
            .min_by_key(|e| (e.span.line, e.span.column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_at(line: u32, message: &str) -> SyntaxError {
        SyntaxError::new(
            ErrorCode::UNEXPECTED_TOKEN,
            message,
            Span::point(line, 1),
            "",
        )
    }

    #[test]
    fn error_code_display() {
        assert_eq!(ErrorCode::UNEXPECTED_TOKEN.to_string(), "E101");
        assert_eq!(ErrorCode::INCONSISTENT_DEDENT.to_string(), "E110");
    }

    #[test]
    fn syntax_error_display_has_position_code_and_message() {
        let err = SyntaxError::new(
            ErrorCode::UNTERMINATED_STRING,
            "unterminated string literal",
            Span::new(3, 9, 3, 14),
            "x = 'abc",
        );
        assert_eq!(err.to_string(), "3:9: E102 unterminated string literal");
    }

    #[test]
    fn syntax_error_serializes_suggestion_only_when_present() {
        let plain = error_at(1, "boom");
        let json = serde_json::to_string(&plain).unwrap();
        assert!(!json.contains("suggestion"));

        let hinted = error_at(1, "boom").with_suggestion("use // instead");
        let json = serde_json::to_string(&hinted).unwrap();
        assert!(json.contains("\"suggestion\":\"use // instead\""));
        let back: SyntaxError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hinted);
    }

    #[test]
    fn diagnostics_cap_stored_errors_but_count_all() {
        let mut diags = Diagnostics::new();
        for i in 0..25 {
            diags.push(error_at(i + 1, "bad"));
        }
        assert_eq!(diags.errors.len(), MAX_ERRORS);
        assert_eq!(diags.total, 25);
        assert!(diags.is_full());
    }

    #[test]
    fn diagnostics_first_is_earliest_in_source() {
        let mut diags = Diagnostics::new();
        diags.push(error_at(9, "late"));
        diags.push(error_at(2, "early"));
        assert_eq!(diags.first().map(|e| e.message.as_str()), Some("early"));
    }

    #[test]
    fn diagnostics_extend_keeps_total() {
        let mut lexed = Diagnostics::new();
        lexed.push(error_at(1, "lex"));
        let mut parsed = Diagnostics::new();
        parsed.push(error_at(2, "parse"));
        parsed.push(error_at(3, "parse"));
        lexed.extend(parsed);
        assert_eq!(lexed.total, 3);
        assert_eq!(lexed.errors.len(), 3);
    }
}
