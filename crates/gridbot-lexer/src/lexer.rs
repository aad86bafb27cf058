//! Core gridbot lexer: converts program text to a token stream.
//!
//! Features:
//! - Offside-rule layout: `Indent` / `Dedent` / `Newline` tokens derived from
//!   leading whitespace, suppressed inside brackets and after `\` joins
//! - Blank and comment-only lines never produce layout tokens
//! - `#` comments stripped
//! - Integer literals checked against the 64-bit range
//! - Error recovery: collects up to 20 errors instead of stopping at the first

use gridbot_types::{Diagnostics, ErrorCode, SourceFile, Span, SyntaxError};

use crate::token::{Token, TokenKind};

/// Column width a tab advances indentation to a multiple of.
const TAB_WIDTH: u32 = 8;

/// The gridbot lexer.
///
/// Converts program text into a vector of [`Token`]s, collecting up to
/// [`gridbot_types::MAX_ERRORS`] errors along the way.
pub struct Lexer<'src> {
    source: &'src [u8],
    source_file: &'src SourceFile,
    /// Current byte offset into `source`.
    pos: usize,
    /// Current line (1-based).
    line: u32,
    /// Current column (1-based).
    col: u32,
    errors: Diagnostics,
    /// Widths of the open indented blocks; always starts with 0.
    indents: Vec<u32>,
    /// Open `(`, `[` and `{` not yet closed.
    bracket_depth: u32,
    /// Set after a `Newline`, cleared once indentation has been measured.
    at_line_start: bool,
}

/// Result of lexing: tokens + any errors collected.
pub struct LexResult {
    /// The token stream (always ends with [`TokenKind::Eof`]).
    pub tokens: Vec<Token>,
    pub errors: Diagnostics,
}

impl<'src> Lexer<'src> {
    pub fn new(source_file: &'src SourceFile) -> Self {
        Self {
            source: source_file.source.as_bytes(),
            source_file,
            pos: 0,
            line: 1,
            col: 1,
            errors: Diagnostics::new(),
            indents: vec![0],
            bracket_depth: 0,
            at_line_start: true,
        }
    }

    /// Lex the whole source into a token stream.
    pub fn lex(mut self) -> LexResult {
        let mut tokens = Vec::new();

        while !self.errors.is_full() {
            if self.at_line_start && self.bracket_depth == 0 {
                if !self.measure_indentation(&mut tokens) {
                    break;
                }
                continue;
            }

            self.skip_inline_whitespace();
            match self.peek() {
                None => break,
                Some(b'#') => self.skip_comment(),
                Some(b'\n') => {
                    let span = self.current_span();
                    self.advance();
                    if self.bracket_depth == 0 {
                        tokens.push(Token::new(TokenKind::Newline, span));
                        self.at_line_start = true;
                    }
                }
                Some(b'\r') if self.peek_at(1) == Some(b'\n') => {
                    self.advance();
                }
                Some(b'\\') => self.scan_line_join(),
                Some(_) => {
                    if let Some(token) = self.scan_token() {
                        tokens.push(token);
                    }
                }
            }
        }

        self.finish(&mut tokens);
        LexResult {
            tokens,
            errors: self.errors,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.source.get(self.pos).copied()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn current_span(&self) -> Span {
        Span::point(self.line, self.col)
    }

    fn span_from(&self, start_line: u32, start_col: u32) -> Span {
        Span::new(
            start_line,
            start_col,
            self.line,
            self.col.saturating_sub(1).max(1),
        )
    }

    fn emit_error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self.source_file.line(span.line).unwrap_or("");
        let err = SyntaxError::new(code, message, span, source_line);
        self.errors.push(err);
    }

    fn emit_error_with_suggestion(
        &mut self,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        suggestion: impl Into<String>,
    ) {
        let source_line = self.source_file.line(span.line).unwrap_or("");
        let err = SyntaxError::new(code, message, span, source_line).with_suggestion(suggestion);
        self.errors.push(err);
    }

    // ─────────────────────────────────────────────────────────────
    // Layout
    // ─────────────────────────────────────────────────────────────

    /// Measure the indentation of the line at the cursor and emit the
    /// matching `Indent`/`Dedent` tokens.
    ///
    /// Blank and comment-only lines are consumed whole. Returns `false` at
    /// end of input.
    fn measure_indentation(&mut self, tokens: &mut Vec<Token>) -> bool {
        let mut width = 0u32;
        loop {
            match self.peek() {
                Some(b' ') => width += 1,
                Some(b'\t') => width = (width / TAB_WIDTH + 1) * TAB_WIDTH,
                Some(b'\x0c') => width = 0,
                _ => break,
            }
            self.advance();
        }

        match self.peek() {
            None => return false,
            Some(b'\n') => {
                self.advance();
                return true;
            }
            Some(b'\r') if self.peek_at(1) == Some(b'\n') => {
                self.advance();
                self.advance();
                return true;
            }
            Some(b'#') => {
                self.skip_comment();
                if self.peek() == Some(b'\n') {
                    self.advance();
                }
                return true;
            }
            _ => {}
        }

        self.at_line_start = false;
        let span = self.current_span();
        let current = self.indents.last().copied().unwrap_or(0);

        if width > current {
            if tokens.is_empty() {
                self.emit_error(
                    ErrorCode::UNEXPECTED_INDENT,
                    "unexpected indent on the first line",
                    span,
                );
                return true;
            }
            self.indents.push(width);
            tokens.push(Token::new(TokenKind::Indent, span));
        } else if width < current {
            while self.indents.last().is_some_and(|&open| open > width) {
                self.indents.pop();
                tokens.push(Token::new(TokenKind::Dedent, span));
            }
            if self.indents.last().copied().unwrap_or(0) != width {
                self.emit_error(
                    ErrorCode::INCONSISTENT_DEDENT,
                    "unindent does not match any outer indentation level",
                    span,
                );
                // Treat the line as opening a block at its own width so the
                // following lines line up again.
                self.indents.push(width);
            }
        }
        true
    }

    /// Close the stream: final `Newline`, one `Dedent` per open block, `Eof`.
    fn finish(&mut self, tokens: &mut Vec<Token>) {
        let span = self.current_span();
        if self.bracket_depth > 0 {
            self.emit_error(
                ErrorCode::UNEXPECTED_TOKEN,
                "unexpected end of program inside brackets",
                span,
            );
        }
        if tokens
            .last()
            .is_some_and(|t| !matches!(t.kind, TokenKind::Newline | TokenKind::Dedent))
        {
            tokens.push(Token::new(TokenKind::Newline, span));
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            tokens.push(Token::new(TokenKind::Dedent, span));
        }
        tokens.push(Token::new(TokenKind::Eof, span));
    }

    // ─────────────────────────────────────────────────────────────
    // Whitespace & comments
    // ─────────────────────────────────────────────────────────────

    fn skip_inline_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\x0c')) {
            self.advance();
        }
    }

    fn skip_comment(&mut self) {
        while self.peek().is_some_and(|c| c != b'\n') {
            self.advance();
        }
    }

    /// `\` immediately before a line break joins the two lines.
    fn scan_line_join(&mut self) {
        let span = self.current_span();
        self.advance();
        if self.peek() == Some(b'\r') {
            self.advance();
        }
        if self.peek() == Some(b'\n') {
            self.advance();
        } else {
            self.emit_error(
                ErrorCode::UNEXPECTED_CHARACTER,
                "unexpected character after line continuation '\\'",
                span,
            );
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Tokens
    // ─────────────────────────────────────────────────────────────

    fn scan_token(&mut self) -> Option<Token> {
        let start_line = self.line;
        let start_col = self.col;
        let ch = self.peek()?;

        if ch.is_ascii_digit() {
            return self.scan_number(start_line, start_col);
        }
        if ch.is_ascii_alphabetic() || ch == b'_' {
            return Some(self.scan_word(start_line, start_col));
        }
        if ch == b'"' || ch == b'\'' {
            return self.scan_string(start_line, start_col);
        }

        self.advance();
        let kind = match ch {
            b'(' => {
                self.bracket_depth += 1;
                TokenKind::LParen
            }
            b'[' => {
                self.bracket_depth += 1;
                TokenKind::LBracket
            }
            b'{' => {
                self.bracket_depth += 1;
                TokenKind::LBrace
            }
            b')' | b']' | b'}' => {
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                match ch {
                    b')' => TokenKind::RParen,
                    b']' => TokenKind::RBracket,
                    _ => TokenKind::RBrace,
                }
            }
            b',' => TokenKind::Comma,
            b':' => TokenKind::Colon,
            b'.' => TokenKind::Dot,
            b'+' => self.with_eq(TokenKind::Plus, TokenKind::PlusEq),
            b'-' => self.with_eq(TokenKind::Minus, TokenKind::MinusEq),
            b'%' => self.with_eq(TokenKind::Percent, TokenKind::PercentEq),
            b'*' => {
                if self.peek() == Some(b'*') {
                    self.advance();
                    TokenKind::StarStar
                } else {
                    self.with_eq(TokenKind::Star, TokenKind::StarEq)
                }
            }
            b'/' => {
                if self.peek() == Some(b'/') {
                    self.advance();
                    self.with_eq(TokenKind::SlashSlash, TokenKind::SlashSlashEq)
                } else {
                    TokenKind::Slash
                }
            }
            b'=' => self.with_eq(TokenKind::Eq, TokenKind::EqEq),
            b'<' => self.with_eq(TokenKind::Less, TokenKind::LessEq),
            b'>' => self.with_eq(TokenKind::Greater, TokenKind::GreaterEq),
            b'!' if self.peek() == Some(b'=') => {
                self.advance();
                TokenKind::BangEq
            }
            b';' => {
                self.emit_error_with_suggestion(
                    ErrorCode::UNSUPPORTED_SYNTAX,
                    "';' is not supported",
                    self.span_from(start_line, start_col),
                    "put each statement on its own line",
                );
                return None;
            }
            _ => {
                // Skip the rest of a multi-byte character so one bad glyph
                // reports once.
                while self.peek().is_some_and(|c| c & 0xC0 == 0x80) {
                    self.advance();
                }
                let span = self.span_from(start_line, start_col);
                let glyph = self.text_since(start_col);
                self.emit_error(
                    ErrorCode::UNEXPECTED_CHARACTER,
                    format!("unexpected character '{glyph}'"),
                    span,
                );
                return None;
            }
        };
        Some(Token::new(kind, self.span_from(start_line, start_col)))
    }

    /// `plain`, or `with_eq` when the next byte is `=`.
    fn with_eq(&mut self, plain: TokenKind, with_eq: TokenKind) -> TokenKind {
        if self.peek() == Some(b'=') {
            self.advance();
            with_eq
        } else {
            plain
        }
    }

    /// Source text consumed on the current line since `start_col`.
    fn text_since(&self, start_col: u32) -> String {
        let consumed = (self.col - start_col) as usize;
        String::from_utf8_lossy(&self.source[self.pos - consumed..self.pos]).into_owned()
    }

    fn scan_word(&mut self, start_line: u32, start_col: u32) -> Token {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
        {
            self.advance();
        }
        let word = String::from_utf8_lossy(&self.source[start..self.pos]).into_owned();
        let kind = TokenKind::from_keyword(&word).unwrap_or(TokenKind::Identifier(word));
        Token::new(kind, self.span_from(start_line, start_col))
    }

    fn scan_number(&mut self, start_line: u32, start_col: u32) -> Option<Token> {
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                digits.push(c as char);
            } else if c == b'_' && self.peek_at(1).is_some_and(|n| n.is_ascii_digit()) {
                // digit separator
            } else {
                break;
            }
            self.advance();
        }

        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
            self.emit_error_with_suggestion(
                ErrorCode::UNSUPPORTED_SYNTAX,
                "decimal numbers are not supported",
                self.span_from(start_line, start_col),
                "use whole numbers only",
            );
            return None;
        }

        if self
            .peek()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == b'_')
        {
            while self
                .peek()
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
            {
                self.advance();
            }
            self.emit_error(
                ErrorCode::INVALID_NUMBER,
                "invalid number literal",
                self.span_from(start_line, start_col),
            );
            return None;
        }

        let span = self.span_from(start_line, start_col);
        match digits.parse::<i64>() {
            Ok(value) => Some(Token::new(TokenKind::Int(value), span)),
            Err(_) => {
                self.emit_error(ErrorCode::INVALID_NUMBER, "integer literal too large", span);
                None
            }
        }
    }

    fn scan_string(&mut self, start_line: u32, start_col: u32) -> Option<Token> {
        let Some(quote) = self.advance() else {
            return None;
        };
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.advance();
            self.advance();
        }

        let mut bytes = Vec::new();
        loop {
            match self.peek() {
                None => break,
                Some(b'\n') if !triple => break,
                Some(c) if c == quote => {
                    if !triple {
                        self.advance();
                        return Some(self.string_token(bytes, start_line, start_col));
                    }
                    if self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote) {
                        self.advance();
                        self.advance();
                        self.advance();
                        return Some(self.string_token(bytes, start_line, start_col));
                    }
                    bytes.push(c);
                    self.advance();
                }
                Some(b'\\') => {
                    self.advance();
                    self.scan_escape(&mut bytes);
                }
                Some(c) => {
                    bytes.push(c);
                    self.advance();
                }
            }
        }

        self.emit_error(
            ErrorCode::UNTERMINATED_STRING,
            "unterminated string literal",
            self.span_from(start_line, start_col),
        );
        None
    }

    fn scan_escape(&mut self, bytes: &mut Vec<u8>) {
        let escape_span = self.current_span();
        let Some(c) = self.peek() else {
            return;
        };
        if !c.is_ascii() {
            self.unknown_escape(escape_span);
            return;
        }
        self.advance();
        match c {
            b'n' => bytes.push(b'\n'),
            b't' => bytes.push(b'\t'),
            b'r' => bytes.push(b'\r'),
            b'0' => bytes.push(0),
            b'\\' | b'\'' | b'"' => bytes.push(c),
            // escaped line break continues the literal
            b'\n' => {}
            other => {
                self.emit_error(
                    ErrorCode::UNEXPECTED_CHARACTER,
                    format!("unknown escape sequence '\\{}'", char::from(other)),
                    escape_span,
                );
            }
        }
    }

    /// Report an escape of a multi-byte character and skip all of its bytes.
    fn unknown_escape(&mut self, escape_span: Span) {
        let ch = self
            .source_file
            .source
            .get(self.pos..)
            .and_then(|rest| rest.chars().next())
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        for _ in 0..ch.len_utf8() {
            self.advance();
        }
        self.emit_error(
            ErrorCode::UNEXPECTED_CHARACTER,
            format!("unknown escape sequence '\\{ch}'"),
            escape_span,
        );
    }

    fn string_token(&self, bytes: Vec<u8>, start_line: u32, start_col: u32) -> Token {
        let text = String::from_utf8_lossy(&bytes).into_owned();
        Token::new(TokenKind::Str(text), self.span_from(start_line, start_col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let file = SourceFile::new("test.py", source);
        let result = Lexer::new(&file).lex();
        assert!(
            !result.errors.has_errors(),
            "unexpected errors: {:?}",
            result.errors.errors
        );
        result.tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn empty_source_is_just_eof() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
        assert_eq!(kinds("\n\n   \n# note\n"), vec![TokenKind::Eof]);
    }

    #[test]
    fn final_newline_is_synthesised() {
        assert_eq!(
            kinds("pass"),
            vec![TokenKind::Pass, TokenKind::Newline, TokenKind::Eof]
        );
    }

    #[test]
    fn tab_indents_to_next_multiple_of_eight() {
        let file = SourceFile::new("t", "if x:\n\ty\n        z\n");
        let result = Lexer::new(&file).lex();
        assert!(!result.errors.has_errors());
        let indents = result
            .tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Indent)
            .count();
        assert_eq!(indents, 1);
    }

    #[test]
    fn inconsistent_dedent_is_reported() {
        let file = SourceFile::new("t", "if x:\n    y\n  z\n");
        let result = Lexer::new(&file).lex();
        assert_eq!(result.errors.errors.len(), 1);
        assert_eq!(result.errors.errors[0].code, ErrorCode::INCONSISTENT_DEDENT);
        assert_eq!(result.errors.errors[0].span.line, 3);
    }
}
