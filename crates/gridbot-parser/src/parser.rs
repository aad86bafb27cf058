//! Core parser infrastructure: token cursor, error reporting, helpers.

use gridbot_lexer::{Lexer, Token, TokenKind};
use gridbot_types::ast::{Ident, Program};
use gridbot_types::{Diagnostics, ErrorCode, SourceFile, Span, SyntaxError};

static EOF: TokenKind = TokenKind::Eof;

/// Deepest expression tree accepted before parsing gives up. Nesting and
/// operator or postfix chains both count.
pub(crate) const MAX_EXPR_DEPTH: u32 = 64;
/// Deepest block nesting accepted before parsing gives up.
pub(crate) const MAX_BLOCK_DEPTH: u32 = 32;

/// The gridbot parser.
///
/// Consumes a token stream produced by the lexer and builds a [`Program`].
/// Collects errors and attempts recovery when possible.
pub struct Parser<'src> {
    tokens: Vec<Token>,
    /// Current index into `tokens`.
    pos: usize,
    source_file: &'src SourceFile,
    errors: Diagnostics,
    /// Enclosing `while`/`for` bodies within the current function.
    pub(crate) loop_depth: u32,
    /// Enclosing `def` bodies.
    pub(crate) function_depth: u32,
    pub(crate) expr_depth: u32,
    pub(crate) block_depth: u32,
}

/// Result of parsing.
pub struct ParseResult {
    /// `None` whenever any error was reported.
    pub program: Option<Program>,
    pub errors: Diagnostics,
}

/// Lex and parse a whole source file.
///
/// Lexer errors come first in the returned diagnostics; a program is only
/// produced when neither pass reported anything.
pub fn parse_source(source_file: &SourceFile) -> ParseResult {
    let lexed = Lexer::new(source_file).lex();
    let mut parsed = Parser::new(lexed.tokens, source_file).parse();
    if lexed.errors.has_errors() {
        let mut errors = lexed.errors;
        errors.extend(parsed.errors);
        parsed.errors = errors;
        parsed.program = None;
    }
    parsed
}

impl<'src> Parser<'src> {
    pub fn new(tokens: Vec<Token>, source_file: &'src SourceFile) -> Self {
        Self {
            tokens,
            pos: 0,
            source_file,
            errors: Diagnostics::new(),
            loop_depth: 0,
            function_depth: 0,
            expr_depth: 0,
            block_depth: 0,
        }
    }

    // ── Token Cursor ──────────────────────────────────────────────────────────

    /// Returns the kind of the current token.
    pub(crate) fn peek_kind(&self) -> &TokenKind {
        self.look_ahead(0)
    }

    /// Look ahead by `n` tokens from current position.
    pub(crate) fn look_ahead(&self, n: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| &t.kind)
            .unwrap_or(&EOF)
    }

    /// Advance the cursor by one and return the consumed token's span.
    pub(crate) fn advance(&mut self) -> Span {
        let span = self.current_span();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        span
    }

    /// Span of the previously consumed token.
    pub(crate) fn previous_span(&self) -> Span {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|t| t.span)
            .unwrap_or_else(|| Span::point(1, 1))
    }

    pub(crate) fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.span)
            .unwrap_or_else(|| Span::point(1, 1))
    }

    pub(crate) fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    /// If the current token matches, advance and return `true`.
    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    // ── Expect Helpers ────────────────────────────────────────────────────────

    /// Expect a specific token kind, reporting an error if it is missing.
    pub(crate) fn expect(&mut self, expected: &TokenKind) -> Option<Span> {
        if self.check(expected) {
            Some(self.advance())
        } else {
            self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("expected '{}', got '{}'", expected, self.peek_kind()),
            );
            None
        }
    }

    pub(crate) fn expect_identifier(&mut self) -> Option<Ident> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                let span = self.advance();
                Some(Ident::new(name, span))
            }
            other => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected a name, got '{other}'"),
                );
                None
            }
        }
    }

    /// Expect the end of a simple statement.
    pub(crate) fn expect_newline(&mut self) -> Option<()> {
        match self.peek_kind() {
            TokenKind::Newline => {
                self.advance();
                Some(())
            }
            TokenKind::Eof | TokenKind::Dedent => Some(()),
            other => {
                let message = format!("expected end of line, got '{other}'");
                self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, message);
                None
            }
        }
    }

    // ── Error Reporting ───────────────────────────────────────────────────────

    pub(crate) fn error_at_current(&mut self, code: ErrorCode, message: impl Into<String>) {
        let span = self.current_span();
        self.error_at(code, message, span);
    }

    pub(crate) fn error_at(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self.source_file.line(span.line).unwrap_or("");
        self.errors
            .push(SyntaxError::new(code, message, span, source_line));
    }

    pub(crate) fn error_with_suggestion(
        &mut self,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        suggestion: impl Into<String>,
    ) {
        let source_line = self.source_file.line(span.line).unwrap_or("");
        let error = SyntaxError::new(code, message, span, source_line).with_suggestion(suggestion);
        self.errors.push(error);
    }

    /// Returns `true` once the error limit is reached and parsing should stop.
    pub(crate) fn too_many_errors(&self) -> bool {
        self.errors.is_full()
    }

    // ── Synchronization ───────────────────────────────────────────────────────

    /// Skip to the start of the next statement after an error.
    ///
    /// Stops after a `Newline`, or before a `Dedent` so the enclosing block
    /// still closes where the source says it does.
    pub(crate) fn synchronize(&mut self) {
        let mut nested_blocks = 0u32;
        loop {
            match self.peek_kind() {
                TokenKind::Eof => return,
                TokenKind::Dedent if nested_blocks == 0 => return,
                TokenKind::Indent => {
                    nested_blocks += 1;
                    self.advance();
                }
                TokenKind::Dedent => {
                    nested_blocks -= 1;
                    self.advance();
                    if nested_blocks == 0 {
                        return;
                    }
                }
                TokenKind::Newline if nested_blocks == 0 => {
                    self.advance();
                    // A header that failed still owns its indented body.
                    if !self.check(&TokenKind::Indent) {
                        return;
                    }
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ── Public API ────────────────────────────────────────────────────────────

    /// Parse the token stream into a [`Program`].
    pub fn parse(mut self) -> ParseResult {
        let start = self.current_span();
        let mut body = Vec::new();
        while !self.at_end() && !self.too_many_errors() {
            match self.peek_kind() {
                TokenKind::Newline | TokenKind::Dedent => {
                    self.advance();
                    continue;
                }
                _ => {}
            }
            match self.parse_statement() {
                Some(stmt) => body.push(stmt),
                None => self.synchronize(),
            }
        }
        let span = start.to(self.previous_span());
        let program = (!self.errors.has_errors()).then(|| Program { body, span });
        ParseResult {
            program,
            errors: self.errors,
        }
    }
}
