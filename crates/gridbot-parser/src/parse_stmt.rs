//! Statement parsing.
//!
//! Compound statements own an indented block (or a single simple statement
//! on the header line). `break`/`continue` are checked against the loop depth
//! and `return` against the function depth while parsing.

use crate::parser::{Parser, MAX_BLOCK_DEPTH};
use gridbot_lexer::TokenKind;
use gridbot_types::ast::*;
use gridbot_types::{ErrorCode, Span};

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Dispatch
    // ══════════════════════════════════════════════════════════════════════════

    /// Parse one statement starting at the current token.
    pub(crate) fn parse_statement(&mut self) -> Option<Stmt> {
        match self.peek_kind().clone() {
            TokenKind::If => self.parse_if().map(|node| {
                let span = node.span;
                Stmt::new(StmtKind::If(node), span)
            }),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Def => self.parse_def(),
            TokenKind::Indent => {
                self.error_at_current(ErrorCode::UNEXPECTED_INDENT, "unexpected indent");
                self.skip_stray_block();
                None
            }
            TokenKind::Elif | TokenKind::Else => {
                let word = self.peek_kind().to_string();
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("'{word}' without a matching 'if'"),
                );
                None
            }
            TokenKind::Unsupported(word) => {
                self.error_at_current(
                    ErrorCode::UNSUPPORTED_SYNTAX,
                    format!("'{word}' is not supported"),
                );
                None
            }
            _ => self.parse_simple_statement(),
        }
    }

    /// Statements that fit on one line.
    fn parse_simple_statement(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        let kind = match self.peek_kind() {
            TokenKind::Pass => {
                self.advance();
                StmtKind::Pass
            }
            TokenKind::Break => {
                self.advance();
                if self.loop_depth == 0 {
                    self.error_at(ErrorCode::OUTSIDE_LOOP, "'break' outside loop", start);
                    return None;
                }
                StmtKind::Break
            }
            TokenKind::Continue => {
                self.advance();
                if self.loop_depth == 0 {
                    self.error_at(
                        ErrorCode::OUTSIDE_LOOP,
                        "'continue' not properly in loop",
                        start,
                    );
                    return None;
                }
                StmtKind::Continue
            }
            TokenKind::Return => self.parse_return(start)?,
            TokenKind::Global => self.parse_global()?,
            TokenKind::Import | TokenKind::From => self.parse_import()?,
            _ => self.parse_expression_statement()?,
        };
        let span = start.to(self.previous_span());
        self.expect_newline()?;
        Some(Stmt::new(kind, span))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Blocks
    // ══════════════════════════════════════════════════════════════════════════

    /// Parse the body after a header's `:`.
    ///
    /// Either `NEWLINE INDENT stmts DEDENT` or one simple statement on the
    /// same line.
    pub(crate) fn parse_block(&mut self) -> Option<Vec<Stmt>> {
        if !self.check(&TokenKind::Newline) {
            return self.parse_simple_statement().map(|stmt| vec![stmt]);
        }
        self.advance();
        if !self.check(&TokenKind::Indent) {
            self.error_at_current(ErrorCode::EXPECTED_INDENT, "expected an indented block");
            return None;
        }
        self.block_depth += 1;
        if self.block_depth > MAX_BLOCK_DEPTH {
            self.error_at_current(
                ErrorCode::NESTING_TOO_DEEP,
                format!("blocks nested more than {MAX_BLOCK_DEPTH} deep"),
            );
            self.block_depth -= 1;
            self.skip_stray_block();
            return None;
        }
        self.advance();

        // Statements that fail are already reported; the block is still
        // returned so the enclosing header does not resynchronize again.
        let mut body = Vec::new();
        while !self.check(&TokenKind::Dedent) && !self.at_end() {
            if self.too_many_errors() {
                break;
            }
            match self.parse_statement() {
                Some(stmt) => body.push(stmt),
                None => self.synchronize(),
            }
        }
        self.eat(&TokenKind::Dedent);
        self.block_depth -= 1;
        Some(body)
    }

    /// Consume an indented block that no header owns.
    fn skip_stray_block(&mut self) {
        let mut depth = 0u32;
        loop {
            match self.peek_kind() {
                TokenKind::Eof => return,
                TokenKind::Indent => depth += 1,
                TokenKind::Dedent => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.advance();
                        return;
                    }
                }
                _ => {}
            }
            self.advance();
        }
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Compound Statements
    // ══════════════════════════════════════════════════════════════════════════

    /// `if cond: ...` followed by any `elif`/`else` clauses.
    ///
    /// Called with the cursor on `if` or `elif`; the node's span covers only
    /// that header line.
    fn parse_if(&mut self) -> Option<IfStmt> {
        let start = self.advance();
        let condition = self.parse_expression()?;
        let span = start.to(self.previous_span());
        self.expect(&TokenKind::Colon)?;
        let then_body = self.parse_block()?;

        let else_branch = match self.peek_kind() {
            TokenKind::Elif => Some(ElseBranch::Elif(Box::new(self.parse_elif()?))),
            TokenKind::Else => {
                self.advance();
                self.expect(&TokenKind::Colon)?;
                Some(ElseBranch::Else(self.parse_block()?))
            }
            _ => None,
        };

        Some(IfStmt {
            condition,
            then_body,
            else_branch,
            span,
        })
    }

    /// An `elif` nests one `if` inside the previous one, so the chain counts
    /// against the block depth.
    fn parse_elif(&mut self) -> Option<IfStmt> {
        self.block_depth += 1;
        let result = if self.block_depth > MAX_BLOCK_DEPTH {
            self.error_at_current(
                ErrorCode::NESTING_TOO_DEEP,
                format!("more than {MAX_BLOCK_DEPTH} nested blocks and 'elif' branches"),
            );
            None
        } else {
            self.parse_if()
        };
        self.block_depth -= 1;
        result
    }

    fn parse_while(&mut self) -> Option<Stmt> {
        let start = self.advance();
        let condition = self.parse_expression()?;
        let span = start.to(self.previous_span());
        self.expect(&TokenKind::Colon)?;
        let body = self.parse_loop_body()?;
        Some(Stmt::new(StmtKind::While { condition, body }, span))
    }

    fn parse_for(&mut self) -> Option<Stmt> {
        let start = self.advance();
        let target = self.expect_identifier()?;
        if self.check(&TokenKind::Comma) {
            self.error_at_current(
                ErrorCode::UNSUPPORTED_SYNTAX,
                "unpacking several loop variables is not supported",
            );
            return None;
        }
        self.expect(&TokenKind::In)?;
        let iterable = self.parse_expression()?;
        let span = start.to(self.previous_span());
        self.expect(&TokenKind::Colon)?;
        let body = self.parse_loop_body()?;
        Some(Stmt::new(
            StmtKind::For {
                target,
                iterable,
                body,
            },
            span,
        ))
    }

    fn parse_loop_body(&mut self) -> Option<Vec<Stmt>> {
        self.loop_depth += 1;
        let body = self.parse_block();
        self.loop_depth -= 1;
        body
    }

    /// `def name(a, b): ...`
    fn parse_def(&mut self) -> Option<Stmt> {
        let start = self.advance();
        let name = self.expect_identifier()?;
        self.expect(&TokenKind::LParen)?;

        let mut params: Vec<Ident> = Vec::new();
        while !self.check(&TokenKind::RParen) {
            let param = self.expect_identifier()?;
            if self.check(&TokenKind::Eq) {
                self.error_at_current(
                    ErrorCode::UNSUPPORTED_SYNTAX,
                    "default parameter values are not supported",
                );
                return None;
            }
            if params.iter().any(|p| p.name == param.name) {
                self.error_at(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("duplicate parameter '{}'", param.name),
                    param.span,
                );
                return None;
            }
            params.push(param);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        let span = start.to(self.previous_span());
        self.expect(&TokenKind::Colon)?;

        // A loop around the `def` does not make `break` legal inside it.
        let outer_loops = std::mem::replace(&mut self.loop_depth, 0);
        self.function_depth += 1;
        let body = self.parse_block();
        self.function_depth -= 1;
        self.loop_depth = outer_loops;

        Some(Stmt::new(
            StmtKind::FunctionDef(FunctionDef {
                name,
                params,
                body: body?,
                span,
            }),
            span,
        ))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Simple Statements
    // ══════════════════════════════════════════════════════════════════════════

    fn parse_return(&mut self, start: Span) -> Option<StmtKind> {
        self.advance();
        if self.function_depth == 0 {
            self.error_at(ErrorCode::OUTSIDE_FUNCTION, "'return' outside function", start);
            return None;
        }
        let value = match self.peek_kind() {
            TokenKind::Newline | TokenKind::Eof | TokenKind::Dedent => None,
            _ => Some(self.parse_expression()?),
        };
        Some(StmtKind::Return(value))
    }

    /// `global a, b`
    fn parse_global(&mut self) -> Option<StmtKind> {
        self.advance();
        let mut names = vec![self.expect_identifier()?];
        while self.eat(&TokenKind::Comma) {
            names.push(self.expect_identifier()?);
        }
        Some(StmtKind::Global(names))
    }

    /// `import a.b [as c]` or `from a.b import ...`.
    ///
    /// Only the module path is kept; the rest of the line is skipped since
    /// imports are always refused before anything runs.
    fn parse_import(&mut self) -> Option<StmtKind> {
        let from = self.check(&TokenKind::From);
        self.advance();
        let mut module = self.expect_identifier()?.name;
        while self.eat(&TokenKind::Dot) {
            module.push('.');
            module.push_str(&self.expect_identifier()?.name);
        }
        if from {
            self.expect(&TokenKind::Import)?;
        }
        while !matches!(
            self.peek_kind(),
            TokenKind::Newline | TokenKind::Eof | TokenKind::Dedent
        ) {
            self.advance();
        }
        Some(StmtKind::Import(ImportStmt { module, from }))
    }

    /// Expression statement, assignment or augmented assignment.
    fn parse_expression_statement(&mut self) -> Option<StmtKind> {
        let expr = self.parse_expression()?;

        let aug_op = match self.peek_kind() {
            TokenKind::PlusEq => Some(BinOp::Add),
            TokenKind::MinusEq => Some(BinOp::Sub),
            TokenKind::StarEq => Some(BinOp::Mul),
            TokenKind::SlashSlashEq => Some(BinOp::FloorDiv),
            TokenKind::PercentEq => Some(BinOp::Mod),
            _ => None,
        };
        if let Some(op) = aug_op {
            self.advance();
            let target = self.assignment_target(expr)?;
            let value = self.parse_expression()?;
            return Some(StmtKind::AugAssign { target, op, value });
        }

        if !self.eat(&TokenKind::Eq) {
            return Some(StmtKind::Expr(expr));
        }
        let target = self.assignment_target(expr)?;
        let value = self.parse_expression()?;
        if self.check(&TokenKind::Eq) {
            self.error_at_current(
                ErrorCode::UNSUPPORTED_SYNTAX,
                "chained assignment is not supported",
            );
            return None;
        }
        Some(StmtKind::Assign { target, value })
    }

    fn assignment_target(&mut self, expr: Expr) -> Option<Target> {
        match expr.kind {
            ExprKind::Name(name) => Some(Target::Name(Ident::new(name, expr.span))),
            ExprKind::Subscript { object, index } => Some(Target::Subscript {
                object: *object,
                index: *index,
            }),
            _ => {
                self.error_at(
                    ErrorCode::UNEXPECTED_TOKEN,
                    "cannot assign to this expression",
                    expr.span,
                );
                None
            }
        }
    }
}
