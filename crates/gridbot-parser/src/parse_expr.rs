//! Expression parsing with full operator precedence.
//!
//! Precedence (lowest → highest):
//! 8. `or`
//! 7. `and`
//! 6. `not`
//! 5. `==`, `!=`, `<`, `>`, `<=`, `>=`, `in`, `not in` (chained)
//! 4. `+`, `-`
//! 3. `*`, `//`, `%`
//! 2. unary `-`, `+`
//! 1. `**` (right associative, binds tighter than a unary operator on its left)
//! 0. `f(args)`, `x[i]`, `x.m(args)`

use gridbot_lexer::TokenKind;
use gridbot_types::ast::*;
use gridbot_types::{ErrorCode, Span};

use crate::parser::{Parser, MAX_EXPR_DEPTH};

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Entry Point
    // ══════════════════════════════════════════════════════════════════════════

    pub(crate) fn parse_expression(&mut self) -> Option<Expr> {
        self.nested(Self::parse_or)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Precedence Chain
    // ══════════════════════════════════════════════════════════════════════════

    fn parse_or(&mut self) -> Option<Expr> {
        self.left_chain(Self::parse_and, Self::or_op, logical)
    }

    fn parse_and(&mut self) -> Option<Expr> {
        self.left_chain(Self::parse_not, Self::and_op, logical)
    }

    fn parse_not(&mut self) -> Option<Expr> {
        if self.check(&TokenKind::Not) {
            let start = self.advance();
            let operand = self.nested(Self::parse_not)?;
            let span = start.to(operand.span);
            return Some(Expr::new(
                ExprKind::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
                span,
            ));
        }
        self.parse_comparison()
    }

    /// `a < b <= c` keeps every link; the evaluator compares neighbours.
    fn parse_comparison(&mut self) -> Option<Expr> {
        let first = self.parse_additive()?;
        let mut rest = Vec::new();
        while let Some(op) = self.comparison_op() {
            let right = self.parse_additive()?;
            rest.push((op, right));
        }
        if rest.is_empty() {
            return Some(first);
        }
        let span = rest
            .last()
            .map_or(first.span, |(_, last)| first.span.to(last.span));
        Some(Expr::new(
            ExprKind::Compare {
                first: Box::new(first),
                rest,
            },
            span,
        ))
    }

    /// Consume a comparison operator if one is next.
    fn comparison_op(&mut self) -> Option<CmpOp> {
        let op = match self.peek_kind() {
            TokenKind::EqEq => CmpOp::Eq,
            TokenKind::BangEq => CmpOp::NotEq,
            TokenKind::Less => CmpOp::Lt,
            TokenKind::Greater => CmpOp::Gt,
            TokenKind::LessEq => CmpOp::LtE,
            TokenKind::GreaterEq => CmpOp::GtE,
            TokenKind::In => CmpOp::In,
            TokenKind::Not if self.look_ahead(1) == &TokenKind::In => {
                self.advance();
                CmpOp::NotIn
            }
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn parse_additive(&mut self) -> Option<Expr> {
        self.left_chain(Self::parse_multiplicative, Self::additive_op, binary)
    }

    fn parse_multiplicative(&mut self) -> Option<Expr> {
        self.left_chain(Self::parse_unary, Self::multiplicative_op, binary)
    }

    // ── Chain Operators ──
    //
    // `None` reports an error; `Some(None)` ends the chain.

    fn or_op(&mut self) -> Option<Option<LogicalOp>> {
        Some(self.eat(&TokenKind::Or).then_some(LogicalOp::Or))
    }

    fn and_op(&mut self) -> Option<Option<LogicalOp>> {
        Some(self.eat(&TokenKind::And).then_some(LogicalOp::And))
    }

    fn additive_op(&mut self) -> Option<Option<BinOp>> {
        let op = match self.peek_kind() {
            TokenKind::Plus => BinOp::Add,
            TokenKind::Minus => BinOp::Sub,
            _ => return Some(None),
        };
        self.advance();
        Some(Some(op))
    }

    fn multiplicative_op(&mut self) -> Option<Option<BinOp>> {
        let op = match self.peek_kind() {
            TokenKind::Star => BinOp::Mul,
            TokenKind::SlashSlash => BinOp::FloorDiv,
            TokenKind::Percent => BinOp::Mod,
            TokenKind::Slash => {
                let span = self.current_span();
                self.error_with_suggestion(
                    ErrorCode::UNSUPPORTED_SYNTAX,
                    "true division '/' is not supported",
                    span,
                    "use '//' for whole-number division",
                );
                return None;
            }
            _ => return Some(None),
        };
        self.advance();
        Some(Some(op))
    }

    /// `a op b op c` as a left-deep tree. Each link adds a level to the tree,
    /// so links are charged against the expression depth like nesting is.
    fn left_chain<O>(
        &mut self,
        operand: fn(&mut Self) -> Option<Expr>,
        next_op: fn(&mut Self) -> Option<Option<O>>,
        build: fn(Expr, O, Expr) -> Expr,
    ) -> Option<Expr> {
        let depth = self.expr_depth;
        let result = self.chain_links(operand, next_op, build);
        self.expr_depth = depth;
        result
    }

    fn chain_links<O>(
        &mut self,
        operand: fn(&mut Self) -> Option<Expr>,
        next_op: fn(&mut Self) -> Option<Option<O>>,
        build: fn(Expr, O, Expr) -> Expr,
    ) -> Option<Expr> {
        let mut left = operand(self)?;
        while let Some(op) = next_op(self)? {
            self.deepen()?;
            let right = operand(self)?;
            left = build(left, op, right);
        }
        Some(left)
    }

    fn parse_unary(&mut self) -> Option<Expr> {
        let op = match self.peek_kind() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Pos,
            _ => return self.parse_power(),
        };
        let start = self.advance();
        let operand = self.nested(Self::parse_unary)?;
        let span = start.to(operand.span);
        Some(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    /// `base ** exponent`; the exponent may itself carry a unary sign.
    fn parse_power(&mut self) -> Option<Expr> {
        let base = self.parse_postfix()?;
        if !self.eat(&TokenKind::StarStar) {
            return Some(base);
        }
        let exponent = self.nested(Self::parse_unary)?;
        Some(binary(base, BinOp::Pow, exponent))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Postfix & Atoms
    // ══════════════════════════════════════════════════════════════════════════

    fn parse_postfix(&mut self) -> Option<Expr> {
        let depth = self.expr_depth;
        let result = self.postfix_links();
        self.expr_depth = depth;
        result
    }

    /// `f(a)[i].m()` wraps the atom once per link.
    fn postfix_links(&mut self) -> Option<Expr> {
        let mut expr = self.parse_atom()?;
        loop {
            if matches!(
                self.peek_kind(),
                TokenKind::LParen | TokenKind::LBracket | TokenKind::Dot
            ) {
                self.deepen()?;
            }
            match self.peek_kind() {
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_call_args()?;
                    let span = expr.span.to(self.previous_span());
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    );
                }
                TokenKind::LBracket => {
                    self.advance();
                    if self.check(&TokenKind::Colon) {
                        self.slice_error();
                        return None;
                    }
                    let index = self.parse_expression()?;
                    if self.check(&TokenKind::Colon) {
                        self.slice_error();
                        return None;
                    }
                    self.expect(&TokenKind::RBracket)?;
                    let span = expr.span.to(self.previous_span());
                    expr = Expr::new(
                        ExprKind::Subscript {
                            object: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    );
                }
                TokenKind::Dot => {
                    self.advance();
                    let method = self.expect_identifier()?;
                    if !self.check(&TokenKind::LParen) {
                        self.error_at(
                            ErrorCode::UNSUPPORTED_SYNTAX,
                            format!("attribute access '.{}' is not supported", method.name),
                            method.span,
                        );
                        return None;
                    }
                    self.advance();
                    let args = self.parse_call_args()?;
                    let span = expr.span.to(self.previous_span());
                    expr = Expr::new(
                        ExprKind::MethodCall {
                            object: Box::new(expr),
                            method,
                            args,
                        },
                        span,
                    );
                }
                _ => return Some(expr),
            }
        }
    }

    fn slice_error(&mut self) {
        self.error_at_current(ErrorCode::UNSUPPORTED_SYNTAX, "slices are not supported");
    }

    /// Arguments after `(`, through the closing `)`.
    fn parse_call_args(&mut self) -> Option<Vec<Expr>> {
        let mut args = Vec::new();
        while !self.check(&TokenKind::RParen) {
            if matches!(self.peek_kind(), TokenKind::Identifier(_))
                && self.look_ahead(1) == &TokenKind::Eq
            {
                self.error_at_current(
                    ErrorCode::UNSUPPORTED_SYNTAX,
                    "keyword arguments are not supported",
                );
                return None;
            }
            args.push(self.parse_expression()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        Some(args)
    }

    fn parse_atom(&mut self) -> Option<Expr> {
        let span = self.current_span();
        let kind = match self.peek_kind().clone() {
            TokenKind::Int(n) => ExprKind::Int(n),
            TokenKind::Str(s) => ExprKind::Str(s),
            TokenKind::True => ExprKind::Bool(true),
            TokenKind::False => ExprKind::Bool(false),
            TokenKind::None => ExprKind::None,
            TokenKind::Identifier(name) => ExprKind::Name(name),
            TokenKind::LParen => return self.parse_parenthesized(),
            TokenKind::LBracket => return self.parse_list(),
            TokenKind::LBrace => return self.parse_brace(),
            TokenKind::Unsupported(word) => {
                self.error_at_current(
                    ErrorCode::UNSUPPORTED_SYNTAX,
                    format!("'{word}' is not supported"),
                );
                return None;
            }
            other => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected an expression, got '{other}'"),
                );
                return None;
            }
        };
        self.advance();
        Some(Expr::new(kind, span))
    }

    fn parse_parenthesized(&mut self) -> Option<Expr> {
        let start = self.advance();
        if self.check(&TokenKind::RParen) {
            self.tuple_error();
            return None;
        }
        let mut inner = self.parse_expression()?;
        if self.check(&TokenKind::Comma) {
            self.tuple_error();
            return None;
        }
        self.expect(&TokenKind::RParen)?;
        inner.span = start.to(self.previous_span());
        Some(inner)
    }

    fn tuple_error(&mut self) {
        self.error_at_current(ErrorCode::UNSUPPORTED_SYNTAX, "tuples are not supported");
    }

    /// `[a, b, c]`
    fn parse_list(&mut self) -> Option<Expr> {
        let start = self.advance();
        let items = self.parse_elements(&TokenKind::RBracket)?;
        let span = start.to(self.previous_span());
        Some(Expr::new(ExprKind::List(items), span))
    }

    /// `{}` and `{k: v}` are dicts, `{a, b}` is a set.
    fn parse_brace(&mut self) -> Option<Expr> {
        let start = self.advance();
        if self.eat(&TokenKind::RBrace) {
            let span = start.to(self.previous_span());
            return Some(Expr::new(ExprKind::Dict(Vec::new()), span));
        }

        let first = self.parse_expression()?;
        if !self.eat(&TokenKind::Colon) {
            let mut items = vec![first];
            if self.eat(&TokenKind::Comma) {
                items.extend(self.parse_elements(&TokenKind::RBrace)?);
            } else {
                self.reject_comprehension()?;
                self.expect(&TokenKind::RBrace)?;
            }
            let span = start.to(self.previous_span());
            return Some(Expr::new(ExprKind::Set(items), span));
        }

        let value = self.parse_expression()?;
        self.reject_comprehension()?;
        let mut entries = vec![(first, value)];
        while self.eat(&TokenKind::Comma) {
            if self.check(&TokenKind::RBrace) {
                break;
            }
            let key = self.parse_expression()?;
            self.expect(&TokenKind::Colon)?;
            let value = self.parse_expression()?;
            entries.push((key, value));
        }
        self.expect(&TokenKind::RBrace)?;
        let span = start.to(self.previous_span());
        Some(Expr::new(ExprKind::Dict(entries), span))
    }

    /// Comma-separated expressions up to and including `close`; a trailing
    /// comma is allowed.
    fn parse_elements(&mut self, close: &TokenKind) -> Option<Vec<Expr>> {
        let mut items = Vec::new();
        while !self.check(close) {
            items.push(self.parse_expression()?);
            if items.len() == 1 {
                self.reject_comprehension()?;
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(close)?;
        Some(items)
    }

    fn reject_comprehension(&mut self) -> Option<()> {
        if self.check(&TokenKind::For) {
            self.error_at_current(
                ErrorCode::UNSUPPORTED_SYNTAX,
                "comprehensions are not supported",
            );
            return None;
        }
        Some(())
    }

    /// Run `parse` one nesting level deeper.
    fn nested(&mut self, parse: fn(&mut Self) -> Option<Expr>) -> Option<Expr> {
        let depth = self.expr_depth;
        let result = match self.deepen() {
            Some(()) => parse(self),
            None => None,
        };
        self.expr_depth = depth;
        result
    }

    /// Count one more tree level, reporting an error past `MAX_EXPR_DEPTH`.
    /// Callers restore `expr_depth` when they return.
    fn deepen(&mut self) -> Option<()> {
        self.expr_depth += 1;
        if self.expr_depth > MAX_EXPR_DEPTH {
            self.error_at_current(
                ErrorCode::NESTING_TOO_DEEP,
                format!("expression is more than {MAX_EXPR_DEPTH} levels deep"),
            );
            return None;
        }
        Some(())
    }
}

// ── Node builders ─────────────────────────────────────────────────────────────

fn binary(left: Expr, op: BinOp, right: Expr) -> Expr {
    let span: Span = left.span.to(right.span);
    Expr::new(
        ExprKind::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
        span,
    )
}

fn logical(left: Expr, op: LogicalOp, right: Expr) -> Expr {
    let span = left.span.to(right.span);
    Expr::new(
        ExprKind::Logical {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
        span,
    )
}
