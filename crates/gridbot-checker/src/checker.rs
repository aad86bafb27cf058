//! Capability checker: walks a parsed program once and rejects anything the
//! level does not allow.
//!
//! Entry point: [`CapabilityChecker::check`]. The walk is pre-order and stops
//! at the first offence.

use gridbot_types::ast::*;
use gridbot_types::{AllowedConstructs, Construct, Span};

use crate::error::ValidationError;

/// Names no program may mention, whatever the level says.
pub const DENIED_NAMES: [&str; 4] = ["exec", "eval", "input", "print"];

/// Constructor names that are denied when their construct flag is off.
const CONSTRUCTOR_NAMES: [(&str, Construct); 3] = [
    ("list", Construct::List),
    ("dict", Construct::Dict),
    ("set", Construct::Set),
];

type Check = Result<(), ValidationError>;

// ══════════════════════════════════════════════════════════════════════════════
// CapabilityChecker
// ══════════════════════════════════════════════════════════════════════════════

pub struct CapabilityChecker<'a> {
    allowed: &'a AllowedConstructs,
}

impl<'a> CapabilityChecker<'a> {
    pub fn new(allowed: &'a AllowedConstructs) -> Self {
        Self { allowed }
    }

    /// Check a complete program. Never runs any of it.
    pub fn check(&self, program: &Program) -> Check {
        self.check_block(&program.body)
    }

    fn require(&self, construct: Construct, span: Span) -> Check {
        if self.allowed.allows(construct) {
            Ok(())
        } else {
            Err(ValidationError::DisallowedConstruct { construct, span })
        }
    }

    fn check_name(&self, name: &str, span: Span) -> Check {
        let denied = DENIED_NAMES.contains(&name)
            || CONSTRUCTOR_NAMES
                .iter()
                .any(|(n, c)| *n == name && !self.allowed.allows(*c));
        if denied {
            return Err(ValidationError::ForbiddenCall {
                name: name.to_string(),
                span,
            });
        }
        Ok(())
    }

    // ── Statements ──

    fn check_block(&self, body: &[Stmt]) -> Check {
        body.iter().try_for_each(|stmt| self.check_stmt(stmt))
    }

    fn check_stmt(&self, stmt: &Stmt) -> Check {
        match &stmt.kind {
            StmtKind::Expr(expr) => self.check_expr(expr),
            StmtKind::Assign { target, value } | StmtKind::AugAssign { target, value, .. } => {
                self.check_target(target)?;
                self.check_expr(value)
            }
            StmtKind::If(if_stmt) => self.check_if(if_stmt),
            StmtKind::While { condition, body } => {
                self.require(Construct::While, stmt.span)?;
                self.check_expr(condition)?;
                self.check_block(body)
            }
            StmtKind::For {
                target,
                iterable,
                body,
            } => {
                self.require(Construct::For, stmt.span)?;
                self.check_name(&target.name, target.span)?;
                self.check_expr(iterable)?;
                self.check_block(body)
            }
            StmtKind::FunctionDef(def) => {
                self.require(Construct::Def, def.span)?;
                self.check_block(&def.body)
            }
            StmtKind::Return(value) => match value {
                Some(expr) => self.check_expr(expr),
                None => Ok(()),
            },
            StmtKind::Break => self.require(Construct::Break, stmt.span),
            StmtKind::Continue => self.require(Construct::Continue, stmt.span),
            StmtKind::Import(import) => Err(ValidationError::ImportForbidden {
                module: import.module.clone(),
                span: stmt.span,
            }),
            StmtKind::Global(_) | StmtKind::Pass => Ok(()),
        }
    }

    fn check_if(&self, if_stmt: &IfStmt) -> Check {
        self.require(Construct::If, if_stmt.span)?;
        self.check_expr(&if_stmt.condition)?;
        self.check_block(&if_stmt.then_body)?;
        match &if_stmt.else_branch {
            // the `else` flag is recorded per level but never enforced
            Some(ElseBranch::Elif(elif)) => self.check_if(elif),
            Some(ElseBranch::Else(body)) => self.check_block(body),
            None => Ok(()),
        }
    }

    fn check_target(&self, target: &Target) -> Check {
        match target {
            Target::Name(ident) => self.check_name(&ident.name, ident.span),
            Target::Subscript { object, index } => {
                self.require(Construct::Bracket, object.span.to(index.span))?;
                self.check_expr(object)?;
                self.check_expr(index)
            }
        }
    }

    // ── Expressions ──

    fn check_exprs(&self, exprs: &[Expr]) -> Check {
        exprs.iter().try_for_each(|e| self.check_expr(e))
    }

    fn check_expr(&self, expr: &Expr) -> Check {
        match &expr.kind {
            ExprKind::Int(_) | ExprKind::Str(_) | ExprKind::Bool(_) | ExprKind::None => Ok(()),
            ExprKind::Name(name) => self.check_name(name, expr.span),
            ExprKind::List(items) => {
                self.require(Construct::Bracket, expr.span)?;
                self.check_exprs(items)
            }
            ExprKind::Set(items) => {
                self.require(Construct::Brace, expr.span)?;
                self.check_exprs(items)
            }
            ExprKind::Dict(entries) => {
                self.require(Construct::Brace, expr.span)?;
                entries.iter().try_for_each(|(key, value)| {
                    self.check_expr(key)?;
                    self.check_expr(value)
                })
            }
            ExprKind::Unary { op, operand } => {
                if *op == UnaryOp::Not {
                    self.require(Construct::Not, expr.span)?;
                }
                self.check_expr(operand)
            }
            ExprKind::Binary { left, right, .. } => {
                self.check_expr(left)?;
                self.check_expr(right)
            }
            ExprKind::Logical { left, op, right } => {
                let construct = match op {
                    LogicalOp::And => Construct::And,
                    LogicalOp::Or => Construct::Or,
                };
                self.require(construct, expr.span)?;
                self.check_expr(left)?;
                self.check_expr(right)
            }
            // `not in` is a comparison operator, not a `not`.
            ExprKind::Compare { first, rest } => {
                self.check_expr(first)?;
                rest.iter().try_for_each(|(_, e)| self.check_expr(e))
            }
            ExprKind::Call { callee, args } => {
                self.check_expr(callee)?;
                self.check_exprs(args)
            }
            ExprKind::MethodCall { object, args, .. } => {
                self.check_expr(object)?;
                self.check_exprs(args)
            }
            ExprKind::Subscript { object, index } => {
                self.require(Construct::Bracket, expr.span)?;
                self.check_expr(object)?;
                self.check_expr(index)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(n: &str) -> Expr {
        Expr::new(ExprKind::Name(n.to_string()), Span::point(1, 1))
    }

    fn program(kind: StmtKind) -> Program {
        Program {
            body: vec![Stmt::new(kind, Span::point(1, 1))],
            span: Span::point(1, 1),
        }
    }

    #[test]
    fn denied_names_ignore_flags() {
        let allowed = AllowedConstructs::all();
        let checker = CapabilityChecker::new(&allowed);
        for denied in DENIED_NAMES {
            let result = checker.check(&program(StmtKind::Expr(name(denied))));
            assert!(matches!(result, Err(ValidationError::ForbiddenCall { .. })));
        }
    }

    #[test]
    fn constructor_names_follow_their_flag() {
        let allowed = AllowedConstructs::all().with(Construct::Dict, false);
        let checker = CapabilityChecker::new(&allowed);
        assert!(checker.check(&program(StmtKind::Expr(name("list")))).is_ok());
        assert!(checker.check(&program(StmtKind::Expr(name("dict")))).is_err());
    }

    #[test]
    fn empty_program_passes_with_nothing_allowed() {
        let allowed = AllowedConstructs::none();
        let program = Program {
            body: Vec::new(),
            span: Span::point(1, 1),
        };
        assert!(CapabilityChecker::new(&allowed).check(&program).is_ok());
    }
}
