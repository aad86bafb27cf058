//! Parser tests: statement forms, precedence, placement rules and error
//! recovery.

use gridbot_parser::parse_source;
use gridbot_types::ast::*;
use gridbot_types::{ErrorCode, SourceFile};

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

fn parse_ok(source: &str) -> Program {
    let sf = SourceFile::new("test.py", source);
    let result = parse_source(&sf);
    assert!(
        !result.errors.has_errors(),
        "unexpected errors: {:#?}",
        result.errors.errors
    );
    result.program.expect("program should be present")
}

fn first_error(source: &str) -> (ErrorCode, u32) {
    let sf = SourceFile::new("test.py", source);
    let result = parse_source(&sf);
    assert!(result.program.is_none(), "expected failure for {source:?}");
    let err = result.errors.first().expect("an error should be reported");
    (err.code, err.span.line)
}

fn error_count(source: &str) -> usize {
    let sf = SourceFile::new("test.py", source);
    parse_source(&sf).errors.total
}

/// The single expression of a one-statement program.
fn expr(source: &str) -> Expr {
    let program = parse_ok(source);
    match program.body.into_iter().next().map(|s| s.kind) {
        Some(StmtKind::Expr(e)) => e,
        other => panic!("expected expression statement, got {other:?}"),
    }
}

fn lines(body: &[Stmt]) -> Vec<u32> {
    body.iter().map(Stmt::line).collect()
}

// ─────────────────────────────────────────────────────────────────────
// Statements
// ─────────────────────────────────────────────────────────────────────

#[test]
fn empty_program() {
    assert!(parse_ok("").body.is_empty());
    assert!(parse_ok("# only a comment\n\n").body.is_empty());
}

#[test]
fn statement_lines_skip_blank_and_comment_lines() {
    let program = parse_ok("right()\n\n# go down\ndown()\n");
    assert_eq!(lines(&program.body), vec![1, 4]);
}

#[test]
fn call_statement() {
    match expr("right()\n").kind {
        ExprKind::Call { callee, args } => {
            assert_eq!(callee.kind, ExprKind::Name("right".into()));
            assert!(args.is_empty());
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn assignments() {
    let program = parse_ok("x = 1\nxs[0] = 2\nx += 3\nx //= 2\n");
    assert!(matches!(
        &program.body[0].kind,
        StmtKind::Assign { target: Target::Name(n), .. } if n.name == "x"
    ));
    assert!(matches!(
        &program.body[1].kind,
        StmtKind::Assign { target: Target::Subscript { .. }, .. }
    ));
    assert!(matches!(
        &program.body[2].kind,
        StmtKind::AugAssign { op: BinOp::Add, .. }
    ));
    assert!(matches!(
        &program.body[3].kind,
        StmtKind::AugAssign { op: BinOp::FloorDiv, .. }
    ));
}

#[test]
fn if_elif_else_chain() {
    let source = "if a():\n    x()\nelif b():\n    y()\nelse:\n    z()\n";
    let program = parse_ok(source);
    assert_eq!(program.body.len(), 1);
    let StmtKind::If(node) = &program.body[0].kind else {
        panic!("expected if");
    };
    assert_eq!(node.span.line, 1);
    let Some(ElseBranch::Elif(elif)) = &node.else_branch else {
        panic!("expected elif");
    };
    assert_eq!(elif.span.line, 3);
    let Some(ElseBranch::Else(body)) = &elif.else_branch else {
        panic!("expected else");
    };
    assert_eq!(lines(body), vec![6]);
}

#[test]
fn single_line_bodies() {
    let program = parse_ok("while True: right()\nif x: pass\n");
    assert_eq!(program.body.len(), 2);
    let StmtKind::While { body, .. } = &program.body[0].kind else {
        panic!("expected while");
    };
    assert_eq!(lines(body), vec![1]);
}

#[test]
fn for_loop_and_break() {
    let program = parse_ok("for i in range(3):\n    if i == 2:\n        break\n    right()\n");
    let StmtKind::For { target, body, .. } = &program.body[0].kind else {
        panic!("expected for");
    };
    assert_eq!(target.name, "i");
    assert_eq!(lines(body), vec![2, 4]);
}

#[test]
fn function_definition_with_return_and_global() {
    let source = "count = 0\ndef go(n, m):\n    global count\n    count += n\n    return\n";
    let program = parse_ok(source);
    let StmtKind::FunctionDef(def) = &program.body[1].kind else {
        panic!("expected def");
    };
    assert_eq!(def.name.name, "go");
    assert_eq!(
        def.params.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
        vec!["n", "m"]
    );
    assert!(matches!(def.body[0].kind, StmtKind::Global(_)));
    assert!(matches!(def.body[2].kind, StmtKind::Return(None)));
}

#[test]
fn imports_are_parsed_for_rejection() {
    let program = parse_ok("import os.path\nfrom random import choice, randint\n");
    assert!(matches!(
        &program.body[0].kind,
        StmtKind::Import(ImportStmt { module, from: false }) if module == "os.path"
    ));
    assert!(matches!(
        &program.body[1].kind,
        StmtKind::Import(ImportStmt { module, from: true }) if module == "random"
    ));
}

// ─────────────────────────────────────────────────────────────────────
// Expressions
// ─────────────────────────────────────────────────────────────────────

#[test]
fn multiplication_binds_tighter_than_addition() {
    let ExprKind::Binary { op, right, .. } = expr("1 + 2 * 3\n").kind else {
        panic!("expected binary");
    };
    assert_eq!(op, BinOp::Add);
    assert!(matches!(right.kind, ExprKind::Binary { op: BinOp::Mul, .. }));
}

#[test]
fn power_is_right_associative_and_beats_unary_minus() {
    let ExprKind::Unary { op, operand } = expr("-2 ** 3 ** 2\n").kind else {
        panic!("expected unary");
    };
    assert_eq!(op, UnaryOp::Neg);
    let ExprKind::Binary { op, right, .. } = operand.kind else {
        panic!("expected power");
    };
    assert_eq!(op, BinOp::Pow);
    assert!(matches!(right.kind, ExprKind::Binary { op: BinOp::Pow, .. }));
}

#[test]
fn comparisons_chain() {
    let ExprKind::Compare { rest, .. } = expr("0 <= x < 10\n").kind else {
        panic!("expected comparison");
    };
    assert_eq!(
        rest.iter().map(|(op, _)| *op).collect::<Vec<_>>(),
        vec![CmpOp::LtE, CmpOp::Lt]
    );
}

#[test]
fn not_in_is_one_operator() {
    let ExprKind::Compare { rest, .. } = expr("x not in seen\n").kind else {
        panic!("expected comparison");
    };
    assert_eq!(rest[0].0, CmpOp::NotIn);
}

#[test]
fn boolean_operators() {
    let ExprKind::Logical { op, right, .. } = expr("a or not b and c\n").kind else {
        panic!("expected or");
    };
    assert_eq!(op, LogicalOp::Or);
    let ExprKind::Logical { op, left, .. } = right.kind else {
        panic!("expected and");
    };
    assert_eq!(op, LogicalOp::And);
    assert!(matches!(left.kind, ExprKind::Unary { op: UnaryOp::Not, .. }));
}

#[test]
fn collection_literals() {
    assert!(matches!(expr("[1, 2,]\n").kind, ExprKind::List(items) if items.len() == 2));
    assert!(matches!(expr("{}\n").kind, ExprKind::Dict(entries) if entries.is_empty()));
    assert!(matches!(expr("{'a': 1, 'b': 2}\n").kind, ExprKind::Dict(entries) if entries.len() == 2));
    assert!(matches!(expr("{1, 2, 3}\n").kind, ExprKind::Set(items) if items.len() == 3));
    assert!(matches!(expr("{1}\n").kind, ExprKind::Set(items) if items.len() == 1));
}

#[test]
fn method_call_and_subscript() {
    let ExprKind::MethodCall { object, method, args } = expr("grid[0].append(5)\n").kind else {
        panic!("expected method call");
    };
    assert_eq!(method.name, "append");
    assert_eq!(args.len(), 1);
    assert!(matches!(object.kind, ExprKind::Subscript { .. }));
}

#[test]
fn multi_line_call_arguments() {
    let program = parse_ok("x = max(1,\n        2)\nright()\n");
    assert_eq!(lines(&program.body), vec![1, 3]);
}

// ─────────────────────────────────────────────────────────────────────
// Placement rules
// ─────────────────────────────────────────────────────────────────────

#[test]
fn break_outside_loop() {
    assert_eq!(first_error("break\n"), (ErrorCode::OUTSIDE_LOOP, 1));
    assert_eq!(first_error("if x:\n    continue\n"), (ErrorCode::OUTSIDE_LOOP, 2));
}

#[test]
fn break_in_function_inside_loop_is_still_outside_loop() {
    let source = "while True:\n    def f():\n        break\n";
    assert_eq!(first_error(source), (ErrorCode::OUTSIDE_LOOP, 3));
}

#[test]
fn return_outside_function() {
    assert_eq!(first_error("return 1\n"), (ErrorCode::OUTSIDE_FUNCTION, 1));
    assert_eq!(
        first_error("while True:\n    return\n"),
        (ErrorCode::OUTSIDE_FUNCTION, 2)
    );
}

// ─────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────

#[test]
fn missing_colon() {
    assert_eq!(first_error("if x\n    y()\n"), (ErrorCode::UNEXPECTED_TOKEN, 1));
}

#[test]
fn missing_block() {
    assert_eq!(first_error("while x:\nright()\n"), (ErrorCode::EXPECTED_INDENT, 2));
}

#[test]
fn unexpected_indent() {
    assert_eq!(first_error("right()\n    left()\n"), (ErrorCode::UNEXPECTED_INDENT, 2));
}

#[test]
fn stray_else() {
    assert_eq!(first_error("right()\nelse:\n    left()\n"), (ErrorCode::UNEXPECTED_TOKEN, 2));
}

#[test]
fn true_division_is_rejected_with_suggestion() {
    let sf = SourceFile::new("test.py", "x = 7 / 2\n");
    let result = parse_source(&sf);
    let err = result.errors.first().expect("error expected");
    assert_eq!(err.code, ErrorCode::UNSUPPORTED_SYNTAX);
    assert!(err.suggestion.as_deref().is_some_and(|s| s.contains("//")));
}

#[test]
fn unsupported_language_features() {
    for source in [
        "lambda: 1\n",
        "class A:\n    pass\n",
        "x = (1, 2)\n",
        "x = xs[1:2]\n",
        "x = [i for i in xs]\n",
        "f(a=1)\n",
        "def f(a=1):\n    pass\n",
        "x = y = 1\n",
        "x = a.b\n",
    ] {
        assert_eq!(first_error(source).0, ErrorCode::UNSUPPORTED_SYNTAX, "{source}");
    }
}

#[test]
fn cannot_assign_to_call() {
    assert_eq!(first_error("f() = 1\n"), (ErrorCode::UNEXPECTED_TOKEN, 1));
}

#[test]
fn lexer_errors_are_reported_first() {
    assert_eq!(first_error("x = 'abc\n"), (ErrorCode::UNTERMINATED_STRING, 1));
}

#[test]
fn recovery_reports_errors_on_several_lines() {
    let source = "x = = 1\nright()\ny = = 2\nif x:\n    z = = 3\n";
    assert_eq!(error_count(source), 3);
}

#[test]
fn deep_nesting_is_rejected_not_overflowed() {
    let source = format!("x = {}1{}\n", "(".repeat(200), ")".repeat(200));
    assert_eq!(first_error(&source).0, ErrorCode::NESTING_TOO_DEEP);
}

#[test]
fn long_operator_chains_are_rejected() {
    for op in ["+", "-", "*", "//", "%"] {
        let source = format!("x = 1{}\n", format!(" {op} 1").repeat(100_000));
        assert_eq!(first_error(&source), (ErrorCode::NESTING_TOO_DEEP, 1));
    }
    let source = format!("x = a{}\n", " or a".repeat(100_000));
    assert_eq!(first_error(&source).0, ErrorCode::NESTING_TOO_DEEP);
    let source = format!("x = a{}\n", " and a".repeat(100_000));
    assert_eq!(first_error(&source).0, ErrorCode::NESTING_TOO_DEEP);
}

#[test]
fn long_postfix_chains_are_rejected() {
    let calls = format!("f{}\n", "()".repeat(100_000));
    assert_eq!(first_error(&calls).0, ErrorCode::NESTING_TOO_DEEP);
    let subscripts = format!("x = a{}\n", "[0]".repeat(100_000));
    assert_eq!(first_error(&subscripts).0, ErrorCode::NESTING_TOO_DEEP);
}

#[test]
fn short_chains_still_parse() {
    let source = format!("x = 1{}\n", " + 1".repeat(40));
    parse_ok(&source);
    parse_ok("x = a[0][1][2].count(3)\n");
}

#[test]
fn long_elif_chains_are_rejected() {
    let mut source = String::from("if x == 0:\n    pass\n");
    for i in 1..10_000 {
        source.push_str(&format!("elif x == {i}:\n    pass\n"));
    }
    assert_eq!(first_error(&source).0, ErrorCode::NESTING_TOO_DEEP);

    let mut short = String::from("if x == 0:\n    pass\n");
    for i in 1..10 {
        short.push_str(&format!("elif x == {i}:\n    pass\n"));
    }
    parse_ok(&short);
}

#[test]
fn parsing_is_deterministic() {
    let source = "def f(n):\n    return n * 2\nwhile f(1) < 3:\n    right()\n";
    let first = parse_ok(source);
    for _ in 0..20 {
        assert_eq!(parse_ok(source), first);
    }
}
