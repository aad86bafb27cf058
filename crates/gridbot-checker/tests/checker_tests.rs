//! Capability checker tests: per-construct flags, the name deny-list,
//! imports and syntax errors through `validate_source`.

use gridbot_checker::{validate_source, ValidationError};
use gridbot_types::{AllowedConstructs, Construct, ErrorCode};

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

fn all_but(construct: Construct) -> AllowedConstructs {
    AllowedConstructs::all().with(construct, false)
}

fn disallowed(source: &str, allowed: &AllowedConstructs) -> Construct {
    match validate_source(source, allowed) {
        Err(ValidationError::DisallowedConstruct { construct, .. }) => construct,
        other => panic!("expected a disallowed construct, got {other:?}"),
    }
}

fn forbidden_name(source: &str, allowed: &AllowedConstructs) -> String {
    match validate_source(source, allowed) {
        Err(ValidationError::ForbiddenCall { name, .. }) => name,
        other => panic!("expected a forbidden call, got {other:?}"),
    }
}

/// One program per construct that uses it and nothing else that can be
/// switched off. `else` has no row: its flag never rejects anything.
const CONSTRUCT_PROGRAMS: [(Construct, &str); 14] = [
    (Construct::For, "for i in range(3):\n    right()\n"),
    (Construct::Def, "def go():\n    right()\n"),
    (Construct::Set, "s = set()\n"),
    (Construct::List, "l = list()\n"),
    (Construct::Dict, "d = dict()\n"),
    (Construct::If, "if on_item():\n    grab()\n"),
    (Construct::While, "while on_item():\n    right()\n"),
    (Construct::Not, "x = not on_item()\n"),
    (Construct::And, "x = on_item() and on_hole()\n"),
    (Construct::Or, "x = on_item() or on_hole()\n"),
    (Construct::Break, "while True:\n    break\n"),
    (Construct::Continue, "while True:\n    continue\n"),
    (Construct::Bracket, "x = [1, 2]\n"),
    (Construct::Brace, "x = {1: 2}\n"),
];

// ─────────────────────────────────────────────────────────────────────
// Construct flags
// ─────────────────────────────────────────────────────────────────────

#[test]
fn every_program_passes_with_everything_allowed() {
    let allowed = AllowedConstructs::all();
    for (construct, source) in CONSTRUCT_PROGRAMS {
        assert!(
            validate_source(source, &allowed).is_ok(),
            "{construct:?} program rejected: {source}"
        );
    }
}

#[test]
fn each_construct_is_rejected_when_its_flag_is_off() {
    for (construct, source) in CONSTRUCT_PROGRAMS {
        let allowed = all_but(construct);
        let result = validate_source(source, &allowed);
        assert!(result.is_err(), "{construct:?} program accepted: {source}");
    }
}

#[test]
fn keyword_flags_report_the_construct() {
    assert_eq!(disallowed("if on_item():\n    grab()\n", &all_but(Construct::If)), Construct::If);
    assert_eq!(
        disallowed("x = on_item() and on_hole()\n", &all_but(Construct::And)),
        Construct::And
    );
    assert_eq!(disallowed("x = [1]\n", &all_but(Construct::Bracket)), Construct::Bracket);
    assert_eq!(disallowed("x = {1, 2}\n", &all_but(Construct::Brace)), Construct::Brace);
}

#[test]
fn else_and_elif_pass_with_the_else_flag_off() {
    let allowed = all_but(Construct::Else);
    let source = "if on_item():\n    grab()\nelif on_hole():\n    release()\nelse:\n    right()\n";
    assert!(validate_source(source, &allowed).is_ok());

    let allowed = AllowedConstructs::none().with(Construct::If, true);
    assert!(validate_source(source, &allowed).is_ok());
}

#[test]
fn subscript_is_gated_by_the_bracket_flag() {
    let allowed = all_but(Construct::Bracket);
    assert_eq!(disallowed("x = y[0]\n", &allowed), Construct::Bracket);
    assert_eq!(disallowed("y[0] = 1\n", &allowed), Construct::Bracket);
}

#[test]
fn not_in_is_not_a_not() {
    let allowed = all_but(Construct::Not);
    assert!(validate_source("x = 1 not in y\n", &allowed).is_ok());
    assert_eq!(disallowed("x = not y\n", &allowed), Construct::Not);
}

#[test]
fn nested_constructs_are_checked() {
    let source = "def go():\n    for i in range(2):\n        while on_item():\n            right()\n";
    assert_eq!(disallowed(source, &all_but(Construct::While)), Construct::While);
}

#[test]
fn first_offence_wins() {
    let allowed = AllowedConstructs::none();
    let source = "while True:\n    if on_item():\n        break\n";
    assert_eq!(disallowed(source, &allowed), Construct::While);
}

#[test]
fn plain_action_calls_pass_with_nothing_allowed() {
    let allowed = AllowedConstructs::none();
    let source = "right()\nright()\ngrab()\nx = column() + 1\n";
    assert!(validate_source(source, &allowed).is_ok());
}

#[test]
fn error_span_points_at_the_construct() {
    let source = "right()\n\nwhile True:\n    right()\n";
    let err = validate_source(source, &all_but(Construct::While)).expect_err("while is off");
    assert_eq!(err.span().map(|s| s.line), Some(3));
    assert_eq!(err.to_string(), "Disabled keywords: while");
}

// ─────────────────────────────────────────────────────────────────────
// Names & imports
// ─────────────────────────────────────────────────────────────────────

#[test]
fn print_is_always_forbidden() {
    let name = forbidden_name("print(1)\n", &AllowedConstructs::all());
    assert_eq!(name, "print");
}

#[test]
fn dynamic_evaluation_is_forbidden() {
    let allowed = AllowedConstructs::all();
    assert_eq!(forbidden_name("eval('1')\n", &allowed), "eval");
    assert_eq!(forbidden_name("exec('x = 1')\n", &allowed), "exec");
    assert_eq!(forbidden_name("x = input()\n", &allowed), "input");
}

#[test]
fn forbidden_names_are_caught_without_a_call() {
    let allowed = AllowedConstructs::all();
    assert_eq!(forbidden_name("f = print\n", &allowed), "print");
    assert_eq!(forbidden_name("print = 3\n", &allowed), "print");
}

#[test]
fn constructor_names_depend_on_their_flag() {
    assert!(validate_source("x = list(range(3))\n", &AllowedConstructs::all()).is_ok());
    let name = forbidden_name("x = list(range(3))\n", &all_but(Construct::List));
    assert_eq!(name, "list");
    let err = validate_source("s = set()\n", &all_but(Construct::Set)).expect_err("set is off");
    assert_eq!(err.to_string(), "Disabled function: set");
}

#[test]
fn import_is_rejected_regardless_of_flags() {
    for allowed in [AllowedConstructs::all(), AllowedConstructs::none()] {
        match validate_source("import os\nright()\n", &allowed) {
            Err(ValidationError::ImportForbidden { module, span }) => {
                assert_eq!(module, "os");
                assert_eq!(span.line, 1);
            }
            other => panic!("expected import rejection, got {other:?}"),
        }
    }
}

#[test]
fn from_import_is_rejected() {
    let result = validate_source("from os.path import join\n", &AllowedConstructs::all());
    assert!(matches!(
        result,
        Err(ValidationError::ImportForbidden { ref module, .. }) if module == "os.path"
    ));
}

#[test]
fn import_inside_a_function_is_rejected() {
    let source = "def go():\n    import sys\n    right()\n";
    assert!(matches!(
        validate_source(source, &AllowedConstructs::all()),
        Err(ValidationError::ImportForbidden { .. })
    ));
}

// ─────────────────────────────────────────────────────────────────────
// Syntax errors
// ─────────────────────────────────────────────────────────────────────

#[test]
fn syntax_errors_surface_as_syntax() {
    match validate_source("right(\n", &AllowedConstructs::all()) {
        Err(ValidationError::Syntax(err)) => assert_eq!(err.span.line, 1),
        other => panic!("expected a syntax error, got {other:?}"),
    }
}

#[test]
fn first_syntax_error_is_reported() {
    let source = "right()\nx = = 1\ny = = 2\n";
    match validate_source(source, &AllowedConstructs::all()) {
        Err(ValidationError::Syntax(err)) => {
            assert_eq!(err.span.line, 2);
            assert_eq!(err.code, ErrorCode::UNEXPECTED_TOKEN);
        }
        other => panic!("expected a syntax error, got {other:?}"),
    }
}

#[test]
fn syntax_is_checked_before_capabilities() {
    let source = "while True:\nright()\n";
    assert!(matches!(
        validate_source(source, &AllowedConstructs::none()),
        Err(ValidationError::Syntax(_))
    ));
}

#[test]
fn very_long_expression_is_a_syntax_error() {
    let source = format!("x = 1{}\n", "+1".repeat(100_000));
    match validate_source(&source, &AllowedConstructs::all()) {
        Err(ValidationError::Syntax(err)) => {
            assert_eq!(err.code, ErrorCode::NESTING_TOO_DEEP);
        }
        other => panic!("expected a syntax error, got {other:?}"),
    }
}
