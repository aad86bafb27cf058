//! gridbot capability checker.
//!
//! ```text
//! source → lexer → parser → CapabilityChecker → Program
//! ```
//!
//! [`validate_source`] is the front door: it either returns a program that
//! is safe to hand to the engine or the first reason it is not.

mod checker;
mod error;

pub use checker::{CapabilityChecker, DENIED_NAMES};
pub use error::ValidationError;

use gridbot_parser::parse_source;
use gridbot_types::ast::Program;
use gridbot_types::{AllowedConstructs, ErrorCode, SourceFile, Span, SyntaxError};

/// Name given to submitted programs in diagnostics.
pub const PROGRAM_FILE_NAME: &str = "<program>";

/// Check an already parsed program against the level's construct flags.
pub fn validate(program: &Program, allowed: &AllowedConstructs) -> Result<(), ValidationError> {
    CapabilityChecker::new(allowed).check(program)
}

/// Lex, parse and check `source`.
///
/// The first syntax error wins; nothing is executed either way.
pub fn validate_source(
    source: &str,
    allowed: &AllowedConstructs,
) -> Result<Program, ValidationError> {
    let file = SourceFile::new(PROGRAM_FILE_NAME, source);
    let parsed = parse_source(&file);
    let program = match parsed.program {
        Some(program) => program,
        None => {
            let err = parsed.errors.first().cloned().unwrap_or_else(|| {
                SyntaxError::new(
                    ErrorCode::UNEXPECTED_TOKEN,
                    "program could not be parsed",
                    Span::point(1, 1),
                    file.line(1).unwrap_or_default(),
                )
            });
            return Err(ValidationError::Syntax(err));
        }
    };
    validate(&program, allowed)?;
    Ok(program)
}
