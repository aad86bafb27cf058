//! Shared types for the gridbot toolchain.
//!
//! This crate defines the program AST, source spans, syntax error types,
//! and the per-level construct flags consumed by every later stage.

mod capability;
mod error;
mod span;
pub mod ast;

pub use capability::{AllowedConstructs, Construct};
pub use error::{Diagnostics, ErrorCode, SyntaxError, MAX_ERRORS};
pub use span::{SourceFile, Span};
