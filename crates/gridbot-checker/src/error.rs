use gridbot_types::{Construct, Span, SyntaxError};
use thiserror::Error;

/// Why a program was refused before it ran.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The program text does not parse.
    #[error(transparent)]
    Syntax(SyntaxError),

    #[error("Disabled keywords: {construct}")]
    DisallowedConstruct { construct: Construct, span: Span },

    #[error("Not allowed to import, for safety ({module})")]
    ImportForbidden { module: String, span: Span },

    #[error("Disabled function: {name}")]
    ForbiddenCall { name: String, span: Span },

    #[error("test {index} does not exist; the level has {count} test(s)")]
    NoSuchTest { index: usize, count: usize },
}

impl ValidationError {
    /// Where in the program the problem is, if it is in the program.
    pub fn span(&self) -> Option<Span> {
        match self {
            ValidationError::Syntax(err) => Some(err.span),
            ValidationError::DisallowedConstruct { span, .. }
            | ValidationError::ImportForbidden { span, .. }
            | ValidationError::ForbiddenCall { span, .. } => Some(*span),
            ValidationError::NoSuchTest { .. } => None,
        }
    }
}

impl From<SyntaxError> for ValidationError {
    fn from(err: SyntaxError) -> Self {
        ValidationError::Syntax(err)
    }
}
