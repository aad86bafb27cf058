//! Runtime faults and the internal control-flow signals of the evaluator.

use std::fmt;
use thiserror::Error;

use gridbot_world::ActionError;

use crate::value::Value;

/// The class of a runtime fault, named the way learners see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// A robot action refused to run.
    Action,
    NameError,
    TypeError,
    ZeroDivisionError,
    IndexError,
    KeyError,
    ValueError,
    OverflowError,
    RecursionError,
    MemoryError,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FaultKind::Action => "ActionError",
            FaultKind::NameError => "NameError",
            FaultKind::TypeError => "TypeError",
            FaultKind::ZeroDivisionError => "ZeroDivisionError",
            FaultKind::IndexError => "IndexError",
            FaultKind::KeyError => "KeyError",
            FaultKind::ValueError => "ValueError",
            FaultKind::OverflowError => "OverflowError",
            FaultKind::RecursionError => "RecursionError",
            FaultKind::MemoryError => "MemoryError",
        };
        f.write_str(name)
    }
}

/// An error raised while running a program. Always ends the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct RuntimeFault {
    pub kind: FaultKind,
    pub message: String,
}

impl fmt::Display for RuntimeFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            // Action messages are already written for the learner.
            FaultKind::Action => f.write_str(&self.message),
            kind => write!(f, "{kind}: {}", self.message),
        }
    }
}

impl RuntimeFault {
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn name_error(name: &str) -> Self {
        Self::new(FaultKind::NameError, format!("name '{name}' is not defined"))
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(FaultKind::TypeError, message)
    }

    pub fn value_error(message: impl Into<String>) -> Self {
        Self::new(FaultKind::ValueError, message)
    }

    pub fn index_error(message: impl Into<String>) -> Self {
        Self::new(FaultKind::IndexError, message)
    }

    pub fn overflow() -> Self {
        Self::new(FaultKind::OverflowError, "integer result too large")
    }

    pub fn division_by_zero() -> Self {
        Self::new(
            FaultKind::ZeroDivisionError,
            "integer division or modulo by zero",
        )
    }

    pub fn too_large(limit: usize) -> Self {
        Self::new(
            FaultKind::MemoryError,
            format!("collection larger than {limit} items"),
        )
    }
}

impl From<ActionError> for RuntimeFault {
    fn from(err: ActionError) -> Self {
        match err {
            ActionError::WrongArity { .. } => RuntimeFault::type_error(err.to_string()),
            other => RuntimeFault::new(FaultKind::Action, other.to_string()),
        }
    }
}

/// Why a run stopped before its program finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Halt {
    Fault(RuntimeFault),
    /// The goal was reached at a suspension point.
    Succeeded,
    /// The driver asked the run to stop.
    Aborted,
}

impl From<RuntimeFault> for Halt {
    fn from(fault: RuntimeFault) -> Self {
        Halt::Fault(fault)
    }
}

/// Non-local exits while executing statements.
#[derive(Debug)]
pub(crate) enum Flow {
    Break,
    Continue,
    Return(Value),
    Halt(Halt),
}

impl From<RuntimeFault> for Flow {
    fn from(fault: RuntimeFault) -> Self {
        Flow::Halt(Halt::Fault(fault))
    }
}

impl From<Halt> for Flow {
    fn from(halt: Halt) -> Self {
        Flow::Halt(halt)
    }
}

pub type EvalResult<T> = Result<T, RuntimeFault>;
