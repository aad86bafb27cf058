use std::path::PathBuf;
use thiserror::Error;

use crate::action::Action;
use crate::grid::{Position, Size};

/// A robot action that cannot be carried out on the current cell.
///
/// Every variant ends the run; the message is what the learner sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("Moving out of the grid!")]
    OutOfBounds,
    #[error("Attempt to paint an unmarked square")]
    UnmarkedSquare,
    #[error("No item to grab!")]
    NothingToGrab,
    #[error("Already holding an item!")]
    AlreadyHolding,
    #[error("Hole is already filled!")]
    HoleAlreadyFilled,
    #[error("The shape held doesn't match the shape of the hole!")]
    ShapeMismatch,
    #[error("Can't release item here!")]
    CannotRelease,
    #[error("No number to read!")]
    NoNumber,
    #[error("Can't write a number here!")]
    CannotWriteNumber,
    #[error("Number {0} does not fit on a square")]
    NumberOutOfRange(i64),
    #[error("{action}() takes {expected} argument(s) ({given} given)")]
    WrongArity {
        action: Action,
        expected: usize,
        given: usize,
    },
}

/// A level file that cannot be used.
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("cannot read level {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid level data: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("level size {size} is outside the allowed 1..={} range", crate::level::LEVEL_MAX_SIZE)]
    InvalidSize { size: Size },
    #[error("spawn {spawn} is outside the {size} grid")]
    SpawnOutOfBounds { spawn: Position, size: Size },
    #[error("level has no tests")]
    NoTests,
    #[error("a level holds at most {} tests", crate::level::MAX_TESTS)]
    TooManyTests,
    #[error("test {test}: {grid} grid does not match the {expected} level size")]
    GridSizeMismatch {
        test: usize,
        grid: &'static str,
        expected: Size,
    },
}
