//! gridbot step engine.
//!
//! Runs a validated program one step at a time on a worker thread, handing
//! a snapshot of the world back to the driver after every step.
//!
//! ```text
//! driver ──Step──► worker: run to the next suspension point
//! driver ◄─Paused / Finished── worker
//! ```

mod budget;
mod builtins;
mod config;
mod driver;
mod engine;
mod env;
mod error;
mod evaluator;
mod ops;
mod session;
mod value;
mod worker;

pub use builtins::Builtin;
pub use config::{
    EngineConfig, DEFAULT_MAX_CALL_DEPTH, DEFAULT_MAX_COLLECTION_LEN, DEFAULT_MAX_STEP_WORK,
    DEFAULT_WORKER_STACK_SIZE,
};
pub use driver::{submit_program, submit_program_with, RunHandle, StepOutcome, StepStatus};
pub use engine::{EngineState, GOAL_NOT_REACHED};
pub use error::{FaultKind, Halt, RuntimeFault};
pub use evaluator::{Evaluator, StepHook};
pub use session::{LevelReport, Session, TestReport};
pub use value::{Key, Range, Value};
