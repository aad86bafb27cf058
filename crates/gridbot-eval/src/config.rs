//! Engine limits.

use serde::{Deserialize, Serialize};

/// Deepest chain of user function calls before a `RecursionError`.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 100;
/// Longest list, string, dict or set a program may build.
pub const DEFAULT_MAX_COLLECTION_LEN: usize = 100_000;
/// Element visits one step may spend before it is cut off with a
/// `MemoryError`.
pub const DEFAULT_MAX_STEP_WORK: usize = 10_000_000;
/// Stack reserved for each run's worker thread.
pub const DEFAULT_WORKER_STACK_SIZE: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_call_depth: usize,
    pub max_collection_len: usize,
    pub max_step_work: usize,
    pub worker_stack_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_collection_len: DEFAULT_MAX_COLLECTION_LEN,
            max_step_work: DEFAULT_MAX_STEP_WORK,
            worker_stack_size: DEFAULT_WORKER_STACK_SIZE,
        }
    }
}
