//! Size and work limits enforced between suspension points.
//!
//! Nothing inside an expression suspends, so one step could otherwise build
//! or walk arbitrarily large values. Every collection, string and element
//! visit is paid for out of a per-step allowance that is refilled each time
//! the evaluator suspends.

use std::cell::Cell;

use crate::config::EngineConfig;
use crate::error::{EvalResult, FaultKind, RuntimeFault};

#[derive(Debug)]
pub struct Budget {
    max_len: usize,
    step_work: usize,
    remaining: Cell<usize>,
}

impl Budget {
    pub fn new(max_len: usize, step_work: usize) -> Self {
        Self {
            max_len,
            step_work,
            remaining: Cell::new(step_work),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.max_collection_len, config.max_step_work)
    }

    /// Longest list, string, dict or set a program may hold.
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Work left before the current step is cut off.
    pub fn remaining(&self) -> usize {
        self.remaining.get()
    }

    /// Fail if a value of `len` items would exceed the size limit.
    pub fn check_len(&self, len: usize) -> EvalResult<()> {
        if len > self.max_len {
            return Err(RuntimeFault::too_large(self.max_len));
        }
        Ok(())
    }

    /// Spend `units` element visits from this step's allowance.
    pub fn charge(&self, units: usize) -> EvalResult<()> {
        let left = self.remaining.get();
        if units > left {
            self.remaining.set(0);
            return Err(RuntimeFault::new(
                FaultKind::MemoryError,
                format!(
                    "one step needs more than {} element operations",
                    self.step_work
                ),
            ));
        }
        self.remaining.set(left - units);
        Ok(())
    }

    /// Check the size of a new `len`-item value and pay for building it.
    pub fn alloc(&self, len: usize) -> EvalResult<()> {
        self.check_len(len)?;
        self.charge(len)
    }

    /// Start a new step with the full allowance.
    pub fn refill(&self) {
        self.remaining.set(self.step_work);
    }
}
