//! The driver protocol: submit a program, then step, fast-run or abort it.
//!
//! ```text
//! submit_program ──► RunHandle ──step()──► StepOutcome { line, grid, robot, status }
//!                        │
//!                        └──abort() / drop──► worker stopped and joined
//! ```

use std::sync::Weak;

use serde::{Deserialize, Serialize};

use gridbot_checker::{validate_source, ValidationError};
use gridbot_world::{Grid, LevelDefinition, Robot, World};

use crate::config::EngineConfig;
use crate::engine::{EngineState, Event, Job, Snapshot};
use crate::worker::{Worker, WorkerLost};

/// Where a run stands after a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum StepStatus {
    Running,
    Succeeded,
    Failed(String),
}

impl StepStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, StepStatus::Running)
    }
}

/// What the driver sees after each step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Line of the statement the step executed; `None` before the first.
    pub line: Option<u32>,
    pub grid: Grid,
    pub robot: Robot,
    pub status: StepStatus,
}

impl StepOutcome {
    fn from_world(line: Option<u32>, world: World, status: StepStatus) -> Self {
        Self {
            line,
            grid: world.grid,
            robot: world.robot,
            status,
        }
    }

    fn from_snapshot(snapshot: Snapshot, status: StepStatus) -> Self {
        Self::from_world(snapshot.line, snapshot.world, status)
    }
}

/// Validate `source` against `level` and start a run of test `test_index`.
pub fn submit_program(
    source: &str,
    level: &LevelDefinition,
    test_index: usize,
) -> Result<RunHandle, ValidationError> {
    submit_program_with(source, level, test_index, &EngineConfig::default())
}

/// [`submit_program`] with explicit engine limits.
///
/// Nothing runs until the first [`RunHandle::step`].
pub fn submit_program_with(
    source: &str,
    level: &LevelDefinition,
    test_index: usize,
    config: &EngineConfig,
) -> Result<RunHandle, ValidationError> {
    let test = level.test(test_index).ok_or(ValidationError::NoSuchTest {
        index: test_index,
        count: level.tests.len(),
    })?;
    let program = validate_source(source, &level.allowed_keywords)?;

    let world = World::new(test.shown.clone(), level.spawn);
    let initial = StepOutcome::from_world(None, world.clone(), StepStatus::Running);
    let job = Job {
        program,
        world,
        wanted: test.wanted.clone(),
        allowed: level.allowed_functions.clone(),
        config: *config,
        test_index,
    };

    let name = format!("gridbot-run-{test_index}");
    let mut handle = RunHandle {
        test_index,
        state: EngineState::Ready,
        outcome: initial,
        steps: 0,
        worker: None,
        liveness: Weak::new(),
    };
    match Worker::spawn(job, name, config.worker_stack_size) {
        Ok(worker) => {
            tracing::info!(test_index, "run started");
            handle.liveness = worker.liveness();
            handle.worker = Some(worker);
        }
        Err(err) => {
            tracing::warn!(test_index, error = %err, "could not start run worker");
            handle.state = EngineState::Done { succeeded: false };
            handle.outcome.status = StepStatus::Failed(format!("could not start the run: {err}"));
        }
    }
    Ok(handle)
}

// ══════════════════════════════════════════════════════════════════════════════
// RunHandle
// ══════════════════════════════════════════════════════════════════════════════

/// One in-progress run. Dropping it aborts the run.
pub struct RunHandle {
    test_index: usize,
    state: EngineState,
    outcome: StepOutcome,
    steps: usize,
    worker: Option<Worker>,
    liveness: Weak<()>,
}

impl RunHandle {
    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn test_index(&self) -> usize {
        self.test_index
    }

    /// The latest outcome, without stepping.
    pub fn outcome(&self) -> &StepOutcome {
        &self.outcome
    }

    pub fn steps_taken(&self) -> usize {
        self.steps
    }

    /// Whether the worker thread is still running its program. Answers from
    /// the thread itself, so it stays accurate after the worker is released.
    pub fn is_worker_alive(&self) -> bool {
        self.liveness.strong_count() > 0
    }

    /// Execute one step. A finished or aborted run returns its final
    /// outcome again.
    pub fn step(&mut self) -> StepOutcome {
        if self.state.is_terminal() {
            return self.outcome.clone();
        }
        let Some(worker) = self.worker.as_mut() else {
            self.fail("run has no worker".to_string());
            return self.outcome.clone();
        };
        match worker.step() {
            Ok(Event::Paused(snapshot)) => {
                self.steps += 1;
                self.state = EngineState::Stepping;
                self.outcome = StepOutcome::from_snapshot(snapshot, StepStatus::Running);
                tracing::debug!(
                    test_index = self.test_index,
                    line = ?self.outcome.line,
                    step = self.steps,
                    "step"
                );
            }
            Ok(Event::Finished(snapshot, status)) => {
                self.steps += 1;
                self.finish(snapshot, status);
            }
            Err(WorkerLost(reason)) => {
                tracing::warn!(test_index = self.test_index, %reason, "run worker lost");
                self.fail(format!("internal error: {reason}"));
            }
        }
        self.outcome.clone()
    }

    /// Fast-run: step until the run ends or `budget` steps were taken, in
    /// which case the run is aborted.
    pub fn run(&mut self, budget: usize) -> StepOutcome {
        let mut taken = 0;
        while !self.state.is_terminal() {
            if taken >= budget {
                tracing::warn!(test_index = self.test_index, budget, "step budget exhausted");
                self.abort();
                self.outcome.status =
                    StepStatus::Failed(format!("step budget exhausted after {budget} steps"));
                break;
            }
            self.step();
            taken += 1;
        }
        self.outcome.clone()
    }

    /// Stop the run and join its worker. Safe to call at any time.
    pub fn abort(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        if let Some(mut worker) = self.worker.take() {
            worker.shutdown();
        }
        self.state = EngineState::Aborted;
        self.outcome.status = StepStatus::Failed("run aborted".to_string());
        tracing::info!(test_index = self.test_index, steps = self.steps, "run aborted");
    }

    fn finish(&mut self, snapshot: Snapshot, status: StepStatus) {
        let succeeded = status == StepStatus::Succeeded;
        self.state = EngineState::Done { succeeded };
        self.outcome = StepOutcome::from_snapshot(snapshot, status);
        if let Some(mut worker) = self.worker.take() {
            worker.shutdown();
        }
        tracing::info!(
            test_index = self.test_index,
            steps = self.steps,
            status = ?self.outcome.status,
            "run finished"
        );
    }

    fn fail(&mut self, message: String) {
        self.worker = None;
        self.state = EngineState::Done { succeeded: false };
        self.outcome.status = StepStatus::Failed(message);
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        self.abort();
    }
}
