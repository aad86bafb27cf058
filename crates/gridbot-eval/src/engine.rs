//! The worker side of a run: the step handshake and the run loop.
//!
//! The worker blocks on the command channel at every suspension point. A
//! `Step` lets it run to the next suspension point, where it checks the goal
//! and reports a [`Event::Paused`] snapshot. Anything other than `Step`
//! (an `Abort`, or the driver going away) unwinds the program without
//! reporting.

use std::sync::mpsc::{Receiver, SyncSender};

use serde::{Deserialize, Serialize};

use gridbot_types::ast::Program;
use gridbot_world::{AllowedFunctions, Grid, World};

use crate::config::EngineConfig;
use crate::driver::StepStatus;
use crate::error::Halt;
use crate::evaluator::{Evaluator, StepHook};

/// Message of a run whose program ended without reaching the goal.
pub const GOAL_NOT_REACHED: &str = "Test failed: goal not reached";

/// Lifecycle of one run, as seen by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    /// Started, nothing executed yet.
    Ready,
    /// Suspended between two steps.
    Stepping,
    Done { succeeded: bool },
    Aborted,
}

impl EngineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, EngineState::Done { .. } | EngineState::Aborted)
    }
}

pub(crate) enum Command {
    Step,
    Abort,
}

/// The world as it stands at a suspension point.
pub(crate) struct Snapshot {
    /// Line of the statement the last step started on.
    pub line: Option<u32>,
    pub world: World,
}

pub(crate) enum Event {
    Paused(Snapshot),
    Finished(Snapshot, StepStatus),
}

/// Everything a worker needs to run one test.
pub(crate) struct Job {
    pub program: Program,
    pub world: World,
    pub wanted: Grid,
    pub allowed: AllowedFunctions,
    pub config: EngineConfig,
    pub test_index: usize,
}

// ══════════════════════════════════════════════════════════════════════════════
// Handshake
// ══════════════════════════════════════════════════════════════════════════════

struct Handshake {
    commands: Receiver<Command>,
    events: SyncSender<Event>,
    wanted: Grid,
    line: Option<u32>,
    /// A step has been requested and not yet reported.
    stepping: bool,
}

impl Handshake {
    fn await_step(&mut self) -> Result<(), Halt> {
        match self.commands.recv() {
            Ok(Command::Step) => {
                self.stepping = true;
                Ok(())
            }
            Ok(Command::Abort) | Err(_) => Err(Halt::Aborted),
        }
    }
}

impl StepHook for Handshake {
    fn suspend(&mut self, line: u32, world: &World) -> Result<(), Halt> {
        if self.stepping {
            if world.is_success(&self.wanted) {
                return Err(Halt::Succeeded);
            }
            let snapshot = Snapshot {
                line: self.line,
                world: world.clone(),
            };
            self.events
                .send(Event::Paused(snapshot))
                .map_err(|_| Halt::Aborted)?;
            self.stepping = false;
        }
        self.await_step()?;
        tracing::trace!(line, "executing");
        self.line = Some(line);
        Ok(())
    }
}

/// Body of the worker thread.
pub(crate) fn run_job(job: Job, commands: Receiver<Command>, events: SyncSender<Event>) {
    let Job {
        program,
        world,
        wanted,
        allowed,
        config,
        test_index,
    } = job;
    let handshake = Handshake {
        commands,
        events,
        wanted,
        line: None,
        stepping: false,
    };
    let mut evaluator = Evaluator::new(world, allowed, config, handshake);
    let result = evaluator.run(&program);
    let (world, mut handshake) = evaluator.into_parts();

    let status = match result {
        Ok(()) => {
            // An empty program still waits for its one step.
            if !handshake.stepping && handshake.await_step().is_err() {
                tracing::debug!(test_index, "worker stopped before the first step");
                return;
            }
            if world.is_success(&handshake.wanted) {
                StepStatus::Succeeded
            } else {
                StepStatus::Failed(GOAL_NOT_REACHED.to_string())
            }
        }
        Err(Halt::Succeeded) => StepStatus::Succeeded,
        Err(Halt::Fault(fault)) => {
            tracing::debug!(test_index, line = ?handshake.line, %fault, "program fault");
            StepStatus::Failed(fault.to_string())
        }
        Err(Halt::Aborted) => {
            tracing::debug!(test_index, line = ?handshake.line, "worker stopped by abort");
            return;
        }
    };
    let snapshot = Snapshot {
        line: handshake.line,
        world,
    };
    let _ = handshake.events.send(Event::Finished(snapshot, status));
}
