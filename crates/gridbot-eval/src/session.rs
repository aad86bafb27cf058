//! An editing session: one level, one program, at most one active run.
//!
//! Hosts keep a `Session` instead of process-wide state.

use serde::{Deserialize, Serialize};

use gridbot_checker::ValidationError;
use gridbot_world::LevelDefinition;

use crate::config::EngineConfig;
use crate::driver::{submit_program_with, RunHandle, StepOutcome, StepStatus};

/// Result of running the program against one test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestReport {
    pub test_index: usize,
    pub steps: usize,
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelReport {
    pub tests: Vec<TestReport>,
}

impl LevelReport {
    /// The level is solved only if every test succeeded.
    pub fn passed(&self) -> bool {
        self.tests
            .iter()
            .all(|t| t.outcome.status == StepStatus::Succeeded)
    }
}

pub struct Session {
    level: LevelDefinition,
    program: String,
    test_index: usize,
    saved: bool,
    config: EngineConfig,
    run: Option<RunHandle>,
}

impl Session {
    pub fn new(level: LevelDefinition) -> Self {
        Self {
            level,
            program: String::new(),
            test_index: 0,
            saved: true,
            config: EngineConfig::default(),
            run: None,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn level(&self) -> &LevelDefinition {
        &self.level
    }

    /// Edit the level. Stops any active run and marks the level unsaved.
    pub fn level_mut(&mut self) -> &mut LevelDefinition {
        self.stop();
        self.saved = false;
        &mut self.level
    }

    pub fn is_saved(&self) -> bool {
        self.saved
    }

    pub fn mark_saved(&mut self) {
        self.saved = true;
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Replace the program text. Stops any active run.
    pub fn set_program(&mut self, source: impl Into<String>) {
        self.stop();
        self.program = source.into();
    }

    pub fn test_index(&self) -> usize {
        self.test_index
    }

    pub fn select_test(&mut self, index: usize) -> Result<(), ValidationError> {
        if index >= self.level.tests.len() {
            return Err(ValidationError::NoSuchTest {
                index,
                count: self.level.tests.len(),
            });
        }
        self.stop();
        self.test_index = index;
        Ok(())
    }

    pub fn active_run(&self) -> Option<&RunHandle> {
        self.run.as_ref()
    }

    /// Start a fresh run of the selected test, replacing any active one.
    pub fn start(&mut self) -> Result<&StepOutcome, ValidationError> {
        self.stop();
        let handle =
            submit_program_with(&self.program, &self.level, self.test_index, &self.config)?;
        Ok(self.run.insert(handle).outcome())
    }

    /// Step the active run, if there is one.
    pub fn step(&mut self) -> Option<StepOutcome> {
        self.run.as_mut().map(RunHandle::step)
    }

    /// Abort and drop the active run.
    pub fn stop(&mut self) {
        if let Some(mut run) = self.run.take() {
            run.abort();
        }
    }

    /// Run the program against every test, each with at most `budget` steps.
    pub fn validate_all(&mut self, budget: usize) -> Result<LevelReport, ValidationError> {
        self.stop();
        let mut tests = Vec::with_capacity(self.level.tests.len());
        for test_index in 0..self.level.tests.len() {
            let mut handle =
                submit_program_with(&self.program, &self.level, test_index, &self.config)?;
            let outcome = handle.run(budget);
            tests.push(TestReport {
                test_index,
                steps: handle.steps_taken(),
                outcome,
            });
        }
        let report = LevelReport { tests };
        tracing::info!(
            tests = report.tests.len(),
            passed = report.passed(),
            "level validated"
        );
        Ok(report)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
    }
}
