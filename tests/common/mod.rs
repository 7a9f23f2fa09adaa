//! In-memory collaborators driving the synthesis scenarios deterministically.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use cov_grader::collaborators::{
    CollaboratorError, CoverageTracker, ModuleHandle, RunResult, SuiteRunner, TestLoader,
    TestSuite,
};

pub struct FakeLoader {
    known: HashSet<String>,
}

impl FakeLoader {
    pub fn knowing(names: &[&str]) -> Self {
        Self {
            known: names.iter().map(|n| n.to_string()).collect(),
        }
    }
}

impl TestLoader for FakeLoader {
    fn load(&mut self, name: &str) -> Result<ModuleHandle, CollaboratorError> {
        if !self.known.contains(name) {
            return Err(CollaboratorError::UnresolvedModule {
                name: name.to_string(),
                reason: "module not part of the submission".to_string(),
            });
        }
        Ok(ModuleHandle::new(name, name))
    }

    fn reload(&mut self, _module: &ModuleHandle) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn load_suite(&self, module: &ModuleHandle) -> Result<TestSuite, CollaboratorError> {
        Ok(TestSuite::from_module(module.clone()))
    }
}

pub struct FakeRunner {
    result: RunResult,
}

impl FakeRunner {
    pub fn passing(transcript: &str) -> Self {
        Self {
            result: RunResult::new(true, transcript),
        }
    }

    pub fn failing(transcript: &str) -> Self {
        Self {
            result: RunResult::new(false, transcript),
        }
    }
}

impl SuiteRunner for FakeRunner {
    fn run(&mut self, _suite: &TestSuite) -> Result<RunResult, CollaboratorError> {
        Ok(self.result.clone())
    }
}

#[derive(Debug, Default)]
pub struct TrackerState {
    pub active: bool,
    pub sessions: u32,
}

/// Tracker returning a fixed measurement; its state can be observed from the
/// outside through the shared handle.
pub struct FakeTracker {
    percentage: f64,
    missing: Vec<u32>,
    state: Rc<RefCell<TrackerState>>,
}

impl FakeTracker {
    pub fn measuring(percentage: f64, missing: Vec<u32>) -> (Self, Rc<RefCell<TrackerState>>) {
        let state = Rc::new(RefCell::new(TrackerState::default()));
        (
            Self {
                percentage,
                missing,
                state: Rc::clone(&state),
            },
            state,
        )
    }
}

impl CoverageTracker for FakeTracker {
    fn start(&mut self) -> Result<(), CollaboratorError> {
        let mut state = self.state.borrow_mut();
        if state.active {
            return Err(CollaboratorError::Coverage(
                "an instrumentation session is already active".to_string(),
            ));
        }
        state.active = true;
        state.sessions += 1;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CollaboratorError> {
        self.state.borrow_mut().active = false;
        Ok(())
    }

    fn percentage_and_missing(
        &self,
        _filename: &str,
    ) -> Result<(f64, Vec<u32>), CollaboratorError> {
        if self.state.borrow().active {
            return Err(CollaboratorError::Coverage(
                "coverage is only defined once the session stopped".to_string(),
            ));
        }
        Ok((self.percentage, self.missing.clone()))
    }
}
