//! This module provides the interface between the synthesizer and the engines
//! it delegates to: module loading, suite execution and coverage tracking.
//!
//! The synthesizer never measures coverage or runs tests on its own; it drives
//! these collaborators through the traits defined here. Reference
//! implementations backed by child processes and LCOV trace files live in the
//! submodules.

pub mod lcov;
pub mod process;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failure raised by one of the collaborator engines.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// The named module could not be resolved to a loadable artifact.
    #[error("module `{name}` could not be resolved: {reason}")]
    UnresolvedModule { name: String, reason: String },
    /// The execution engine failed before any test outcome was produced.
    #[error("suite execution failed: {0}")]
    Execution(#[from] io::Error),
    /// The coverage engine could not produce data for the requested file.
    #[error("coverage data unavailable: {0}")]
    Coverage(String),
}

/// Handle to a loaded module, identified by the name it was requested under
/// and the path it resolved to.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct ModuleHandle {
    name: String,
    path: PathBuf,
}

impl ModuleHandle {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Every test case discoverable in one test module, ready to be executed as a
/// unit. Discovery follows the convention of the loader that produced it.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TestSuite {
    module: ModuleHandle,
}

impl TestSuite {
    pub fn from_module(module: ModuleHandle) -> Self {
        Self { module }
    }

    pub fn module(&self) -> &ModuleHandle {
        &self.module
    }
}

/// Outcome of exactly one execution of a test suite.
///
/// `success` is true only when zero test cases failed and zero errored; an
/// erroring test counts the same as a failing one. The transcript is the
/// human-readable report of the individual test outcomes.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct RunResult {
    success: bool,
    transcript: String,
}

impl RunResult {
    pub fn new(success: bool, transcript: impl Into<String>) -> Self {
        Self {
            success,
            transcript: transcript.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }
}

/// Resolves module names to loadable artifacts and discovers test suites.
///
/// `reload` exists so that coverage instrumentation observes definition-time
/// execution of the target module: in a runtime with an import cache, a plain
/// first-time import would have completed before instrumentation started and
/// its definition lines would read as uncovered. Loaders without an import
/// cache may implement it as a no-op.
pub trait TestLoader {
    /// Resolves `name` to a module. Failure here is a configuration error and
    /// aborts the whole synthesis.
    fn load(&mut self, name: &str) -> Result<ModuleHandle, CollaboratorError>;

    /// Forces the exact module behind `module` to be evaluated again.
    fn reload(&mut self, module: &ModuleHandle) -> Result<(), CollaboratorError>;

    /// Builds a suite from every test case discoverable in `module`.
    fn load_suite(&self, module: &ModuleHandle) -> Result<TestSuite, CollaboratorError>;
}

/// Executes a test suite exactly once, non-verbose, and reports the outcome.
pub trait SuiteRunner {
    fn run(&mut self, suite: &TestSuite) -> Result<RunResult, CollaboratorError>;
}

/// Line-coverage instrumentation.
///
/// Trackers are process-wide mutable state: at most one session may be active
/// in a process at a time, and callers that synthesize several suites must
/// serialize the constructions. `percentage_and_missing` reports the covered
/// percentage and the ordered missing line numbers for a single file; other
/// files touched during the run are excluded.
pub trait CoverageTracker {
    fn start(&mut self) -> Result<(), CollaboratorError>;

    fn stop(&mut self) -> Result<(), CollaboratorError>;

    fn percentage_and_missing(
        &self,
        filename: &str,
    ) -> Result<(f64, Vec<u32>), CollaboratorError>;
}

/// Scoped coverage-tracking session.
///
/// Starting the session starts the tracker; the tracker is stopped on every
/// exit path, including when suite execution errors before `finish` is
/// reached.
pub struct InstrumentationSession<'a, T: CoverageTracker + ?Sized> {
    tracker: &'a mut T,
    active: bool,
}

impl<'a, T: CoverageTracker + ?Sized> InstrumentationSession<'a, T> {
    pub fn start(tracker: &'a mut T) -> Result<Self, CollaboratorError> {
        tracker.start()?;
        log::debug!("coverage instrumentation session started");
        Ok(Self {
            tracker,
            active: true,
        })
    }

    /// Stops the tracker and reports `(percentage, missing lines)` for
    /// `filename`.
    pub fn finish(mut self, filename: &str) -> Result<(f64, Vec<u32>), CollaboratorError> {
        self.tracker.stop()?;
        self.active = false;
        log::debug!("coverage instrumentation session stopped");
        self.tracker.percentage_and_missing(filename)
    }
}

impl<T: CoverageTracker + ?Sized> Drop for InstrumentationSession<'_, T> {
    fn drop(&mut self) {
        if self.active {
            log::warn!("instrumentation session dropped without finishing; stopping tracker");
            if let Err(err) = self.tracker.stop() {
                log::error!("failed to stop coverage tracker");
                log::debug!("error: {err:?}");
            }
        }
    }
}
