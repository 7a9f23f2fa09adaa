//! The coverage-test synthesis engine.
//!
//! A synthesis runs the student's own test suite exactly once under coverage
//! instrumentation and turns the captured results into graded checks: one
//! baseline check asserting the suite itself passed, plus one check per
//! configured point value, each bound to a coverage threshold. A synthesis
//! moves from pending to running (instrumentation active, suite executing) to
//! complete; there are no retries and no partial completion, so any error
//! while running propagates and no suite is produced.

pub mod check;
pub mod threshold;

use std::sync::Arc;

use log::{debug, info};
use thiserror::Error;

use crate::collaborators::{
    CollaboratorError, CoverageTracker, InstrumentationSession, SuiteRunner, TestLoader,
};
use crate::configuration::SynthesisRequest;
use check::{CheckReport, CoverageResult, GeneratedCheck, ResultBundle};
use threshold::ThresholdSchedule;

/// Fatal synthesis failure. None of these is convertible to a graded
/// failure: when synthesis errors, no suite exists to report one, and the
/// grading platform must treat the assignment as misconfigured.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("invalid synthesis request: {0}")]
    InvalidRequest(&'static str),
    #[error("failed to load module `{module}`")]
    Configuration {
        module: String,
        source: CollaboratorError,
    },
    #[error("coverage instrumentation failed")]
    Instrumentation(#[source] CollaboratorError),
    #[error("suite execution failed")]
    Execution(#[source] CollaboratorError),
}

/// Drives one synthesis from a request to a [`SynthesizedSuite`], delegating
/// module loading, suite execution and coverage measurement to the
/// collaborators it owns.
///
/// Coverage trackers are process-wide state, so at most one `synthesize` call
/// may be in flight per process; callers grading several submissions must
/// serialize the calls and isolate submissions in separate processes to avoid
/// cross-submission contamination through reloaded modules.
#[derive(Debug)]
pub struct Synthesizer<L, R, T> {
    loader: L,
    runner: R,
    tracker: T,
}

impl<L, R, T> Synthesizer<L, R, T>
where
    L: TestLoader,
    R: SuiteRunner,
    T: CoverageTracker,
{
    pub fn new(loader: L, runner: R, tracker: T) -> Self {
        Self {
            loader,
            runner,
            tracker,
        }
    }

    /// Runs the full synthesis for `request`.
    ///
    /// The returned suite exposes exactly `1 + points.len()` checks: the
    /// baseline `test_code` first, then `test_coverage_01` ..
    /// `test_coverage_NN` in threshold order.
    pub fn synthesize(
        &mut self,
        request: &SynthesisRequest,
    ) -> Result<SynthesizedSuite, SynthesisError> {
        let schedule = ThresholdSchedule::build(request.minimum(), request.points())
            .map_err(SynthesisError::InvalidRequest)?;

        info!(
            "synthesizing {} coverage checks for `{}` from suite `{}`",
            schedule.len(),
            request.filename(),
            request.testmodule()
        );

        let session = InstrumentationSession::start(&mut self.tracker)
            .map_err(SynthesisError::Instrumentation)?;

        let test_module = load(&mut self.loader, request.testmodule())?;
        let target = load(&mut self.loader, request.filename())?;
        // reload the exact target module while instrumentation is active so
        // its definition lines are recorded as covered
        self.loader
            .reload(&target)
            .map_err(|source| SynthesisError::Configuration {
                module: request.filename().to_string(),
                source,
            })?;

        let suite = self
            .loader
            .load_suite(&test_module)
            .map_err(|source| SynthesisError::Configuration {
                module: request.testmodule().to_string(),
                source,
            })?;

        debug!("executing student suite `{}`", request.testmodule());
        let run = self
            .runner
            .run(&suite)
            .map_err(SynthesisError::Execution)?;
        if !run.success() {
            info!("student suite did not pass; every generated check will fail");
        }

        let (percentage, missing_lines) = session
            .finish(request.filename())
            .map_err(SynthesisError::Instrumentation)?;
        debug!(
            "`{}` coverage: {percentage:.2}%, {} missing lines",
            request.filename(),
            missing_lines.len()
        );

        let bundle = Arc::new(ResultBundle::new(
            run,
            CoverageResult::new(percentage, missing_lines),
        ));

        let mut checks = Vec::with_capacity(1 + schedule.len());
        checks.push(GeneratedCheck::baseline(Arc::clone(&bundle)));
        for (index, entry) in schedule.entries().iter().enumerate() {
            checks.push(GeneratedCheck::coverage(
                Arc::clone(&bundle),
                *entry,
                index + 1,
            ));
        }

        info!("synthesis complete: {} graded checks attached", checks.len());
        Ok(SynthesizedSuite { checks })
    }
}

fn load<L: TestLoader>(
    loader: &mut L,
    name: &str,
) -> Result<crate::collaborators::ModuleHandle, SynthesisError> {
    loader
        .load(name)
        .map_err(|source| SynthesisError::Configuration {
            module: name.to_string(),
            source,
        })
}

/// The product of a synthesis: the baseline and threshold checks, in
/// deterministic order, and nothing else.
///
/// The student's own test cases are deliberately not part of this suite; a
/// grading platform must discover graded tests through it exclusively so
/// student-authored tests are never scored on their own.
#[derive(Debug)]
pub struct SynthesizedSuite {
    checks: Vec<GeneratedCheck>,
}

impl SynthesizedSuite {
    pub fn checks(&self) -> &[GeneratedCheck] {
        &self.checks
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Executes every check once and returns their reports in suite order.
    /// The student suite itself is never re-run; the checks only read the
    /// results captured during synthesis.
    pub fn run_all(&self) -> Vec<CheckReport> {
        self.checks.iter().map(GeneratedCheck::report).collect()
    }
}
