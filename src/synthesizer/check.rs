use std::fmt;
use std::sync::Arc;

use crate::collaborators::RunResult;
use crate::synthesizer::threshold::ThresholdEntry;

// Tolerance for the threshold boundary: the tracker may compute its
// percentage with a different operation order than the schedule, and a
// submission sitting exactly on a boundary must still earn the tier.
const BOUNDARY_TOLERANCE: f64 = 1e-9;

/// Covered percentage and missing line numbers for the target file, measured
/// once while instrumentation was active.
#[derive(Debug, PartialEq, Clone)]
pub struct CoverageResult {
    percentage: f64,
    missing_lines: Vec<u32>,
}

impl CoverageResult {
    pub fn new(percentage: f64, missing_lines: Vec<u32>) -> Self {
        Self {
            percentage,
            missing_lines,
        }
    }

    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    pub fn missing_lines(&self) -> &[u32] {
        &self.missing_lines
    }
}

/// Everything the generated checks read: the single run outcome plus the
/// coverage measured for the target file. Built once per synthesis and shared
/// read-only by every check.
#[derive(Debug, PartialEq, Clone)]
pub struct ResultBundle {
    run: RunResult,
    coverage: CoverageResult,
}

impl ResultBundle {
    pub fn new(run: RunResult, coverage: CoverageResult) -> Self {
        Self { run, coverage }
    }

    pub fn run(&self) -> &RunResult {
        &self.run
    }

    pub fn coverage(&self) -> &CoverageResult {
        &self.coverage
    }
}

/// Outcome of one generated check.
///
/// A check always produces a pass or a fail, never an error or skip state, so
/// score extraction can treat anything but `Passed` as zero points for the
/// tier.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum CheckOutcome {
    Passed { feedback: Option<String> },
    Failed { message: String },
}

impl CheckOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, CheckOutcome::Passed { .. })
    }
}

/// A graded check synthesized at construction time, owned by the suite that
/// created it. The closure reads the shared [`ResultBundle`]; running a check
/// never re-runs the student suite.
pub struct GeneratedCheck {
    name: String,
    points: u32,
    doc: String,
    check: Box<dyn Fn() -> CheckOutcome + Send + Sync>,
}

impl GeneratedCheck {
    /// The zero-point baseline check, named `test_code`: fails with the
    /// embedded transcript when the student suite did not pass, and records
    /// the transcript as informational feedback otherwise.
    pub(crate) fn baseline(bundle: Arc<ResultBundle>) -> Self {
        Self {
            name: "test_code".to_string(),
            points: 0,
            doc: "Check if students tests pass".to_string(),
            check: Box::new(move || {
                let run = bundle.run();
                if !run.success() {
                    return CheckOutcome::Failed {
                        message: format!(
                            "Your tests didn't pass. Coverage tests won't be run.\n\n{}",
                            run.transcript()
                        ),
                    };
                }
                CheckOutcome::Passed {
                    feedback: Some(format!("Run results: \n{}", run.transcript())),
                }
            }),
        }
    }

    /// One threshold check, named `test_coverage_{index:02}` with `index`
    /// starting at 1. Fails outright when the run was unsuccessful; otherwise
    /// passes iff the measured percentage meets the boundary.
    pub(crate) fn coverage(
        bundle: Arc<ResultBundle>,
        entry: ThresholdEntry,
        index: usize,
    ) -> Self {
        Self {
            name: format!("test_coverage_{index:02}"),
            points: entry.points(),
            doc: format!("Checks that test coverage is over {}%", entry.percentage()),
            check: Box::new(move || {
                if !bundle.run().success() {
                    return CheckOutcome::Failed {
                        message: "Test wasn't run because your tests weren't successful"
                            .to_string(),
                    };
                }
                let coverage = bundle.coverage();
                if coverage.percentage() >= entry.percentage() - BOUNDARY_TOLERANCE {
                    return CheckOutcome::Passed { feedback: None };
                }
                let missing = coverage
                    .missing_lines()
                    .iter()
                    .map(|line| line.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                CheckOutcome::Failed {
                    message: format!(
                        "\nYour code covers only {:.2}%\nMissing lines: [{}]",
                        coverage.percentage(),
                        missing
                    ),
                }
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn points(&self) -> u32 {
        self.points
    }

    pub fn doc(&self) -> &str {
        &self.doc
    }

    pub fn run(&self) -> CheckOutcome {
        (self.check)()
    }

    /// Runs the check and pairs the outcome with its grading metadata.
    pub fn report(&self) -> CheckReport {
        CheckReport {
            name: self.name.clone(),
            points: self.points,
            outcome: self.run(),
        }
    }
}

impl fmt::Debug for GeneratedCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedCheck")
            .field("name", &self.name)
            .field("points", &self.points)
            .field("doc", &self.doc)
            .finish_non_exhaustive()
    }
}

/// Result of one executed check, ready for score extraction.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CheckReport {
    name: String,
    points: u32,
    outcome: CheckOutcome,
}

impl CheckReport {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_points(&self) -> u32 {
        self.points
    }

    pub fn awarded_points(&self) -> u32 {
        if self.outcome.passed() { self.points } else { 0 }
    }

    pub fn outcome(&self) -> &CheckOutcome {
        &self.outcome
    }
}
