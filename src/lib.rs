//! Generates graded coverage checks from a student's own test suite.
//!
//! Given a synthesis request naming the student's test module, the file to
//! measure coverage for and a list of point values, the [`Synthesizer`] runs
//! the suite once under coverage instrumentation and returns a
//! [`SynthesizedSuite`] with `1 + N` graded checks: `test_code` (0 points,
//! fails with the run transcript when the student suite itself failed) and
//! `test_coverage_01` .. `test_coverage_NN`, one per point value, each bound
//! to a threshold from the equal-interval partition of `[minimum, 100]`.
//!
//! With `points = [8, 10, 12]` a submission earns 8 points at 33.33% coverage
//! of the target file, 10 more at 66.67% and 12 more at 100%, totaling 30;
//! five point values check coverage in 20% intervals. If the student suite
//! does not pass, every check fails and 0 of the total is awarded.
//!
//! Grading platforms must extract scores from the synthesized suite only, so
//! a student cannot smuggle self-awarded tests into the graded set, and must
//! serialize syntheses within a process: coverage instrumentation is
//! process-wide state.
//!
//! ```
//! use cov_grader::SynthesisRequest;
//!
//! let request = SynthesisRequest::from_json(
//!     r#"{"testmodule": "usertest", "filename": "userfile", "points": [8, 10, 12]}"#,
//! )
//! .unwrap();
//! assert_eq!(request.minimum(), 0.0);
//! ```

pub mod collaborators;
mod configuration;
pub mod synthesizer;

pub use configuration::{RequestError, SynthesisRequest};
pub use synthesizer::check::{
    CheckOutcome, CheckReport, CoverageResult, GeneratedCheck, ResultBundle,
};
pub use synthesizer::threshold::{ThresholdEntry, ThresholdSchedule};
pub use synthesizer::{SynthesisError, SynthesizedSuite, Synthesizer};
