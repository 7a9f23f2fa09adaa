//! Coverage tracking backed by an LCOV trace file.
//!
//! The instrumented test run is expected to write an LCOV tracefile (`SF:`,
//! `DA:` and `end_of_record` records); this tracker owns the session around
//! that run and reduces the trace to the covered percentage and missing line
//! numbers of one target file.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;

use crate::collaborators::{CollaboratorError, CoverageTracker};

/// Execution counts of one `SF:` block, keyed by line number.
#[derive(Debug, PartialEq, Eq, Clone)]
struct LcovRecord {
    path: String,
    hits: BTreeMap<u32, u64>,
}

/// [`CoverageTracker`] reading the tracefile at `trace_path`.
///
/// `start` discards any stale tracefile from an earlier run; the file is read
/// only after the session stopped. The target file is matched against the
/// file stem of each record's `SF:` path, so a request for `userfile` selects
/// `src/userfile.rs` no matter which directory it lives in; records for other
/// files are excluded from the computation.
#[derive(Debug)]
pub struct LcovTracker {
    trace_path: PathBuf,
    active: bool,
}

impl LcovTracker {
    pub fn new(trace_path: impl Into<PathBuf>) -> Self {
        Self {
            trace_path: trace_path.into(),
            active: false,
        }
    }
}

impl CoverageTracker for LcovTracker {
    fn start(&mut self) -> Result<(), CollaboratorError> {
        if self.active {
            return Err(CollaboratorError::Coverage(
                "an instrumentation session is already active".to_string(),
            ));
        }
        match fs::remove_file(&self.trace_path) {
            Ok(()) => debug!("removed stale tracefile {:?}", self.trace_path),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(CollaboratorError::Coverage(format!(
                    "could not discard stale tracefile {:?}: {err}",
                    self.trace_path
                )));
            }
        }
        self.active = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CollaboratorError> {
        self.active = false;
        Ok(())
    }

    fn percentage_and_missing(
        &self,
        filename: &str,
    ) -> Result<(f64, Vec<u32>), CollaboratorError> {
        if self.active {
            return Err(CollaboratorError::Coverage(
                "coverage is only defined once the session stopped".to_string(),
            ));
        }
        let content = fs::read_to_string(&self.trace_path).map_err(|err| {
            CollaboratorError::Coverage(format!(
                "could not read tracefile {:?}: {err}",
                self.trace_path
            ))
        })?;
        let records = parse_records(&content).map_err(CollaboratorError::Coverage)?;

        // records for the same file (one per test binary) are merged
        let mut hits: BTreeMap<u32, u64> = BTreeMap::new();
        let mut matched = false;
        for record in records {
            if !matches_target(&record.path, filename) {
                continue;
            }
            matched = true;
            for (line, count) in record.hits {
                *hits.entry(line).or_insert(0) += count;
            }
        }
        if !matched {
            return Err(CollaboratorError::Coverage(format!(
                "tracefile has no record for `{filename}`"
            )));
        }
        Ok(percentage_and_missing_of(&hits))
    }
}

fn matches_target(record_path: &str, filename: &str) -> bool {
    Path::new(record_path)
        .file_stem()
        .is_some_and(|stem| stem == filename)
}

fn parse_records(content: &str) -> Result<Vec<LcovRecord>, String> {
    let mut records = vec![];
    let mut current: Option<LcovRecord> = None;
    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if let Some(path) = line.strip_prefix("SF:") {
            current = Some(LcovRecord {
                path: path.to_string(),
                hits: BTreeMap::new(),
            });
        } else if let Some(data) = line.strip_prefix("DA:") {
            let record = current
                .as_mut()
                .ok_or_else(|| format!("line {}: DA record outside SF block", number + 1))?;
            let (line_number, count) = data
                .split_once(',')
                .ok_or_else(|| format!("line {}: malformed DA record", number + 1))?;
            let line_number: u32 = line_number
                .parse()
                .map_err(|_| format!("line {}: malformed DA line number", number + 1))?;
            // the checksum field, when present, is ignored
            let count: u64 = count
                .split(',')
                .next()
                .unwrap_or(count)
                .parse()
                .map_err(|_| format!("line {}: malformed DA hit count", number + 1))?;
            *record.hits.entry(line_number).or_insert(0) += count;
        } else if line == "end_of_record" {
            if let Some(record) = current.take() {
                records.push(record);
            }
        }
        // other record kinds (FN, BRDA, LH, LF, ...) carry no line-hit data
    }
    if let Some(record) = current {
        records.push(record);
    }
    Ok(records)
}

fn percentage_and_missing_of(hits: &BTreeMap<u32, u64>) -> (f64, Vec<u32>) {
    if hits.is_empty() {
        // a file with no executable lines reads as fully covered
        return (100.0, vec![]);
    }
    let covered = hits.values().filter(|&&count| count > 0).count();
    let missing: Vec<u32> = hits
        .iter()
        .filter(|&(_, &count)| count == 0)
        .map(|(&line, _)| line)
        .collect();
    let percentage = covered as f64 * 100.0 / hits.len() as f64;
    (percentage, missing)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACE: &str = "\
TN:
SF:src/userfile.rs
DA:1,4
DA:2,0
DA:5,1
LH:2
LF:3
end_of_record
SF:src/other.rs
DA:1,0
end_of_record
";

    fn write_trace(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lcov.info");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    mod parse_tests {
        use super::*;

        #[test]
        fn should_parse_every_sf_block() {
            let records = parse_records(TRACE).unwrap();
            assert_eq!(records.len(), 2);
            assert_eq!(records[0].path, "src/userfile.rs");
            assert_eq!(records[0].hits.len(), 3);
            assert_eq!(records[1].path, "src/other.rs");
        }

        #[test]
        fn should_reject_malformed_da_records() {
            assert!(parse_records("SF:a.rs\nDA:nonsense\n").is_err());
            assert!(parse_records("DA:1,2\n").is_err());
        }

        #[test]
        fn should_ignore_da_checksums() {
            let records = parse_records("SF:a.rs\nDA:3,7,AbCdEf==\nend_of_record\n").unwrap();
            assert_eq!(records[0].hits.get(&3), Some(&7));
        }
    }

    mod tracker_tests {
        use super::*;

        #[test]
        fn should_restrict_the_computation_to_the_target_file() {
            let (_dir, path) = write_trace(TRACE);
            let mut tracker = LcovTracker::new(&path);
            tracker.start().unwrap();
            tracker.stop().unwrap();
            let (percentage, missing) = tracker.percentage_and_missing("userfile").unwrap();
            assert_eq!(percentage, 2.0 * 100.0 / 3.0);
            assert_eq!(missing, vec![2]);
        }

        #[test]
        fn should_merge_records_of_the_same_file() {
            let (_dir, path) = write_trace(
                "SF:userfile.rs\nDA:1,1\nDA:2,0\nend_of_record\nSF:lib/userfile.rs\nDA:2,3\nend_of_record\n",
            );
            let mut tracker = LcovTracker::new(&path);
            tracker.start().unwrap();
            tracker.stop().unwrap();
            let (percentage, missing) = tracker.percentage_and_missing("userfile").unwrap();
            assert_eq!(percentage, 100.0);
            assert!(missing.is_empty());
        }

        #[test]
        fn should_report_full_coverage_for_a_file_without_executable_lines() {
            let (_dir, path) = write_trace("SF:userfile.rs\nend_of_record\n");
            let mut tracker = LcovTracker::new(&path);
            tracker.start().unwrap();
            tracker.stop().unwrap();
            let (percentage, missing) = tracker.percentage_and_missing("userfile").unwrap();
            assert_eq!(percentage, 100.0);
            assert!(missing.is_empty());
        }

        #[test]
        fn should_fail_for_a_file_the_trace_never_saw() {
            let (_dir, path) = write_trace(TRACE);
            let mut tracker = LcovTracker::new(&path);
            tracker.start().unwrap();
            tracker.stop().unwrap();
            assert!(tracker.percentage_and_missing("ghostfile").is_err());
        }

        #[test]
        fn should_discard_a_stale_tracefile_on_start() {
            let (_dir, path) = write_trace(TRACE);
            let mut tracker = LcovTracker::new(&path);
            tracker.start().unwrap();
            assert!(!path.exists());
        }

        #[test]
        fn should_refuse_to_report_while_the_session_is_active() {
            let (_dir, path) = write_trace(TRACE);
            let mut tracker = LcovTracker::new(&path);
            tracker.start().unwrap();
            assert!(tracker.percentage_and_missing("userfile").is_err());
        }

        #[test]
        fn should_refuse_overlapping_sessions() {
            let (_dir, path) = write_trace(TRACE);
            let mut tracker = LcovTracker::new(&path);
            tracker.start().unwrap();
            assert!(tracker.start().is_err());
        }
    }
}
