//! Reference vs candidate comparison
//!
//! The aggregate gate decides whether there is a regression at all; only
//! then is each candidate file judged against its reference counterpart.

use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::path::Path;
use tracing::{debug, trace, warn};

use super::percent::{change, round4};
use super::{parse_cobertura, CoverageReport, FileCoverage};
use crate::error::Result;

/// Marker shown for a new file that has no coverage at all
pub const UNCOVERED_MARKER: &str = "uncovered";

/// How much a single file lost
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegressionDelta {
    /// Percentage points lost, `(reference - candidate) * 100`
    Points(f64),
    /// New file with a line rate of zero
    Uncovered,
}

impl fmt::Display for RegressionDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegressionDelta::Points(points) => write!(f, "{:.4}%", points),
            RegressionDelta::Uncovered => f.write_str(UNCOVERED_MARKER),
        }
    }
}

impl Serialize for RegressionDelta {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A file whose coverage went down
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionEntry {
    pub path: String,
    pub delta: RegressionDelta,
    /// Lines hit in the reference run and unhit in the candidate run
    pub lost_lines: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    /// Rounded reference aggregate, in percent
    pub reference_coverage: f64,
    /// Rounded candidate aggregate, in percent
    pub candidate_coverage: f64,
    /// `candidate - reference`, rounded
    pub delta: f64,
    pub regressed: bool,
    pub entries: Vec<RegressionEntry>,
    /// Why per-file detail could not be produced, when it could not
    pub detail_unavailable: Option<String>,
}

impl ComparisonResult {
    fn gate(reference_aggregate: f64, candidate_aggregate: f64) -> Self {
        ComparisonResult {
            reference_coverage: round4(reference_aggregate),
            candidate_coverage: round4(candidate_aggregate),
            delta: change(candidate_aggregate, reference_aggregate),
            regressed: is_regression(reference_aggregate, candidate_aggregate),
            entries: Vec::new(),
            detail_unavailable: None,
        }
    }

    /// The aggregate regressed but no file could be blamed
    pub fn is_unattributed(&self) -> bool {
        self.regressed && self.entries.is_empty()
    }
}

/// True when the candidate is strictly below the reference after rounding
pub fn is_regression(reference: f64, candidate: f64) -> bool {
    round4(candidate) < round4(reference)
}

/// Compare two parsed reports given their whole-project aggregates (percent)
pub fn compare(
    reference: &CoverageReport,
    candidate: &CoverageReport,
    reference_aggregate: f64,
    candidate_aggregate: f64,
) -> ComparisonResult {
    let mut result = ComparisonResult::gate(reference_aggregate, candidate_aggregate);
    if !result.regressed {
        debug!(
            reference = result.reference_coverage,
            candidate = result.candidate_coverage,
            "no aggregate regression"
        );
        return result;
    }

    result.entries = candidate
        .iter()
        .filter_map(|file| compare_file(reference.get(&file.path), file))
        .collect();
    result
}

/// Read both reports from disk and compare them, degrading instead of failing
///
/// The files are only read when the aggregate gate reports a regression.
/// A missing or malformed report leaves the entry list empty and records
/// the reason in `detail_unavailable`.
pub fn compare_sources(
    reference_path: &Path,
    candidate_path: &Path,
    reference_aggregate: f64,
    candidate_aggregate: f64,
) -> ComparisonResult {
    let gated = ComparisonResult::gate(reference_aggregate, candidate_aggregate);
    if !gated.regressed {
        return gated;
    }

    match parse_pair(reference_path, candidate_path) {
        Ok((reference, candidate)) => compare(&reference, &candidate, reference_aggregate, candidate_aggregate),
        Err(e) => {
            warn!(error = %e, "could not determine the cause of the coverage regression");
            ComparisonResult {
                detail_unavailable: Some(e.to_string()),
                ..gated
            }
        }
    }
}

/// Parse both reports concurrently
pub fn parse_pair(reference_path: &Path, candidate_path: &Path) -> Result<(CoverageReport, CoverageReport)> {
    let (reference, candidate) = std::thread::scope(|scope| {
        let reference = scope.spawn(|| parse_cobertura(reference_path));
        let candidate = parse_cobertura(candidate_path);
        let reference = match reference.join() {
            Ok(parsed) => parsed,
            Err(panic) => std::panic::resume_unwind(panic),
        };
        (reference, candidate)
    });
    Ok((reference?, candidate?))
}

fn compare_file(reference: Option<&FileCoverage>, candidate: &FileCoverage) -> Option<RegressionEntry> {
    let candidate_rate = round4(candidate.line_rate);

    let Some(reference) = reference else {
        if candidate_rate == 0.0 {
            debug!(path = %candidate.path, "new file without coverage");
            return Some(RegressionEntry {
                path: candidate.path.clone(),
                delta: RegressionDelta::Uncovered,
                lost_lines: Vec::new(),
            });
        }
        return None;
    };

    let reference_rate = round4(reference.line_rate);
    // NaN on either side compares as None and never produces an entry
    if reference_rate.partial_cmp(&candidate_rate) != Some(Ordering::Greater) {
        return None;
    }

    let points = (reference.line_rate - candidate.line_rate) * 100.0;
    let lost_lines = lost_lines(reference, candidate);
    debug!(path = %candidate.path, points, lost = lost_lines.len(), "file coverage regressed");

    Some(RegressionEntry {
        path: candidate.path.clone(),
        delta: RegressionDelta::Points(points),
        lost_lines,
    })
}

/// Lines unhit in the candidate that the reference did hit
pub fn lost_lines(reference: &FileCoverage, candidate: &FileCoverage) -> Vec<u32> {
    candidate
        .line_hits()
        .filter(|hit| hit.hits == 0)
        .filter(|hit| reference.lines.get(&hit.number).is_some_and(|&hits| hits > 0))
        .map(|hit| {
            trace!(path = %candidate.path, line = hit.number, "line lost coverage");
            hit.number
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::Message;
    use std::io::Write;

    fn report(files: impl IntoIterator<Item = FileCoverage>) -> CoverageReport {
        files.into_iter().collect()
    }

    #[test]
    fn test_regressed_file_with_lost_lines() {
        let reference = report([FileCoverage::new("A.java", 0.90).with_lines([(1, 5), (2, 0)])]);
        let candidate = report([FileCoverage::new("A.java", 0.80).with_lines([(1, 0), (2, 0)])]);

        let result = compare(&reference, &candidate, 90.0, 80.0);

        assert!(result.regressed);
        assert_eq!(result.delta, -10.0);
        assert_eq!(result.entries.len(), 1);
        let entry = &result.entries[0];
        assert_eq!(entry.path, "A.java");
        assert_eq!(entry.delta.to_string(), "10.0000%");
        assert_eq!(entry.lost_lines, vec![1]);
    }

    #[test]
    fn test_new_uncovered_file() {
        let reference = report([]);
        let candidate = report([
            FileCoverage::new("B.java", 0.0).with_lines([(1, 0)]),
            FileCoverage::new("C.java", 0.5),
        ]);

        let result = compare(&reference, &candidate, 80.0, 70.0);

        assert_eq!(result.entries.len(), 1);
        let entry = &result.entries[0];
        assert_eq!(entry.path, "B.java");
        assert_eq!(entry.delta, RegressionDelta::Uncovered);
        assert_eq!(entry.delta.to_string(), UNCOVERED_MARKER);
        assert!(entry.lost_lines.is_empty());
    }

    #[test]
    fn test_no_aggregate_regression_skips_files() {
        let reference = report([FileCoverage::new("A.java", 0.9).with_lines([(1, 1)])]);
        let candidate = report([
            FileCoverage::new("A.java", 0.1).with_lines([(1, 0)]),
            FileCoverage::new("New.java", 0.0),
        ]);

        let result = compare(&reference, &candidate, 80.0, 85.0);

        assert!(!result.regressed);
        assert!(result.entries.is_empty());
        assert_eq!(result.delta, 5.0);
        assert!(!result.is_unattributed());
    }

    #[test]
    fn test_equal_after_rounding_is_not_a_regression() {
        for (a, b) in [(80.0, 80.000_04), (80.000_04, 80.0), (0.1 + 0.2, 0.3), (55.5, 55.5)] {
            assert_eq!(round4(a), round4(b));
            assert!(!is_regression(a, b));
            let result = compare(&report([]), &report([FileCoverage::new("X", 0.0)]), a, b);
            assert!(!result.regressed);
            assert!(result.entries.is_empty());
        }
    }

    #[test]
    fn test_improved_and_removed_files_are_not_entries() {
        let reference = report([
            FileCoverage::new("Up.java", 0.5),
            FileCoverage::new("Same.java", 0.7),
            FileCoverage::new("Gone.java", 0.9),
            FileCoverage::new("Down.java", 0.6).with_lines([(3, 1), (4, 2), (5, 0)]),
        ]);
        let candidate = report([
            FileCoverage::new("Up.java", 0.8),
            FileCoverage::new("Same.java", 0.700_000_01),
            FileCoverage::new("Down.java", 0.4).with_lines([(3, 0), (4, 0), (5, 0), (6, 0)]),
        ]);

        let result = compare(&reference, &candidate, 75.0, 70.0);

        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].path, "Down.java");
        assert_eq!(result.entries[0].delta.to_string(), "20.0000%");
        assert_eq!(result.entries[0].lost_lines, vec![3, 4]);
    }

    #[test]
    fn test_nan_rates_are_never_regressions() {
        let reference = report([
            FileCoverage::new("A.java", f64::NAN).with_lines([(1, 5)]),
            FileCoverage::new("B.java", 0.9).with_lines([(1, 5)]),
        ]);
        let candidate = report([
            FileCoverage::new("A.java", 0.5).with_lines([(1, 0)]),
            FileCoverage::new("B.java", f64::NAN).with_lines([(1, 0)]),
        ]);

        let result = compare(&reference, &candidate, 90.0, 80.0);

        assert!(result.regressed);
        assert!(result.entries.is_empty());
        assert!(!Message::new(&result).for_build().contains("NaN"));
    }

    #[test]
    fn test_unattributed_regression() {
        let reference = report([FileCoverage::new("A.java", 0.5)]);
        let candidate = report([FileCoverage::new("A.java", 0.5)]);

        let result = compare(&reference, &candidate, 81.0, 80.0);

        assert!(result.regressed);
        assert!(result.is_unattributed());
    }

    #[test]
    fn test_entries_are_ordered_by_path() {
        let reference = report([FileCoverage::new("b.rs", 0.9), FileCoverage::new("a.rs", 0.9)]);
        let candidate = report([
            FileCoverage::new("b.rs", 0.1),
            FileCoverage::new("c.rs", 0.0),
            FileCoverage::new("a.rs", 0.1),
        ]);

        let result = compare(&reference, &candidate, 90.0, 10.0);
        let paths: Vec<_> = result.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["a.rs", "b.rs", "c.rs"]);
    }

    fn write_xml(dir: &Path, name: &str, xml: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(xml.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_compare_sources_reads_files_on_regression() {
        let dir = tempfile::tempdir().unwrap();
        let reference = write_xml(
            dir.path(),
            "master.xml",
            r#"<coverage><class filename="A.java" line-rate="0.9"><lines><line number="1" hits="5"/></lines></class></coverage>"#,
        );
        let candidate = write_xml(
            dir.path(),
            "pr.xml",
            r#"<coverage><class filename="A.java" line-rate="0.8"><lines><line number="1" hits="0"/></lines></class></coverage>"#,
        );

        let result = compare_sources(&reference, &candidate, 90.0, 80.0);

        assert_eq!(result.detail_unavailable, None);
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].lost_lines, vec![1]);
    }

    #[test]
    fn test_compare_sources_degrades_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let candidate = write_xml(dir.path(), "pr.xml", "<coverage/>");

        let result = compare_sources(&dir.path().join("missing.xml"), &candidate, 90.0, 80.0);

        assert!(result.regressed);
        assert!(result.entries.is_empty());
        let reason = result.detail_unavailable.unwrap();
        assert!(reason.contains("missing.xml"), "{}", reason);
    }

    #[test]
    fn test_compare_sources_degrades_when_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let reference = write_xml(dir.path(), "master.xml", "<coverage>");
        let candidate = write_xml(dir.path(), "pr.xml", "<coverage/>");

        let result = compare_sources(&reference, &candidate, 90.0, 80.0);

        assert!(result.entries.is_empty());
        assert!(result.detail_unavailable.unwrap().starts_with("Malformed coverage report"));
    }

    #[test]
    fn test_compare_sources_skips_reading_without_regression() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.xml");

        let result = compare_sources(&missing, &missing, 80.0, 80.0);

        assert!(!result.regressed);
        assert_eq!(result.detail_unavailable, None);
    }
}
