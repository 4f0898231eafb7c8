//! Coverage data model shared by the parser and the comparator

use serde::Serialize;
use std::collections::BTreeMap;

/// A single `(line number, hit count)` pair from a `<line>` element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineHit {
    pub number: u32,
    pub hits: u64,
}

/// Coverage record for one source file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileCoverage {
    pub path: String,
    /// Fraction in [0.0, 1.0] as reported by the coverage tool
    pub line_rate: f64,
    /// Line number to hit count
    pub lines: BTreeMap<u32, u64>,
}

impl FileCoverage {
    pub fn new(path: impl Into<String>, line_rate: f64) -> Self {
        Self {
            path: path.into(),
            line_rate,
            lines: BTreeMap::new(),
        }
    }

    /// Record a line; a repeated line number keeps the last hit count.
    pub fn record(&mut self, hit: LineHit) {
        self.lines.insert(hit.number, hit.hits);
    }

    pub fn with_lines(mut self, lines: impl IntoIterator<Item = (u32, u64)>) -> Self {
        for (number, hits) in lines {
            self.record(LineHit { number, hits });
        }
        self
    }

    pub fn line_hits(&self) -> impl Iterator<Item = LineHit> + '_ {
        self.lines
            .iter()
            .map(|(&number, &hits)| LineHit { number, hits })
    }

    pub fn lines_covered(&self) -> usize {
        self.lines.values().filter(|&&hits| hits > 0).count()
    }

    pub fn lines_total(&self) -> usize {
        self.lines.len()
    }
}

/// All file records parsed from one coverage document, keyed by path
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoverageReport {
    pub files: BTreeMap<String, FileCoverage>,
    /// Root `<coverage line-rate>` when the document carries one
    pub line_rate: Option<f64>,
}

impl CoverageReport {
    /// Insert a file record, replacing any earlier record for the same path.
    pub fn insert(&mut self, file: FileCoverage) {
        self.files.insert(file.path.clone(), file);
    }

    pub fn get(&self, path: &str) -> Option<&FileCoverage> {
        self.files.get(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileCoverage> {
        self.files.values()
    }

    /// Whole-project coverage as a percentage, from the root `line-rate`
    pub fn aggregate(&self) -> Option<f64> {
        self.line_rate.map(aggregate_from_line_rate)
    }
}

impl FromIterator<FileCoverage> for CoverageReport {
    fn from_iter<I: IntoIterator<Item = FileCoverage>>(iter: I) -> Self {
        let mut report = CoverageReport::default();
        for file in iter {
            report.insert(file);
        }
        report
    }
}

/// Convert a Cobertura fraction to the percentage convention used for aggregates
pub fn aggregate_from_line_rate(rate: f64) -> f64 {
    rate * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_last_wins() {
        let mut report = CoverageReport::default();
        report.insert(FileCoverage::new("A.java", 0.5).with_lines([(1, 1)]));
        report.insert(FileCoverage::new("A.java", 0.25).with_lines([(7, 0)]));

        assert_eq!(report.len(), 1);
        let file = report.get("A.java").unwrap();
        assert_eq!(file.line_rate, 0.25);
        assert_eq!(file.lines.keys().copied().collect::<Vec<_>>(), vec![7]);
    }

    #[test]
    fn test_line_counts() {
        let file = FileCoverage::new("A.java", 0.5).with_lines([(1, 3), (2, 0), (3, 1), (4, 0)]);
        assert_eq!(file.lines_covered(), 2);
        assert_eq!(file.lines_total(), 4);
    }

    #[test]
    fn test_aggregate_from_root_line_rate() {
        let report = CoverageReport {
            line_rate: Some(0.875),
            ..Default::default()
        };
        assert_eq!(report.aggregate(), Some(87.5));
        assert_eq!(CoverageReport::default().aggregate(), None);
    }
}
