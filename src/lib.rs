//! prcov - pull request coverage comparison
//!
//! Compares a candidate Cobertura report against a reference one:
//! - Aggregate coverage gate with four-digit rounding
//! - Per-file regressions in percentage points
//! - Lines that were hit in the reference run and are unhit now
//! - Renderings for console, status checks, PR comments and build reports

pub mod config;
pub mod coverage;
pub mod error;
pub mod logging;
pub mod report;

pub use coverage::{
    compare, compare_sources, parse_cobertura, parse_cobertura_reader, parse_cobertura_string,
    BadgeColor, ComparisonResult, CoverageReport, FileCoverage, LineHit, Message, RegressionDelta,
    RegressionEntry,
};
pub use error::CoverageError;
