//! Human-readable renderings of a comparison result
//!
//! One renderer per channel: console log, status check, pull request
//! comment and the persisted build report.

use serde::Serialize;
use std::fmt;
use url::Url;

use super::compare::{ComparisonResult, UNCOVERED_MARKER};
use super::percent;
use crate::error::Result;

/// See https://shields.io/ for the badge path format
const SHIELDS_BADGE_BASE: &str = "https://img.shields.io/badge/";

pub const UNATTRIBUTED_FALLBACK: &str =
    "Failed to get the coverage reduce reason. Check coverage reports manually";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeColor {
    Red,
    Yellow,
    #[serde(rename = "brightgreen")]
    Green,
}

impl BadgeColor {
    /// Classify a candidate percentage; only values strictly below a
    /// threshold fall to the lower color.
    pub fn classify(coverage: f64, yellow_threshold: i64, green_threshold: i64) -> Self {
        let whole = percent::of(coverage);
        if whole < yellow_threshold {
            BadgeColor::Red
        } else if whole < green_threshold {
            BadgeColor::Yellow
        } else {
            BadgeColor::Green
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeColor::Red => "red",
            BadgeColor::Yellow => "yellow",
            BadgeColor::Green => "brightgreen",
        }
    }
}

impl fmt::Display for BadgeColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Renders a [`ComparisonResult`] for the different publishing channels
pub struct Message<'a> {
    result: &'a ComparisonResult,
}

impl<'a> Message<'a> {
    pub fn new(result: &'a ComparisonResult) -> Self {
        Self { result }
    }

    fn coverage(&self) -> f64 {
        self.result.candidate_coverage
    }

    fn master_coverage(&self) -> f64 {
        self.result.reference_coverage
    }

    /// `Coverage 80% changed -10% vs master 90%`
    pub fn summary(&self) -> String {
        format!(
            "Coverage {} changed {} vs master {}",
            percent::to_whole_no_sign_string(self.coverage()),
            percent::to_signed_string(self.result.delta),
            percent::to_whole_no_sign_string(self.master_coverage())
        )
    }

    pub fn for_console(&self) -> String {
        self.summary()
    }

    pub fn for_status_check(&self) -> String {
        self.summary()
    }

    /// `80% (-10%) vs master 90%`
    pub fn for_icon(&self) -> String {
        format!(
            "{} ({}) vs master {}",
            percent::to_whole_no_sign_string(self.coverage()),
            percent::to_signed_string(self.result.delta),
            percent::to_whole_no_sign_string(self.master_coverage())
        )
    }

    pub fn color(&self, yellow_threshold: i64, green_threshold: i64) -> BadgeColor {
        BadgeColor::classify(self.coverage(), yellow_threshold, green_threshold)
    }

    /// Markdown badge linking to the build
    pub fn for_comment(
        &self,
        build_url: &str,
        icon_base_url: &str,
        yellow_threshold: i64,
        green_threshold: i64,
        use_shields_io: bool,
    ) -> Result<String> {
        let icon = self.for_icon();
        let image = if use_shields_io {
            self.shields_url(&icon, yellow_threshold, green_threshold)?
        } else {
            self.local_icon_url(icon_base_url)?
        };
        Ok(format!("[![{}]({})]({})", icon, image, build_url))
    }

    /// Summary followed by one line per regressed file
    pub fn for_build(&self) -> String {
        let mut lines = vec![self.summary()];
        for entry in &self.result.entries {
            lines.push(format!("{}: -{}", entry.path, entry.delta));
        }
        if self.result.is_unattributed() {
            lines.push(UNATTRIBUTED_FALLBACK.to_string());
        }
        if let Some(ref reason) = self.result.detail_unavailable {
            lines.push(reason.clone());
        }
        lines.join("\n")
    }

    fn shields_url(&self, icon: &str, yellow_threshold: i64, green_threshold: i64) -> Result<String> {
        let color = self.color(yellow_threshold, green_threshold);
        // shields.io reads a single dash as a separator
        let label = icon.replace('-', "--");

        let mut url = Url::parse(SHIELDS_BADGE_BASE)?;
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&format!("coverage-{}-{}.svg", label, color));
        }
        Ok(url.into())
    }

    fn local_icon_url(&self, icon_base_url: &str) -> Result<String> {
        let mut url = Url::parse(&format!(
            "{}/coverage-status-icon/",
            icon_base_url.trim_end_matches('/')
        ))?;
        url.query_pairs_mut()
            .append_pair("coverage", &self.coverage().to_string())
            .append_pair("masterCoverage", &self.master_coverage().to_string());
        Ok(url.into())
    }
}

/// Recover `(path, delta)` pairs from a [`Message::for_build`] block
pub fn parse_detail_lines(text: &str) -> Vec<(String, String)> {
    text.lines()
        .skip(1)
        .filter_map(|line| line.rsplit_once(": -"))
        .filter(|(_, delta)| is_delta(delta))
        .map(|(path, delta)| (path.to_string(), delta.to_string()))
        .collect()
}

fn is_delta(text: &str) -> bool {
    text == UNCOVERED_MARKER
        || text
            .strip_suffix('%')
            .and_then(|points| points.parse::<f64>().ok())
            .is_some_and(f64::is_finite)
}
