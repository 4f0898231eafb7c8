//! Persisted build report (HTML page or JSON document)

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::config::Thresholds;
use crate::coverage::{BadgeColor, ComparisonResult, Message, RegressionEntry};

#[derive(Debug, Serialize)]
pub struct BuildReport<'a> {
    pub project: &'a str,
    pub generated_at: DateTime<Utc>,
    pub summary: String,
    pub color: BadgeColor,
    pub comparison: &'a ComparisonResult,
}

impl<'a> BuildReport<'a> {
    pub fn new(project: &'a str, comparison: &'a ComparisonResult, thresholds: &Thresholds) -> Self {
        let message = Message::new(comparison);
        Self {
            project,
            generated_at: Utc::now(),
            summary: message.summary(),
            color: message.color(thresholds.yellow, thresholds.green),
            comparison,
        }
    }
}

/// Write the report; a `.json` extension selects JSON, anything else HTML
pub fn generate_report(report: &BuildReport, output_path: &Path) -> Result<()> {
    let is_json = output_path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let content = if is_json {
        serde_json::to_string_pretty(report)?
    } else {
        build_html(report)
    };

    fs::write(output_path, content)
        .with_context(|| format!("Failed to write report: {}", output_path.display()))?;
    Ok(())
}

fn build_html(report: &BuildReport) -> String {
    let comparison = report.comparison;
    let details = Message::new(comparison)
        .for_build()
        .lines()
        .map(escape_html)
        .collect::<Vec<_>>()
        .join("<br/>");

    let rows: String = comparison.entries.iter().map(build_entry_row).collect();
    let table = if rows.is_empty() {
        r#"<p class="empty">No file-level regressions</p>"#.to_string()
    } else {
        format!(
            r#"<table>
            <thead><tr><th>File</th><th>Lost</th><th>Newly unhit lines</th></tr></thead>
            <tbody>{}</tbody>
        </table>"#,
            rows
        )
    };

    let delta_class = if comparison.regressed { "red" } else { "green" };

    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{project} - Coverage comparison</title>
    <style>
        * {{ margin: 0; padding: 0; box-sizing: border-box; }}
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: #0f0f1a;
            color: #eee;
            min-height: 100vh;
        }}
        .header {{
            background: linear-gradient(135deg, #1a1a2e 0%, #16213e 100%);
            padding: 20px 30px;
            border-bottom: 1px solid #2d2d44;
        }}
        .header h1 {{ color: #00d4ff; font-size: 28px; margin-bottom: 5px; }}
        .header p {{ color: #888; font-size: 14px; }}
        .summary {{
            display: flex;
            gap: 20px;
            padding: 20px 30px;
            background: #1a1a2e;
            border-bottom: 1px solid #2d2d44;
            flex-wrap: wrap;
        }}
        .summary-card {{
            background: #16213e;
            padding: 15px 25px;
            border-radius: 10px;
            text-align: center;
            min-width: 120px;
            border-left: 4px solid #00d4ff;
        }}
        .summary-value {{ font-size: 28px; font-weight: bold; }}
        .summary-value.green {{ color: #26a69a; }}
        .summary-value.red {{ color: #ef5350; }}
        .summary-label {{ font-size: 12px; color: #888; margin-top: 5px; }}
        .content {{ padding: 20px 30px; }}
        .details {{ background: #16213e; padding: 15px; border-radius: 10px; margin-bottom: 20px; font-family: monospace; }}
        table {{ width: 100%; border-collapse: collapse; background: #16213e; border-radius: 10px; }}
        th, td {{ text-align: left; padding: 8px 12px; border-bottom: 1px solid #2d2d44; }}
        th {{ color: #888; font-size: 12px; text-transform: uppercase; }}
        td.lost {{ color: #ef5350; }}
        .empty {{ color: #888; }}
    </style>
</head>
<body>
    <div class="header">
        <h1>{project}</h1>
        <p>Coverage comparison generated {timestamp}</p>
    </div>
    <div class="summary">
        <div class="summary-card">
            <div class="summary-value" style="color: {badge}">{candidate:.2}%</div>
            <div class="summary-label">Coverage</div>
        </div>
        <div class="summary-card">
            <div class="summary-value">{reference:.2}%</div>
            <div class="summary-label">Master</div>
        </div>
        <div class="summary-card">
            <div class="summary-value {delta_class}">{delta:+.2}%</div>
            <div class="summary-label">Change</div>
        </div>
        <div class="summary-card">
            <div class="summary-value">{regressed_files}</div>
            <div class="summary-label">Regressed files</div>
        </div>
    </div>
    <div class="content">
        <div class="details">{details}</div>
        {table}
    </div>
</body>
</html>"##,
        project = escape_html(report.project),
        timestamp = report.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        badge = badge_css(report.color),
        candidate = comparison.candidate_coverage,
        reference = comparison.reference_coverage,
        delta = comparison.delta,
        delta_class = delta_class,
        regressed_files = comparison.entries.len(),
        details = details,
        table = table,
    )
}

fn build_entry_row(entry: &RegressionEntry) -> String {
    let lines = if entry.lost_lines.is_empty() {
        "-".to_string()
    } else {
        entry
            .lost_lines
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        r#"<tr><td>{}</td><td class="lost">-{}</td><td>{}</td></tr>"#,
        escape_html(&entry.path),
        entry.delta,
        lines
    )
}

fn badge_css(color: BadgeColor) -> &'static str {
    match color {
        BadgeColor::Red => "#ef5350",
        BadgeColor::Yellow => "#ffd700",
        BadgeColor::Green => "#26a69a",
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
