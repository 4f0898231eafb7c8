use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::{ColoredString, Colorize};
use std::path::{Path, PathBuf};

use prcov::config::{Channel, Config};
use prcov::coverage::{parse_pair, percent, UNATTRIBUTED_FALLBACK};
use prcov::report::{generate_report, BuildReport};
use prcov::{compare, compare_sources, parse_cobertura, BadgeColor, ComparisonResult, Message};

const CONFIG_FILE: &str = "prcov.toml";

#[derive(Parser)]
#[command(name = "prcov")]
#[command(about = "Compare pull request coverage against master and explain regressions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (default: prcov.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare a candidate report against the reference (master) report
    Compare {
        /// Reference (master) Cobertura XML
        #[arg(long)]
        reference: PathBuf,

        /// Candidate (pull request) Cobertura XML
        #[arg(long)]
        candidate: PathBuf,

        /// Reference whole-project coverage in percent (default: report line-rate)
        #[arg(long)]
        reference_coverage: Option<f64>,

        /// Candidate whole-project coverage in percent (default: report line-rate)
        #[arg(long)]
        candidate_coverage: Option<f64>,

        /// Output channel (overrides publish.channel)
        #[arg(short, long, value_enum)]
        format: Option<Channel>,

        /// Link target for comment badges (overrides publish.build_url)
        #[arg(long)]
        build_url: Option<String>,

        /// Write a build report (.json for JSON, HTML otherwise)
        #[arg(long)]
        report: Option<PathBuf>,

        /// Exit with status 1 when coverage regressed
        #[arg(long)]
        fail_on_regression: bool,
    },

    /// Show per-file coverage of a single report
    Inspect {
        /// Cobertura XML file
        report: PathBuf,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    prcov::logging::init(cli.verbose)?;

    let config = match cli.config {
        Some(ref path) => {
            Config::load(path).with_context(|| format!("Could not load {}", path.display()))?
        }
        None => Config::load_or_default(Path::new(CONFIG_FILE))?,
    };

    match cli.command {
        Commands::Compare {
            reference,
            candidate,
            reference_coverage,
            candidate_coverage,
            format,
            build_url,
            report,
            fail_on_regression,
        } => {
            let comparison = cmd_compare(&reference, &candidate, reference_coverage, candidate_coverage)?;
            let channel = format.unwrap_or(config.publish.channel);
            let build_url = build_url.or_else(|| config.publish.build_url.clone());
            print_comparison(&config, &comparison, channel, build_url.as_deref())?;

            if let Some(report_path) = report {
                let build_report = BuildReport::new(&config.project.name, &comparison, &config.thresholds);
                generate_report(&build_report, &report_path)?;
                println!(
                    "\n{} Report generated: {}",
                    "📊".cyan(),
                    report_path.display().to_string().green()
                );
            }

            if fail_on_regression && comparison.regressed {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Inspect { report } => cmd_inspect(&config, &report),
    }
}

fn cmd_compare(
    reference: &Path,
    candidate: &Path,
    reference_coverage: Option<f64>,
    candidate_coverage: Option<f64>,
) -> Result<ComparisonResult> {
    check_aggregate("--reference-coverage", reference_coverage)?;
    check_aggregate("--candidate-coverage", candidate_coverage)?;

    if let (Some(r), Some(c)) = (reference_coverage, candidate_coverage) {
        return Ok(compare_sources(reference, candidate, r, c));
    }

    // Without both aggregates the gate can't run, so unreadable reports are fatal here
    let (reference_report, candidate_report) = parse_pair(reference, candidate)
        .context("Could not read reports to derive aggregate coverage")?;

    let r = reference_coverage
        .or_else(|| reference_report.aggregate())
        .with_context(|| {
            format!(
                "No --reference-coverage given and {} has no root line-rate",
                reference.display()
            )
        })?;
    let c = candidate_coverage
        .or_else(|| candidate_report.aggregate())
        .with_context(|| {
            format!(
                "No --candidate-coverage given and {} has no root line-rate",
                candidate.display()
            )
        })?;

    Ok(compare(&reference_report, &candidate_report, r, c))
}

fn check_aggregate(flag: &str, value: Option<f64>) -> Result<()> {
    match value {
        Some(v) if !v.is_finite() || !(0.0..=100.0).contains(&v) => {
            anyhow::bail!("{} must be a percentage between 0 and 100, got {}", flag, v)
        }
        _ => Ok(()),
    }
}

fn print_comparison(
    config: &Config,
    comparison: &ComparisonResult,
    channel: Channel,
    build_url: Option<&str>,
) -> Result<()> {
    let message = Message::new(comparison);

    match channel {
        Channel::Console => print_console(config, comparison),
        Channel::Status => println!("{}", message.for_status_check()),
        Channel::Build => println!("{}", message.for_build()),
        Channel::Comment => {
            let build_url = build_url
                .context("A build URL is required for comment output (--build-url or publish.build_url)")?;
            let comment = message.for_comment(
                build_url,
                config.badge.icon_base_url.as_deref().unwrap_or_default(),
                config.thresholds.yellow,
                config.thresholds.green,
                config.badge.use_shields_io,
            )?;
            println!("{}", comment);
        }
    }

    Ok(())
}

fn print_console(config: &Config, comparison: &ComparisonResult) {
    let message = Message::new(comparison);
    let color = message.color(config.thresholds.yellow, config.thresholds.green);

    let status = if comparison.regressed { "✗".red() } else { "✓".green() };
    println!("  {} {}", status, paint(&message.for_console(), color));

    for entry in &comparison.entries {
        println!("    {} {}", entry.path.cyan(), format!("-{}", entry.delta).red());
        if !entry.lost_lines.is_empty() {
            let lines: Vec<String> = entry.lost_lines.iter().map(|n| n.to_string()).collect();
            println!("      {} {}", "lines:".dimmed(), lines.join(", "));
        }
    }

    if comparison.is_unattributed() {
        println!("    {}", UNATTRIBUTED_FALLBACK.yellow());
    }
    if let Some(ref reason) = comparison.detail_unavailable {
        println!("    {} {}", "reason:".dimmed(), reason);
    }
}

fn cmd_inspect(config: &Config, path: &Path) -> Result<()> {
    let report = parse_cobertura(path).with_context(|| format!("Could not parse {}", path.display()))?;

    println!("\n{} {}\n", "📦".cyan(), path.display().to_string().bold());

    if report.is_empty() {
        println!("  {}", "No classes found".dimmed());
        return Ok(());
    }

    for file in report.iter() {
        let pct = file.line_rate * 100.0;
        let color = BadgeColor::classify(pct, config.thresholds.yellow, config.thresholds.green);
        println!(
            "  {} {} {}",
            "•".green(),
            paint(&format!("{:>7.2}%", pct), color),
            file.path
        );
        println!(
            "    {} {}/{}",
            "lines:".dimmed(),
            file.lines_covered(),
            file.lines_total()
        );
    }

    if let Some(aggregate) = report.aggregate() {
        println!(
            "\n  {} {}",
            "Total:".bold(),
            percent::to_whole_no_sign_string(aggregate)
        );
    }

    Ok(())
}

fn paint(text: &str, color: BadgeColor) -> ColoredString {
    match color {
        BadgeColor::Red => text.red(),
        BadgeColor::Yellow => text.yellow(),
        BadgeColor::Green => text.green(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_aggregate() {
        assert!(check_aggregate("--reference-coverage", None).is_ok());
        assert!(check_aggregate("--reference-coverage", Some(0.0)).is_ok());
        assert!(check_aggregate("--reference-coverage", Some(100.0)).is_ok());
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, -1.0, 100.5] {
            assert!(check_aggregate("--candidate-coverage", Some(bad)).is_err(), "{}", bad);
        }
    }
}
