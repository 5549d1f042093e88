//! gesture-migrate: Detect and migrate deprecated HammerJS gesture setup
//! in Angular projects.
//!
//! This tool scans target directories for the deprecated gesture integration
//! (config class imports, provider wiring, template event bindings, runtime
//! usage of the global), decides a migration strategy per target, and
//! reports or applies the resulting rewrites.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use gesture_migrate::aggregate::{WorkspaceSummary, aggregate};
use gesture_migrate::changes::ChangeSet;
use gesture_migrate::cli::{Args, Commands};
use gesture_migrate::config::LegacyApi;
use gesture_migrate::engine::{Severity, Strategy, TargetOutcome, run_target};
use gesture_migrate::project::collect_targets;
use serde::Serialize;
use std::path::PathBuf;

/// Everything one run decided, for reporting.
#[derive(Debug, Serialize)]
struct DetectionResult {
    targets: Vec<TargetReport>,
    workspace: WorkspaceSummary,
}

#[derive(Debug, Serialize)]
struct TargetReport {
    #[serde(flatten)]
    outcome: TargetOutcome,
    files_changed: Vec<PathBuf>,
    files_created: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Commands::Detect {
            paths,
            exclude,
            no_default_excludes,
            json,
            verbose,
        } => cmd_detect(paths, exclude, no_default_excludes, json, verbose),
        Commands::Migrate {
            write,
            interactive,
            paths,
            exclude,
            no_default_excludes,
            verbose,
        } => cmd_migrate(write, interactive, paths, exclude, no_default_excludes, verbose),
        Commands::Scan {
            paths,
            exclude,
            no_default_excludes,
        } => cmd_scan(paths, exclude, no_default_excludes),
    }
}

/// Runs detection and aggregation over every target, filling `changes` with
/// the proposed edits.
fn run_pipeline(
    paths: Option<Vec<PathBuf>>,
    exclude: &[String],
    no_default_excludes: bool,
    verbose: bool,
    changes: &mut ChangeSet,
) -> Result<DetectionResult> {
    let scan_paths = paths.unwrap_or_else(|| vec![PathBuf::from(".")]);
    let api = LegacyApi::default();

    let targets = collect_targets(&scan_paths, exclude, !no_default_excludes)?;
    if verbose {
        eprintln!(
            "{} Found {} target(s) to migrate",
            "info:".blue().bold(),
            targets.len()
        );
    }

    let mut outcomes = Vec::new();
    for target in &targets {
        let outcome = run_target(&api, target, changes)?;
        if verbose {
            eprintln!(
                "{} {}: {} ({} sources, {} templates)",
                "info:".blue().bold(),
                target.root.display(),
                outcome.strategy.describe(),
                outcome.files_scanned,
                outcome.templates_scanned
            );
        }
        outcomes.push(outcome);
    }

    let workspace = aggregate(&api, &outcomes, changes)?;

    let targets = outcomes
        .into_iter()
        .map(|outcome| {
            let files_changed = changes
                .edited_paths()
                .filter(|p| p.starts_with(&outcome.root))
                .map(PathBuf::from)
                .collect();
            let files_created = changes
                .created_files()
                .filter(|(p, _)| p.starts_with(&outcome.root))
                .map(|(p, _)| PathBuf::from(p))
                .collect();
            TargetReport {
                outcome,
                files_changed,
                files_created,
            }
        })
        .collect();

    Ok(DetectionResult { targets, workspace })
}

fn cmd_detect(
    paths: Option<Vec<PathBuf>>,
    exclude: Vec<String>,
    no_default_excludes: bool,
    json_output: bool,
    verbose: bool,
) -> Result<()> {
    let mut changes = ChangeSet::new();
    let result = run_pipeline(paths, &exclude, no_default_excludes, verbose, &mut changes)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_detection_result(&result);
    }

    Ok(())
}

fn cmd_migrate(
    write: bool,
    interactive: bool,
    paths: Option<Vec<PathBuf>>,
    exclude: Vec<String>,
    no_default_excludes: bool,
    verbose: bool,
) -> Result<()> {
    let mut changes = ChangeSet::new();
    let result = run_pipeline(paths, &exclude, no_default_excludes, verbose, &mut changes)?;

    print_failures(&result);

    if changes.is_empty() {
        println!("{} No changes to apply", "info:".blue().bold());
        return Ok(());
    }

    if interactive {
        let pending: Vec<PathBuf> = changes
            .edited_paths()
            .map(PathBuf::from)
            .chain(changes.created_files().map(|(p, _)| PathBuf::from(p)))
            .collect();
        for path in pending {
            let confirmed = dialoguer::Confirm::new()
                .with_prompt(format!("Apply changes to {}?", path.display()))
                .default(true)
                .interact()?;
            if !confirmed {
                changes.discard(&path);
            }
        }
        if changes.is_empty() {
            println!("{} No changes to apply", "info:".blue().bold());
            return Ok(());
        }
    }

    let label = if write { "Updating:" } else { "Would update:" };
    for path in changes.edited_paths() {
        println!("{} {}", label.yellow().bold(), path.display());
    }
    let label = if write { "Creating:" } else { "Would create:" };
    for (path, _) in changes.created_files() {
        println!("{} {}", label.green().bold(), path.display());
    }

    changes.write(!write)?;

    if !write {
        println!("\n{} Use --write to apply changes", "hint:".cyan().bold());
    }

    Ok(())
}

fn cmd_scan(
    paths: Option<Vec<PathBuf>>,
    exclude: Vec<String>,
    no_default_excludes: bool,
) -> Result<()> {
    let scan_paths = paths.unwrap_or_else(|| vec![PathBuf::from(".")]);
    let targets = collect_targets(&scan_paths, &exclude, !no_default_excludes)?;

    for target in &targets {
        println!(
            "{} ({} sources, {} templates):",
            target.root.display(),
            target.sources.len(),
            target.templates.len()
        );
        for file in target.sources.iter().chain(&target.templates) {
            println!("  {}", file.display());
        }
    }

    Ok(())
}

fn print_detection_result(result: &DetectionResult) {
    for report in &result.targets {
        println!(
            "\n{} {}",
            report.outcome.root.display().to_string().bold(),
            format!("({})", strategy_name(report.outcome.strategy)).dimmed()
        );
        println!("  {}", report.outcome.strategy.describe());

        for path in &report.files_changed {
            println!("  {} {}", "would update:".yellow(), path.display());
        }
        for path in &report.files_created {
            println!("  {} {}", "would create:".green(), path.display());
        }
    }

    print_failures(result);

    if !result.workspace.legacy_needed {
        if result.workspace.packages_edited.is_empty() {
            println!(
                "\n{} The gesture library is no longer needed",
                "ok:".green().bold()
            );
        } else {
            for manifest in &result.workspace.packages_edited {
                println!(
                    "\n{} {} (dropping the gesture library dependency)",
                    "would update:".yellow().bold(),
                    manifest.display()
                );
            }
        }
    }
}

fn print_failures(result: &DetectionResult) {
    for report in &result.targets {
        for failure in &report.outcome.failures {
            let loc = if failure.line > 0 {
                format!("{}:{}:{}", failure.file.display(), failure.line, failure.column)
            } else {
                failure.file.display().to_string()
            };
            let tag = match failure.severity {
                Severity::Info => "info:".blue().bold(),
                Severity::Warning => "warn:".yellow().bold(),
            };
            println!("  {} {} {}", tag, loc.dimmed(), failure.message);
        }
    }
}

fn strategy_name(strategy: Strategy) -> &'static str {
    match strategy {
        Strategy::RemoveConfigOnly => "remove-config-only",
        Strategy::NoChangeAmbiguous => "no-change-ambiguous",
        Strategy::RemoveConfigAndModule => "remove-config-and-module",
        Strategy::RegisterModule => "register-module",
        Strategy::RelocateConfig => "relocate-config",
        Strategy::RemoveEverything => "remove-everything",
    }
}
