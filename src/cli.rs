//! Command-line interface definitions.
//!
//! Defines the argument parser and subcommands using clap's derive API.
//! Each subcommand corresponds to a distinct operation: detecting legacy
//! gesture usage, migrating files, or listing scan targets.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Detect and migrate deprecated HammerJS gesture setup in Angular projects.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan targets and report the migration each of them needs.
    Detect {
        /// Target directories to scan. Defaults to current directory.
        #[arg(short, long)]
        paths: Option<Vec<PathBuf>>,

        /// Glob patterns for directories/files to exclude (e.g., "fixtures", "*.spec.ts").
        /// By default, entries starting with `.` or `_` and build output directories
        /// are excluded.
        #[arg(short, long)]
        exclude: Vec<String>,

        /// Disable the default exclusions.
        #[arg(long)]
        no_default_excludes: bool,

        /// Emit JSON instead of human-readable output.
        #[arg(long)]
        json: bool,

        /// Print additional diagnostics to stderr.
        #[arg(short, long)]
        verbose: bool,
    },

    /// Rewrite files according to the detected migration.
    Migrate {
        /// Actually modify files (default is dry-run).
        #[arg(long)]
        write: bool,

        /// Interactively confirm each file's changes before applying.
        #[arg(short, long)]
        interactive: bool,

        /// Target directories to scan. Defaults to current directory.
        #[arg(short, long)]
        paths: Option<Vec<PathBuf>>,

        /// Glob patterns for directories/files to exclude (e.g., "fixtures", "*.spec.ts").
        /// By default, entries starting with `.` or `_` and build output directories
        /// are excluded.
        #[arg(short, long)]
        exclude: Vec<String>,

        /// Disable the default exclusions.
        #[arg(long)]
        no_default_excludes: bool,

        /// Print additional diagnostics to stderr.
        #[arg(short, long)]
        verbose: bool,
    },

    /// List files that would be scanned without processing them.
    Scan {
        /// Target directories to scan. Defaults to current directory.
        #[arg(short, long)]
        paths: Option<Vec<PathBuf>>,

        /// Glob patterns for directories/files to exclude.
        #[arg(short, long)]
        exclude: Vec<String>,

        /// Disable the default exclusions.
        #[arg(long)]
        no_default_excludes: bool,
    },
}
