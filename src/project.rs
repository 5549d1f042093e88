//! Project file discovery.
//!
//! Each scan path is one migration target. Walks the target directory for
//! TypeScript sources and HTML templates, skipping entries whose names start
//! with `.` or `_` plus the usual build output directories, with optional
//! user-supplied glob excludes.

use anyhow::Result;
use glob::Pattern;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const SKIPPED_DIRS: &[&str] = &["node_modules", "dist", "out-tsc", "coverage"];

/// Files belonging to one migration target.
#[derive(Debug)]
pub struct Target {
    pub root: PathBuf,
    pub sources: Vec<PathBuf>,
    pub templates: Vec<PathBuf>,
}

/// Collects the source and template files of each target directory.
pub fn collect_targets(
    paths: &[PathBuf],
    exclude: &[String],
    default_excludes: bool,
) -> Result<Vec<Target>> {
    let patterns: Vec<Pattern> = exclude
        .iter()
        .map(|e| Pattern::new(e))
        .collect::<Result<_, _>>()?;

    let mut targets = Vec::new();
    for path in paths {
        let mut sources = Vec::new();
        let mut templates = Vec::new();

        for entry in WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_excluded(e, &patterns, default_excludes))
        {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let file = entry.path();
            if is_source_file(file) {
                sources.push(entry.into_path());
            } else if file.extension().is_some_and(|ext| ext == "html") {
                templates.push(entry.into_path());
            }
        }

        targets.push(Target {
            root: path.clone(),
            sources,
            templates,
        });
    }

    Ok(targets)
}

fn is_source_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(".ts") && !name.ends_with(".d.ts")
}

fn is_excluded(entry: &walkdir::DirEntry, patterns: &[Pattern], default_excludes: bool) -> bool {
    let Some(name) = entry.file_name().to_str() else {
        return true;
    };
    if default_excludes
        && (name.starts_with('.') || name.starts_with('_') || SKIPPED_DIRS.contains(&name))
    {
        // Never skip the scan root itself, whatever it is named.
        return entry.depth() > 0;
    }
    patterns.iter().any(|p| p.matches(name))
}
