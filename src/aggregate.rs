//! Workspace-level aggregation of per-target outcomes.
//!
//! The dependency on the legacy library is shared by every target in a
//! workspace, so it can only be dropped once all of them agree it is no
//! longer needed.

use crate::changes::ChangeSet;
use crate::config::LegacyApi;
use crate::engine::TargetOutcome;
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
pub struct WorkspaceSummary {
    /// True when at least one target still uses the library after migration.
    pub legacy_needed: bool,
    /// Manifests from which the dependency was removed.
    pub packages_edited: Vec<PathBuf>,
}

/// Folds per-target outcomes into a workspace verdict and, when the library
/// is unused everywhere, proposes dropping it from each target's manifest.
pub fn aggregate(
    api: &LegacyApi,
    outcomes: &[TargetOutcome],
    changes: &mut ChangeSet,
) -> Result<WorkspaceSummary> {
    let legacy_needed = outcomes.iter().any(|o| o.legacy_needed);
    let mut packages_edited = Vec::new();

    if !legacy_needed {
        for outcome in outcomes {
            let manifest = outcome.root.join("package.json");
            if packages_edited.contains(&manifest) {
                continue;
            }
            if drop_dependency(&manifest, &api.library_module, changes)? {
                packages_edited.push(manifest);
            }
        }
    }

    Ok(WorkspaceSummary {
        legacy_needed,
        packages_edited,
    })
}

/// Removes `name` from the manifest's dependency sections. Returns whether
/// an edit was proposed. A manifest that is missing or does not list the
/// dependency is left alone; one that cannot be parsed is skipped with a
/// warning rather than aborting the run.
fn drop_dependency(manifest: &Path, name: &str, changes: &mut ChangeSet) -> Result<bool> {
    if !manifest.is_file() {
        return Ok(false);
    }
    let text = fs::read_to_string(manifest)
        .with_context(|| format!("failed to read {}", manifest.display()))?;
    let mut json: Value = match serde_json::from_str(&text) {
        Ok(json) => json,
        Err(err) => {
            eprintln!(
                "warning: skipping malformed {}: {err}",
                manifest.display()
            );
            return Ok(false);
        }
    };

    let mut removed = false;
    for section in ["dependencies", "devDependencies"] {
        if let Some(map) = json.get_mut(section).and_then(Value::as_object_mut) {
            removed |= map.remove(name).is_some();
        }
    }
    if !removed {
        return Ok(false);
    }

    let mut rendered = serde_json::to_string_pretty(&json)?;
    rendered.push('\n');
    changes.replace(manifest, 0..text.len(), rendered);
    Ok(true)
}
