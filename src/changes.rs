//! Deferred text edits.
//!
//! Syntax-tree byte offsets become stale the moment a file is edited, so no
//! edit is applied while trees are still being traversed. Instead, edits are
//! proposed into a [`ChangeSet`] and materialized in one pass: per file,
//! edits are sorted by position and applied in reverse offset order, which
//! keeps every recorded offset valid.

use anyhow::{Context, Result, bail};
use std::collections::BTreeMap;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Which side of an offset an insertion binds to.
///
/// Two insertions at the same offset keep their proposal order within a
/// side; a `Right` insertion always lands after every `Left` one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Side {
    Left,
    Right,
}

/// A single proposed replacement. Pure insertions have `start == end`,
/// pure removals have empty `text`.
#[derive(Debug, Clone)]
struct TextEdit {
    start: usize,
    end: usize,
    text: String,
    side: Side,
    seq: usize,
}

/// Accumulated edits and file creations for a whole migration run.
#[derive(Debug, Default)]
pub struct ChangeSet {
    edits: BTreeMap<PathBuf, Vec<TextEdit>>,
    created: BTreeMap<PathBuf, String>,
    seq: usize,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules removal of `range` in `path`.
    pub fn remove(&mut self, path: &Path, range: Range<usize>) {
        self.push(path, range, String::new(), Side::Left);
    }

    /// Schedules replacement of `range` with `text`.
    pub fn replace(&mut self, path: &Path, range: Range<usize>, text: impl Into<String>) {
        self.push(path, range, text.into(), Side::Left);
    }

    /// Schedules an insertion that lands before anything else proposed at
    /// `offset`.
    pub fn insert_left(&mut self, path: &Path, offset: usize, text: impl Into<String>) {
        self.push(path, offset..offset, text.into(), Side::Left);
    }

    /// Schedules an insertion that lands after anything else proposed at
    /// `offset`.
    pub fn insert_right(&mut self, path: &Path, offset: usize, text: impl Into<String>) {
        self.push(path, offset..offset, text.into(), Side::Right);
    }

    fn push(&mut self, path: &Path, range: Range<usize>, text: String, side: Side) {
        self.seq += 1;
        self.edits.entry(path.to_path_buf()).or_default().push(TextEdit {
            start: range.start,
            end: range.end,
            text,
            side,
            seq: self.seq,
        });
    }

    /// Registers a brand-new file. Callers pick a non-colliding path up
    /// front (see [`available_path`]) so the name can be referenced by other
    /// edits in the same run.
    pub fn create(&mut self, path: &Path, contents: impl Into<String>) {
        self.created.insert(path.to_path_buf(), contents.into());
    }

    /// Drops everything pending for `path`. Used when the user declines a
    /// file in interactive mode.
    pub fn discard(&mut self, path: &Path) {
        self.edits.remove(path);
        self.created.remove(path);
    }

    /// Whether any edit or creation is pending for `path`.
    pub fn touches(&self, path: &Path) -> bool {
        self.edits.contains_key(path) || self.created.contains_key(path)
    }

    /// Paths with pending in-place edits.
    pub fn edited_paths(&self) -> impl Iterator<Item = &Path> {
        self.edits.keys().map(PathBuf::as_path)
    }

    /// Pending file creations as `(path, contents)` pairs.
    pub fn created_files(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.created.iter().map(|(p, c)| (p.as_path(), c.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty() && self.created.is_empty()
    }

    /// Applies every edit recorded for `path` to `content`.
    ///
    /// Edits are applied from the end of the file towards the start so that
    /// earlier spans stay valid. Overlapping removal spans mean the engine
    /// proposed contradictory edits; that is a bug, not a user error.
    pub fn apply_to(&self, path: &Path, content: &str) -> Result<String> {
        let Some(edits) = self.edits.get(path) else {
            return Ok(content.to_string());
        };

        // Ascending application key. Iterated in reverse, this applies span
        // edits before insertions sharing their start offset, so a left
        // insertion at a removed span's start still lands in the output.
        fn rank(edit: &TextEdit) -> u8 {
            if edit.start < edit.end {
                2
            } else if edit.side == Side::Right {
                1
            } else {
                0
            }
        }
        let mut ordered: Vec<&TextEdit> = edits.iter().collect();
        ordered.sort_by_key(|e| (e.start, rank(e), e.seq));

        // A span edit reaching past the start of any later edit means the
        // engine proposed contradictory changes for the same text.
        let mut covered_until = 0usize;
        for edit in &ordered {
            if edit.start < covered_until {
                bail!(
                    "internal: overlapping edits in {} (span ending at {} overlaps edit at {})",
                    path.display(),
                    covered_until,
                    edit.start
                );
            }
            if edit.start < edit.end {
                covered_until = edit.end;
            }
        }

        let mut result = content.to_string();
        for edit in ordered.iter().rev() {
            if edit.end > result.len() {
                bail!(
                    "internal: edit {}..{} out of bounds for {} ({} bytes)",
                    edit.start,
                    edit.end,
                    path.display(),
                    result.len()
                );
            }
            result.replace_range(edit.start..edit.end, &edit.text);
        }

        Ok(result)
    }

    /// Materializes the change set on disk.
    ///
    /// Returns the rewritten `(path, new_content)` pairs. When `dry_run` is
    /// set nothing is written.
    pub fn write(&self, dry_run: bool) -> Result<Vec<(PathBuf, String)>> {
        let mut out = Vec::new();

        for path in self.edits.keys() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let rewritten = self.apply_to(path, &content)?;
            if rewritten != content {
                if !dry_run {
                    std::fs::write(path, &rewritten)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                }
                out.push((path.clone(), rewritten));
            }
        }

        for (path, contents) in &self.created {
            if !dry_run {
                std::fs::write(path, contents)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
            }
            out.push((path.clone(), contents.clone()));
        }

        Ok(out)
    }
}

/// First of `name.ext`, `name-1.ext`, `name-2.ext`, … that does not exist.
pub fn available_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = path.extension().and_then(|s| s.to_str());
    for n in 1.. {
        let name = match ext {
            Some(ext) => format!("{stem}-{n}.{ext}"),
            None => format!("{stem}-{n}"),
        };
        let candidate = path.with_file_name(name);
        if !candidate.exists() {
            return candidate;
        }
    }
    unreachable!()
}
