//! Per-file import bookkeeping.
//!
//! The single source of truth for what every file's imports will look like
//! after the migration, while the files themselves stay untouched. Import
//! declarations are analyzed lazily and exactly once per file; engine
//! requests mutate the in-memory records, and one deferred [`commit`] pass
//! prints the accumulated changes into the [`ChangeSet`].
//!
//! [`commit`]: ImportManager::commit

use crate::changes::ChangeSet;
use crate::source::{SourceUnit, normalize_specifier, string_value};
use anyhow::{Result, bail};
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::path::{Path, PathBuf};

/// One named binding inside an import's brace clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specifier {
    pub local_name: String,
    /// Set only when the binding is aliased (`original as local`).
    pub original_name: Option<String>,
}

impl Specifier {
    /// The exported name this specifier binds, aliased or not.
    pub fn bound_name(&self) -> &str {
        self.original_name.as_deref().unwrap_or(&self.local_name)
    }

    fn print(&self) -> String {
        match &self.original_name {
            Some(original) => format!("{} as {}", original, self.local_name),
            None => self.local_name.clone(),
        }
    }
}

/// How an import declaration binds its module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingForm {
    /// `import 'm';`
    SideEffect,
    /// `import name from 'm';`
    Default(String),
    /// `import * as name from 'm';`
    Namespace(String),
    /// `import { a, b as c } from 'm';`
    Named(Vec<Specifier>),
}

/// One analyzed (or newly created) import declaration.
#[derive(Debug, Clone)]
pub struct ImportRecord {
    /// Module specifier as written in the source.
    pub module: String,
    /// Specifier normalized against the importing file's directory.
    pub normalized: String,
    /// Whole-statement span. Empty for records created in this run.
    pub decl_range: Range<usize>,
    /// Span of the named-bindings brace clause, when present.
    pub clause_range: Option<Range<usize>>,
    pub form: BindingForm,
    pub type_only: bool,
    added: bool,
    modified: bool,
    deleted: bool,
}

impl ImportRecord {
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn is_added(&self) -> bool {
        self.added
    }

    fn untouched(&self) -> bool {
        !self.added && !self.modified && !self.deleted
    }

    fn print(&self) -> String {
        let type_kw = if self.type_only { "type " } else { "" };
        match &self.form {
            BindingForm::SideEffect => format!("import '{}';", self.module),
            BindingForm::Default(name) => {
                format!("import {type_kw}{} from '{}';", name, self.module)
            }
            BindingForm::Namespace(name) => {
                format!("import {type_kw}* as {} from '{}';", name, self.module)
            }
            BindingForm::Named(specs) => {
                format!(
                    "import {type_kw}{} from '{}';",
                    print_clause(specs),
                    self.module
                )
            }
        }
    }
}

fn print_clause(specs: &[Specifier]) -> String {
    let list: Vec<String> = specs.iter().map(Specifier::print).collect();
    format!("{{ {} }}", list.join(", "))
}

/// Where an identifier's binding comes from, per the import table.
#[derive(Debug, Clone)]
pub struct BindingInfo {
    pub module: String,
    pub normalized: String,
    pub decl_range: Range<usize>,
    /// Exported name behind the local binding (differs when aliased).
    pub bound_name: String,
}

#[derive(Debug, Default)]
struct FileImports {
    text: String,
    records: Vec<ImportRecord>,
    generated: HashSet<String>,
}

/// A whole-declaration edit that shifts line numbers below it.
#[derive(Debug, Clone, Copy)]
struct LineShift {
    offset: usize,
    delta: isize,
}

/// Lazily analyzed, mutate-then-commit import model for a migration run.
#[derive(Debug, Default)]
pub struct ImportManager {
    files: HashMap<PathBuf, FileImports>,
    shifts: HashMap<PathBuf, Vec<LineShift>>,
}

impl ImportManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyzes `unit`'s top-level import declarations, once. Idempotent;
    /// later calls return the cached records, mutations included.
    pub fn analyze(&mut self, unit: &SourceUnit) -> &[ImportRecord] {
        &self.file_mut(unit).records
    }

    /// Cache entry for `unit`, analyzed on first access.
    fn file_mut(&mut self, unit: &SourceUnit) -> &mut FileImports {
        self.files
            .entry(unit.path.clone())
            .or_insert_with(|| FileImports {
                text: unit.text.clone(),
                records: analyze_unit(unit),
                generated: HashSet::new(),
            })
    }

    /// Resolves a local identifier to the import that binds it, if any.
    ///
    /// This is the whole reference resolver the engine needs: every symbol
    /// it classifies is either bound by an import or irrelevant.
    pub fn binding_of(&mut self, unit: &SourceUnit, local: &str) -> Option<BindingInfo> {
        for record in self.analyze(unit) {
            let bound = match &record.form {
                BindingForm::Default(name) | BindingForm::Namespace(name) if name == local => {
                    Some(local.to_string())
                }
                BindingForm::Named(specs) => specs
                    .iter()
                    .find(|s| s.local_name == local)
                    .map(|s| s.bound_name().to_string()),
                _ => None,
            };
            if let Some(bound_name) = bound {
                return Some(BindingInfo {
                    module: record.module.clone(),
                    normalized: record.normalized.clone(),
                    decl_range: record.decl_range.clone(),
                    bound_name,
                });
            }
        }
        None
    }

    /// Removes the one specifier binding `symbol` from the import of
    /// `module`. An emptied record is marked deleted, otherwise modified.
    /// No-op when nothing matches.
    pub fn delete_specifier(&mut self, unit: &SourceUnit, symbol: &str, module: &str) {
        let normalized = normalize_specifier(module, unit.dir());
        let file = self.file_mut(unit);
        for record in &mut file.records {
            if record.normalized != normalized {
                continue;
            }
            let BindingForm::Named(specs) = &mut record.form else {
                continue;
            };
            let Some(index) = specs.iter().position(|s| s.bound_name() == symbol) else {
                continue;
            };
            specs.remove(index);
            if specs.is_empty() {
                record.deleted = true;
            } else {
                record.modified = true;
            }
            return;
        }
    }

    /// Marks the import declaration spanning `decl_range` deleted outright.
    /// No-op when nothing matches.
    pub fn delete_by_declaration(&mut self, unit: &SourceUnit, decl_range: &Range<usize>) {
        let file = self.file_mut(unit);
        if let Some(record) = file
            .records
            .iter_mut()
            .find(|r| !r.added && r.decl_range == *decl_range)
        {
            record.deleted = true;
        }
    }

    /// Makes `symbol` (or the module's default export, when `None`)
    /// importable in `unit` and returns the expression to use at the call
    /// site. The returned text is not necessarily `symbol`: an existing
    /// namespace import yields a property access, and colliding names get a
    /// numeric suffix.
    ///
    /// Identifiers whose byte ranges appear in `ignore` are skipped during
    /// collision scanning; they belong to bindings being deleted in this
    /// same run.
    pub fn add_symbol(
        &mut self,
        unit: &SourceUnit,
        symbol: Option<&str>,
        module: &str,
        type_only: bool,
        ignore: &[Range<usize>],
    ) -> String {
        let normalized = normalize_specifier(module, unit.dir());
        let file = self.file_mut(unit);

        enum Action<'a> {
            Existing(String),
            Extend(usize, &'a str),
            Create,
        }

        let mut action = Action::Create;
        for (index, record) in file.records.iter().enumerate() {
            if record.normalized != normalized {
                continue;
            }
            match (&record.form, symbol) {
                (BindingForm::Default(name), None) if !record.deleted => {
                    action = Action::Existing(name.clone());
                    break;
                }
                // A namespace import only carries values; a type-only
                // request must fall through to a named import.
                (BindingForm::Namespace(name), Some(s)) if !type_only && !record.deleted => {
                    action = Action::Existing(format!("{name}.{s}"));
                    break;
                }
                (BindingForm::Named(specs), Some(s)) => {
                    if !record.deleted
                        && let Some(existing) = specs.iter().find(|sp| sp.bound_name() == s)
                    {
                        action = Action::Existing(existing.local_name.clone());
                        break;
                    }
                    // Module specifiers are not guaranteed unique across
                    // records; keep the first candidate but keep looking
                    // for an exact binding.
                    if matches!(action, Action::Create) {
                        action = Action::Extend(index, s);
                    }
                }
                _ => {}
            }
        }

        match action {
            Action::Existing(expr) => expr,
            Action::Extend(index, requested) => {
                let local = unique_identifier(file, unit, requested, ignore);
                let record = &mut file.records[index];
                if let BindingForm::Named(specs) = &mut record.form {
                    specs.push(Specifier {
                        local_name: local.clone(),
                        original_name: (local != requested).then(|| requested.to_string()),
                    });
                }
                record.modified = true;
                // A record slated for removal is reused instead of creating
                // a duplicate import from the same module.
                record.deleted = false;
                local
            }
            Action::Create => {
                let requested = symbol.unwrap_or("defaultExport");
                let local = unique_identifier(file, unit, requested, ignore);
                let form = match symbol {
                    Some(s) => BindingForm::Named(vec![Specifier {
                        local_name: local.clone(),
                        original_name: (local != s).then(|| s.to_string()),
                    }]),
                    None => BindingForm::Default(local.clone()),
                };
                file.records.push(ImportRecord {
                    module: module.to_string(),
                    normalized,
                    decl_range: 0..0,
                    clause_range: None,
                    form,
                    type_only,
                    added: true,
                    modified: false,
                    deleted: false,
                });
                local
            }
        }
    }

    /// Prints every accumulated change into `changes`. One-shot: the record
    /// cache is drained, so a second call is a no-op and later mutations
    /// cannot target committed files.
    pub fn commit(&mut self, changes: &mut ChangeSet) -> Result<()> {
        let files = std::mem::take(&mut self.files);
        for (path, file) in files {
            if file.records.iter().all(ImportRecord::untouched) {
                continue;
            }

            // New imports land right after the last import left untouched,
            // as close to the existing block as possible.
            let anchor = file
                .records
                .iter()
                .filter(|r| r.untouched())
                .map(|r| r.decl_range.end)
                .max()
                .unwrap_or(0);

            let mut shifts = Vec::new();
            for record in &file.records {
                match (record.added, record.deleted) {
                    (false, true) => {
                        let span = full_line_span(&file.text, &record.decl_range);
                        shifts.push(LineShift {
                            offset: span.start,
                            delta: -1,
                        });
                        changes.remove(&path, span);
                    }
                    (true, false) => {
                        let decl = record.print();
                        if anchor == 0 {
                            changes.insert_left(&path, 0, format!("{decl}\n"));
                        } else {
                            changes.insert_right(&path, anchor, format!("\n{decl}"));
                        }
                        shifts.push(LineShift {
                            offset: anchor,
                            delta: 1,
                        });
                    }
                    (false, false) if record.modified => {
                        let (BindingForm::Named(specs), Some(clause)) =
                            (&record.form, &record.clause_range)
                        else {
                            bail!(
                                "internal: modified import without a named clause in {}",
                                path.display()
                            );
                        };
                        // Only the brace clause is reprinted, keeping the
                        // rest of the statement's text untouched.
                        changes.replace(&path, clause.clone(), print_clause(specs));
                    }
                    (false, false) => {}
                    (true, true) => {
                        bail!(
                            "internal: import record both added and deleted in {}",
                            path.display()
                        );
                    }
                }
            }
            self.shifts.insert(path, shifts);
        }
        Ok(())
    }

    /// Adjusts a pre-commit line number for the whole-declaration edits that
    /// landed before `offset` in the same file. In-place clause edits do not
    /// shift lines.
    pub fn correct_line(&self, path: &Path, offset: usize, line: usize) -> usize {
        let Some(shifts) = self.shifts.get(path) else {
            return line;
        };
        let delta: isize = shifts
            .iter()
            .filter(|s| s.offset < offset)
            .map(|s| s.delta)
            .sum();
        line.saturating_add_signed(delta).max(1)
    }
}

/// First of `base`, `base_1`, `base_2`, … that neither occurs in the file
/// (outside `ignore`) nor was already handed out for it.
fn unique_identifier(
    file: &mut FileImports,
    unit: &SourceUnit,
    base: &str,
    ignore: &[Range<usize>],
) -> String {
    let mut candidate = base.to_string();
    let mut counter = 0usize;
    loop {
        if !file.generated.contains(&candidate) && !unit.uses_identifier(&candidate, ignore) {
            file.generated.insert(candidate.clone());
            return candidate;
        }
        counter += 1;
        candidate = format!("{base}_{counter}");
    }
}

/// Extends a declaration span over its whole line, trailing newline
/// included.
fn full_line_span(text: &str, range: &Range<usize>) -> Range<usize> {
    let start = text[..range.start].rfind('\n').map_or(0, |i| i + 1);
    let end = text[range.end..]
        .find('\n')
        .map_or(text.len(), |i| range.end + i + 1);
    start..end
}

fn analyze_unit(unit: &SourceUnit) -> Vec<ImportRecord> {
    let mut records = Vec::new();
    let root = unit.root();
    let mut cursor = root.walk();
    for stmt in root.named_children(&mut cursor) {
        if stmt.kind() != "import_statement" {
            continue;
        }
        let Some(source) = stmt.child_by_field_name("source") else {
            continue;
        };
        let module = string_value(source, &unit.text).to_string();
        let normalized = normalize_specifier(&module, unit.dir());

        let mut type_only = false;
        let mut clause = None;
        let mut stmt_cursor = stmt.walk();
        for child in stmt.children(&mut stmt_cursor) {
            match child.kind() {
                "type" => type_only = true,
                "import_clause" => clause = Some(child),
                _ => {}
            }
        }

        let mut clause_range = None;
        let form = match clause {
            None => BindingForm::SideEffect,
            Some(clause) => {
                let mut form = BindingForm::SideEffect;
                let mut clause_cursor = clause.walk();
                for part in clause.named_children(&mut clause_cursor) {
                    match part.kind() {
                        "identifier" => {
                            form = BindingForm::Default(unit.text_of(part).to_string());
                        }
                        "namespace_import" => {
                            let mut ns_cursor = part.walk();
                            if let Some(name) = part
                                .named_children(&mut ns_cursor)
                                .find(|c| c.kind() == "identifier")
                            {
                                form = BindingForm::Namespace(unit.text_of(name).to_string());
                            }
                        }
                        "named_imports" => {
                            clause_range = Some(part.byte_range());
                            let mut specs = Vec::new();
                            let mut named_cursor = part.walk();
                            for spec in part.named_children(&mut named_cursor) {
                                if spec.kind() != "import_specifier" {
                                    continue;
                                }
                                let Some(name) = spec.child_by_field_name("name") else {
                                    continue;
                                };
                                let alias = spec.child_by_field_name("alias");
                                let local = alias.unwrap_or(name);
                                specs.push(Specifier {
                                    local_name: unit.text_of(local).to_string(),
                                    original_name: alias
                                        .map(|_| unit.text_of(name).to_string()),
                                });
                            }
                            form = BindingForm::Named(specs);
                        }
                        _ => {}
                    }
                }
                form
            }
        };

        records.push(ImportRecord {
            module,
            normalized,
            decl_range: stmt.byte_range(),
            clause_range,
            form,
            type_only,
            added: false,
            modified: false,
            deleted: false,
        });
    }
    records
}
