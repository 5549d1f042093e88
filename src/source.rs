//! TypeScript source parsing.
//!
//! Wraps tree-sitter to turn a source file into a [`SourceUnit`] owning the
//! text and the parsed tree. Parse errors are reported to stderr but do not
//! stop the run, since partially broken files can still carry extractable
//! evidence.

use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Tree};

/// One parsed source file.
pub struct SourceUnit {
    pub path: PathBuf,
    pub text: String,
    tree: Tree,
}

impl SourceUnit {
    /// Reads and parses a TypeScript file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(path, text)
    }

    /// Parses TypeScript source text.
    pub fn parse(path: &Path, text: String) -> Result<Self> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
            .context("Failed to load TypeScript grammar")?;
        let tree = parser
            .parse(&text, None)
            .ok_or_else(|| anyhow!("Failed to parse {}", path.display()))?;

        if tree.root_node().has_error() {
            eprintln!("warn: Parse errors in {}", path.display());
        }

        Ok(SourceUnit {
            path: path.to_path_buf(),
            text,
            tree,
        })
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Node text, or empty string for invalid UTF-8 boundaries.
    pub fn text_of(&self, node: Node<'_>) -> &str {
        node.utf8_text(self.text.as_bytes()).unwrap_or("")
    }

    /// Directory containing this file, for resolving relative specifiers.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Whether `name` occurs as an identifier anywhere in the file, skipping
    /// nodes whose byte range is listed in `ignore`.
    ///
    /// Member-access property names are not counted: a fresh top-level
    /// binding cannot collide with `obj.name`.
    pub fn uses_identifier(&self, name: &str, ignore: &[std::ops::Range<usize>]) -> bool {
        let mut found = false;
        walk(self.root(), &mut |node| {
            if found {
                return false;
            }
            if is_identifier_kind(node.kind())
                && self.text_of(node) == name
                && !ignore.iter().any(|r| *r == node.byte_range())
            {
                found = true;
            }
            true
        });
        found
    }
}

/// Identifier node kinds that occupy the file's binding namespace.
fn is_identifier_kind(kind: &str) -> bool {
    matches!(
        kind,
        "identifier" | "type_identifier" | "shorthand_property_identifier"
    )
}

/// Preorder traversal. The callback returns whether to descend into the
/// node's children.
pub fn walk<'a>(node: Node<'a>, visit: &mut impl FnMut(Node<'a>) -> bool) {
    if !visit(node) {
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, visit);
    }
}

/// Unquoted value of a `string` literal node.
pub fn string_value<'a>(node: Node<'a>, text: &'a str) -> &'a str {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "string_fragment" {
            return child.utf8_text(text.as_bytes()).unwrap_or("");
        }
    }
    ""
}

/// Converts a byte offset into a 1-indexed `(line, column)` pair.
pub fn offset_to_line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;
    for (i, c) in source.char_indices() {
        if i >= offset {
            break;
        }
        if c == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

/// Normalizes a module specifier for equality comparison.
///
/// Relative specifiers are resolved against `dir` and canonicalized
/// component-by-component; `.ts`/`.js` extensions are stripped so `./x`,
/// `./x.ts` and the full path of `x` compare equal. Bare specifiers are
/// returned unchanged.
pub fn normalize_specifier(specifier: &str, dir: &Path) -> String {
    if !specifier.starts_with("./") && !specifier.starts_with("../") {
        return specifier.to_string();
    }

    let joined = dir.join(specifier);
    let mut parts: Vec<String> = Vec::new();
    for component in joined.components() {
        use std::path::Component;
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.last().is_some_and(|p| p != "..") {
                    parts.pop();
                } else {
                    parts.push("..".into());
                }
            }
            other => parts.push(other.as_os_str().to_string_lossy().into_owned()),
        }
    }

    let mut normalized = parts.join("/");
    for ext in [".ts", ".js"] {
        if let Some(stripped) = normalized.strip_suffix(ext) {
            normalized = stripped.to_string();
            break;
        }
    }
    normalized
}

/// Writes a relative module specifier for importing `to` from a file in
/// `from_dir`. The `.ts` extension is dropped and same-directory targets get
/// an explicit `./` prefix.
pub fn relative_specifier(from_dir: &Path, to: &Path) -> String {
    let from: Vec<_> = from_dir.components().collect();
    let to_parts: Vec<_> = to.components().collect();

    let mut common = 0;
    while common < from.len()
        && common + 1 < to_parts.len()
        && from[common] == to_parts[common]
    {
        common += 1;
    }

    let mut parts: Vec<String> = Vec::new();
    for _ in common..from.len() {
        parts.push("..".into());
    }
    for component in &to_parts[common..] {
        parts.push(component.as_os_str().to_string_lossy().into_owned());
    }

    let mut specifier = parts.join("/");
    if let Some(stripped) = specifier.strip_suffix(".ts") {
        specifier = stripped.to_string();
    }
    if !specifier.starts_with("../") {
        specifier = format!("./{specifier}");
    }
    specifier
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(text: &str) -> SourceUnit {
        SourceUnit::parse(Path::new("app/test.ts"), text.to_string()).unwrap()
    }

    #[test]
    fn parses_valid_typescript() {
        let u = unit("const x: number = 1;\n");
        assert!(!u.root().has_error());
        assert_eq!(u.root().kind(), "program");
    }

    #[test]
    fn finds_used_identifier() {
        let u = unit("const Config = 1;\nconsole.log(Config);\n");
        assert!(u.uses_identifier("Config", &[]));
        assert!(!u.uses_identifier("Other", &[]));
    }

    #[test]
    fn property_names_do_not_count_as_usage() {
        let u = unit("window.Config = 1;\n");
        assert!(!u.uses_identifier("Config", &[]));
    }

    #[test]
    fn ignore_list_skips_nodes() {
        let text = "import { Config } from './a';\n";
        let u = unit(text);
        let start = text.find("Config").unwrap();
        assert!(u.uses_identifier("Config", &[]));
        assert!(!u.uses_identifier("Config", &[start..start + 6]));
    }

    #[test]
    fn type_positions_count_as_usage() {
        let u = unit("let c: Config;\n");
        assert!(u.uses_identifier("Config", &[]));
    }

    #[test]
    fn string_value_unquotes() {
        let text = "import x from 'some-module';\n";
        let u = unit(text);
        let mut found = None;
        walk(u.root(), &mut |n| {
            if n.kind() == "string" {
                found = Some(string_value(n, &u.text).to_string());
            }
            true
        });
        assert_eq!(found.as_deref(), Some("some-module"));
    }

    #[test]
    fn offset_to_line_col_counts_lines() {
        let source = "ab\ncd\nef";
        assert_eq!(offset_to_line_col(source, 0), (1, 1));
        assert_eq!(offset_to_line_col(source, 3), (2, 1));
        assert_eq!(offset_to_line_col(source, 7), (3, 2));
    }

    #[test]
    fn normalize_resolves_relative_specifiers() {
        let dir = Path::new("src/app");
        assert_eq!(normalize_specifier("./x", dir), "src/app/x");
        assert_eq!(normalize_specifier("../shared/y.ts", dir), "src/shared/y");
        assert_eq!(normalize_specifier("./sub/../x.js", dir), "src/app/x");
    }

    #[test]
    fn relative_specifier_same_directory() {
        assert_eq!(
            relative_specifier(Path::new("src/app"), Path::new("src/app/gesture-config.ts")),
            "./gesture-config"
        );
    }

    #[test]
    fn relative_specifier_walks_up() {
        assert_eq!(
            relative_specifier(Path::new("src/app/feature"), Path::new("src/app/gesture-config.ts")),
            "../gesture-config"
        );
        assert_eq!(
            relative_specifier(Path::new("src/a"), Path::new("src/b/config.ts")),
            "../b/config"
        );
    }

    #[test]
    fn relative_specifier_round_trips_through_normalize() {
        let spec = relative_specifier(Path::new("src/app"), Path::new("src/gesture-config.ts"));
        assert_eq!(spec, "../gesture-config");
        assert_eq!(normalize_specifier(&spec, Path::new("src/app")), "src/gesture-config");
    }

    #[test]
    fn normalize_leaves_bare_specifiers_alone() {
        let dir = Path::new("src/app");
        assert_eq!(normalize_specifier("hammerjs", dir), "hammerjs");
        assert_eq!(
            normalize_specifier("@angular/material/core", dir),
            "@angular/material/core"
        );
    }
}
