//! Markup template scanning.
//!
//! Parses HTML templates with tree-sitter and looks for event-binding
//! attributes belonging to the two configured legacy event sets. The scan
//! only gathers evidence; it never mutates the tree. Also locates `<script>`
//! tags that load the legacy library, for markup-side pruning.

use crate::config::{EventKind, LegacyApi};
use anyhow::{Context, Result, anyhow};
use std::ops::Range;
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Tree};

/// One parsed markup document.
pub struct MarkupDoc {
    pub path: PathBuf,
    pub text: String,
    tree: Tree,
}

impl MarkupDoc {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(path, text)
    }

    pub fn parse(path: &Path, text: String) -> Result<Self> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_html::LANGUAGE.into())
            .context("Failed to load HTML grammar")?;
        let tree = parser
            .parse(&text, None)
            .ok_or_else(|| anyhow!("Failed to parse {}", path.display()))?;
        Ok(MarkupDoc {
            path: path.to_path_buf(),
            text,
            tree,
        })
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn text_of(&self, node: Node<'_>) -> &str {
        node.utf8_text(self.text.as_bytes()).unwrap_or("")
    }
}

/// Which legacy event bindings a template uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TemplateUsage {
    pub standard_events: bool,
    pub custom_events: bool,
}

impl TemplateUsage {
    pub fn any(&self) -> bool {
        self.standard_events || self.custom_events
    }

    pub fn merge(&mut self, other: TemplateUsage) {
        self.standard_events |= other.standard_events;
        self.custom_events |= other.custom_events;
    }
}

/// Recursive attribute scan over a markup tree.
///
/// Once evidence for both event sets has been seen there is nothing left to
/// learn, so traversal stops descending; `visited` records how many nodes
/// were actually entered.
pub struct TemplateScanner<'a> {
    api: &'a LegacyApi,
    pub usage: TemplateUsage,
    pub visited: usize,
}

impl<'a> TemplateScanner<'a> {
    pub fn new(api: &'a LegacyApi) -> Self {
        TemplateScanner {
            api,
            usage: TemplateUsage::default(),
            visited: 0,
        }
    }

    pub fn scan(&mut self, doc: &MarkupDoc) -> TemplateUsage {
        self.visit(doc.root(), &doc.text);
        self.usage
    }

    fn complete(&self) -> bool {
        self.usage.standard_events && self.usage.custom_events
    }

    fn visit(&mut self, node: Node<'_>, text: &str) {
        self.visited += 1;

        if node.kind() == "attribute" {
            if let Some(name) = attribute_name(node, text) {
                match self.api.classify_binding(name) {
                    Some(EventKind::Standard) => self.usage.standard_events = true,
                    Some(EventKind::Custom) => self.usage.custom_events = true,
                    None => {}
                }
            }
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if self.complete() {
                break;
            }
            self.visit(child, text);
        }
    }
}

fn attribute_name<'t>(attribute: Node<'_>, text: &'t str) -> Option<&'t str> {
    let mut cursor = attribute.walk();
    let name = attribute
        .children(&mut cursor)
        .find(|c| c.kind() == "attribute_name")?;
    name.utf8_text(text.as_bytes()).ok()
}

/// Byte ranges of `<script>` elements whose `src` loads the legacy library.
pub fn legacy_script_ranges(doc: &MarkupDoc, api: &LegacyApi) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    collect_scripts(doc.root(), doc, api, &mut ranges);
    ranges
}

fn collect_scripts(
    node: Node<'_>,
    doc: &MarkupDoc,
    api: &LegacyApi,
    ranges: &mut Vec<Range<usize>>,
) {
    if node.kind() == "script_element" && script_loads_library(node, doc, api) {
        ranges.push(node.byte_range());
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_scripts(child, doc, api, ranges);
    }
}

fn script_loads_library(script: Node<'_>, doc: &MarkupDoc, api: &LegacyApi) -> bool {
    let mut cursor = script.walk();
    let Some(start_tag) = script.children(&mut cursor).find(|c| c.kind() == "start_tag") else {
        return false;
    };
    let mut tag_cursor = start_tag.walk();
    for child in start_tag.children(&mut tag_cursor) {
        if child.kind() != "attribute" {
            continue;
        }
        if attribute_name(child, &doc.text) != Some("src") {
            continue;
        }
        // The whole attribute text is enough; quote style varies.
        if doc.text_of(child).contains(&api.library_module) {
            return true;
        }
    }
    false
}
