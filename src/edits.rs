//! Structural removal utilities.
//!
//! Removing one element from a comma-delimited list, or one node from a
//! markup tree, takes more than deleting the node's own span: the adjacent
//! separator and surrounding whitespace have to go with it or the edited
//! text ends up with a dangling comma or a blank line.

use crate::changes::ChangeSet;
use crate::template::MarkupDoc;
use std::path::Path;
use tree_sitter::Node;

/// Schedules removal of one element from a comma-separated list (array
/// literal, argument list, …).
///
/// The removed span covers the element's leading trivia. When a comma
/// follows the element it is removed too; for a final element the preceding
/// comma goes instead, so the remaining list stays syntactically valid for
/// any element count and position.
pub fn remove_list_element(changes: &mut ChangeSet, path: &Path, element: Node<'_>) {
    let prev = element.prev_sibling();
    let next = element.next_sibling();

    let (start, end) = match (prev, next) {
        // Trailing comma present: take everything from the previous token
        // (separator or opening bracket) up through that comma.
        (Some(prev), Some(next)) if next.kind() == "," => (prev.end_byte(), next.end_byte()),
        (None, Some(next)) if next.kind() == "," => (element.start_byte(), next.end_byte()),
        // Final element: the separator before it has to go.
        (Some(prev), _) if prev.kind() == "," => (prev.start_byte(), element.end_byte()),
        // Sole element.
        (Some(prev), _) => (prev.end_byte(), element.end_byte()),
        (None, _) => (element.start_byte(), element.end_byte()),
    };

    changes.remove(path, start..end);
}

/// Schedules removal of a markup node.
///
/// When only whitespace separates the node from the preceding tag boundary,
/// that whitespace is removed as well so no blank line is left behind. A
/// preceding text sibling with real content is never touched.
pub fn remove_markup_node(changes: &mut ChangeSet, doc: &MarkupDoc, node: Node<'_>) {
    let node_range = node.byte_range();

    let gap_start = match node.prev_sibling() {
        Some(prev) if prev.kind() == "text" => node_range.start,
        Some(prev) => prev.end_byte(),
        None => 0,
    };

    let gap = &doc.text[gap_start..node_range.start];
    let start = if !gap.is_empty() && gap.chars().all(char::is_whitespace) {
        gap_start
    } else {
        node_range.start
    };

    changes.remove(&doc.path, start..node_range.end);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{SourceUnit, walk};
    use std::path::PathBuf;

    fn ts_path() -> PathBuf {
        PathBuf::from("test.ts")
    }

    /// Removes the `index`-th element of the first array literal in `text`
    /// and returns the rewritten source.
    fn remove_array_element(text: &str, index: usize) -> String {
        let unit = SourceUnit::parse(&ts_path(), text.to_string()).unwrap();
        let mut array = None;
        walk(unit.root(), &mut |n| {
            if n.kind() == "array" && array.is_none() {
                array = Some(n);
            }
            true
        });
        let array = array.expect("no array literal in test input");
        let mut cursor = array.walk();
        let element = array
            .named_children(&mut cursor)
            .nth(index)
            .expect("index out of range");

        let mut changes = ChangeSet::new();
        remove_list_element(&mut changes, &ts_path(), element);
        changes.apply_to(&ts_path(), text).unwrap()
    }

    fn array_element_count(text: &str) -> usize {
        let unit = SourceUnit::parse(&ts_path(), text.to_string()).unwrap();
        assert!(!unit.root().has_error(), "result does not parse: {text}");
        let mut count = None;
        walk(unit.root(), &mut |n| {
            if n.kind() == "array" && count.is_none() {
                count = Some(n.named_child_count());
            }
            true
        });
        count.expect("no array literal in result")
    }

    #[test]
    fn removes_middle_element_with_separator() {
        let result = remove_array_element("const x = [a, b, c];", 1);
        assert_eq!(result, "const x = [a, c];");
    }

    #[test]
    fn removes_first_element() {
        let result = remove_array_element("const x = [a, b, c];", 0);
        assert_eq!(result, "const x = [ b, c];");
        assert_eq!(array_element_count(&result), 2);
    }

    #[test]
    fn removes_last_element_and_preceding_comma() {
        let result = remove_array_element("const x = [a, b, c];", 2);
        assert_eq!(result, "const x = [a, b];");
    }

    #[test]
    fn removes_sole_element() {
        let result = remove_array_element("const x = [onlyOne];", 0);
        assert_eq!(result, "const x = [];");
    }

    #[test]
    fn removal_stays_parseable_for_all_positions() {
        for n in 1..=4usize {
            let elements: Vec<String> = (0..n).map(|i| format!("e{i}")).collect();
            let text = format!("const x = [{}];", elements.join(", "));
            for i in 0..n {
                let result = remove_array_element(&text, i);
                assert_eq!(
                    array_element_count(&result),
                    n - 1,
                    "removing index {i} of {text} gave {result}"
                );
                assert!(!result.contains(",]"), "dangling comma in {result}");
            }
        }
    }

    #[test]
    fn multiline_list_keeps_layout() {
        let text = "const providers = [\n  FirstProvider,\n  SecondProvider,\n];\n";
        let result = remove_array_element(text, 1);
        assert_eq!(result, "const providers = [\n  FirstProvider,\n];\n");
    }

    #[test]
    fn multiline_without_trailing_comma() {
        let text = "const providers = [\n  FirstProvider,\n  SecondProvider\n];\n";
        let result = remove_array_element(text, 1);
        assert_eq!(result, "const providers = [\n  FirstProvider\n];\n");
    }

    fn html(text: &str) -> MarkupDoc {
        MarkupDoc::parse(Path::new("test.html"), text.to_string()).unwrap()
    }

    fn remove_first_script(text: &str) -> String {
        let doc = html(text);
        let mut script = None;
        find_kind(doc.root(), "script_element", &mut script);
        let mut changes = ChangeSet::new();
        remove_markup_node(&mut changes, &doc, script.expect("no script element"));
        changes.apply_to(&doc.path, text).unwrap()
    }

    fn find_kind<'a>(node: Node<'a>, kind: &str, out: &mut Option<Node<'a>>) {
        if out.is_some() {
            return;
        }
        if node.kind() == kind {
            *out = Some(node);
            return;
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            find_kind(child, kind, out);
        }
    }

    #[test]
    fn markup_removal_takes_leading_whitespace() {
        let text = "<body>\n  <script src=\"h.js\"></script>\n</body>";
        let result = remove_first_script(text);
        assert_eq!(result, "<body>\n</body>");
    }

    #[test]
    fn markup_removal_leaves_text_sibling_untouched() {
        let text = "<body>hello <script src=\"h.js\"></script></body>";
        let result = remove_first_script(text);
        assert_eq!(result, "<body>hello </body>");
    }

    #[test]
    fn markup_removal_without_surrounding_whitespace() {
        let text = "<body><script src=\"h.js\"></script></body>";
        let result = remove_first_script(text);
        assert_eq!(result, "<body></body>");
    }
}
