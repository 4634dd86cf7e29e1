//! Snapshot rendering helpers.
//!
//! [`markup`] turns a subtree into an indented, tag-per-line text form suitable
//! for snapshot assertions:
//!
//! ```text
//! <le-context name="s">
//!   <div attr:hidden="{s.visible}" hidden>
//!   <span set:text="{s.label}"> "Hello"
//! ```
//!
//! Attributes keep their order; an empty value prints as a bare name; classes
//! print as a `class` attribute; non-empty text follows the tag in quotes.

use std::fmt::Write as _;

use crate::dom::node::{NodeData, NodeId};
use crate::dom::Dom;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Render `node` and its descendants, one line per node, two spaces per level.
///
/// Returns an empty string if `node` does not exist. The last line has no
/// trailing newline.
pub fn markup(dom: &Dom, node: NodeId) -> String {
    let mut lines = Vec::new();
    render(dom, node, 0, &mut lines);
    lines.join("\n")
}

/// Render a single node's opening tag (without children or indentation).
pub fn tag_line(data: &NodeData) -> String {
    let mut line = format!("<{}", data.tag);
    for (name, value) in &data.attributes {
        if value.is_empty() {
            let _ = write!(line, " {name}");
        } else {
            let _ = write!(line, " {name}=\"{value}\"");
        }
    }
    if !data.classes.is_empty() {
        let _ = write!(line, " class=\"{}\"", data.classes.join(" "));
    }
    line.push('>');
    if !data.text.is_empty() {
        let _ = write!(line, " {:?}", data.text);
    }
    line
}

fn render(dom: &Dom, node: NodeId, depth: usize, lines: &mut Vec<String>) {
    let Some(data) = dom.get(node) else {
        return;
    };
    lines.push(format!("{}{}", "  ".repeat(depth), tag_line(data)));
    for &child in dom.children(node) {
        render(dom, child, depth + 1, lines);
    }
}

// ===========================================================================
// Tests
// ===========================================================================
