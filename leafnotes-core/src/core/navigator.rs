//! Tree navigation: finding the previous/next caret-enterable unit.
//!
//! A *unit* is a node the caret can land on directly: an element holding
//! inline text (paragraph, heading, table cell), a code block, or a block-level
//! media/attachment void. Structural containers (lists, list items,
//! blockquotes, tables, rows) have no caret position of their own and are
//! descended into.

use crate::{Document, Node, Path};

/// Coarse classification of a node for navigation decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeClass {
    /// Media, attachment or inline formula.
    Void,
    /// A text leaf carrying marks.
    DirtyLeaf,
    /// A plain text leaf.
    Text,
    TableCell,
    CodeBlock,
    /// Any other element.
    Container,
}

/// Classifies the node at `path`, `None` if the path does not resolve.
pub fn classify(doc: &Document, path: &Path) -> Option<NodeClass> {
    let node = doc.get(path).ok()?;
    let class = match node {
        Node::Media(_) | Node::Attachment(_) | Node::Formula(_) => NodeClass::Void,
        Node::Text(_) if node.is_dirty_leaf() => NodeClass::DirtyLeaf,
        Node::Text(_) => NodeClass::Text,
        Node::Element(_) if node.is_table_cell() => NodeClass::TableCell,
        Node::Element(_) if node.is_code_block() => NodeClass::CodeBlock,
        Node::Element(_) => NodeClass::Container,
    };
    Some(class)
}

pub fn is_void(doc: &Document, path: &Path) -> bool {
    classify(doc, path) == Some(NodeClass::Void)
}

pub fn is_dirty_leaf(doc: &Document, path: &Path) -> bool {
    classify(doc, path) == Some(NodeClass::DirtyLeaf)
}

pub fn is_table_cell(doc: &Document, path: &Path) -> bool {
    classify(doc, path) == Some(NodeClass::TableCell)
}

pub fn is_code_block(doc: &Document, path: &Path) -> bool {
    classify(doc, path) == Some(NodeClass::CodeBlock)
}

/// The unit containing `path`: the lowest enterable ancestor-or-self that is
/// not itself inline content. Falls back to `path` for structural nodes.
pub fn unit_of(doc: &Document, path: &Path) -> Path {
    let mut current = path.clone();
    while !current.is_root() {
        let holds_inline = doc
            .get(&current.parent())
            .ok()
            .and_then(Node::kind)
            .is_some_and(|kind| kind.holds_inline());
        if !holds_inline && doc.get(&current).is_ok_and(Node::is_enterable) {
            return current;
        }
        current = current.parent();
    }
    path.clone()
}

/// The next unit after the one containing `path` in document order, or
/// `None` at the end of the document.
pub fn find_next(doc: &Document, path: &Path) -> Option<Path> {
    let mut current = unit_of(doc, path);
    while !current.is_root() {
        match doc.next_sibling(&current) {
            Some((next, node)) => {
                if let Some(found) = first_unit_in(node, &next) {
                    return Some(found);
                }
                current = next;
            }
            None => current = current.parent(),
        }
    }
    None
}

/// The previous unit before the one containing `path` in document order, or
/// `None` at the start of the document.
pub fn find_previous(doc: &Document, path: &Path) -> Option<Path> {
    let mut current = unit_of(doc, path);
    while !current.is_root() {
        match doc.previous_sibling(&current) {
            Some((prev, node)) => {
                if let Some(found) = last_unit_in(node, &prev) {
                    return Some(found);
                }
                current = prev;
            }
            None => current = current.parent(),
        }
    }
    None
}

fn first_unit_in(node: &Node, path: &Path) -> Option<Path> {
    if node.is_enterable() {
        return Some(path.clone());
    }
    node.children()
        .iter()
        .enumerate()
        .find_map(|(i, child)| first_unit_in(child, &path.child(i)))
}

fn last_unit_in(node: &Node, path: &Path) -> Option<Path> {
    if node.is_enterable() {
        return Some(path.clone());
    }
    node.children()
        .iter()
        .enumerate()
        .rev()
        .find_map(|(i, child)| last_unit_in(child, &path.child(i)))
}
