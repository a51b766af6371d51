//! The document tree: path resolution, transactional mutation and invariant
//! checks.
//!
//! All structural edits go through [`Document::transaction`]. The closure
//! mutates a scratch copy of the tree; when it succeeds the table-grid and
//! list invariants are re-checked and only then is the copy swapped in and
//! the snapshot [`generation`](Document::generation) bumped. A failed closure
//! or a failed invariant check leaves the document exactly as it was, so no
//! caller can observe a half-applied gesture.

use crate::{
    ElementKind, LeafnotesError, Node, Operation, OperationLog, Path, Point, Result, Selection,
};
use serde::{Deserialize, Serialize};

/// Which end of a node a caret should be placed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Start,
    End,
}

/// A rooted ordered tree of block and inline nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    children: Vec<Node>,
    #[serde(skip)]
    generation: u64,
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Document {
            children,
            generation: 0,
        }
    }

    /// A document holding one empty paragraph.
    pub fn empty() -> Self {
        Self::new(vec![Node::paragraph("")])
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Snapshot counter, bumped by every committed transaction. Paths
    /// captured under an older generation must be re-resolved.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Resolves `path` to a node.
    ///
    /// # Errors
    ///
    /// Returns [`LeafnotesError::InvalidPath`] if the path does not address a
    /// node in this snapshot. The root path addresses no node.
    pub fn get(&self, path: &Path) -> Result<&Node> {
        let (first, rest) = path
            .indices()
            .split_first()
            .ok_or_else(|| LeafnotesError::InvalidPath(path.clone()))?;
        let mut node = self
            .children
            .get(*first)
            .ok_or_else(|| LeafnotesError::InvalidPath(path.clone()))?;
        for &i in rest {
            node = node
                .children()
                .get(i)
                .ok_or_else(|| LeafnotesError::InvalidPath(path.clone()))?;
        }
        Ok(node)
    }

    fn get_mut(&mut self, path: &Path) -> Result<&mut Node> {
        let invalid = || LeafnotesError::InvalidPath(path.clone());
        let (first, rest) = path.indices().split_first().ok_or_else(invalid)?;
        let mut node = self.children.get_mut(*first).ok_or_else(invalid)?;
        for &i in rest {
            node = node
                .as_element_mut()
                .and_then(|el| el.children.get_mut(i))
                .ok_or_else(invalid)?;
        }
        Ok(node)
    }

    pub fn has_path(&self, path: &Path) -> bool {
        self.get(path).is_ok()
    }

    /// Children of the node at `path`; the root path yields the top-level blocks.
    pub fn children_of(&self, path: &Path) -> Result<&[Node]> {
        if path.is_root() {
            return Ok(&self.children);
        }
        match self.get(path)? {
            Node::Element(el) => Ok(&el.children),
            _ => Ok(&[]),
        }
    }

    fn children_of_mut(&mut self, path: &Path) -> Result<&mut Vec<Node>> {
        if path.is_root() {
            return Ok(&mut self.children);
        }
        match self.get_mut(path)? {
            Node::Element(el) => Ok(&mut el.children),
            _ => Err(LeafnotesError::InvalidPath(path.clone())),
        }
    }

    /// Number of siblings (including itself) of the node at `path`.
    pub fn sibling_count(&self, path: &Path) -> usize {
        self.children_of(&path.parent()).map_or(0, <[Node]>::len)
    }

    /// Whether a next sibling of `path` exists in this snapshot.
    pub fn has_next(&self, path: &Path) -> bool {
        path.has_next(self.sibling_count(path))
    }

    /// The node directly preceding `path` among its siblings.
    pub fn previous_sibling(&self, path: &Path) -> Option<(Path, &Node)> {
        let prev = path.previous().ok()?;
        let node = self.get(&prev).ok()?;
        Some((prev, node))
    }

    /// The node directly following `path` among its siblings.
    pub fn next_sibling(&self, path: &Path) -> Option<(Path, &Node)> {
        let next = path.next();
        let node = self.get(&next).ok()?;
        Some((next, node))
    }

    /// Path of the lowest element at or above `path`.
    pub fn enclosing_element(&self, path: &Path) -> Option<Path> {
        let mut current = path.clone();
        while !current.is_root() {
            if matches!(self.get(&current), Ok(Node::Element(_))) {
                return Some(current);
            }
            current = current.parent();
        }
        None
    }

    /// Whether `path` sits among blocks: at the top level, inside a container
    /// holding blocks, or in a list.
    pub fn is_block_position(&self, path: &Path) -> bool {
        path.depth() == 1
            || self
                .get(&path.parent())
                .ok()
                .and_then(Node::kind)
                .is_some_and(|k| k.holds_blocks() || matches!(k, ElementKind::List { .. }))
    }

    /// Concatenated text of the node at `path`.
    pub fn string(&self, path: &Path) -> Result<String> {
        Ok(self.get(path)?.string())
    }

    /// Every node in depth-first document order, paired with its path.
    pub fn descendants(&self) -> Vec<(Path, &Node)> {
        fn walk<'a>(nodes: &'a [Node], base: &Path, out: &mut Vec<(Path, &'a Node)>) {
            for (i, node) in nodes.iter().enumerate() {
                let path = base.child(i);
                out.push((path.clone(), node));
                walk(node.children(), &path, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.children, &Path::root(), &mut out);
        out
    }

    /// The caret position at the given edge of the node at `path`.
    ///
    /// Descends to the first (or last) leaf. File voids yield a node
    /// selection; code blocks yield `None` since their content lives in a
    /// sub-editor rather than the tree.
    pub fn edge_selection(&self, path: &Path, edge: Edge) -> Option<Selection> {
        let mut path = path.clone();
        loop {
            let node = self.get(&path).ok()?;
            match node {
                Node::Media(_) | Node::Attachment(_) => return Some(Selection::node(path)),
                Node::Text(_) | Node::Formula(_) => {
                    let offset = match edge {
                        Edge::Start => 0,
                        Edge::End => node.leaf_len(),
                    };
                    return Some(Selection::caret(path, offset));
                }
                Node::Element(el) => {
                    if matches!(el.kind, ElementKind::Code { .. }) || el.children.is_empty() {
                        return None;
                    }
                    let index = match edge {
                        Edge::Start => 0,
                        Edge::End => el.children.len() - 1,
                    };
                    path = path.child(index);
                }
            }
        }
    }

    /// Whether `point` addresses an existing leaf at a valid char boundary.
    pub fn is_valid_point(&self, point: &Point) -> bool {
        match self.get(&point.path) {
            Ok(Node::Text(t)) => t.text.is_char_boundary(point.offset),
            Ok(Node::Formula(f)) => f.tex.is_char_boundary(point.offset),
            _ => false,
        }
    }

    /// Runs `f` against a scratch copy of the tree and commits its result.
    ///
    /// On success the operations recorded by `f` are appended to `log`.
    ///
    /// # Errors
    ///
    /// Propagates any error from `f`, or returns
    /// [`LeafnotesError::InvariantViolation`] if the resulting tree breaks a
    /// table or list invariant. In both cases the document is unchanged.
    pub fn transaction<T, F>(&mut self, log: &mut OperationLog, f: F) -> Result<T>
    where
        F: FnOnce(&mut Transaction) -> Result<T>,
    {
        let mut tx = Transaction {
            scratch: Document::new(self.children.clone()),
            ops: Vec::new(),
        };
        let value = f(&mut tx)?;
        if tx.ops.is_empty() {
            return Ok(value);
        }
        tx.scratch.validate()?;
        self.children = tx.scratch.children;
        self.generation += 1;
        for op in tx.ops {
            log.log(op);
        }
        log.purge_if_needed();
        Ok(value)
    }

    /// Checks the structural invariants of the whole tree.
    ///
    /// Tables must be non-empty grids of rows with equal cell counts, lists
    /// hold only list items, inline holders hold only inline content, and
    /// structural containers are never empty.
    ///
    /// # Errors
    ///
    /// Returns [`LeafnotesError::InvariantViolation`] naming the first
    /// offending path.
    pub fn validate(&self) -> Result<()> {
        for (i, node) in self.children.iter().enumerate() {
            let path = Path::new(vec![i]);
            if !is_block(node) {
                return Err(violation(&path, "top-level node must be a block"));
            }
            validate_node(node, &path)?;
        }
        Ok(())
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

/// A pending set of structural edits against a scratch copy of the document.
pub struct Transaction {
    scratch: Document,
    ops: Vec<Operation>,
}

impl Transaction {
    /// The tree as it stands with this transaction's edits applied so far.
    pub fn document(&self) -> &Document {
        &self.scratch
    }

    pub fn get(&self, path: &Path) -> Result<&Node> {
        self.scratch.get(path)
    }

    /// Inserts `nodes` as consecutive siblings starting at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`LeafnotesError::InvalidPath`] if the parent does not resolve
    /// or the index is past the end of its children.
    pub fn insert_nodes(&mut self, path: &Path, nodes: Vec<Node>) -> Result<()> {
        let index = path
            .last()
            .ok_or_else(|| LeafnotesError::InvalidPath(path.clone()))?;
        let count = nodes.len();
        let siblings = self.scratch.children_of_mut(&path.parent())?;
        if index > siblings.len() {
            return Err(LeafnotesError::InvalidPath(path.clone()));
        }
        siblings.splice(index..index, nodes);
        self.ops.push(Operation::insert_nodes(path.clone(), count));
        Ok(())
    }

    /// Removes and returns the node at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`LeafnotesError::InvalidPath`] if `path` does not resolve.
    pub fn remove_node(&mut self, path: &Path) -> Result<Node> {
        let index = path
            .last()
            .ok_or_else(|| LeafnotesError::InvalidPath(path.clone()))?;
        let siblings = self.scratch.children_of_mut(&path.parent())?;
        if index >= siblings.len() {
            return Err(LeafnotesError::InvalidPath(path.clone()));
        }
        let node = siblings.remove(index);
        self.ops
            .push(Operation::remove_node(path.clone(), node.clone()));
        Ok(node)
    }

    /// Moves the node at `from` to the slot `to`, where `to` is expressed in
    /// coordinates taken before the move. Returns the node's final path.
    ///
    /// # Errors
    ///
    /// Returns [`LeafnotesError::InvalidMove`] when `to` lies inside the moved
    /// subtree and [`LeafnotesError::InvalidPath`] when either path does not
    /// resolve.
    pub fn move_node(&mut self, from: &Path, to: &Path) -> Result<Path> {
        if from.is_ancestor(to) {
            return Err(LeafnotesError::InvalidMove(format!(
                "cannot move {from} into its own subtree at {to}"
            )));
        }
        let from_index = from
            .last()
            .ok_or_else(|| LeafnotesError::InvalidPath(from.clone()))?;
        let siblings = self.scratch.children_of_mut(&from.parent())?;
        if from_index >= siblings.len() {
            return Err(LeafnotesError::InvalidPath(from.clone()));
        }
        let node = siblings.remove(from_index);
        let target = to
            .transform(&crate::PathOp::Remove { path: from.clone() })
            .ok_or_else(|| LeafnotesError::InvalidPath(to.clone()))?;
        let index = target
            .last()
            .ok_or_else(|| LeafnotesError::InvalidPath(to.clone()))?;
        let siblings = self.scratch.children_of_mut(&target.parent())?;
        if index > siblings.len() {
            return Err(LeafnotesError::InvalidPath(to.clone()));
        }
        siblings.insert(index, node);
        self.ops.push(Operation::move_node(from.clone(), target.clone()));
        Ok(target)
    }
}

fn violation(path: &Path, what: &str) -> LeafnotesError {
    LeafnotesError::InvariantViolation(format!("{what} at {path}"))
}

fn is_inline(node: &Node) -> bool {
    match node {
        Node::Text(_) | Node::Formula(_) | Node::Media(_) | Node::Attachment(_) => true,
        Node::Element(_) => false,
    }
}

fn is_block(node: &Node) -> bool {
    match node {
        Node::Media(_) | Node::Attachment(_) => true,
        Node::Text(_) | Node::Formula(_) => false,
        Node::Element(el) => match el.kind {
            ElementKind::Paragraph
            | ElementKind::Heading { .. }
            | ElementKind::Blockquote
            | ElementKind::List { .. }
            | ElementKind::Table
            | ElementKind::Code { .. } => true,
            ElementKind::ListItem { .. } | ElementKind::TableRow | ElementKind::TableCell { .. } => {
                false
            }
        },
    }
}

fn validate_node(node: &Node, path: &Path) -> Result<()> {
    let Node::Element(el) = node else {
        return Ok(());
    };
    let children = &el.children;
    let all = |pred: fn(&Node) -> bool| children.iter().all(pred);
    match &el.kind {
        ElementKind::Paragraph | ElementKind::Heading { .. } | ElementKind::TableCell { .. } => {
            if children.is_empty() || !all(is_inline) {
                return Err(violation(path, "text block must hold inline content"));
            }
        }
        ElementKind::Blockquote | ElementKind::ListItem { .. } => {
            if children.is_empty() || !all(is_block) {
                return Err(violation(path, "container must hold blocks"));
            }
        }
        ElementKind::List { .. } => {
            if children.is_empty() || !all(Node::is_list_item) {
                return Err(violation(path, "list must hold list items"));
            }
        }
        ElementKind::Table => {
            let is_row = |n: &Node| matches!(n.kind(), Some(ElementKind::TableRow));
            if children.is_empty() || !children.iter().all(is_row) {
                return Err(violation(path, "table must hold rows"));
            }
            let width = children[0].children().len();
            if children.iter().any(|row| row.children().len() != width) {
                return Err(violation(path, "table rows must have equal cell counts"));
            }
        }
        ElementKind::TableRow => {
            if children.is_empty() || !all(Node::is_table_cell) {
                return Err(violation(path, "table row must hold cells"));
            }
        }
        ElementKind::Code { .. } => {
            if !children.is_empty() {
                return Err(violation(path, "code block text belongs to its sub-editor"));
            }
        }
    }
    for (i, child) in children.iter().enumerate() {
        validate_node(child, &path.child(i))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PurgeStrategy;

    fn sample() -> Document {
        Document::new(vec![
            Node::heading(1, "Title"),
            Node::list(
                false,
                vec![
                    Node::list_item(vec![Node::paragraph("one")]),
                    Node::list_item(vec![Node::paragraph("two")]),
                ],
            ),
            Node::table(&[&["a", "b"], &["c", "d"]]),
        ])
    }

    fn log() -> OperationLog {
        OperationLog::new(PurgeStrategy::Unbounded)
    }

    #[test]
    fn test_get_resolves_nested_paths() {
        let doc = sample();
        assert_eq!(doc.string(&Path::new(vec![1, 1])).unwrap(), "two");
        assert_eq!(doc.string(&Path::new(vec![2, 1, 0])).unwrap(), "c");
        let err = doc.get(&Path::new(vec![1, 5])).unwrap_err();
        assert!(matches!(err, LeafnotesError::InvalidPath(_)));
        assert!(doc.get(&Path::root()).is_err());
    }

    #[test]
    fn test_edge_selection_descends_to_leaves() {
        let doc = sample();
        assert_eq!(
            doc.edge_selection(&Path::new(vec![1]), Edge::End),
            Some(Selection::caret(vec![1, 1, 0, 0], 3))
        );
        assert_eq!(
            doc.edge_selection(&Path::new(vec![2]), Edge::Start),
            Some(Selection::caret(vec![2, 0, 0, 0], 0))
        );
        let doc = Document::new(vec![Node::code(None), Node::media("m.png", 1)]);
        assert_eq!(doc.edge_selection(&Path::new(vec![0]), Edge::Start), None);
        assert_eq!(
            doc.edge_selection(&Path::new(vec![1]), Edge::End),
            Some(Selection::node(vec![1]))
        );
    }

    #[test]
    fn test_transaction_commits_and_logs() {
        let mut doc = sample();
        let mut log = log();
        doc.transaction(&mut log, |tx| {
            tx.insert_nodes(&Path::new(vec![3]), vec![Node::paragraph("end")])
        })
        .unwrap();
        assert_eq!(doc.children().len(), 4);
        assert_eq!(doc.generation(), 1);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_failed_transaction_leaves_document_untouched() {
        let mut doc = sample();
        let before = doc.clone();
        let mut log = log();
        let result = doc.transaction(&mut log, |tx| {
            tx.remove_node(&Path::new(vec![0]))?;
            tx.remove_node(&Path::new(vec![9]))
        });
        assert!(result.is_err());
        assert_eq!(doc, before);
        assert_eq!(doc.generation(), 0);
        assert!(log.is_empty());
    }

    #[test]
    fn test_transaction_rejects_ragged_table() {
        let mut doc = sample();
        let mut log = log();
        let result = doc.transaction(&mut log, |tx| tx.remove_node(&Path::new(vec![2, 1, 0])));
        assert!(matches!(result, Err(LeafnotesError::InvariantViolation(_))));
        assert_eq!(doc.get(&Path::new(vec![2, 1])).unwrap().children().len(), 2);
    }

    #[test]
    fn test_move_node_adjusts_for_removal_before_target() {
        let mut doc = Document::new(vec![
            Node::paragraph("a"),
            Node::paragraph("b"),
            Node::paragraph("c"),
        ]);
        let mut log = log();
        let final_path = doc
            .transaction(&mut log, |tx| {
                tx.move_node(&Path::new(vec![0]), &Path::new(vec![3]))
            })
            .unwrap();
        assert_eq!(final_path, Path::new(vec![2]));
        let texts: Vec<String> = doc.children().iter().map(Node::string).collect();
        assert_eq!(texts, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_move_into_own_subtree_is_rejected() {
        let mut doc = sample();
        let mut log = log();
        let result = doc.transaction(&mut log, |tx| {
            tx.move_node(&Path::new(vec![1]), &Path::new(vec![1, 0, 0]))
        });
        assert!(matches!(result, Err(LeafnotesError::InvalidMove(_))));
    }

    #[test]
    fn test_descendants_are_in_document_order() {
        let doc = sample();
        let paths: Vec<Path> = doc.descendants().into_iter().map(|(p, _)| p).collect();
        let mut sorted = paths.clone();
        sorted.sort();
        assert_eq!(paths, sorted);
        assert_eq!(paths[0], Path::new(vec![0]));
        assert_eq!(paths[1], Path::new(vec![0, 0]));
    }
}
