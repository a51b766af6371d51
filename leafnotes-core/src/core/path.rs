//! Structural addresses into the document tree.
//!
//! A [`Path`] is the sequence of child indices leading from the document root
//! to a node. Paths are coordinates into one snapshot of the tree: after any
//! structural mutation they must either be re-resolved or carried across the
//! mutation with [`Path::transform`].
//!
//! Ordering follows depth-first document order, so an ancestor sorts before
//! all of its descendants and siblings sort by index.

use crate::{LeafnotesError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A sequence of child indices from the document root to a node.
///
/// The empty path addresses the root itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<usize>);

/// A structural mutation that captured paths may need to be carried across.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathOp {
    /// A node was inserted at `path`, shifting later siblings right.
    Insert { path: Path },
    /// The node at `path` was removed, shifting later siblings left.
    Remove { path: Path },
    /// The node at `from` now lives at `to` (post-move coordinates).
    Move { from: Path, to: Path },
}

impl Path {
    pub fn new(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    /// The path of the document root.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Index of the addressed node among its siblings, `None` for the root.
    pub fn last(&self) -> Option<usize> {
        self.0.last().copied()
    }

    /// Returns the path of the `index`-th child of this node.
    pub fn child(&self, index: usize) -> Path {
        let mut indices = self.0.clone();
        indices.push(index);
        Path(indices)
    }

    /// Appends `suffix` to this path.
    pub fn join(&self, suffix: &[usize]) -> Path {
        let mut indices = self.0.clone();
        indices.extend_from_slice(suffix);
        Path(indices)
    }

    /// Returns the parent path. The root is its own parent.
    pub fn parent(&self) -> Path {
        match self.0.split_last() {
            Some((_, rest)) => Path(rest.to_vec()),
            None => Path::root(),
        }
    }

    /// Returns the path of the previous sibling.
    ///
    /// # Errors
    ///
    /// Returns [`LeafnotesError::NoSibling`] when the node is the first child
    /// of its parent (or is the root).
    pub fn previous(&self) -> Result<Path> {
        match self.0.split_last() {
            Some((&last, rest)) if last > 0 => {
                let mut indices = rest.to_vec();
                indices.push(last - 1);
                Ok(Path(indices))
            }
            _ => Err(LeafnotesError::NoSibling(self.clone())),
        }
    }

    /// Returns the path of the next sibling slot. The slot is not guaranteed
    /// to hold a node; probe with [`Path::has_next`] or the document.
    pub fn next(&self) -> Path {
        match self.0.split_last() {
            Some((&last, rest)) => {
                let mut indices = rest.to_vec();
                indices.push(last + 1);
                Path(indices)
            }
            None => Path::root(),
        }
    }

    pub fn has_previous(&self) -> bool {
        matches!(self.last(), Some(i) if i > 0)
    }

    /// Whether a next sibling exists, given how many children the parent has.
    pub fn has_next(&self, sibling_count: usize) -> bool {
        matches!(self.last(), Some(i) if i + 1 < sibling_count)
    }

    /// Document-order comparison: `Less` means `self` comes before `other`.
    pub fn compare(&self, other: &Path) -> Ordering {
        self.cmp(other)
    }

    /// Whether `self` is a strict ancestor of `other`.
    pub fn is_ancestor(&self, other: &Path) -> bool {
        self.0.len() < other.0.len() && other.0.starts_with(&self.0)
    }

    /// Whether both paths share a parent (a path is its own sibling).
    pub fn is_sibling(&self, other: &Path) -> bool {
        !self.is_root() && !other.is_root() && self.parent() == other.parent()
    }

    /// Whether `self` is the sibling slot directly after `other`.
    pub fn is_next_of(&self, other: &Path) -> bool {
        self.is_sibling(other) && other.last().map(|i| i + 1) == self.last()
    }

    /// Carries this path across a structural mutation.
    ///
    /// Returns `None` when the addressed node (or one of its ancestors) was
    /// removed by the operation.
    pub fn transform(&self, op: &PathOp) -> Option<Path> {
        match op {
            PathOp::Insert { path } => Some(self.shift_for_insert(path)),
            PathOp::Remove { path } => self.shift_for_remove(path),
            PathOp::Move { from, to } => {
                if self == from || from.is_ancestor(self) {
                    return Some(to.join(&self.0[from.depth()..]));
                }
                self.shift_for_remove(from)
                    .map(|p| p.shift_for_insert(to))
            }
        }
    }

    fn shift_for_insert(&self, inserted: &Path) -> Path {
        let Some(at) = inserted.last() else {
            return self.clone();
        };
        let level = inserted.depth() - 1;
        let mut out = self.clone();
        if self.depth() > level
            && self.0[..level] == inserted.0[..level]
            && self.0[level] >= at
        {
            out.0[level] += 1;
        }
        out
    }

    fn shift_for_remove(&self, removed: &Path) -> Option<Path> {
        let at = removed.last()?;
        if self == removed || removed.is_ancestor(self) {
            return None;
        }
        let level = removed.depth() - 1;
        let mut out = self.clone();
        if self.depth() > level
            && self.0[..level] == removed.0[..level]
            && self.0[level] > at
        {
            out.0[level] -= 1;
        }
        Some(out)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl From<Vec<usize>> for Path {
    fn from(indices: Vec<usize>) -> Self {
        Path(indices)
    }
}

impl From<&[usize]> for Path {
    fn from(indices: &[usize]) -> Self {
        Path(indices.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(indices: &[usize]) -> Path {
        Path::from(indices)
    }

    #[test]
    fn test_parent_and_child() {
        assert_eq!(p(&[1, 2, 3]).parent(), p(&[1, 2]));
        assert_eq!(p(&[1, 2]).child(0), p(&[1, 2, 0]));
        assert_eq!(Path::root().parent(), Path::root());
    }

    #[test]
    fn test_previous_fails_on_first_child() {
        assert_eq!(p(&[0, 2]).previous().unwrap(), p(&[0, 1]));
        let err = p(&[0, 0]).previous().unwrap_err();
        assert!(matches!(err, LeafnotesError::NoSibling(_)));
        assert!(Path::root().previous().is_err());
    }

    #[test]
    fn test_sibling_probes() {
        assert!(!p(&[3, 0]).has_previous());
        assert!(p(&[3, 1]).has_previous());
        assert!(p(&[3, 1]).has_next(3));
        assert!(!p(&[3, 2]).has_next(3));
        assert_eq!(p(&[3, 1]).next(), p(&[3, 2]));
    }

    #[test]
    fn test_compare_is_document_order() {
        assert_eq!(p(&[0]).compare(&p(&[0, 5])), Ordering::Less);
        assert_eq!(p(&[0, 5]).compare(&p(&[1])), Ordering::Less);
        assert_eq!(p(&[2, 1]).compare(&p(&[2, 0, 9])), Ordering::Greater);
        assert_eq!(p(&[2, 1]).compare(&p(&[2, 1])), Ordering::Equal);
    }

    #[test]
    fn test_ancestry() {
        assert!(p(&[1]).is_ancestor(&p(&[1, 0, 2])));
        assert!(!p(&[1]).is_ancestor(&p(&[1])));
        assert!(!p(&[1]).is_ancestor(&p(&[2, 0])));
        assert!(Path::root().is_ancestor(&p(&[0])));
        assert!(p(&[4, 2]).is_next_of(&p(&[4, 1])));
        assert!(!p(&[4, 1]).is_next_of(&p(&[4, 2])));
        assert!(!p(&[5, 2]).is_next_of(&p(&[4, 1])));
    }

    #[test]
    fn test_transform_across_remove() {
        let removed = PathOp::Remove { path: p(&[1]) };
        assert_eq!(p(&[0, 3]).transform(&removed), Some(p(&[0, 3])));
        assert_eq!(p(&[2, 0]).transform(&removed), Some(p(&[1, 0])));
        assert_eq!(p(&[1, 4]).transform(&removed), None);
        assert_eq!(p(&[1]).transform(&removed), None);
    }

    #[test]
    fn test_transform_across_insert() {
        let inserted = PathOp::Insert { path: p(&[0, 1]) };
        assert_eq!(p(&[0, 1]).transform(&inserted), Some(p(&[0, 2])));
        assert_eq!(p(&[0, 0, 7]).transform(&inserted), Some(p(&[0, 0, 7])));
        assert_eq!(p(&[0]).transform(&inserted), Some(p(&[0])));
        assert_eq!(p(&[1, 1]).transform(&inserted), Some(p(&[1, 1])));
    }

    #[test]
    fn test_transform_across_move() {
        let moved = PathOp::Move { from: p(&[0]), to: p(&[2]) };
        assert_eq!(p(&[0, 1]).transform(&moved), Some(p(&[2, 1])));
        assert_eq!(p(&[1]).transform(&moved), Some(p(&[0])));
        assert_eq!(p(&[3]).transform(&moved), Some(p(&[3])));
    }
}
