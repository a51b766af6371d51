//! Caret and selection positions inside the document tree.

use crate::Path;
use serde::{Deserialize, Serialize};

/// A position inside a leaf: the leaf's path plus a byte offset into its text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: impl Into<Path>, offset: usize) -> Self {
        Point {
            path: path.into(),
            offset,
        }
    }
}

/// The current selection.
///
/// A text range runs from `anchor` to `focus`; when both are equal the
/// selection is collapsed and represents the caret. A void node (media,
/// attachment) is selected as a whole by its path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Selection {
    Range { anchor: Point, focus: Point },
    Node { path: Path },
}

impl Selection {
    pub fn collapsed(point: Point) -> Self {
        Selection::Range {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn caret(path: impl Into<Path>, offset: usize) -> Self {
        Self::collapsed(Point::new(path, offset))
    }

    pub fn node(path: impl Into<Path>) -> Self {
        Selection::Node { path: path.into() }
    }

    pub fn is_collapsed(&self) -> bool {
        match self {
            Selection::Range { anchor, focus } => anchor == focus,
            Selection::Node { .. } => true,
        }
    }

    /// The focus point of a text range, `None` for a node selection.
    pub fn focus(&self) -> Option<&Point> {
        match self {
            Selection::Range { focus, .. } => Some(focus),
            Selection::Node { .. } => None,
        }
    }

    /// The path the selection is focused on: the focus leaf or the selected node.
    pub fn focus_path(&self) -> &Path {
        match self {
            Selection::Range { focus, .. } => &focus.path,
            Selection::Node { path } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caret_is_collapsed() {
        assert!(Selection::caret(vec![0, 0], 3).is_collapsed());
        assert!(Selection::node(vec![2]).is_collapsed());
        let range = Selection::Range {
            anchor: Point::new(vec![0, 0], 0),
            focus: Point::new(vec![0, 0], 2),
        };
        assert!(!range.is_collapsed());
        assert_eq!(range.focus().map(|p| p.offset), Some(2));
    }
}
