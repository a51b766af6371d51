//! Arrow-key navigation across text, voids, table cells and code blocks.
//!
//! [`KeyboardNav::handle`] maps the current selection and a pressed arrow to
//! the next selection, or to a hand-off to something outside the tree (a
//! code sub-editor, the page title field). Rules are tried in order and the
//! first that applies wins. Left/right and up/down mirror each other.
//!
//! A few rules edit the tree: escaping a formula or a marked run may insert
//! an empty plain text leaf to park the caret on, and moving down from a
//! trailing non-blank paragraph appends an empty paragraph. These edits run
//! as document transactions.

use crate::navigator;
use crate::{
    CodeEditorRegistry, Document, Edge, LeafnotesError, Node, NodeId, OperationLog, Path, Point,
    Result, Selection,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrowKey {
    Left,
    Right,
    Up,
    Down,
}

/// A pressed arrow key, with the platform's word/line modifier flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: ArrowKey,
    pub modifier: bool,
}

impl KeyInput {
    pub fn plain(key: ArrowKey) -> Self {
        KeyInput {
            key,
            modifier: false,
        }
    }

    pub fn with_modifier(key: ArrowKey) -> Self {
        KeyInput {
            key,
            modifier: true,
        }
    }
}

/// What the host should do in response to an arrow key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Apply this selection to the tree.
    Select(Selection),
    /// Focus the sub-editor of a code block at the given edge; the sub-editor
    /// has already been told to move its caret there.
    FocusSubEditor { block: NodeId, edge: Edge },
    /// The caret left the top of the document: focus the page title.
    HandOffTitle,
    /// Nothing to do beyond the platform's default caret behaviour.
    Default,
}

/// Arrow-key state machine over one document and its code sub-editors.
pub struct KeyboardNav<'a> {
    pub doc: &'a mut Document,
    pub log: &'a mut OperationLog,
    pub code_editors: &'a mut CodeEditorRegistry,
}

impl KeyboardNav<'_> {
    /// Decides where `input` moves the caret from `selection`.
    ///
    /// Extended (non-collapsed) selections are left to the platform.
    ///
    /// # Errors
    ///
    /// Returns [`LeafnotesError::InvalidPath`] when the selection does not
    /// resolve against the current document.
    pub fn handle(&mut self, selection: Option<&Selection>, input: KeyInput) -> Result<Navigation> {
        let Some(selection) = selection else {
            return Ok(Navigation::Default);
        };
        if !selection.is_collapsed() {
            return Ok(Navigation::Default);
        }
        match selection {
            Selection::Node { path } => self.from_void(path, input.key),
            Selection::Range { focus, .. } => {
                if !self.doc.is_valid_point(focus) {
                    return Err(LeafnotesError::InvalidPath(focus.path.clone()));
                }
                match input.key {
                    ArrowKey::Left => self.left(focus, input.modifier),
                    ArrowKey::Right => self.right(focus, input.modifier),
                    ArrowKey::Up => self.up(&focus.path),
                    ArrowKey::Down => self.down(&focus.path),
                }
            }
        }
    }

    /// Hands the caret back to the tree when it leaves a code sub-editor
    /// through its first or last line.
    ///
    /// # Errors
    ///
    /// Returns [`LeafnotesError::InvalidPath`] when `block` is not a code block.
    pub fn exit_code_block(&mut self, block: &Path, key: ArrowKey) -> Result<Navigation> {
        if !self.doc.get(block)?.is_code_block() {
            return Err(LeafnotesError::InvalidPath(block.clone()));
        }
        Ok(match key {
            ArrowKey::Left | ArrowKey::Up => self.select_previous(block),
            ArrowKey::Right | ArrowKey::Down => {
                self.select_next(block).unwrap_or(Navigation::Default)
            }
        })
    }

    fn left(&mut self, point: &Point, modifier: bool) -> Result<Navigation> {
        let path = &point.path;
        if modifier {
            return Ok(self.select_edge(&path.parent(), Edge::Start));
        }
        if point.offset == 0 && !path.has_previous() {
            return Ok(self.select_previous(&path.parent()));
        }
        let leaf = self.doc.get(path)?;
        if leaf.is_formula() {
            return self.move_before(path);
        }
        if point.offset > 0 {
            let offset = prev_boundary(leaf_text(leaf), point.offset);
            return Ok(Navigation::Select(Selection::caret(path.clone(), offset)));
        }
        let dirty = leaf.is_dirty_leaf();
        let Some((prev_path, prev)) = self.doc.previous_sibling(path) else {
            return Ok(self.select_previous(&path.parent()));
        };
        if prev.is_file_void() {
            return Ok(Navigation::Select(Selection::node(prev_path)));
        }
        if dirty {
            return self.move_before(path);
        }
        if prev.is_void() {
            return Ok(match prev_path.previous() {
                Ok(before) => self.select_edge(&before, Edge::End),
                Err(_) => self.select_previous(&path.parent()),
            });
        }
        let text = leaf_text(prev);
        let offset = prev_boundary(text, text.len());
        Ok(Navigation::Select(Selection::caret(prev_path, offset)))
    }

    fn right(&mut self, point: &Point, modifier: bool) -> Result<Navigation> {
        let path = &point.path;
        if modifier {
            return Ok(self.select_edge(&path.parent(), Edge::End));
        }
        let leaf = self.doc.get(path)?;
        if leaf.is_formula() {
            return self.move_after(path);
        }
        let text = leaf_text(leaf);
        if point.offset < text.len() {
            let offset = next_boundary(text, point.offset);
            return Ok(Navigation::Select(Selection::caret(path.clone(), offset)));
        }
        let dirty = leaf.is_dirty_leaf();
        match self.doc.next_sibling(path) {
            Some((next_path, next)) if next.is_file_void() => {
                Ok(Navigation::Select(Selection::node(next_path)))
            }
            Some((next_path, next)) if next.is_void() => {
                let after = next_path.next();
                Ok(if self.doc.has_path(&after) {
                    self.select_edge(&after, Edge::Start)
                } else {
                    self.select_next(&path.parent()).unwrap_or(Navigation::Default)
                })
            }
            Some((next_path, next)) => {
                let offset = next_boundary(leaf_text(next), 0);
                Ok(Navigation::Select(Selection::caret(next_path, offset)))
            }
            None if dirty && navigator::find_next(self.doc, path).is_none() => {
                self.move_after(path)
            }
            None => Ok(self.select_next(&path.parent()).unwrap_or(Navigation::Default)),
        }
    }

    fn up(&mut self, path: &Path) -> Result<Navigation> {
        let element = self
            .doc
            .enclosing_element(path)
            .ok_or_else(|| LeafnotesError::InvalidPath(path.clone()))?;
        if let Some(target) = self.adjacent_cell(&element, ArrowKey::Up) {
            return Ok(self.select_edge(&target, Edge::End));
        }
        Ok(self.select_previous(&element))
    }

    fn down(&mut self, path: &Path) -> Result<Navigation> {
        let element = self
            .doc
            .enclosing_element(path)
            .ok_or_else(|| LeafnotesError::InvalidPath(path.clone()))?;
        if let Some(target) = self.adjacent_cell(&element, ArrowKey::Down) {
            return Ok(self.select_edge(&target.child(0), Edge::End));
        }
        if let Some(nav) = self.select_next(&element) {
            return Ok(nav);
        }
        let node = self.doc.get(&element)?;
        if node.is_paragraph() && !node.string().trim().is_empty() {
            return self.append_paragraph(&element);
        }
        Ok(Navigation::Default)
    }

    fn from_void(&mut self, path: &Path, key: ArrowKey) -> Result<Navigation> {
        self.doc.get(path)?;
        let container = path.parent();
        let inline = !container.is_root()
            && self
                .doc
                .get(&container)
                .ok()
                .and_then(Node::kind)
                .is_some_and(|k| k.holds_inline());
        if !inline {
            return Ok(match key {
                ArrowKey::Left | ArrowKey::Up => self.select_previous(path),
                ArrowKey::Right | ArrowKey::Down => {
                    self.select_next(path).unwrap_or(Navigation::Default)
                }
            });
        }
        Ok(match key {
            ArrowKey::Left => match self.doc.previous_sibling(path) {
                Some((prev, _)) => self.select_edge(&prev, Edge::End),
                None => self.select_previous(&container),
            },
            ArrowKey::Right => match self.doc.next_sibling(path) {
                Some((next, _)) => self.select_edge(&next, Edge::Start),
                None => self.select_next(&container).unwrap_or(Navigation::Default),
            },
            ArrowKey::Up => return self.up(&container),
            ArrowKey::Down => return self.down(&container),
        })
    }

    /// The same-column cell in the neighbouring row, if `cell` is a table
    /// cell and that row exists.
    fn adjacent_cell(&self, cell: &Path, key: ArrowKey) -> Option<Path> {
        if !navigator::is_table_cell(self.doc, cell) {
            return None;
        }
        let column = cell.last()?;
        let row = cell.parent();
        let target_row = match key {
            ArrowKey::Up => row.previous().ok()?,
            ArrowKey::Down => row.next(),
            ArrowKey::Left | ArrowKey::Right => return None,
        };
        let target = target_row.child(column);
        self.doc.has_path(&target).then_some(target)
    }

    fn select_edge(&self, path: &Path, edge: Edge) -> Navigation {
        match self.doc.edge_selection(path, edge) {
            Some(selection) => Navigation::Select(selection),
            None => Navigation::Default,
        }
    }

    /// Moves to the end of the previous unit, or hands off to the title at
    /// the top of the document.
    fn select_previous(&mut self, from: &Path) -> Navigation {
        let mut current = from.clone();
        while let Some(unit) = navigator::find_previous(self.doc, &current) {
            if let Some(nav) = self.enter_unit(&unit, Edge::End) {
                return nav;
            }
            current = unit;
        }
        Navigation::HandOffTitle
    }

    /// Moves to the start of the next unit, `None` at the end of the document.
    fn select_next(&mut self, from: &Path) -> Option<Navigation> {
        let mut current = from.clone();
        while let Some(unit) = navigator::find_next(self.doc, &current) {
            if let Some(nav) = self.enter_unit(&unit, Edge::Start) {
                return Some(nav);
            }
            current = unit;
        }
        None
    }

    /// Places the caret on `unit`; `None` when the unit cannot take it (a
    /// code block without a mounted sub-editor) and should be skipped.
    fn enter_unit(&mut self, unit: &Path, edge: Edge) -> Option<Navigation> {
        let node = self.doc.get(unit).ok()?;
        if node.is_code_block() {
            let block = node.id()?;
            return match self.code_editors.get_mut(block) {
                Some(editor) => {
                    match edge {
                        Edge::Start => editor.focus_start(),
                        Edge::End => editor.focus_end(),
                    }
                    Some(Navigation::FocusSubEditor { block, edge })
                }
                None => {
                    log::debug!(
                        "skipping code block at {unit}: {}",
                        LeafnotesError::MissingSubEditor(block)
                    );
                    None
                }
            };
        }
        self.doc.edge_selection(unit, edge).map(Navigation::Select)
    }

    /// Parks the caret in unmarked text directly before the inline at `path`.
    fn move_before(&mut self, path: &Path) -> Result<Navigation> {
        if let Some((prev_path, prev)) = self.doc.previous_sibling(path) {
            if prev.is_plain_text() {
                let offset = prev.leaf_len();
                return Ok(Navigation::Select(Selection::caret(prev_path, offset)));
            }
        }
        self.insert_padding(path)
    }

    /// Parks the caret in unmarked text directly after the inline at `path`.
    fn move_after(&mut self, path: &Path) -> Result<Navigation> {
        if let Some((next_path, next)) = self.doc.next_sibling(path) {
            if next.is_plain_text() {
                return Ok(Navigation::Select(Selection::caret(next_path, 0)));
            }
        }
        self.insert_padding(&path.next())
    }

    fn insert_padding(&mut self, at: &Path) -> Result<Navigation> {
        self.doc
            .transaction(self.log, |tx| tx.insert_nodes(at, vec![Node::text("")]))?;
        Ok(Navigation::Select(Selection::caret(at.clone(), 0)))
    }

    fn append_paragraph(&mut self, element: &Path) -> Result<Navigation> {
        let top = element
            .indices()
            .first()
            .copied()
            .ok_or_else(|| LeafnotesError::InvalidPath(element.clone()))?;
        let at = Path::new(vec![top + 1]);
        self.doc
            .transaction(self.log, |tx| tx.insert_nodes(&at, vec![Node::paragraph("")]))?;
        Ok(Navigation::Select(Selection::caret(at.child(0), 0)))
    }
}

fn leaf_text(node: &Node) -> &str {
    match node {
        Node::Text(t) => &t.text,
        Node::Formula(f) => &f.tex,
        _ => "",
    }
}

fn prev_boundary(text: &str, offset: usize) -> usize {
    text[..offset]
        .char_indices()
        .next_back()
        .map_or(0, |(i, _)| i)
}

fn next_boundary(text: &str, offset: usize) -> usize {
    text[offset..]
        .chars()
        .next()
        .map_or(offset, |c| offset + c.len_utf8())
}
