//! Code sub-editors: the independent text buffers backing code blocks.
//!
//! A code block in the tree stores no text. Its content lives in a
//! [`CodeEditor`] instance registered under the block's [`NodeId`] when the
//! block is mounted and removed again on unmount.

use crate::{Document, NodeId};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Identifier of a marker placed in a sub-editor.
pub type MarkerId = u32;

/// A line/column position inside a sub-editor buffer. Columns are byte
/// offsets into the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CodePosition {
    pub row: usize,
    pub column: usize,
}

/// A half-open span inside a sub-editor buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodeRange {
    pub start: CodePosition,
    pub end: CodePosition,
}

impl CodeRange {
    /// A span within a single line.
    pub fn on_line(row: usize, start: usize, end: usize) -> Self {
        CodeRange {
            start: CodePosition { row, column: start },
            end: CodePosition { row, column: end },
        }
    }
}

/// Presentation class of a search marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerClass {
    /// An ordinary match.
    Match,
    /// The match the search cursor is on.
    Current,
}

/// The interface the core needs from a code-editing surface.
pub trait CodeEditor {
    /// The buffer content, one entry per line.
    fn lines(&self) -> Vec<String>;

    /// Places a marker over `range` and returns its id.
    fn add_marker(&mut self, range: CodeRange, class: MarkerClass) -> MarkerId;

    /// Removes a marker. Unknown ids are ignored.
    fn remove_marker(&mut self, id: MarkerId);

    /// Looks up a live marker.
    fn marker(&self, id: MarkerId) -> Option<(CodeRange, MarkerClass)>;

    /// Removes every search marker from the buffer.
    fn clear_markers(&mut self);

    /// Moves the sub-editor caret to the start of the buffer and focuses it.
    fn focus_start(&mut self);

    /// Moves the sub-editor caret to the end of the buffer and focuses it.
    fn focus_end(&mut self);
}

/// Where a [`TextBufferEditor`] was last focused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferFocus {
    Start,
    End,
}

/// A plain in-memory [`CodeEditor`] over a list of lines.
#[derive(Debug, Default)]
pub struct TextBufferEditor {
    lines: Vec<String>,
    markers: BTreeMap<MarkerId, (CodeRange, MarkerClass)>,
    next_marker: MarkerId,
    focus: Option<BufferFocus>,
}

impl TextBufferEditor {
    pub fn new(text: &str) -> Self {
        TextBufferEditor {
            lines: text.split('\n').map(str::to_string).collect(),
            ..Default::default()
        }
    }

    pub fn markers(&self) -> impl Iterator<Item = (MarkerId, &(CodeRange, MarkerClass))> {
        self.markers.iter().map(|(id, m)| (*id, m))
    }

    pub fn focus(&self) -> Option<BufferFocus> {
        self.focus
    }
}

impl CodeEditor for TextBufferEditor {
    fn lines(&self) -> Vec<String> {
        self.lines.clone()
    }

    fn add_marker(&mut self, range: CodeRange, class: MarkerClass) -> MarkerId {
        let id = self.next_marker;
        self.next_marker += 1;
        self.markers.insert(id, (range, class));
        id
    }

    fn remove_marker(&mut self, id: MarkerId) {
        self.markers.remove(&id);
    }

    fn marker(&self, id: MarkerId) -> Option<(CodeRange, MarkerClass)> {
        self.markers.get(&id).copied()
    }

    fn clear_markers(&mut self) {
        self.markers.clear();
    }

    fn focus_start(&mut self) {
        self.focus = Some(BufferFocus::Start);
    }

    fn focus_end(&mut self) {
        self.focus = Some(BufferFocus::End);
    }
}

/// Live sub-editors keyed by the id of the code block they back.
///
/// At most one editor is registered per block: mounting a block twice
/// replaces the earlier instance.
#[derive(Default)]
pub struct CodeEditorRegistry {
    editors: HashMap<NodeId, Box<dyn CodeEditor>>,
}

impl CodeEditorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the sub-editor for a freshly mounted code block.
    pub fn mount(&mut self, block: NodeId, editor: Box<dyn CodeEditor>) {
        if self.editors.insert(block, editor).is_some() {
            log::debug!("replaced sub-editor for code block {block}");
        }
    }

    /// Drops the sub-editor of an unmounted code block.
    pub fn unmount(&mut self, block: NodeId) -> Option<Box<dyn CodeEditor>> {
        self.editors.remove(&block)
    }

    pub fn contains(&self, block: NodeId) -> bool {
        self.editors.contains_key(&block)
    }

    pub fn get(&self, block: NodeId) -> Option<&dyn CodeEditor> {
        self.editors.get(&block).map(|e| e.as_ref())
    }

    pub fn get_mut(&mut self, block: NodeId) -> Option<&mut (dyn CodeEditor + 'static)> {
        self.editors.get_mut(&block).map(|e| e.as_mut())
    }

    pub fn len(&self) -> usize {
        self.editors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.editors.is_empty()
    }

    /// Unmounts every editor whose code block no longer exists in `doc`.
    pub fn retain_live(&mut self, doc: &Document) {
        let live: HashSet<NodeId> = doc
            .descendants()
            .into_iter()
            .filter(|(_, node)| node.is_code_block())
            .filter_map(|(_, node)| node.id())
            .collect();
        self.editors.retain(|id, _| live.contains(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Node;

    #[test]
    fn test_buffer_splits_lines() {
        let editor = TextBufferEditor::new("// cat\ncat()");
        assert_eq!(editor.lines(), vec!["// cat".to_string(), "cat()".to_string()]);
    }

    #[test]
    fn test_markers_add_and_remove() {
        let mut editor = TextBufferEditor::new("abc");
        let a = editor.add_marker(CodeRange::on_line(0, 0, 1), MarkerClass::Match);
        let b = editor.add_marker(CodeRange::on_line(0, 1, 2), MarkerClass::Current);
        assert_ne!(a, b);
        editor.remove_marker(a);
        assert!(editor.marker(a).is_none());
        assert_eq!(editor.marker(b).map(|m| m.1), Some(MarkerClass::Current));
        editor.clear_markers();
        assert_eq!(editor.markers().count(), 0);
    }

    #[test]
    fn test_registry_holds_one_editor_per_block() {
        let mut registry = CodeEditorRegistry::new();
        let id = NodeId::new();
        registry.mount(id, Box::new(TextBufferEditor::new("a")));
        registry.mount(id, Box::new(TextBufferEditor::new("b")));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(id).unwrap().lines(), vec!["b".to_string()]);
        assert!(registry.unmount(id).is_some());
        assert!(registry.get_mut(id).is_none());
    }

    #[test]
    fn test_retain_live_drops_unmounted_blocks() {
        let code = Node::code(Some("rust"));
        let live_id = code.id().unwrap();
        let doc = Document::new(vec![code]);
        let mut registry = CodeEditorRegistry::new();
        registry.mount(live_id, Box::new(TextBufferEditor::new("")));
        registry.mount(NodeId::new(), Box::new(TextBufferEditor::new("")));
        registry.retain_live(&doc);
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(live_id));
    }
}
