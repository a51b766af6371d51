//! One open document together with all of its editing state.
//!
//! [`EditorSession`] owns the document, the selection, the code sub-editor
//! registry, search and drag state, and the operation log. Its gesture
//! methods never fail: errors from the underlying engines are logged and the
//! gesture degrades to a no-op, leaving the session consistent.

use crate::{
    load_settings, media, ArrowKey, CodeEditor, CodeEditorRegistry, Document, DragController,
    DropIndicator, EditorSettings, FileRef, KeyInput, KeyboardNav, LayoutProvider, Navigation,
    NodeId, OperationLog, Path, PurgeStrategy, ReorderOutcome, Result, SearchEngine, SearchMatch,
    Selection, Viewport,
};
use std::time::{Duration, Instant};

pub struct EditorSession {
    document: Document,
    selection: Option<Selection>,
    code_editors: CodeEditorRegistry,
    search: SearchEngine,
    drag: DragController,
    operation_log: OperationLog,
    settings: EditorSettings,
}

impl EditorSession {
    pub fn new(document: Document, settings: EditorSettings) -> Self {
        let operation_log = OperationLog::new(PurgeStrategy::LocalOnly {
            keep_last: settings.operation_log.keep_last,
        });
        EditorSession {
            document,
            selection: None,
            code_editors: CodeEditorRegistry::new(),
            search: SearchEngine::new(Duration::from_millis(settings.search.debounce_ms)),
            drag: DragController::new(settings.drag.clone()),
            operation_log,
            settings,
        }
    }

    /// Opens `document` with the settings stored at `settings_path`.
    pub fn open(document: Document, settings_path: &std::path::Path) -> Self {
        Self::new(document, load_settings(settings_path))
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn set_selection(&mut self, selection: Option<Selection>) {
        self.selection = selection;
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn search(&self) -> &SearchEngine {
        &self.search
    }

    pub fn drag(&self) -> &DragController {
        &self.drag
    }

    pub fn operation_log(&self) -> &OperationLog {
        &self.operation_log
    }

    pub fn code_editors(&self) -> &CodeEditorRegistry {
        &self.code_editors
    }

    /// Registers the sub-editor of a code block that has just been mounted.
    pub fn mount_code_block(&mut self, block: NodeId, editor: Box<dyn CodeEditor>) {
        self.code_editors.mount(block, editor);
    }

    pub fn unmount_code_block(&mut self, block: NodeId) {
        self.code_editors.unmount(block);
    }

    /// Handles an arrow key and applies the resulting selection.
    pub fn handle_arrow(&mut self, input: KeyInput) -> Navigation {
        let generation = self.document.generation();
        let result = KeyboardNav {
            doc: &mut self.document,
            log: &mut self.operation_log,
            code_editors: &mut self.code_editors,
        }
        .handle(self.selection.as_ref(), input);
        let nav = recover("arrow key", result).unwrap_or(Navigation::Default);
        self.apply(&nav);
        if self.document.generation() != generation {
            self.after_mutation();
        }
        nav
    }

    /// Hands the caret back from the sub-editor of the code block at `block`.
    pub fn exit_code_block(&mut self, block: &Path, key: ArrowKey) -> Navigation {
        let result = KeyboardNav {
            doc: &mut self.document,
            log: &mut self.operation_log,
            code_editors: &mut self.code_editors,
        }
        .exit_code_block(block, key);
        let nav = recover("code block exit", result).unwrap_or(Navigation::Default);
        self.apply(&nav);
        nav
    }

    /// Starts dragging the block at `source`. Returns whether the drag began.
    pub fn start_drag(&mut self, layout: &dyn LayoutProvider, source: &Path) -> bool {
        let result = self.drag.start(&self.document, layout, source);
        recover("drag start", result).is_some()
    }

    pub fn drag_move(
        &mut self,
        client_y: f64,
        viewport: &mut dyn Viewport,
        now: Instant,
    ) -> Option<DropIndicator> {
        let result = self.drag.pointer_move(client_y, viewport, now);
        recover("drag move", result).flatten()
    }

    /// Releases the drag and returns the moved node's new path, if it moved.
    pub fn end_drag(&mut self) -> Option<Path> {
        let result = self.drag.release(&mut self.document, &mut self.operation_log);
        match recover("drop", result)? {
            ReorderOutcome::Moved { path } => {
                self.selection = None;
                self.after_mutation();
                Some(path)
            }
            ReorderOutcome::Unchanged => None,
        }
    }

    pub fn cancel_drag(&mut self) {
        self.drag.cancel();
    }

    /// Updates the search keyword; the scan runs on a later [`tick`](Self::tick).
    pub fn set_search_text(&mut self, text: &str, now: Instant) {
        self.search.set_keyword(text, &mut self.code_editors, now);
    }

    /// Runs a due debounced search and scrolls to its current match.
    /// Returns whether a scan ran.
    pub fn tick(
        &mut self,
        now: Instant,
        layout: &dyn LayoutProvider,
        viewport: &mut dyn Viewport,
    ) -> bool {
        let result = self.search.poll(now, &self.document, &mut self.code_editors);
        let ran = recover("search", result).unwrap_or(false);
        if ran {
            self.search
                .scroll_to_current(&self.document, layout, viewport, &self.settings.scroll);
        }
        ran
    }

    pub fn next_match(
        &mut self,
        layout: &dyn LayoutProvider,
        viewport: &mut dyn Viewport,
    ) -> Option<SearchMatch> {
        let found = self.search.next(&self.document, &mut self.code_editors).cloned();
        self.search
            .scroll_to_current(&self.document, layout, viewport, &self.settings.scroll);
        found
    }

    pub fn previous_match(
        &mut self,
        layout: &dyn LayoutProvider,
        viewport: &mut dyn Viewport,
    ) -> Option<SearchMatch> {
        let found = self.search.previous(&self.document, &mut self.code_editors).cloned();
        self.search
            .scroll_to_current(&self.document, layout, viewport, &self.settings.scroll);
        found
    }

    pub fn set_search_open(
        &mut self,
        open: bool,
        layout: &dyn LayoutProvider,
        viewport: &mut dyn Viewport,
    ) {
        let result = self
            .search
            .set_open(open, &self.document, &mut self.code_editors);
        if recover("search panel", result).is_some() && open {
            self.search
                .scroll_to_current(&self.document, layout, viewport, &self.settings.scroll);
        }
    }

    pub fn hide_search_ranges(&mut self) {
        self.search.hide_ranges(&mut self.code_editors);
    }

    /// Inserts media blocks at the caret and selects the last one.
    pub fn insert_media(&mut self, files: &[FileRef]) -> Option<Selection> {
        let result = media::insert_media(
            &mut self.document,
            &mut self.operation_log,
            self.selection.as_ref(),
            files,
        );
        let selection = recover("media insert", result).flatten()?;
        self.selection = Some(selection.clone());
        self.after_mutation();
        Some(selection)
    }

    pub fn select_media(
        &mut self,
        layout: &dyn LayoutProvider,
        viewport: &mut dyn Viewport,
        path: &Path,
    ) -> Option<Selection> {
        let result = media::select_media(
            &self.document,
            layout,
            viewport,
            &self.settings.scroll,
            path,
        );
        let selection = recover("media select", result)?;
        self.selection = Some(selection.clone());
        Some(selection)
    }

    fn apply(&mut self, nav: &Navigation) {
        match nav {
            Navigation::Select(selection) => self.selection = Some(selection.clone()),
            Navigation::FocusSubEditor { .. } | Navigation::HandOffTitle => self.selection = None,
            Navigation::Default => {}
        }
    }

    /// Drops sub-editors of removed code blocks and rescans the active search.
    fn after_mutation(&mut self) {
        self.code_editors.retain_live(&self.document);
        if !self.search.keyword().is_empty() {
            let result = self.search.run(&self.document, &mut self.code_editors);
            recover("search refresh", result);
        }
    }
}

/// Logs a failed gesture and turns it into `None`.
fn recover<T>(gesture: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) if e.is_recoverable() => {
            log::debug!("{gesture} ignored: {e}");
            None
        }
        Err(e) => {
            log::error!("{gesture} failed: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::fakes::{FakeLayout, FakeViewport};
    use crate::{Node, TextBufferEditor};

    fn session(children: Vec<Node>) -> EditorSession {
        EditorSession::new(Document::new(children), EditorSettings::default())
    }

    #[test]
    fn test_arrow_down_appends_and_selects() {
        let mut s = session(vec![Node::paragraph("last")]);
        s.set_selection(Some(Selection::caret(vec![0, 0], 4)));
        let nav = s.handle_arrow(KeyInput::plain(ArrowKey::Down));
        assert_eq!(nav, Navigation::Select(Selection::caret(vec![1, 0], 0)));
        assert_eq!(s.selection(), Some(&Selection::caret(vec![1, 0], 0)));
        assert_eq!(s.operation_log().len(), 1);

        assert_eq!(s.handle_arrow(KeyInput::plain(ArrowKey::Down)), Navigation::Default);
        assert_eq!(s.document().children().len(), 2);
    }

    #[test]
    fn test_stale_selection_degrades_to_no_op() {
        let mut s = session(vec![Node::paragraph("a")]);
        s.set_selection(Some(Selection::caret(vec![5, 0], 0)));
        assert_eq!(s.handle_arrow(KeyInput::plain(ArrowKey::Left)), Navigation::Default);
        assert_eq!(s.selection(), Some(&Selection::caret(vec![5, 0], 0)));
    }

    #[test]
    fn test_title_hand_off_clears_selection() {
        let mut s = session(vec![Node::paragraph("a")]);
        s.set_selection(Some(Selection::caret(vec![0, 0], 0)));
        assert_eq!(s.handle_arrow(KeyInput::plain(ArrowKey::Up)), Navigation::HandOffTitle);
        assert_eq!(s.selection(), None);
    }

    #[test]
    fn test_drag_moves_block_and_refreshes_search() {
        let mut s = session(vec![
            Node::paragraph("one cat"),
            Node::paragraph("two"),
            Node::paragraph("three"),
        ]);
        let layout = FakeLayout::stacked(
            &[Path::new(vec![0]), Path::new(vec![1]), Path::new(vec![2])],
            100.0,
        );
        let mut viewport = FakeViewport::new(2000.0);
        let now = Instant::now();
        s.set_search_open(true, &layout, &mut viewport);
        s.set_search_text("cat", now);
        assert!(s.tick(now + Duration::from_millis(300), &layout, &mut viewport));
        assert_eq!(s.search().matches().len(), 1);

        let mut drag_viewport = FakeViewport::new(2000.0);
        assert!(s.start_drag(&layout, &Path::new(vec![0])));
        assert!(s.drag_move(342.0, &mut drag_viewport, now).is_some());
        assert_eq!(s.end_drag(), Some(Path::new(vec![2])));
        assert!(!s.drag().is_dragging());
        match &s.search().matches()[0] {
            SearchMatch::Text { leaf, .. } => assert_eq!(leaf, &Path::new(vec![2, 0])),
            other => panic!("unexpected match {other:?}"),
        }
    }

    #[test]
    fn test_drag_with_closed_panel_rescans_matches() {
        let mut s = session(vec![
            Node::paragraph("one cat"),
            Node::paragraph("two"),
            Node::paragraph("three"),
        ]);
        let layout = FakeLayout::stacked(
            &[Path::new(vec![0]), Path::new(vec![1]), Path::new(vec![2])],
            100.0,
        );
        let mut viewport = FakeViewport::new(2000.0);
        let now = Instant::now();
        s.set_search_text("cat", now);
        assert!(s.tick(now + Duration::from_millis(300), &layout, &mut viewport));
        assert!(!s.search().is_open());

        let mut drag_viewport = FakeViewport::new(2000.0);
        assert!(s.start_drag(&layout, &Path::new(vec![0])));
        assert!(s.drag_move(342.0, &mut drag_viewport, now).is_some());
        assert_eq!(s.end_drag(), Some(Path::new(vec![2])));
        assert!(!s.search().is_stale(s.document()));

        match s.next_match(&layout, &mut viewport) {
            Some(SearchMatch::Text {
                leaf, start, end, ..
            }) => {
                assert_eq!(leaf, Path::new(vec![2, 0]));
                assert_eq!((start, end), (4, 7));
            }
            other => panic!("unexpected match {other:?}"),
        }
    }

    #[test]
    fn test_cancelled_drag_leaves_document_untouched() {
        let mut s = session(vec![Node::paragraph("a"), Node::paragraph("b")]);
        let layout = FakeLayout::stacked(&[Path::new(vec![0]), Path::new(vec![1])], 100.0);
        let mut viewport = FakeViewport::new(2000.0);
        assert!(s.start_drag(&layout, &Path::new(vec![0])));
        assert!(s.drag_move(242.0, &mut viewport, Instant::now()).is_some());
        s.cancel_drag();
        assert!(!s.drag().is_dragging());
        assert_eq!(s.end_drag(), None);
        assert_eq!(s.document().generation(), 0);
    }

    #[test]
    fn test_hidden_search_ranges_keep_the_matches() {
        let mut s = session(vec![Node::paragraph("cat and cat")]);
        let paragraph = s.document().children()[0].id().unwrap();
        let layout = FakeLayout::default();
        let mut viewport = FakeViewport::new(800.0);
        let now = Instant::now();
        s.set_search_text("cat", now);
        assert!(s.tick(now + Duration::from_millis(300), &layout, &mut viewport));
        assert_eq!(s.search().highlights_for(s.document(), paragraph).len(), 2);

        s.hide_search_ranges();
        assert!(s.search().highlights_for(s.document(), paragraph).is_empty());
        assert_eq!(s.search().matches().len(), 2);
        assert_eq!(s.search().keyword(), "cat");
    }

    #[test]
    fn test_drag_gestures_without_drag_are_ignored() {
        let mut s = session(vec![Node::paragraph("a")]);
        let mut viewport = FakeViewport::new(800.0);
        assert_eq!(s.drag_move(100.0, &mut viewport, Instant::now()), None);
        assert_eq!(s.end_drag(), None);
        assert!(!s.start_drag(&FakeLayout::default(), &Path::new(vec![7])));
    }

    #[test]
    fn test_search_navigation_through_code_block() {
        let code = Node::code(None);
        let id = code.id().unwrap();
        let mut s = session(vec![Node::paragraph("x"), code]);
        s.mount_code_block(id, Box::new(TextBufferEditor::new("x = 1\nprint(x)")));
        let layout = FakeLayout::default();
        let mut viewport = FakeViewport::new(800.0);
        let now = Instant::now();
        s.set_search_text("x", now);
        assert!(!s.tick(now, &layout, &mut viewport));
        assert!(s.tick(now + Duration::from_millis(300), &layout, &mut viewport));
        assert_eq!(s.search().matches().len(), 3);
        assert!(matches!(
            s.next_match(&layout, &mut viewport),
            Some(SearchMatch::Code { .. })
        ));
        assert!(matches!(
            s.previous_match(&layout, &mut viewport),
            Some(SearchMatch::Text { .. })
        ));
    }

    #[test]
    fn test_code_sub_editors_follow_mount_lifecycle() {
        let code = Node::code(None);
        let id = code.id().unwrap();
        let mut s = session(vec![Node::paragraph(""), code]);
        s.mount_code_block(id, Box::new(TextBufferEditor::new("")));
        s.set_selection(Some(Selection::caret(vec![0, 0], 0)));
        let selection = s.insert_media(&[FileRef::new("a.png", 3)]);
        assert_eq!(selection, Some(Selection::node(vec![0])));
        assert!(s.code_editors().contains(id));

        s.unmount_code_block(id);
        assert!(s.code_editors().is_empty());
    }

    #[test]
    fn test_select_media_updates_selection() {
        let mut s = session(vec![Node::media("m.png", 1)]);
        let layout = FakeLayout::default();
        let mut viewport = FakeViewport::new(800.0);
        assert!(s.select_media(&layout, &mut viewport, &Path::new(vec![0])).is_some());
        assert_eq!(s.selection(), Some(&Selection::node(vec![0])));
        assert!(s.select_media(&layout, &mut viewport, &Path::new(vec![1])).is_none());
    }
}
