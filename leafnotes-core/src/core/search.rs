//! Keyword search across rich text and code sub-editors.
//!
//! A scan walks paragraphs, headings, table cells and code blocks in
//! document order and flattens every occurrence of the keyword into one
//! globally indexed match list. Rich-text matches are cached per container
//! for the renderer; code matches are rendered as sub-editor markers, with
//! the match under the search cursor tagged [`MarkerClass::Current`].
//!
//! Matching is case-insensitive on the literal keyword. Offsets are byte
//! offsets into the original (not lower-cased) text.

use crate::{
    CodeEditorRegistry, CodeRange, Document, ElementKind, LayoutProvider, MarkerClass, MarkerId,
    Node, NodeId, Path, Result, ScrollSettings, Viewport,
};
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// One occurrence of the keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchMatch {
    /// A span inside a text leaf of a rich-text container.
    Text {
        container: NodeId,
        leaf: Path,
        start: usize,
        end: usize,
    },
    /// A span inside a code block's sub-editor buffer.
    Code {
        block: NodeId,
        block_path: Path,
        range: CodeRange,
        /// The sub-editor marker currently rendering this match.
        marker: Option<MarkerId>,
    },
}

/// A cached rich-text highlight, ready for the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightRange {
    pub leaf: Path,
    pub start: usize,
    pub end: usize,
    /// Whether the search cursor is on this match.
    pub current: bool,
}

/// Search state for one editing session.
#[derive(Debug)]
pub struct SearchEngine {
    keyword: String,
    index: usize,
    open: bool,
    matches: Vec<SearchMatch>,
    /// Global match indices of each rich-text container's matches.
    highlight_cache: HashMap<NodeId, Vec<usize>>,
    debounce: Duration,
    pending: Option<Instant>,
    scanned_generation: Option<u64>,
}

impl SearchEngine {
    pub fn new(debounce: Duration) -> Self {
        SearchEngine {
            keyword: String::new(),
            index: 0,
            open: false,
            matches: Vec::new(),
            highlight_cache: HashMap::new(),
            debounce,
            pending: None,
            scanned_generation: None,
        }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Position of the search cursor in [`matches`](Self::matches).
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn matches(&self) -> &[SearchMatch] {
        &self.matches
    }

    /// The match under the search cursor, `None` once `doc` has changed
    /// since the last scan.
    pub fn current(&self, doc: &Document) -> Option<&SearchMatch> {
        if self.is_stale(doc) {
            return None;
        }
        self.matches.get(self.index)
    }

    /// Whether a debounced scan is waiting to run.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Replaces the keyword and schedules a scan one debounce interval after
    /// `now`. A scan already scheduled is superseded. Markers of the previous
    /// keyword are removed immediately.
    pub fn set_keyword(&mut self, text: &str, registry: &mut CodeEditorRegistry, now: Instant) {
        self.clear_markers(registry);
        self.matches.clear();
        self.highlight_cache.clear();
        self.keyword = text.to_string();
        self.index = 0;
        self.pending = (!self.keyword.is_empty()).then(|| now + self.debounce);
    }

    /// Runs the scheduled scan once its deadline has passed. Returns whether
    /// a scan ran.
    ///
    /// # Errors
    ///
    /// Propagates [`run`](Self::run) errors.
    pub fn poll(
        &mut self,
        now: Instant,
        doc: &Document,
        registry: &mut CodeEditorRegistry,
    ) -> Result<bool> {
        match self.pending {
            Some(deadline) if deadline <= now => {
                self.pending = None;
                self.run(doc, registry)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Rebuilds the match list for the current keyword and returns the
    /// number of matches.
    ///
    /// If the search cursor points past the new list it is reset to the
    /// first match. Code blocks without a mounted sub-editor are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LeafnotesError::Pattern`] if the keyword cannot be
    /// compiled into a matcher.
    pub fn run(&mut self, doc: &Document, registry: &mut CodeEditorRegistry) -> Result<usize> {
        self.clear_markers(registry);
        self.matches.clear();
        self.highlight_cache.clear();
        self.scanned_generation = Some(doc.generation());
        if self.keyword.is_empty() {
            self.index = 0;
            return Ok(0);
        }
        let regex = keyword_regex(&self.keyword)?;
        for (path, node) in doc.descendants() {
            let Node::Element(el) = node else {
                continue;
            };
            match el.kind {
                ElementKind::Code { .. } => self.scan_code(el.id, &path, registry, &regex),
                ElementKind::Paragraph
                | ElementKind::Heading { .. }
                | ElementKind::TableCell { .. } => self.scan_text(node, el.id, &path, &regex),
                ElementKind::Blockquote
                | ElementKind::List { .. }
                | ElementKind::ListItem { .. }
                | ElementKind::Table
                | ElementKind::TableRow => {}
            }
        }
        if self.index >= self.matches.len() {
            self.index = 0;
        }
        for i in 0..self.matches.len() {
            self.place_marker(i, registry);
        }
        log::debug!(
            "search for {:?} found {} matches",
            self.keyword,
            self.matches.len()
        );
        Ok(self.matches.len())
    }

    /// Whether the match list was built against an older document snapshot.
    pub fn is_stale(&self, doc: &Document) -> bool {
        self.scanned_generation != Some(doc.generation())
    }

    /// Advances the search cursor, wrapping from the last match to the first.
    /// Does nothing while the matches are stale against `doc`.
    pub fn next(
        &mut self,
        doc: &Document,
        registry: &mut CodeEditorRegistry,
    ) -> Option<&SearchMatch> {
        let len = self.matches.len();
        if len == 0 || self.is_stale(doc) {
            return None;
        }
        let target = if self.index + 1 >= len { 0 } else { self.index + 1 };
        self.move_cursor(target, registry);
        self.matches.get(self.index)
    }

    /// Moves the search cursor back, wrapping from the first match to the last.
    /// Does nothing while the matches are stale against `doc`.
    pub fn previous(
        &mut self,
        doc: &Document,
        registry: &mut CodeEditorRegistry,
    ) -> Option<&SearchMatch> {
        let len = self.matches.len();
        if len == 0 || self.is_stale(doc) {
            return None;
        }
        let target = if self.index == 0 { len - 1 } else { self.index - 1 };
        self.move_cursor(target, registry);
        self.matches.get(self.index)
    }

    /// Opens or closes the search panel.
    ///
    /// Closing removes every marker and forgets the matches. Opening with a
    /// keyword rescans immediately.
    ///
    /// # Errors
    ///
    /// Propagates [`run`](Self::run) errors.
    pub fn set_open(
        &mut self,
        open: bool,
        doc: &Document,
        registry: &mut CodeEditorRegistry,
    ) -> Result<()> {
        self.open = open;
        if !open {
            self.clear_markers(registry);
            self.highlight_cache.clear();
            self.matches.clear();
            self.pending = None;
        } else if !self.keyword.is_empty() {
            self.pending = None;
            self.run(doc, registry)?;
        }
        Ok(())
    }

    /// Removes markers and cached highlights but keeps the keyword and the
    /// match list.
    pub fn hide_ranges(&mut self, registry: &mut CodeEditorRegistry) {
        self.clear_markers(registry);
        self.highlight_cache.clear();
    }

    /// Rich-text highlights cached for the container element `container`.
    /// Empty once `doc` has changed since the last scan.
    pub fn highlights_for(&self, doc: &Document, container: NodeId) -> Vec<HighlightRange> {
        if self.is_stale(doc) {
            return Vec::new();
        }
        let Some(indices) = self.highlight_cache.get(&container) else {
            return Vec::new();
        };
        indices
            .iter()
            .filter_map(|&i| match self.matches.get(i) {
                Some(SearchMatch::Text {
                    leaf, start, end, ..
                }) => Some(HighlightRange {
                    leaf: leaf.clone(),
                    start: *start,
                    end: *end,
                    current: i == self.index,
                }),
                _ => None,
            })
            .collect()
    }

    /// Scrolls the current match into view unless it already lies inside
    /// the safe band of the viewport. Returns whether the viewport moved.
    pub fn scroll_to_current(
        &self,
        doc: &Document,
        layout: &dyn LayoutProvider,
        viewport: &mut dyn Viewport,
        settings: &ScrollSettings,
    ) -> bool {
        let Some(current) = self.current(doc) else {
            return false;
        };
        let top = match current {
            SearchMatch::Text { leaf, .. } => layout.element_rect(&leaf.parent()).map(|r| r.top),
            SearchMatch::Code { block, range, .. } => layout.code_line_top(*block, range.start.row),
        };
        let Some(top) = top else {
            log::debug!("current search match is not on screen");
            return false;
        };
        let top = top - settings.anchor_offset;
        let scroll_top = viewport.scroll_top();
        let band_top = scroll_top + settings.safe_top;
        let band_bottom = scroll_top + viewport.height() - settings.safe_bottom;
        if top > band_top && top < band_bottom {
            return false;
        }
        viewport.scroll_to(top - settings.margin);
        true
    }

    fn scan_text(&mut self, node: &Node, container: NodeId, path: &Path, regex: &Regex) {
        let text = node.string();
        if text.trim().is_empty() || !regex.is_match(&text) {
            return;
        }
        let mut found = Vec::new();
        for (i, child) in node.children().iter().enumerate() {
            let Node::Text(leaf) = child else {
                continue;
            };
            for m in regex.find_iter(&leaf.text) {
                found.push(self.matches.len());
                self.matches.push(SearchMatch::Text {
                    container,
                    leaf: path.child(i),
                    start: m.start(),
                    end: m.end(),
                });
            }
        }
        self.highlight_cache.insert(container, found);
    }

    fn scan_code(
        &mut self,
        block: NodeId,
        path: &Path,
        registry: &mut CodeEditorRegistry,
        regex: &Regex,
    ) {
        let Some(editor) = registry.get_mut(block) else {
            log::debug!("search skips code block at {path}: no sub-editor mounted");
            return;
        };
        editor.clear_markers();
        for (row, line) in editor.lines().iter().enumerate() {
            for m in regex.find_iter(line) {
                self.matches.push(SearchMatch::Code {
                    block,
                    block_path: path.clone(),
                    range: CodeRange::on_line(row, m.start(), m.end()),
                    marker: None,
                });
            }
        }
    }

    fn class_for(&self, i: usize) -> MarkerClass {
        if i == self.index {
            MarkerClass::Current
        } else {
            MarkerClass::Match
        }
    }

    fn place_marker(&mut self, i: usize, registry: &mut CodeEditorRegistry) {
        let class = self.class_for(i);
        if let Some(SearchMatch::Code {
            block,
            range,
            marker,
            ..
        }) = self.matches.get_mut(i)
        {
            *marker = registry
                .get_mut(*block)
                .map(|editor| editor.add_marker(*range, class));
        }
    }

    fn move_cursor(&mut self, target: usize, registry: &mut CodeEditorRegistry) {
        let old = self.index;
        self.index = target;
        self.retag(old, registry);
        if target != old {
            self.retag(target, registry);
        }
    }

    /// Re-renders the marker of match `i` with its class under the current
    /// cursor. Matches whose markers were hidden stay hidden.
    fn retag(&mut self, i: usize, registry: &mut CodeEditorRegistry) {
        let class = self.class_for(i);
        if let Some(SearchMatch::Code {
            block,
            range,
            marker,
            ..
        }) = self.matches.get_mut(i)
        {
            let Some(old) = *marker else {
                return;
            };
            *marker = registry.get_mut(*block).map(|editor| {
                editor.remove_marker(old);
                editor.add_marker(*range, class)
            });
        }
    }

    fn clear_markers(&mut self, registry: &mut CodeEditorRegistry) {
        for m in &mut self.matches {
            if let SearchMatch::Code { block, marker, .. } = m {
                if marker.take().is_some() {
                    if let Some(editor) = registry.get_mut(*block) {
                        editor.clear_markers();
                    }
                }
            }
        }
    }
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new(Duration::from_millis(300))
    }
}

fn keyword_regex(keyword: &str) -> Result<Regex> {
    Ok(RegexBuilder::new(&regex::escape(keyword))
        .case_insensitive(true)
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::fakes::{FakeLayout, FakeViewport};
    use crate::{CodeEditor, OperationLog, PurgeStrategy, Rect, TextBufferEditor};

    struct Fixture {
        doc: Document,
        registry: CodeEditorRegistry,
        code: NodeId,
        search: SearchEngine,
    }

    fn cat_fixture() -> Fixture {
        let code = Node::code(Some("js"));
        let id = code.id().unwrap();
        let doc = Document::new(vec![Node::paragraph("the cat sat"), code]);
        let mut registry = CodeEditorRegistry::new();
        registry.mount(id, Box::new(TextBufferEditor::new("// cat\ncat()")));
        Fixture {
            doc,
            registry,
            code: id,
            search: SearchEngine::default(),
        }
    }

    fn search(f: &mut Fixture, keyword: &str) -> usize {
        let now = Instant::now();
        f.search.set_keyword(keyword, &mut f.registry, now);
        f.search
            .poll(now + Duration::from_millis(300), &f.doc, &mut f.registry)
            .unwrap();
        f.search.matches().len()
    }

    fn marker_classes(f: &Fixture) -> Vec<MarkerClass> {
        let editor = f.registry.get(f.code).unwrap();
        f.search
            .matches()
            .iter()
            .filter_map(|m| match m {
                SearchMatch::Code {
                    marker: Some(id), ..
                } => editor.marker(*id).map(|(_, class)| class),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_matches_span_text_and_code_in_document_order() {
        let mut f = cat_fixture();
        assert_eq!(search(&mut f, "cat"), 3);
        let paragraph = f.doc.children()[0].id().unwrap();
        assert_eq!(
            f.search.matches()[0],
            SearchMatch::Text {
                container: paragraph,
                leaf: Path::new(vec![0, 0]),
                start: 4,
                end: 7,
            }
        );
        let ranges: Vec<CodeRange> = f.search.matches()[1..]
            .iter()
            .map(|m| match m {
                SearchMatch::Code { range, .. } => *range,
                other => panic!("expected a code match, got {other:?}"),
            })
            .collect();
        assert_eq!(ranges, vec![CodeRange::on_line(0, 3, 6), CodeRange::on_line(1, 0, 3)]);
        assert_eq!(marker_classes(&f), vec![MarkerClass::Match, MarkerClass::Match]);
    }

    #[test]
    fn test_matching_ignores_case() {
        let mut f = cat_fixture();
        f.doc = Document::new(vec![Node::heading(1, "The CAT and the Cat")]);
        assert_eq!(search(&mut f, "cAt"), 2);
    }

    #[test]
    fn test_keyword_is_literal() {
        let mut f = cat_fixture();
        f.doc = Document::new(vec![Node::paragraph("a.b axb (x)")]);
        assert_eq!(search(&mut f, "a.b"), 1);
        assert_eq!(search(&mut f, "(x)"), 1);
    }

    #[test]
    fn test_next_wraps_around() {
        let mut f = cat_fixture();
        let count = search(&mut f, "cat");
        let start = f.search.index();
        for _ in 0..count {
            f.search.next(&f.doc, &mut f.registry);
        }
        assert_eq!(f.search.index(), start);
        f.search.previous(&f.doc, &mut f.registry);
        assert_eq!(f.search.index(), count - 1);
    }

    #[test]
    fn test_cursor_moves_retag_code_markers() {
        let mut f = cat_fixture();
        search(&mut f, "cat");
        f.search.next(&f.doc, &mut f.registry);
        assert_eq!(marker_classes(&f), vec![MarkerClass::Current, MarkerClass::Match]);
        f.search.next(&f.doc, &mut f.registry);
        assert_eq!(marker_classes(&f), vec![MarkerClass::Match, MarkerClass::Current]);
        f.search.next(&f.doc, &mut f.registry);
        assert_eq!(marker_classes(&f), vec![MarkerClass::Match, MarkerClass::Match]);
        let editor = f.registry.get(f.code).unwrap();
        assert_eq!(editor.lines().len(), 2);
    }

    #[test]
    fn test_clearing_keyword_removes_markers_and_matches() {
        let mut f = cat_fixture();
        search(&mut f, "cat");
        let ids: Vec<MarkerId> = f
            .search
            .matches()
            .iter()
            .filter_map(|m| match m {
                SearchMatch::Code { marker, .. } => *marker,
                _ => None,
            })
            .collect();
        assert_eq!(ids.len(), 2);
        f.search.set_keyword("", &mut f.registry, Instant::now());
        assert!(f.search.matches().is_empty());
        assert!(!f.search.is_pending());
        let editor = f.registry.get(f.code).unwrap();
        assert!(ids.iter().all(|id| editor.marker(*id).is_none()));
    }

    #[test]
    fn test_keyword_changes_are_debounced() {
        let mut f = cat_fixture();
        let t0 = Instant::now();
        f.search.set_keyword("ca", &mut f.registry, t0);
        let ran = f.search.poll(t0 + Duration::from_millis(100), &f.doc, &mut f.registry);
        assert!(!ran.unwrap());
        f.search
            .set_keyword("cat", &mut f.registry, t0 + Duration::from_millis(200));
        let ran = f.search.poll(t0 + Duration::from_millis(400), &f.doc, &mut f.registry);
        assert!(!ran.unwrap());
        let ran = f.search.poll(t0 + Duration::from_millis(500), &f.doc, &mut f.registry);
        assert!(ran.unwrap());
        assert_eq!(f.search.matches().len(), 3);
    }

    #[test]
    fn test_cursor_resets_when_matches_shrink() {
        let mut f = cat_fixture();
        search(&mut f, "cat");
        f.search.previous(&f.doc, &mut f.registry);
        assert_eq!(f.search.index(), 2);
        f.doc = Document::new(vec![Node::paragraph("one cat")]);
        assert_eq!(f.search.run(&f.doc, &mut f.registry).unwrap(), 1);
        assert_eq!(f.search.index(), 0);
    }

    #[test]
    fn test_unmounted_code_block_is_skipped() {
        let mut f = cat_fixture();
        f.registry.unmount(f.code);
        assert_eq!(search(&mut f, "cat"), 1);
    }

    #[test]
    fn test_blank_and_nested_containers() {
        let mut f = cat_fixture();
        f.doc = Document::new(vec![
            Node::paragraph("   "),
            Node::blockquote(vec![Node::paragraph("quoted cat")]),
            Node::table(&[&["cat", "dog"], &["", "cat cat"]]),
        ]);
        assert_eq!(search(&mut f, "cat"), 4);
        assert_eq!(search(&mut f, " "), 2);
    }

    #[test]
    fn test_highlights_track_current_match() {
        let mut f = cat_fixture();
        f.doc = Document::new(vec![Node::paragraph("cat cat"), Node::paragraph("cat")]);
        search(&mut f, "cat");
        let first = f.doc.children()[0].id().unwrap();
        let second = f.doc.children()[1].id().unwrap();
        let ranges = f.search.highlights_for(&f.doc, first);
        assert_eq!(ranges.len(), 2);
        assert!(ranges[0].current && !ranges[1].current);
        assert_eq!((ranges[1].start, ranges[1].end), (4, 7));
        f.search.previous(&f.doc, &mut f.registry);
        assert!(f.search.highlights_for(&f.doc, second)[0].current);
        assert!(f.search.highlights_for(&f.doc, first).iter().all(|r| !r.current));
    }

    #[test]
    fn test_matches_are_withheld_after_the_document_changes() {
        let mut f = cat_fixture();
        search(&mut f, "cat");
        let paragraph = f.doc.children()[0].id().unwrap();
        let mut log = OperationLog::new(PurgeStrategy::Unbounded);
        f.doc
            .transaction(&mut log, |tx| {
                tx.insert_nodes(&Path::new(vec![0]), vec![Node::paragraph("new")])
            })
            .unwrap();
        assert!(f.search.is_stale(&f.doc));
        assert_eq!(f.search.current(&f.doc), None);
        assert_eq!(f.search.next(&f.doc, &mut f.registry), None);
        assert_eq!(f.search.previous(&f.doc, &mut f.registry), None);
        assert_eq!(f.search.index(), 0);
        assert!(f.search.highlights_for(&f.doc, paragraph).is_empty());

        f.search.run(&f.doc, &mut f.registry).unwrap();
        assert!(!f.search.is_stale(&f.doc));
        assert_eq!(f.search.highlights_for(&f.doc, paragraph).len(), 1);
        match f.search.current(&f.doc) {
            Some(SearchMatch::Text { leaf, .. }) => assert_eq!(leaf, &Path::new(vec![1, 0])),
            other => panic!("unexpected match {other:?}"),
        }
    }

    #[test]
    fn test_panel_lifecycle() {
        let mut f = cat_fixture();
        search(&mut f, "cat");
        f.search.hide_ranges(&mut f.registry);
        assert_eq!(f.search.matches().len(), 3);
        assert!(marker_classes(&f).is_empty());
        let paragraph = f.doc.children()[0].id().unwrap();
        assert!(f.search.highlights_for(&f.doc, paragraph).is_empty());

        f.search.set_open(false, &f.doc, &mut f.registry).unwrap();
        assert!(f.search.matches().is_empty());
        assert_eq!(f.search.keyword(), "cat");

        f.search.set_open(true, &f.doc, &mut f.registry).unwrap();
        assert!(f.search.is_open());
        assert_eq!(f.search.matches().len(), 3);
        assert_eq!(marker_classes(&f).len(), 2);
    }

    #[test]
    fn test_scroll_only_when_outside_safe_band() {
        let mut f = cat_fixture();
        search(&mut f, "cat");
        let mut layout = FakeLayout::default();
        layout
            .rects
            .insert(Path::new(vec![0]), Rect::new(0.0, 1000.0, 600.0, 20.0));
        layout.code_lines.insert((f.code, 0), 1010.0);
        let mut viewport = FakeViewport::new(600.0);
        let settings = ScrollSettings::default();

        assert!(f.search.scroll_to_current(&f.doc, &layout, &mut viewport, &settings));
        assert_eq!(viewport.scrolled_to, vec![820.0]);
        assert!(!f.search.scroll_to_current(&f.doc, &layout, &mut viewport, &settings));

        f.search.next(&f.doc, &mut f.registry);
        assert!(!f.search.scroll_to_current(&f.doc, &layout, &mut viewport, &settings));
        f.search.next(&f.doc, &mut f.registry);
        assert!(!f.search.scroll_to_current(&f.doc, &layout, &mut viewport, &settings));
        assert_eq!(viewport.scrolled_to.len(), 1);
    }
}
