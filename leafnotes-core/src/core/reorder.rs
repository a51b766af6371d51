//! Drag-and-drop reordering of block nodes.
//!
//! A drag runs through an explicit lifecycle held by [`DragController`]:
//! `Idle -> Dragging -> Committing -> Idle`. [`DragController::start`] takes
//! a snapshot of every visible drop anchor, [`DragController::pointer_move`]
//! tracks the nearest drop point and auto-scrolls near the viewport edges,
//! and [`DragController::release`] commits the move in one document
//! transaction. Every exit path, including errors, leaves the controller
//! idle.

use crate::{
    Document, DragSettings, ElementKind, LayoutProvider, LeafnotesError, Node, OperationLog, Path,
    PathOp, Result, Transaction, Viewport,
};
use std::time::{Duration, Instant};

/// Which side of its anchor a drop point sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropSide {
    Above,
    Below,
}

/// A candidate drop position next to an anchor block.
#[derive(Debug, Clone, PartialEq)]
pub struct DropPoint {
    pub anchor: Path,
    pub side: DropSide,
    /// Vertical position in content coordinates.
    pub top: f64,
    pub left: f64,
    pub width: f64,
}

impl DropPoint {
    /// The slot a node dropped here lands in, in pre-move coordinates.
    pub fn destination(&self) -> Path {
        match self.side {
            DropSide::Above => self.anchor.clone(),
            DropSide::Below => self.anchor.next(),
        }
    }

    pub fn indicator(&self) -> DropIndicator {
        DropIndicator {
            top: self.top,
            left: self.left,
            width: self.width,
        }
    }
}

/// Where the host should draw the drop mark.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropIndicator {
    pub top: f64,
    pub left: f64,
    pub width: f64,
}

/// Result of releasing a drag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderOutcome {
    /// The dragged node now lives at `path`.
    Moved { path: Path },
    /// The drop resolved to the node's own position, or no drop point was
    /// ever hovered. The tree is untouched.
    Unchanged,
}

#[derive(Debug)]
struct ActiveDrag {
    source: Path,
    generation: u64,
    points: Vec<DropPoint>,
    current: Option<usize>,
    last_scroll: Option<Instant>,
}

#[derive(Debug, Default)]
enum DragPhase {
    #[default]
    Idle,
    Dragging(ActiveDrag),
    Committing,
}

/// Drives one drag gesture at a time.
#[derive(Debug)]
pub struct DragController {
    settings: DragSettings,
    phase: DragPhase,
}

impl DragController {
    pub fn new(settings: DragSettings) -> Self {
        DragController {
            settings,
            phase: DragPhase::Idle,
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, DragPhase::Dragging(_))
    }

    /// Path of the node being dragged, if a drag is in progress.
    pub fn source(&self) -> Option<&Path> {
        match &self.phase {
            DragPhase::Dragging(drag) => Some(&drag.source),
            DragPhase::Idle | DragPhase::Committing => None,
        }
    }

    /// Drop points captured when the drag started, in document order.
    pub fn drop_points(&self) -> &[DropPoint] {
        match &self.phase {
            DragPhase::Dragging(drag) => &drag.points,
            DragPhase::Idle | DragPhase::Committing => &[],
        }
    }

    /// The drop mark for the currently nearest drop point.
    pub fn indicator(&self) -> Option<DropIndicator> {
        match &self.phase {
            DragPhase::Dragging(drag) => drag
                .current
                .and_then(|i| drag.points.get(i))
                .map(DropPoint::indicator),
            DragPhase::Idle | DragPhase::Committing => None,
        }
    }

    /// Starts dragging the block at `source` and returns the number of drop
    /// points found. A drag already in progress is superseded.
    ///
    /// # Errors
    ///
    /// Returns [`LeafnotesError::InvalidPath`] if `source` does not resolve
    /// and [`LeafnotesError::InvalidMove`] if the node there cannot be dragged.
    pub fn start(
        &mut self,
        doc: &Document,
        layout: &dyn LayoutProvider,
        source: &Path,
    ) -> Result<usize> {
        let node = doc.get(source)?;
        if !is_draggable(node) || !doc.is_block_position(source) {
            return Err(LeafnotesError::InvalidMove(format!(
                "node at {source} cannot be dragged"
            )));
        }
        if self.is_dragging() {
            log::debug!("drag from {source} supersedes the previous drag");
        }
        let points = self.collect_points(doc, layout, source, node);
        let count = points.len();
        log::debug!("drag started from {source} with {count} drop points");
        self.phase = DragPhase::Dragging(ActiveDrag {
            source: source.clone(),
            generation: doc.generation(),
            points,
            current: None,
            last_scroll: None,
        });
        Ok(count)
    }

    /// Tracks the pointer at window position `client_y` and returns the drop
    /// mark for the nearest drop point.
    ///
    /// Near the viewport edges the viewport is scrolled by one step, at most
    /// once per throttle interval.
    ///
    /// # Errors
    ///
    /// Returns [`LeafnotesError::DragNotActive`] when no drag is in progress.
    pub fn pointer_move(
        &mut self,
        client_y: f64,
        viewport: &mut dyn Viewport,
        now: Instant,
    ) -> Result<Option<DropIndicator>> {
        let DragPhase::Dragging(drag) = &mut self.phase else {
            return Err(LeafnotesError::DragNotActive);
        };
        let s = &self.settings;
        let delta = if client_y > viewport.height() - s.edge_bottom {
            Some(s.scroll_step)
        } else if client_y < s.edge_top {
            Some(-s.scroll_step)
        } else {
            None
        };
        if let Some(delta) = delta {
            let throttle = Duration::from_millis(s.scroll_throttle_ms);
            let due = drag
                .last_scroll
                .map_or(true, |last| now.saturating_duration_since(last) >= throttle);
            if due {
                viewport.scroll_by(delta);
                drag.last_scroll = Some(now);
            }
        }
        let y = client_y - s.pointer_offset + viewport.scroll_top();
        drag.current = nearest(&drag.points, y);
        Ok(drag.current.map(|i| drag.points[i].indicator()))
    }

    /// Ends the drag and commits the move to the nearest drop point.
    ///
    /// # Errors
    ///
    /// Returns [`LeafnotesError::DragNotActive`] when no drag is in progress,
    /// [`LeafnotesError::InvalidPath`] when the document changed since the
    /// drag started, or any error of the underlying transaction. The
    /// document is unchanged in every error case.
    pub fn release(&mut self, doc: &mut Document, log: &mut OperationLog) -> Result<ReorderOutcome> {
        let DragPhase::Dragging(drag) = std::mem::take(&mut self.phase) else {
            return Err(LeafnotesError::DragNotActive);
        };
        self.phase = DragPhase::Committing;
        let result = commit(doc, log, &drag);
        self.phase = DragPhase::Idle;
        if let Err(e) = &result {
            log::warn!("drop of {} abandoned: {e}", drag.source);
        }
        result
    }

    /// Abandons the drag in progress. Returns whether there was one.
    pub fn cancel(&mut self) -> bool {
        let was_dragging = self.is_dragging();
        self.phase = DragPhase::Idle;
        was_dragging
    }

    fn collect_points(
        &self,
        doc: &Document,
        layout: &dyn LayoutProvider,
        source: &Path,
        source_node: &Node,
    ) -> Vec<DropPoint> {
        let s = &self.settings;
        let rule = AnchorRule {
            source,
            dragging_item: source_node.is_list_item(),
            dragging_heading: source_node.is_heading(),
        };
        let mut points = Vec::new();
        for (path, node) in doc.descendants() {
            if !rule.accepts(doc, &path, node) {
                continue;
            }
            let flags = layout.element_flags(&path);
            if flags.frontmatter {
                continue;
            }
            let Some(rect) = layout.element_rect(&path) else {
                continue;
            };
            let (left, width) = if node.is_list_item() {
                let left = if flags.task {
                    rect.left
                } else {
                    rect.left - s.list_indent
                };
                (left, rect.width + s.list_mark_width)
            } else {
                (rect.left, rect.width)
            };
            points.push(DropPoint {
                anchor: path.clone(),
                side: DropSide::Above,
                top: rect.top - s.anchor_gap,
                left,
                width,
            });
            points.push(DropPoint {
                anchor: path,
                side: DropSide::Below,
                top: rect.bottom() + s.anchor_gap,
                left,
                width,
            });
        }
        points
    }
}

/// Which blocks may serve as drop anchors for a given dragged node.
struct AnchorRule<'a> {
    source: &'a Path,
    dragging_item: bool,
    dragging_heading: bool,
}

impl AnchorRule<'_> {
    fn accepts(&self, doc: &Document, path: &Path, node: &Node) -> bool {
        if path == self.source || self.source.is_ancestor(path) || !doc.is_block_position(path) {
            return false;
        }
        if self.dragging_heading && path.depth() != 1 {
            return false;
        }
        match node {
            Node::Element(el) => match el.kind {
                ElementKind::Paragraph => {
                    let leading_in_item = !path.has_previous()
                        && doc.get(&path.parent()).is_ok_and(Node::is_list_item);
                    !(self.dragging_item && leading_in_item)
                }
                ElementKind::Heading { .. }
                | ElementKind::Blockquote
                | ElementKind::List { .. }
                | ElementKind::Table
                | ElementKind::Code { .. } => true,
                ElementKind::ListItem { .. } => self.dragging_item,
                ElementKind::TableRow | ElementKind::TableCell { .. } => false,
            },
            Node::Media(_) | Node::Attachment(_) => true,
            Node::Text(_) | Node::Formula(_) => false,
        }
    }
}

fn is_draggable(node: &Node) -> bool {
    match node {
        Node::Element(el) => !matches!(
            el.kind,
            ElementKind::TableRow | ElementKind::TableCell { .. }
        ),
        Node::Media(_) | Node::Attachment(_) => true,
        Node::Text(_) | Node::Formula(_) => false,
    }
}

/// Index of the point closest to `y`. Ties keep the earliest point, which is
/// the first in document order with "above" before "below".
fn nearest(points: &[DropPoint], y: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, point) in points.iter().enumerate() {
        let distance = (point.top - y).abs();
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((i, distance));
        }
    }
    best.map(|(i, _)| i)
}

fn commit(doc: &mut Document, log: &mut OperationLog, drag: &ActiveDrag) -> Result<ReorderOutcome> {
    let source = &drag.source;
    if doc.generation() != drag.generation {
        return Err(LeafnotesError::InvalidPath(source.clone()));
    }
    let Some(point) = drag.current.and_then(|i| drag.points.get(i)) else {
        return Ok(ReorderOutcome::Unchanged);
    };
    if point.anchor == *source || source.is_ancestor(&point.anchor) {
        return Ok(ReorderOutcome::Unchanged);
    }
    let source_is_item = doc.get(source)?.is_list_item();
    let mut dest = point.destination();
    if !source_is_item
        && !dest.has_previous()
        && doc.get(&dest.parent()).is_ok_and(Node::is_list_item)
    {
        dest = dest.next();
    }
    if dest == *source || dest.is_next_of(source) {
        return Ok(ReorderOutcome::Unchanged);
    }
    let beside_item = doc
        .get(&dest.parent())
        .ok()
        .and_then(Node::kind)
        .is_some_and(|k| matches!(k, ElementKind::List { .. }));
    if source_is_item && !beside_item {
        // A sole item dropped beside its own list stays where it is.
        let list = source.parent();
        let sole = doc.get(&list)?.children().len() == 1;
        if sole && (dest == list || dest.is_next_of(&list)) {
            return Ok(ReorderOutcome::Unchanged);
        }
    }

    let moved = doc.transaction(log, |tx| {
        let (moved, parent) = if source_is_item && !beside_item {
            extract_list_item(tx, source, &dest)?
        } else {
            let at = tx.move_node(source, &dest)?;
            let parent = source.parent().transform(&PathOp::Move {
                from: source.clone(),
                to: at.clone(),
            });
            (at, parent)
        };
        let parent = parent.ok_or_else(|| {
            LeafnotesError::InvalidMove(format!("parent of {source} vanished during the move"))
        })?;
        prune_empty_ancestors(tx, parent, moved)
    })?;
    log::info!("moved {source} to {moved}");
    Ok(ReorderOutcome::Moved { path: moved })
}

/// Moves a list item out of its list, wrapping it alone in a new list of the
/// same kind at `dest`. Returns the new list's path and the old parent's
/// path after the move.
fn extract_list_item(
    tx: &mut Transaction,
    source: &Path,
    dest: &Path,
) -> Result<(Path, Option<Path>)> {
    let kind = tx
        .get(&source.parent())?
        .kind()
        .filter(|k| matches!(k, ElementKind::List { .. }))
        .cloned()
        .ok_or_else(|| LeafnotesError::InvalidMove(format!("{source} is not inside a list")))?;
    let item = tx.remove_node(source)?;
    let removal = PathOp::Remove {
        path: source.clone(),
    };
    let at = dest
        .transform(&removal)
        .ok_or_else(|| LeafnotesError::InvalidPath(dest.clone()))?;
    tx.insert_nodes(&at, vec![Node::element(kind, vec![item])])?;
    let parent = source
        .parent()
        .transform(&removal)
        .and_then(|p| p.transform(&PathOp::Insert { path: at.clone() }));
    Ok((at, parent))
}

/// Deletes containers left empty by the move, innermost first, and carries
/// the moved node's path across each deletion.
fn prune_empty_ancestors(tx: &mut Transaction, mut parent: Path, mut moved: Path) -> Result<Path> {
    while !parent.is_root() && tx.get(&parent)?.children().is_empty() {
        tx.remove_node(&parent)?;
        moved = moved
            .transform(&PathOp::Remove {
                path: parent.clone(),
            })
            .ok_or_else(|| LeafnotesError::InvalidPath(moved.clone()))?;
        parent = parent.parent();
    }
    Ok(moved)
}
