//! Inserting and selecting media blocks.

use crate::{
    navigator, Document, FileRef, LayoutProvider, LeafnotesError, Node, OperationLog, Path,
    Result, ScrollSettings, Selection, Viewport,
};

/// Inserts one media block per file at the caret's insertion point and
/// returns a selection of the last inserted block.
///
/// Media lands after the block holding the caret. An empty paragraph under
/// the caret is replaced instead, and an empty paragraph directly after the
/// inserted run is dropped. Without a selection the media is appended to
/// the end of the document. Returns `Ok(None)` when `files` is empty.
///
/// # Errors
///
/// Returns [`LeafnotesError::InvalidPath`] when the selection does not
/// resolve against `doc`. The document is unchanged on error.
pub fn insert_media(
    doc: &mut Document,
    log: &mut OperationLog,
    selection: Option<&Selection>,
    files: &[FileRef],
) -> Result<Option<Selection>> {
    if files.is_empty() {
        return Ok(None);
    }
    let (at, replace) = insertion_point(doc, selection)?;
    let count = files.len();
    let nodes = files.iter().cloned().map(Node::Media).collect();
    let last = doc.transaction(log, |tx| {
        if replace {
            tx.remove_node(&at)?;
        }
        tx.insert_nodes(&at, nodes)?;
        let mut indices = at.indices().to_vec();
        if let Some(i) = indices.last_mut() {
            *i += count - 1;
        }
        let last = Path::new(indices);
        let after = last.next();
        let trailing_blank = tx
            .get(&after)
            .is_ok_and(|n| n.is_paragraph() && n.string().is_empty());
        if trailing_blank {
            tx.remove_node(&after)?;
        }
        Ok(last)
    })?;
    log::debug!("inserted {count} media blocks at {at}");
    Ok(Some(Selection::node(last)))
}

/// Selects the media or attachment block at `path`, scrolling it back into
/// view when it starts above the top of the viewport.
///
/// # Errors
///
/// Returns [`LeafnotesError::InvalidPath`] when `path` does not address a
/// media or attachment node.
pub fn select_media(
    doc: &Document,
    layout: &dyn LayoutProvider,
    viewport: &mut dyn Viewport,
    settings: &ScrollSettings,
    path: &Path,
) -> Result<Selection> {
    if !doc.get(path)?.is_file_void() {
        return Err(LeafnotesError::InvalidPath(path.clone()));
    }
    if let Some(rect) = layout.element_rect(path) {
        if viewport.scroll_top() > rect.top {
            viewport.scroll_to(rect.top - settings.media_margin);
        }
    }
    Ok(Selection::node(path.clone()))
}

/// Where new media goes, and whether the block there is an empty paragraph
/// to be replaced.
fn insertion_point(doc: &Document, selection: Option<&Selection>) -> Result<(Path, bool)> {
    let Some(selection) = selection else {
        return Ok((Path::new(vec![doc.children().len()]), false));
    };
    let focus = selection.focus_path();
    doc.get(focus)?;
    let mut block = navigator::unit_of(doc, focus);
    while !doc.is_block_position(&block) {
        block = block.parent();
    }
    let node = doc.get(&block)?;
    if node.is_paragraph() && node.string().is_empty() {
        Ok((block, true))
    } else {
        Ok((block.next(), false))
    }
}
