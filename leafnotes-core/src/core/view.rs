//! Interfaces to the rendering layer and the scrollable viewport.
//!
//! The core never renders anything itself. It asks a [`LayoutProvider`] where
//! nodes ended up on screen and drives a [`Viewport`] to bring targets into
//! view. All coordinates are in the scroll container's content space unless
//! stated otherwise.

use crate::{NodeId, Path};

/// An on-screen box in content coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Rect {
            left,
            top,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// Extra presentation facts about a rendered element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ElementFlags {
    /// The list item renders a task checkbox.
    pub task: bool,
    /// The element is hidden metadata (front matter) and never a drop target.
    pub frontmatter: bool,
}

/// Resolves tree positions to their rendered geometry.
pub trait LayoutProvider {
    /// The box of the element at `path`, or `None` when it is not currently
    /// mounted on screen.
    fn element_rect(&self, path: &Path) -> Option<Rect>;

    /// Top offset of row `row` of the sub-editor backing `block`.
    fn code_line_top(&self, block: NodeId, row: usize) -> Option<f64>;

    fn element_flags(&self, _path: &Path) -> ElementFlags {
        ElementFlags::default()
    }
}

/// The scroll container the document is rendered in.
pub trait Viewport {
    /// Current vertical scroll offset.
    fn scroll_top(&self) -> f64;

    /// Visible height of the container.
    fn height(&self) -> f64;

    fn scroll_to(&mut self, top: f64);

    fn scroll_by(&mut self, delta: f64);
}
