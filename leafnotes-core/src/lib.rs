//! Core editing engine for Leafnotes, a local-first note-taking application.
//!
//! A note is a [`Document`]: an ordered tree of block and inline nodes
//! addressed by [`Path`]. The engine moves the caret across that tree with
//! the arrow keys, reorders blocks by drag and drop, and searches rich text
//! and code blocks for a keyword. [`EditorSession`] bundles all of this
//! state for one open note.
//!
//! Types are re-exported from their respective sub-modules for convenience;
//! consumers should import from the crate root rather than the `core` module.

pub mod core;

pub use core::{navigator, view};

// Re-export commonly used types.
#[doc(inline)]
pub use core::{
    code_editor::{
        BufferFocus, CodeEditor, CodeEditorRegistry, CodePosition, CodeRange, MarkerClass,
        MarkerId, TextBufferEditor,
    },
    document::{Document, Edge, Transaction},
    error::{LeafnotesError, Result},
    keyboard::{ArrowKey, KeyInput, KeyboardNav, Navigation},
    media,
    navigator::NodeClass,
    node::{Element, ElementKind, FileRef, Formula, Marks, Node, NodeId, Text},
    operation::Operation,
    operation_log::{OperationLog, OperationSummary, PurgeStrategy},
    path::{Path, PathOp},
    reorder::{DragController, DropIndicator, DropPoint, DropSide, ReorderOutcome},
    search::{HighlightRange, SearchEngine, SearchMatch},
    selection::{Point, Selection},
    session::EditorSession,
    settings::{
        load_settings, save_settings, settings_file_path, DragSettings, EditorSettings,
        OperationLogSettings, ScrollSettings, SearchSettings,
    },
    view::{ElementFlags, LayoutProvider, Rect, Viewport},
};
