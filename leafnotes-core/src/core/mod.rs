//! Internal domain modules for the Leafnotes core library.
//!
//! All public types from these modules are re-exported at the crate root
//! with `#[doc(inline)]`; import from there in preference to this module.

pub mod code_editor;
pub mod document;
pub mod error;
pub mod keyboard;
pub mod media;
pub mod navigator;
pub mod node;
pub mod operation;
pub mod operation_log;
pub mod path;
pub mod reorder;
pub mod search;
pub mod selection;
pub mod session;
pub mod settings;
pub mod view;

#[doc(inline)]
pub use code_editor::{
    BufferFocus, CodeEditor, CodeEditorRegistry, CodePosition, CodeRange, MarkerClass, MarkerId,
    TextBufferEditor,
};
#[doc(inline)]
pub use document::{Document, Edge, Transaction};
#[doc(inline)]
pub use error::{LeafnotesError, Result};
#[doc(inline)]
pub use keyboard::{ArrowKey, KeyInput, KeyboardNav, Navigation};
#[doc(inline)]
pub use media::{insert_media, select_media};
#[doc(inline)]
pub use navigator::NodeClass;
#[doc(inline)]
pub use node::{Element, ElementKind, FileRef, Formula, Marks, Node, NodeId, Text};
#[doc(inline)]
pub use operation::Operation;
#[doc(inline)]
pub use operation_log::{OperationLog, OperationSummary, PurgeStrategy};
#[doc(inline)]
pub use path::{Path, PathOp};
#[doc(inline)]
pub use reorder::{DragController, DropIndicator, DropPoint, DropSide, ReorderOutcome};
#[doc(inline)]
pub use search::{HighlightRange, SearchEngine, SearchMatch};
#[doc(inline)]
pub use selection::{Point, Selection};
#[doc(inline)]
pub use session::EditorSession;
#[doc(inline)]
pub use settings::{
    load_settings, save_settings, settings_file_path, DragSettings, EditorSettings,
    OperationLogSettings, ScrollSettings, SearchSettings,
};
#[doc(inline)]
pub use view::{ElementFlags, LayoutProvider, Rect, Viewport};
