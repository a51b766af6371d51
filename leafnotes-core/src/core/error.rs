//! Error types for the Leafnotes core library.

use crate::{NodeId, Path};
use thiserror::Error;

/// All errors that can occur within the Leafnotes core library.
///
/// Running out of positions or matches is not an error: navigation and search
/// report those boundaries through `Option` or an explicit outcome value.
#[derive(Debug, Error)]
pub enum LeafnotesError {
    /// A path no longer resolves against the current document snapshot.
    #[error("Invalid path: {0}")]
    InvalidPath(Path),

    /// A previous sibling was requested for a path whose last index is 0.
    #[error("No previous sibling for path {0}")]
    NoSibling(Path),

    /// A code block is in the tree but has no live sub-editor registered.
    #[error("No sub-editor mounted for code block {0}")]
    MissingSubEditor(NodeId),

    /// A structural move was rejected before touching the tree.
    #[error("Invalid move: {0}")]
    InvalidMove(String),

    /// A mutation would have left a table or list in an inconsistent state.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// A drag operation was advanced without a drag gesture in progress.
    #[error("No drag in progress")]
    DragNotActive,

    /// The search keyword could not be compiled into a matcher.
    #[error("Invalid search pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// An I/O operation on the settings file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The settings file could not be (de)serialised.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias that pins the error type to [`LeafnotesError`].
pub type Result<T> = std::result::Result<T, LeafnotesError>;

impl LeafnotesError {
    /// Whether the current gesture can simply be abandoned when this error
    /// occurs, leaving the session untouched.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Io(_) | Self::Json(_))
    }
}
