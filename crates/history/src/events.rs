//! Requests and notices exchanged between the editor session and the history.

use bevy::prelude::*;

/// A command for the undo history, processed in the order sent.
///
/// Any in-progress interactive edit (e.g. a path being drawn) must be
/// aborted before sending `Undo` or `Redo`; the loaded snapshot knows
/// nothing about uncommitted gesture state.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryRequest {
    /// Snapshot the live level as a new undoable edit.
    Store,
    /// Re-save the current slot after a non-undoable change (e.g. a rename).
    Overwrite,
    Undo,
    Redo,
    /// Resize the history capacity.
    SetMaxUndoLevels(usize),
    /// Start a fresh history from the live level.
    Restart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeSeverity {
    Info,
    Warning,
    Error,
}

/// User-facing message about a history operation.
#[derive(Event, Debug, Clone)]
pub struct HistoryNotice {
    pub text: String,
    pub severity: NoticeSeverity,
}

impl HistoryNotice {
    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            severity: NoticeSeverity::Warning,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            severity: NoticeSeverity::Error,
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            severity: NoticeSeverity::Info,
        }
    }
}
