//! Undo/Redo history for a level editor.
//!
//! Every committed edit is snapshotted into a named slot by a
//! [`LevelSerializer`]. [`UndoStack`] keeps a fixed-capacity circular log of
//! those slot names together with three pointers (oldest undoable, current,
//! newest redoable) and moves between them by loading snapshots back into the
//! live world. The current position is mirrored into a [`ResumeStore`] so a
//! later launch can pick up where the previous session stopped.
//!
//! The engine knows nothing about what a level contains; it only manages
//! slots and pointers.

pub mod error;
pub mod events;
pub mod resume;
pub mod serializer;
pub mod slot;
pub mod undo_stack;

#[cfg(test)]
mod tests;

pub use error::HistoryError;
pub use events::{HistoryNotice, HistoryRequest, NoticeSeverity};
pub use resume::{MemoryResumeStore, ResumePointer, ResumeStore};
pub use serializer::LevelSerializer;
pub use slot::{SessionNamespace, SlotId, SlotIdParseError};
pub use undo_stack::{UndoStack, DEFAULT_MAX_UNDO_LEVELS};
