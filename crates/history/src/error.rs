// ---------------------------------------------------------------------------
// HistoryError: failures surfaced by the undo/redo engine
// ---------------------------------------------------------------------------

use std::error::Error;
use std::fmt;

use crate::slot::SlotId;

type BoxedSource = Box<dyn Error + Send + Sync + 'static>;

/// Errors returned by [`crate::UndoStack`] operations.
///
/// Pointer arithmetic cannot fail; only the snapshot I/O behind it can.
#[derive(Debug)]
pub enum HistoryError {
    /// Writing the live world into a slot failed. The edit that triggered
    /// the store is still applied but was not recorded.
    Save { slot: SlotId, source: BoxedSource },
    /// Reading a slot back failed. The live world and pointers are unchanged.
    Load { slot: SlotId, source: BoxedSource },
    /// A capacity of zero was requested.
    InvalidCapacity(usize),
}

impl HistoryError {
    pub(crate) fn save(slot: &SlotId, source: impl Error + Send + Sync + 'static) -> Self {
        HistoryError::Save {
            slot: slot.clone(),
            source: Box::new(source),
        }
    }

    pub(crate) fn load(slot: &SlotId, source: impl Error + Send + Sync + 'static) -> Self {
        HistoryError::Load {
            slot: slot.clone(),
            source: Box::new(source),
        }
    }

    /// The slot involved in the failed I/O, if any.
    pub fn slot(&self) -> Option<&SlotId> {
        match self {
            HistoryError::Save { slot, .. } | HistoryError::Load { slot, .. } => Some(slot),
            HistoryError::InvalidCapacity(_) => None,
        }
    }
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryError::Save { slot, source } => {
                write!(f, "Failed to save snapshot {slot}: {source}")
            }
            HistoryError::Load { slot, source } => {
                write!(f, "Failed to load snapshot {slot}: {source}")
            }
            HistoryError::InvalidCapacity(n) => {
                write!(f, "Invalid undo capacity {n}: must be at least 1")
            }
        }
    }
}

impl Error for HistoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            HistoryError::Save { source, .. } | HistoryError::Load { source, .. } => {
                Some(source.as_ref())
            }
            HistoryError::InvalidCapacity(_) => None,
        }
    }
}
