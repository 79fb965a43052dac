//! The resume pointer: which slot was live when the last session ended.

use serde::{Deserialize, Serialize};

/// Persisted position of the live slot.
///
/// `index` is the ring position (`at`); `sequence` names the slot file that
/// was live there, since sequences do not wrap with the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumePointer {
    pub index: usize,
    pub sequence: u64,
}

/// User-settings backing for the resume pointer.
///
/// Written every time the current position moves. Implementations report
/// their own write failures; a lost resume pointer never fails an edit.
pub trait ResumeStore: Send + Sync {
    fn last_autosave(&self) -> Option<ResumePointer>;

    fn set_last_autosave(&mut self, pointer: ResumePointer);
}

/// Keeps the resume pointer in memory only.
#[derive(Debug, Default, Clone)]
pub struct MemoryResumeStore {
    pointer: Option<ResumePointer>,
}

impl MemoryResumeStore {
    pub fn with_pointer(pointer: ResumePointer) -> Self {
        Self {
            pointer: Some(pointer),
        }
    }
}

impl ResumeStore for MemoryResumeStore {
    fn last_autosave(&self) -> Option<ResumePointer> {
        self.pointer
    }

    fn set_last_autosave(&mut self, pointer: ResumePointer) {
        self.pointer = Some(pointer);
    }
}
