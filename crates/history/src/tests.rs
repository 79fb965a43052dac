//! Unit tests for the undo stack, driven by an in-memory level.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::error::HistoryError;
use crate::resume::{MemoryResumeStore, ResumePointer};
use crate::serializer::LevelSerializer;
use crate::slot::{SessionNamespace, SlotId};
use crate::undo_stack::{UndoStack, DEFAULT_MAX_UNDO_LEVELS};

#[derive(Debug)]
struct FakeIoError(&'static str);

impl fmt::Display for FakeIoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl std::error::Error for FakeIoError {}

/// A "world" that is a single number, with snapshots kept in a map.
#[derive(Default)]
struct MemoryLevel {
    live: u32,
    slots: HashMap<SlotId, u32>,
    fail_saves: bool,
    fail_discards: bool,
    unreadable: HashSet<SlotId>,
}

impl MemoryLevel {
    fn edit(&mut self, value: u32) {
        self.live = value;
    }
}

impl LevelSerializer for MemoryLevel {
    type Error = FakeIoError;

    fn save(&mut self, slot: &SlotId) -> Result<(), FakeIoError> {
        if self.fail_saves {
            return Err(FakeIoError("disk full"));
        }
        self.slots.insert(slot.clone(), self.live);
        Ok(())
    }

    fn load(&mut self, slot: &SlotId) -> Result<(), FakeIoError> {
        if self.unreadable.contains(slot) {
            return Err(FakeIoError("corrupt snapshot"));
        }
        let value = self.slots.get(slot).ok_or(FakeIoError("missing snapshot"))?;
        self.live = *value;
        Ok(())
    }

    fn slot_exists(&self, slot: &SlotId) -> bool {
        self.slots.contains_key(slot)
    }

    fn discard(&mut self, slot: &SlotId) -> Result<(), FakeIoError> {
        if self.fail_discards {
            return Err(FakeIoError("read-only storage"));
        }
        self.slots.remove(slot);
        Ok(())
    }
}

/// Sequences of every snapshot still held by the level, sorted.
fn stored(level: &MemoryLevel) -> Vec<u64> {
    let mut sequences: Vec<u64> = level.slots.keys().map(|s| s.sequence).collect();
    sequences.sort_unstable();
    sequences
}

fn ns() -> SessionNamespace {
    SessionNamespace::new("NS")
}

fn slot(sequence: u64) -> SlotId {
    SlotId::new(ns(), sequence)
}

fn stack(capacity: usize) -> UndoStack {
    UndoStack::new(ns(), capacity, MemoryResumeStore::default()).unwrap()
}

fn sequences(stack: &UndoStack) -> Vec<u64> {
    stack.reachable_slots().iter().map(|s| s.sequence).collect()
}

/// Init, then store one edit per value.
fn history_with_edits(capacity: usize, edits: &[u32]) -> (UndoStack, MemoryLevel) {
    let mut level = MemoryLevel::default();
    let mut stack = stack(capacity);
    stack.init(&mut level).unwrap();
    for &value in edits {
        level.edit(value);
        stack.store(&mut level).unwrap();
    }
    (stack, level)
}

// ---------------------------------------------------------------------------
// Bounds and basic stepping
// ---------------------------------------------------------------------------

#[test]
fn test_fresh_init_has_nothing_to_step_to() {
    let (mut stack, mut level) = history_with_edits(DEFAULT_MAX_UNDO_LEVELS, &[]);

    assert!(!stack.have_undo());
    assert!(!stack.have_redo());
    assert!(!stack.have_anything());
    assert!(!stack.undo(&mut level).unwrap());
    assert!(!stack.redo(&mut level).unwrap());
    assert_eq!(stack.position(), 0);
    assert_eq!(stack.num_undo(), 0);
    assert_eq!(stack.num_redo(), 0);
    assert_eq!(stack.current_slot(), Some(&slot(0)));
}

#[test]
fn test_undo_twice_returns_to_initial_slot() {
    let (mut stack, mut level) = history_with_edits(DEFAULT_MAX_UNDO_LEVELS, &[10, 20]);

    assert!(stack.undo(&mut level).unwrap());
    assert!(stack.undo(&mut level).unwrap());

    assert_eq!(stack.current_slot(), Some(&slot(0)));
    assert_eq!(level.live, 0);
    assert!(!stack.have_undo());
    assert_eq!(stack.num_redo(), 2);
}

#[test]
fn test_store_after_undo_discards_redo() {
    let (mut stack, mut level) = history_with_edits(DEFAULT_MAX_UNDO_LEVELS, &[10, 20]);

    stack.undo(&mut level).unwrap();
    assert!(stack.have_redo());

    level.edit(30);
    stack.store(&mut level).unwrap();

    assert!(!stack.have_redo());
    assert_eq!(stack.num_redo(), 0);
    assert!(!stack.redo(&mut level).unwrap());
    assert_eq!(level.live, 30);
    // The abandoned edit is neither reachable nor kept in storage.
    assert_eq!(sequences(&stack), vec![0, 1, 3]);
    assert_eq!(stored(&level), vec![0, 1, 3]);
}

#[test]
fn test_store_after_undo_to_base_clears_whole_future() {
    let (mut stack, mut level) = history_with_edits(5, &[1, 2, 3]);
    for _ in 0..3 {
        stack.undo(&mut level).unwrap();
    }
    level.edit(9);
    stack.store(&mut level).unwrap();

    assert_eq!(sequences(&stack), vec![0, 4]);
    assert_eq!(stored(&level), vec![0, 4]);
    assert_eq!(stack.num_undo(), 1);
    assert!(!stack.have_redo());
}

#[test]
fn test_concrete_default_capacity_scenario() {
    let mut level = MemoryLevel::default();
    let mut stack = stack(DEFAULT_MAX_UNDO_LEVELS);
    assert_eq!(stack.max_undo_level(), 11);

    stack.init(&mut level).unwrap();
    assert_eq!(stack.current_slot().unwrap().to_string(), "NS/AutoSave0");

    level.edit(1);
    stack.store(&mut level).unwrap();
    assert_eq!(stack.position(), 1);
    assert_eq!(stack.current_slot().unwrap().to_string(), "NS/AutoSave1");
    assert_eq!(stack.num_undo(), 1);

    level.edit(2);
    stack.store(&mut level).unwrap();
    assert_eq!(stack.position(), 2);
    assert_eq!(stack.num_undo(), 2);

    assert!(stack.undo(&mut level).unwrap());
    assert_eq!(stack.position(), 1);
    assert_eq!(level.live, 1);

    assert!(stack.redo(&mut level).unwrap());
    assert_eq!(stack.position(), 2);
    assert_eq!(level.live, 2);
}

// ---------------------------------------------------------------------------
// Capacity
// ---------------------------------------------------------------------------

#[test]
fn test_full_log_evicts_oldest() {
    let (mut stack, mut level) = history_with_edits(3, &[1, 2, 3, 4, 5]);

    assert_eq!(stack.num_undo(), 2);
    assert_eq!(sequences(&stack), vec![3, 4, 5]);
    assert_eq!(stored(&level), vec![3, 4, 5]);

    assert!(stack.undo(&mut level).unwrap());
    assert!(stack.undo(&mut level).unwrap());
    assert!(!stack.undo(&mut level).unwrap());
    assert_eq!(level.live, 3);
    assert_eq!(stack.current_slot(), Some(&slot(3)));
}

#[test]
fn test_capacity_one_keeps_only_current() {
    let (mut stack, mut level) = history_with_edits(1, &[1, 2]);

    assert_eq!(stack.num_undo(), 0);
    assert!(!stack.undo(&mut level).unwrap());
    assert_eq!(stack.current_slot(), Some(&slot(2)));
    assert_eq!(stored(&level), vec![2]);
}

#[test]
fn test_trim_keeps_recent_lineage() {
    let (mut stack, mut level) = history_with_edits(DEFAULT_MAX_UNDO_LEVELS, &[1, 2, 3, 4]);
    let before = stack.current_slot().cloned();

    stack.trim_stack(&mut level, 3).unwrap();

    assert_eq!(stack.max_undo_level(), 3);
    assert!(stack.num_undo() <= 2);
    assert!(!stack.have_redo());
    assert_eq!(stack.current_slot().cloned(), before);
    assert_eq!(sequences(&stack), vec![2, 3, 4]);
    assert_eq!(stored(&level), vec![2, 3, 4]);
}

#[test]
fn test_trim_discards_redo() {
    let (mut stack, mut level) = history_with_edits(DEFAULT_MAX_UNDO_LEVELS, &[1, 2, 3]);
    stack.undo(&mut level).unwrap();
    assert!(stack.have_redo());

    stack.trim_stack(&mut level, 10).unwrap();

    assert!(!stack.have_redo());
    assert_eq!(stack.num_undo(), 2);
    assert_eq!(stack.current_slot(), Some(&slot(2)));
    assert_eq!(stored(&level), vec![0, 1, 2]);
}

#[test]
fn test_trim_grow_then_store_wraps_correctly() {
    let (mut stack, mut level) = history_with_edits(3, &[1, 2, 3, 4]);
    stack.set_max_undo_level(&mut level, 5).unwrap();
    assert_eq!(stack.max_undo_level(), 5);
    assert_eq!(sequences(&stack), vec![2, 3, 4]);

    for value in 5..=7 {
        level.edit(value);
        stack.store(&mut level).unwrap();
    }
    assert_eq!(stack.num_undo(), 4);
    assert_eq!(sequences(&stack), vec![3, 4, 5, 6, 7]);
    assert_eq!(stored(&level), vec![3, 4, 5, 6, 7]);
}

#[test]
fn test_trim_same_capacity_is_noop() {
    let (mut stack, mut level) = history_with_edits(4, &[1, 2]);
    stack.undo(&mut level).unwrap();
    stack.trim_stack(&mut level, 4).unwrap();
    assert!(stack.have_redo());
    assert_eq!(stored(&level), vec![0, 1, 2]);
}

#[test]
fn test_trim_rejects_zero() {
    let (mut stack, mut level) = history_with_edits(4, &[1]);
    assert!(matches!(
        stack.trim_stack(&mut level, 0),
        Err(HistoryError::InvalidCapacity(0))
    ));
    assert_eq!(stack.max_undo_level(), 4);
}

#[test]
fn test_new_rejects_zero_capacity() {
    let result = UndoStack::new(ns(), 0, MemoryResumeStore::default());
    assert!(matches!(result, Err(HistoryError::InvalidCapacity(0))));
}

// ---------------------------------------------------------------------------
// Failure handling
// ---------------------------------------------------------------------------

#[test]
fn test_failed_undo_leaves_pointers_unchanged() {
    let (mut stack, mut level) = history_with_edits(DEFAULT_MAX_UNDO_LEVELS, &[1, 2]);
    level.unreadable.insert(slot(1));

    let err = stack.undo(&mut level).unwrap_err();
    assert!(matches!(err, HistoryError::Load { .. }));
    assert_eq!(err.slot(), Some(&slot(1)));
    assert_eq!(stack.position(), 2);
    assert_eq!(stack.num_undo(), 2);
    assert_eq!(level.live, 2);
    assert_eq!(
        stack.resume_store().last_autosave(),
        Some(ResumePointer {
            index: 2,
            sequence: 2
        })
    );
}

#[test]
fn test_failed_redo_leaves_pointers_unchanged() {
    let (mut stack, mut level) = history_with_edits(DEFAULT_MAX_UNDO_LEVELS, &[1]);
    stack.undo(&mut level).unwrap();
    level.slots.remove(&slot(1));

    assert!(stack.redo(&mut level).is_err());
    assert_eq!(stack.position(), 0);
    assert!(stack.have_redo());
}

#[test]
fn test_failed_store_records_nothing() {
    let (mut stack, mut level) = history_with_edits(DEFAULT_MAX_UNDO_LEVELS, &[1]);
    level.fail_saves = true;
    level.edit(2);

    let err = stack.store(&mut level).unwrap_err();
    assert!(matches!(err, HistoryError::Save { .. }));
    assert_eq!(stack.position(), 1);
    assert_eq!(stack.num_undo(), 1);
    // The edit stays applied to the live world.
    assert_eq!(level.live, 2);

    level.fail_saves = false;
    stack.store(&mut level).unwrap();
    assert_eq!(stack.num_undo(), 2);
}

#[test]
fn test_failed_init_keeps_previous_history() {
    let (mut stack, mut level) = history_with_edits(DEFAULT_MAX_UNDO_LEVELS, &[1, 2]);
    level.fail_saves = true;

    assert!(stack.init(&mut level).is_err());
    assert_eq!(stack.num_undo(), 2);
}

// ---------------------------------------------------------------------------
// Overwrite, dirty flag, lazy start
// ---------------------------------------------------------------------------

#[test]
fn test_overwrite_top_of_stack() {
    let mut level = MemoryLevel::default();
    let mut stack = stack(4);
    assert!(!stack.overwrite_top_of_stack(&mut level).unwrap());

    stack.init(&mut level).unwrap();
    level.edit(42);
    assert!(stack.overwrite_top_of_stack(&mut level).unwrap());

    assert_eq!(stack.position(), 0);
    assert!(!stack.have_anything());
    assert_eq!(level.slots[&slot(0)], 42);
}

#[test]
fn test_store_before_init_starts_history() {
    let mut level = MemoryLevel::default();
    let mut stack = stack(4);
    level.edit(5);
    stack.store(&mut level).unwrap();

    assert_eq!(stack.current_slot(), Some(&slot(0)));
    assert!(!stack.have_undo());
}

#[test]
fn test_unsaved_edits_flag() {
    let (mut stack, mut level) = history_with_edits(4, &[]);
    assert!(!stack.has_unsaved_edits());

    level.edit(1);
    stack.store(&mut level).unwrap();
    assert!(stack.has_unsaved_edits());

    stack.mark_saved();
    assert!(!stack.has_unsaved_edits());

    stack.init(&mut level).unwrap();
    assert!(!stack.has_unsaved_edits());
}

#[test]
fn test_sequences_never_repeat_across_wraps() {
    let (stack, level) = history_with_edits(2, &[1, 2, 3, 4, 5, 6]);
    assert_eq!(stack.current_slot(), Some(&slot(6)));
    assert_eq!(sequences(&stack), vec![5, 6]);
    assert_eq!(stored(&level), vec![5, 6]);
}

// ---------------------------------------------------------------------------
// Storage is bounded by the capacity
// ---------------------------------------------------------------------------

#[test]
fn test_storage_never_exceeds_capacity() {
    let mut level = MemoryLevel::default();
    let mut stack = stack(3);
    stack.init(&mut level).unwrap();
    for value in 1..=50 {
        level.edit(value);
        stack.store(&mut level).unwrap();
        assert!(level.slots.len() <= 3, "{} snapshots kept", level.slots.len());
    }
    assert_eq!(stored(&level), vec![48, 49, 50]);
}

#[test]
fn test_restart_discards_previous_history() {
    let (mut stack, mut level) = history_with_edits(DEFAULT_MAX_UNDO_LEVELS, &[1, 2, 3]);
    stack.undo(&mut level).unwrap();

    stack.init(&mut level).unwrap();

    assert_eq!(stored(&level), vec![0]);
    assert_eq!(level.slots[&slot(0)], 2);
    assert!(!stack.have_anything());
}

#[test]
fn test_failed_discard_still_commits_store() {
    let (mut stack, mut level) = history_with_edits(2, &[1]);
    level.fail_discards = true;
    level.edit(2);

    stack.store(&mut level).unwrap();

    assert_eq!(stack.current_slot(), Some(&slot(2)));
    assert_eq!(sequences(&stack), vec![1, 2]);
    // The evicted snapshot is left behind, nothing else goes wrong.
    assert_eq!(stored(&level), vec![0, 1, 2]);
}

// ---------------------------------------------------------------------------
// Resume pointer
// ---------------------------------------------------------------------------

#[test]
fn test_resume_pointer_tracks_position() {
    let (mut stack, mut level) = history_with_edits(DEFAULT_MAX_UNDO_LEVELS, &[1, 2]);
    assert_eq!(
        stack.resume_store().last_autosave(),
        Some(ResumePointer {
            index: 2,
            sequence: 2
        })
    );

    stack.undo(&mut level).unwrap();
    assert_eq!(
        stack.resume_store().last_autosave(),
        Some(ResumePointer {
            index: 1,
            sequence: 1
        })
    );
}

#[test]
fn test_resume_continues_previous_session() {
    let (old_stack, mut level) = history_with_edits(DEFAULT_MAX_UNDO_LEVELS, &[1, 2, 3]);
    let pointer = old_stack.resume_store().last_autosave().unwrap();
    drop(old_stack);
    level.edit(0);

    let mut stack = UndoStack::new(
        ns(),
        DEFAULT_MAX_UNDO_LEVELS,
        MemoryResumeStore::with_pointer(pointer),
    )
    .unwrap();
    assert!(stack.have_resume(&level));
    assert!(stack.resume(&mut level).unwrap());

    assert_eq!(level.live, 3);
    assert_eq!(stack.position(), 3);
    assert!(!stack.have_anything());

    level.edit(4);
    stack.store(&mut level).unwrap();
    assert_eq!(stack.current_slot(), Some(&slot(4)));
    assert_eq!(stack.num_undo(), 1);
    assert!(stack.undo(&mut level).unwrap());
    assert_eq!(level.live, 3);
}

#[test]
fn test_resume_without_snapshot_is_not_an_error() {
    let mut level = MemoryLevel::default();
    let mut stale = UndoStack::new(
        ns(),
        DEFAULT_MAX_UNDO_LEVELS,
        MemoryResumeStore::with_pointer(ResumePointer {
            index: 3,
            sequence: 3,
        }),
    )
    .unwrap();

    assert!(!stale.have_resume(&level));
    assert!(!stale.resume(&mut level).unwrap());
    assert!(stale.current_slot().is_none());

    let mut empty = stack(4);
    assert!(!empty.resume(&mut level).unwrap());
}

#[test]
fn test_resume_index_beyond_capacity_wraps() {
    let mut level = MemoryLevel::default();
    level.slots.insert(slot(20), 7);
    let mut stack = UndoStack::new(
        ns(),
        4,
        MemoryResumeStore::with_pointer(ResumePointer {
            index: 9,
            sequence: 20,
        }),
    )
    .unwrap();

    assert!(stack.resume(&mut level).unwrap());
    assert_eq!(stack.position(), 1);
    assert_eq!(level.live, 7);
}

#[test]
fn test_init_from_failure_is_reported() {
    let mut level = MemoryLevel::default();
    let mut stack = stack(4);
    let err = stack.init_from(&mut level, slot(5), 2).unwrap_err();
    assert!(matches!(err, HistoryError::Load { .. }));
    assert!(stack.current_slot().is_none());
}

#[test]
fn test_resume_pointer_serializes() {
    let pointer = ResumePointer {
        index: 4,
        sequence: 17,
    };
    let json = serde_json::to_string(&pointer).unwrap();
    let back: ResumePointer = serde_json::from_str(&json).unwrap();
    assert_eq!(back, pointer);
}
