//! The undo stack: a circular log of snapshot slots.

use bevy::prelude::*;

use crate::error::HistoryError;
use crate::resume::{ResumePointer, ResumeStore};
use crate::serializer::LevelSerializer;
use crate::slot::{SessionNamespace, SlotId};

/// Number of history positions when nothing else is configured.
pub const DEFAULT_MAX_UNDO_LEVELS: usize = 11;

// ---------------------------------------------------------------------------
// UndoStack resource
// ---------------------------------------------------------------------------

/// Fixed-capacity circular log of level snapshots.
///
/// `idx_base` is the oldest position reachable by undo, `idx_top` the newest
/// reachable by redo, `idx_at` the slot currently materialized in the live
/// world. Walking forward from `idx_base` reaches `idx_at`, and from there
/// `idx_top`, all modulo the capacity.
///
/// Every operation that moves `idx_at` performs its snapshot I/O first and
/// only commits the pointer move once the I/O succeeded.
#[derive(Resource)]
pub struct UndoStack {
    namespace: SessionNamespace,
    slots: Vec<Option<SlotId>>,
    idx_base: usize,
    idx_top: usize,
    idx_at: usize,
    next_sequence: u64,
    unsaved_edits: bool,
    resume: Box<dyn ResumeStore>,
}

impl UndoStack {
    pub fn new(
        namespace: SessionNamespace,
        capacity: usize,
        resume: impl ResumeStore + 'static,
    ) -> Result<Self, HistoryError> {
        if capacity == 0 {
            return Err(HistoryError::InvalidCapacity(capacity));
        }
        Ok(Self {
            namespace,
            slots: vec![None; capacity],
            idx_base: 0,
            idx_top: 0,
            idx_at: 0,
            next_sequence: 0,
            unsaved_edits: false,
            resume: Box::new(resume),
        })
    }

    // -- Accessors ----------------------------------------------------------

    /// The deepest the stack can get.
    pub fn max_undo_level(&self) -> usize {
        self.slots.len()
    }

    /// Undo steps available before reaching the oldest snapshot.
    pub fn num_undo(&self) -> usize {
        (self.idx_at + self.capacity() - self.idx_base) % self.capacity()
    }

    /// Redo steps available before reaching the newest snapshot.
    pub fn num_redo(&self) -> usize {
        (self.idx_top + self.capacity() - self.idx_at) % self.capacity()
    }

    pub fn have_undo(&self) -> bool {
        self.idx_at != self.idx_base
    }

    pub fn have_redo(&self) -> bool {
        self.idx_at != self.idx_top
    }

    /// Whether there is any state to step to.
    pub fn have_anything(&self) -> bool {
        self.have_undo() || self.have_redo()
    }

    /// Slot currently loaded into the live world.
    pub fn current_slot(&self) -> Option<&SlotId> {
        self.slots[self.idx_at].as_ref()
    }

    /// Current ring position.
    pub fn position(&self) -> usize {
        self.idx_at
    }

    pub fn namespace(&self) -> &SessionNamespace {
        &self.namespace
    }

    /// Whether the live world has changed since the history was started.
    pub fn has_unsaved_edits(&self) -> bool {
        self.unsaved_edits
    }

    /// Clears the unsaved-edits flag, e.g. after the level was saved by name.
    pub fn mark_saved(&mut self) {
        self.unsaved_edits = false;
    }

    /// Every slot reachable by undo or redo, oldest first.
    pub fn reachable_slots(&self) -> Vec<&SlotId> {
        let span = self.num_undo() + self.num_redo();
        (0..=span)
            .filter_map(|i| self.slots[(self.idx_base + i) % self.capacity()].as_ref())
            .collect()
    }

    pub fn resume_store(&self) -> &dyn ResumeStore {
        self.resume.as_ref()
    }

    // -- Session start ------------------------------------------------------

    /// Starts a fresh history: snapshots the live world into slot
    /// `AutoSave0` and makes it the only entry.
    ///
    /// On failure the previous history is kept as it was.
    pub fn init<S: LevelSerializer>(&mut self, serializer: &mut S) -> Result<(), HistoryError> {
        let slot = SlotId::new(self.namespace.clone(), 0);
        serializer
            .save(&slot)
            .map_err(|e| HistoryError::save(&slot, e))?;

        info!("Undo history started at {slot}");
        self.reset_to(serializer, 0, slot);
        self.next_sequence = 1;
        self.unsaved_edits = false;
        Ok(())
    }

    /// Starts the history from an existing snapshot, loading it into the live
    /// world and adopting it as entry `index`.
    ///
    /// A load failure is returned as-is; nothing is retried and the history
    /// is left untouched.
    pub fn init_from<S: LevelSerializer>(
        &mut self,
        serializer: &mut S,
        slot: SlotId,
        index: usize,
    ) -> Result<(), HistoryError> {
        serializer
            .load(&slot)
            .map_err(|e| HistoryError::load(&slot, e))?;

        let index = index % self.capacity();
        info!("Undo history resumed from {slot} at position {index}");
        self.next_sequence = slot.sequence + 1;
        self.reset_to(serializer, index, slot);
        self.unsaved_edits = false;
        Ok(())
    }

    /// Whether the resume pointer names a snapshot that still exists.
    /// Only existence is checked, not integrity.
    pub fn have_resume<S: LevelSerializer>(&self, serializer: &S) -> bool {
        self.resume_slot()
            .is_some_and(|(slot, _)| serializer.slot_exists(&slot))
    }

    /// Continues the previous session from the resume pointer.
    ///
    /// Returns `Ok(false)` when there is nothing to resume; the caller should
    /// then start fresh with [`UndoStack::init`].
    pub fn resume<S: LevelSerializer>(&mut self, serializer: &mut S) -> Result<bool, HistoryError> {
        if !self.have_resume(&*serializer) {
            return Ok(false);
        }
        let Some((slot, index)) = self.resume_slot() else {
            return Ok(false);
        };
        self.init_from(serializer, slot, index)?;
        Ok(true)
    }

    // -- Edits --------------------------------------------------------------

    /// Records the live world as a new undoable edit.
    ///
    /// When the log is full the oldest snapshot is dropped. Any redo history
    /// is discarded. Dropped snapshots are handed to
    /// [`LevelSerializer::discard`]. If the save fails nothing about the
    /// history changes.
    pub fn store<S: LevelSerializer>(&mut self, serializer: &mut S) -> Result<(), HistoryError> {
        if self.current_slot().is_none() {
            return self.init(serializer);
        }

        let slot = SlotId::new(self.namespace.clone(), self.next_sequence);
        serializer
            .save(&slot)
            .map_err(|e| HistoryError::save(&slot, e))?;
        self.next_sequence += 1;

        let discarded_redo = self.num_redo();
        let next = self.step_forward(self.idx_at);
        let capacity = self.capacity();
        let mut dropped: Vec<SlotId> = (0..discarded_redo)
            .filter_map(|k| self.slots[(next + k) % capacity].take())
            .collect();
        self.idx_top = next;
        if next == self.idx_base {
            if let Some(evicted) = self.slots[self.idx_base].take() {
                debug!("Undo history full, dropped {evicted}");
                dropped.push(evicted);
            }
            self.idx_base = self.step_forward(self.idx_base);
        }

        debug!("Stored {slot} at position {next}");
        self.slots[next] = Some(slot);
        self.set_at(next);
        self.unsaved_edits = true;
        discard_all(serializer, dropped);
        Ok(())
    }

    /// Saves the live world over the current slot without moving anything.
    ///
    /// Returns whether there was a slot to overwrite.
    pub fn overwrite_top_of_stack<S: LevelSerializer>(
        &mut self,
        serializer: &mut S,
    ) -> Result<bool, HistoryError> {
        let Some(slot) = self.current_slot() else {
            return Ok(false);
        };
        serializer
            .save(slot)
            .map_err(|e| HistoryError::save(slot, e))?;
        Ok(true)
    }

    /// Steps back to the previous snapshot, if any.
    pub fn undo<S: LevelSerializer>(&mut self, serializer: &mut S) -> Result<bool, HistoryError> {
        if !self.have_undo() {
            return Ok(false);
        }
        let target = self.step_back(self.idx_at);
        self.move_to(serializer, target)
    }

    /// Steps forward to the next snapshot, if any.
    pub fn redo<S: LevelSerializer>(&mut self, serializer: &mut S) -> Result<bool, HistoryError> {
        if !self.have_redo() {
            return Ok(false);
        }
        let target = self.step_forward(self.idx_at);
        self.move_to(serializer, target)
    }

    // -- Capacity -----------------------------------------------------------

    /// Alias of [`UndoStack::trim_stack`].
    pub fn set_max_undo_level<S: LevelSerializer>(
        &mut self,
        serializer: &mut S,
        levels: usize,
    ) -> Result<(), HistoryError> {
        self.trim_stack(serializer, levels)
    }

    /// Resizes the log, keeping the newest part of the undo lineage that ends
    /// at the current slot. The current slot always survives; redo history
    /// is dropped, and every slot that no longer fits is discarded.
    pub fn trim_stack<S: LevelSerializer>(
        &mut self,
        serializer: &mut S,
        new_capacity: usize,
    ) -> Result<(), HistoryError> {
        if new_capacity == 0 {
            return Err(HistoryError::InvalidCapacity(new_capacity));
        }
        if new_capacity == self.capacity() {
            return Ok(());
        }

        let old_capacity = self.capacity();
        let kept = (self.num_undo() + 1).min(new_capacity);
        let first = (self.idx_at + old_capacity + 1 - kept) % old_capacity;

        let mut slots: Vec<Option<SlotId>> = (0..kept)
            .map(|i| self.slots[(first + i) % old_capacity].take())
            .collect();
        slots.resize(new_capacity, None);
        let dropped: Vec<SlotId> = self.slots.iter_mut().filter_map(Option::take).collect();

        debug!(
            "Undo history resized from {} to {} levels, kept {}",
            old_capacity, new_capacity, kept
        );
        self.slots = slots;
        self.idx_base = 0;
        self.idx_top = kept - 1;
        self.set_at(kept - 1);
        discard_all(serializer, dropped);
        Ok(())
    }

    // -- Internal -----------------------------------------------------------

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn step_forward(&self, i: usize) -> usize {
        (i + 1) % self.capacity()
    }

    fn step_back(&self, i: usize) -> usize {
        (i + self.capacity() - 1) % self.capacity()
    }

    /// Makes `slot` the only entry, discarding every other slot the log held.
    fn reset_to<S: LevelSerializer>(&mut self, serializer: &mut S, index: usize, slot: SlotId) {
        let capacity = self.capacity();
        let previous = std::mem::replace(&mut self.slots, vec![None; capacity]);
        let dropped: Vec<SlotId> = previous
            .into_iter()
            .flatten()
            .filter(|old| *old != slot)
            .collect();
        self.slots[index] = Some(slot);
        self.idx_base = index;
        self.idx_top = index;
        self.set_at(index);
        discard_all(serializer, dropped);
    }

    /// Loads the slot at `target` and, only if that worked, makes it current.
    fn move_to<S: LevelSerializer>(
        &mut self,
        serializer: &mut S,
        target: usize,
    ) -> Result<bool, HistoryError> {
        let Some(slot) = self.slots[target].as_ref() else {
            warn!("Undo history position {target} has no snapshot");
            return Ok(false);
        };
        serializer
            .load(slot)
            .map_err(|e| HistoryError::load(slot, e))?;
        debug!("Loaded {slot} from position {target}");
        self.set_at(target);
        self.unsaved_edits = true;
        Ok(true)
    }

    /// Moves the current position and mirrors it into the resume store.
    fn set_at(&mut self, index: usize) {
        self.idx_at = index;
        let Some(slot) = self.slots[index].as_ref() else {
            return;
        };
        let pointer = ResumePointer {
            index,
            sequence: slot.sequence,
        };
        if self.resume.last_autosave() != Some(pointer) {
            self.resume.set_last_autosave(pointer);
        }
    }

    fn resume_slot(&self) -> Option<(SlotId, usize)> {
        let pointer = self.resume.last_autosave()?;
        Some((
            SlotId::new(self.namespace.clone(), pointer.sequence),
            pointer.index,
        ))
    }
}

/// Hands slots the log no longer references back to the serializer. Failures
/// only cost disk space, so they are logged and otherwise ignored.
fn discard_all<S: LevelSerializer>(serializer: &mut S, dropped: Vec<SlotId>) {
    for slot in dropped {
        match serializer.discard(&slot) {
            Ok(()) => debug!("Discarded {slot}"),
            Err(e) => warn!("Failed to discard {slot}: {e}"),
        }
    }
}
