//! The level serializer the undo history uses inside a Bevy world.

use std::any::type_name;
use std::marker::PhantomData;

use bevy::prelude::*;
use history::{LevelSerializer, SlotId};

use crate::level_snapshot::{decode_level, encode_level, EditableLevel};
use crate::slot_files::SlotDirectory;
use crate::snapshot_error::SnapshotError;

/// Saves the `L` resource of a world into slot files and loads it back.
///
/// A load decodes the whole snapshot before replacing the resource, so a
/// corrupt slot leaves the live level untouched.
pub struct WorldSnapshotter<'a, L: EditableLevel> {
    world: &'a mut World,
    slots: &'a SlotDirectory,
    compress: bool,
    _level: PhantomData<fn() -> L>,
}

impl<'a, L: EditableLevel> WorldSnapshotter<'a, L> {
    pub fn new(world: &'a mut World, slots: &'a SlotDirectory, compress: bool) -> Self {
        Self {
            world,
            slots,
            compress,
            _level: PhantomData,
        }
    }
}

impl<L: EditableLevel> LevelSerializer for WorldSnapshotter<'_, L> {
    type Error = SnapshotError;

    fn save(&mut self, slot: &SlotId) -> Result<(), SnapshotError> {
        let level = self
            .world
            .get_resource::<L>()
            .ok_or_else(|| SnapshotError::MissingResource(type_name::<L>().to_string()))?;
        let bytes = encode_level(level, slot.sequence, self.compress);
        self.slots.write(slot, &bytes)?;
        debug!("Wrote snapshot {slot} ({} bytes)", bytes.len());
        Ok(())
    }

    fn load(&mut self, slot: &SlotId) -> Result<(), SnapshotError> {
        let bytes = self.slots.read(slot)?;
        let (metadata, level) = decode_level::<L>(&bytes)?;
        if metadata.sequence != slot.sequence {
            warn!(
                "Snapshot {slot} records sequence {}, loading it anyway",
                metadata.sequence
            );
        }
        self.world.insert_resource(level);
        debug!("Loaded snapshot {slot} \"{}\"", metadata.level_name);
        Ok(())
    }

    fn slot_exists(&self, slot: &SlotId) -> bool {
        self.slots.exists(slot)
    }

    fn discard(&mut self, slot: &SlotId) -> Result<(), SnapshotError> {
        self.slots.remove(slot)
    }
}
