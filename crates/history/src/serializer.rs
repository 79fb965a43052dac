use crate::slot::SlotId;

/// Persists and restores the live editable world by slot name.
///
/// Both calls are synchronous. `load` must leave the live world untouched
/// when it returns an error, so a failed undo or redo never half-applies.
pub trait LevelSerializer {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Writes the live world into `slot`, replacing any previous content.
    fn save(&mut self, slot: &SlotId) -> Result<(), Self::Error>;

    /// Replaces the live world with the snapshot stored in `slot`.
    fn load(&mut self, slot: &SlotId) -> Result<(), Self::Error>;

    /// Whether a snapshot exists for `slot`. No integrity check is implied.
    fn slot_exists(&self, slot: &SlotId) -> bool;

    /// Releases the storage behind a slot the history no longer references.
    /// A slot that is already gone is not an error.
    fn discard(&mut self, _slot: &SlotId) -> Result<(), Self::Error> {
        Ok(())
    }
}
