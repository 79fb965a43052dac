//! Encoding a level into snapshot bytes and back.

use bevy::prelude::*;

use crate::file_header::{unix_now, unwrap_snapshot, wrap_snapshot};
use crate::snapshot_error::SnapshotError;
use crate::snapshot_metadata::SnapshotMetadata;

/// The editable world state the history snapshots.
///
/// The history never looks inside a level; it only needs to write the whole
/// resource out and read it back.
pub trait EditableLevel: Resource + Default + bitcode::Encode + bitcode::DecodeOwned {
    /// Name shown in history listings.
    fn display_name(&self) -> String {
        String::new()
    }
}

/// Serializes `level` as the snapshot for slot `sequence`.
pub fn encode_level<L: EditableLevel>(level: &L, sequence: u64, compress: bool) -> Vec<u8> {
    let metadata = SnapshotMetadata {
        level_name: level.display_name(),
        sequence,
        saved_at: unix_now(),
    };
    let body = bitcode::encode(level);
    wrap_snapshot(&metadata.encode(), &body, compress)
}

/// Validates and fully decodes a snapshot. Nothing is returned unless the
/// checksum, decompression and decode all succeed.
pub fn decode_level<L: EditableLevel>(
    bytes: &[u8],
) -> Result<(SnapshotMetadata, L), SnapshotError> {
    let snapshot = unwrap_snapshot(bytes)?;
    let metadata = SnapshotMetadata::decode(snapshot.metadata)?;
    let body = snapshot.decompressed_body()?;
    let level = bitcode::decode::<L>(&body)?;
    Ok((metadata, level))
}

/// Reads only the metadata section of a snapshot.
pub(crate) fn read_metadata(bytes: &[u8]) -> Result<SnapshotMetadata, SnapshotError> {
    let snapshot = unwrap_snapshot(bytes)?;
    Ok(SnapshotMetadata::decode(snapshot.metadata)?)
}
