// ---------------------------------------------------------------------------
// snapshot_metadata – Quick-access facts about a snapshot
// ---------------------------------------------------------------------------
//
// Encoded between the header and the level body so a history listing can
// show what each slot holds without decoding the whole level.

use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct SnapshotMetadata {
    /// Display name of the level when the snapshot was taken.
    pub level_name: String,
    /// Sequence number of the slot the snapshot was written to.
    pub sequence: u64,
    /// Unix seconds at write time.
    pub saved_at: u64,
}

impl SnapshotMetadata {
    pub fn encode(&self) -> Vec<u8> {
        bitcode::encode(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, bitcode::Error> {
        bitcode::decode(bytes)
    }
}
