// ---------------------------------------------------------------------------
// SnapshotError: failures while writing or reading a level snapshot
// ---------------------------------------------------------------------------

use std::fmt;
use std::path::PathBuf;

/// Errors raised by the file-backed level serializer.
#[derive(Debug)]
pub enum SnapshotError {
    /// I/O error (permission denied, disk full, etc.)
    Io(std::io::Error),
    /// The snapshot file does not exist.
    Missing(PathBuf),
    /// Header, checksum or compression framing is invalid.
    Corrupt(String),
    /// Bitcode decoding of metadata or level data failed.
    Decode(String),
    /// Snapshot was written by a newer header format.
    VersionMismatch { expected_max: u32, found: u32 },
    /// The level resource to snapshot is not in the world.
    MissingResource(String),
    /// The settings file could not be encoded or parsed.
    Settings(String),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::Io(e) => write!(f, "I/O error: {e}"),
            SnapshotError::Missing(path) => {
                write!(f, "Snapshot not found: {}", path.display())
            }
            SnapshotError::Corrupt(msg) => write!(f, "Corrupt snapshot: {msg}"),
            SnapshotError::Decode(msg) => write!(f, "Decoding error: {msg}"),
            SnapshotError::VersionMismatch {
                expected_max,
                found,
            } => write!(
                f,
                "Version mismatch: snapshot is v{found}, but this build only supports up to v{expected_max}"
            ),
            SnapshotError::MissingResource(name) => {
                write!(f, "Missing required resource: {name}")
            }
            SnapshotError::Settings(msg) => write!(f, "Settings error: {msg}"),
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SnapshotError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SnapshotError {
    fn from(e: std::io::Error) -> Self {
        SnapshotError::Io(e)
    }
}

impl From<bitcode::Error> for SnapshotError {
    fn from(e: bitcode::Error) -> Self {
        SnapshotError::Decode(e.to_string())
    }
}

impl From<lz4_flex::block::DecompressError> for SnapshotError {
    fn from(e: lz4_flex::block::DecompressError) -> Self {
        SnapshotError::Corrupt(format!("LZ4 decompression failed: {e}"))
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(e: serde_json::Error) -> Self {
        SnapshotError::Settings(e.to_string())
    }
}
