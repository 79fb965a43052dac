// ---------------------------------------------------------------------------
// file_header – Snapshot header with magic bytes, version, and checksum
// ---------------------------------------------------------------------------
//
// Header format (32 bytes, fixed-size, little-endian):
//   [0..4]   Magic bytes: "LVLS"
//   [4..8]   Format version (u32)
//   [8..12]  Flags (u32: bit 0 = body is LZ4 compressed)
//   [12..20] Timestamp (Unix epoch, u64)
//   [20..24] Uncompressed body size (u32)
//   [24..28] Metadata size (u32)
//   [28..32] xxHash32 checksum of everything after the header
//
// After the header: [metadata (metadata size bytes)] [body]
//
// The checksum is verified before anything is decompressed or decoded, so a
// torn or tampered snapshot is rejected without touching the live level.

use xxhash_rust::xxh32::xxh32;

use crate::snapshot_error::SnapshotError;

/// Magic bytes identifying a level snapshot.
pub const MAGIC: [u8; 4] = *b"LVLS";

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 32;

/// Current header layout version.
pub const HEADER_FORMAT_VERSION: u32 = 1;

/// Flag bit: body is LZ4 compressed with a prepended size.
pub const FLAG_COMPRESSED: u32 = 1;

const XXHASH_SEED: u32 = 0;

/// Parsed snapshot header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub format_version: u32,
    pub flags: u32,
    pub timestamp: u64,
    pub uncompressed_size: u32,
    pub metadata_size: u32,
    pub checksum: u32,
}

impl SnapshotHeader {
    pub fn is_compressed(&self) -> bool {
        self.flags & FLAG_COMPRESSED != 0
    }
}

/// Seconds since the Unix epoch, or 0 if the clock is before it.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Frames `metadata` and `body` behind a header, compressing the body when
/// asked to.
pub fn wrap_snapshot(metadata: &[u8], body: &[u8], compress: bool) -> Vec<u8> {
    let stored_body;
    let body_bytes: &[u8] = if compress {
        stored_body = lz4_flex::compress_prepend_size(body);
        &stored_body
    } else {
        body
    };

    let header = SnapshotHeader {
        format_version: HEADER_FORMAT_VERSION,
        flags: if compress { FLAG_COMPRESSED } else { 0 },
        timestamp: unix_now(),
        uncompressed_size: body.len() as u32,
        metadata_size: metadata.len() as u32,
        checksum: checksum_of(metadata, body_bytes),
    };

    let mut out = Vec::with_capacity(HEADER_SIZE + metadata.len() + body_bytes.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&header.format_version.to_le_bytes());
    out.extend_from_slice(&header.flags.to_le_bytes());
    out.extend_from_slice(&header.timestamp.to_le_bytes());
    out.extend_from_slice(&header.uncompressed_size.to_le_bytes());
    out.extend_from_slice(&header.metadata_size.to_le_bytes());
    out.extend_from_slice(&header.checksum.to_le_bytes());
    out.extend_from_slice(metadata);
    out.extend_from_slice(body_bytes);
    out
}

/// A validated snapshot split into its parts. `body` is still compressed
/// when the header says so; use [`UnwrappedSnapshot::decompressed_body`].
#[derive(Debug)]
pub struct UnwrappedSnapshot<'a> {
    pub header: SnapshotHeader,
    pub metadata: &'a [u8],
    pub body: &'a [u8],
}

impl UnwrappedSnapshot<'_> {
    pub fn decompressed_body(&self) -> Result<Vec<u8>, SnapshotError> {
        let body = if self.header.is_compressed() {
            lz4_flex::decompress_size_prepended(self.body)?
        } else {
            self.body.to_vec()
        };
        if body.len() != self.header.uncompressed_size as usize {
            return Err(SnapshotError::Corrupt(format!(
                "body is {} bytes, header says {}",
                body.len(),
                self.header.uncompressed_size
            )));
        }
        Ok(body)
    }
}

/// Parses and validates the header of a snapshot file.
///
/// # Errors
///
/// - the magic bytes are wrong or the file is shorter than a header
/// - the header format version is from a newer build
/// - the metadata size points past the end of the file
/// - the checksum does not match
pub fn unwrap_snapshot(bytes: &[u8]) -> Result<UnwrappedSnapshot<'_>, SnapshotError> {
    if bytes.len() < 4 || bytes[..4] != MAGIC {
        return Err(SnapshotError::Corrupt(
            "missing LVLS magic bytes".to_string(),
        ));
    }
    if bytes.len() < HEADER_SIZE {
        return Err(SnapshotError::Corrupt(format!(
            "file is too short ({} bytes, need at least {} for header)",
            bytes.len(),
            HEADER_SIZE
        )));
    }

    let format_version = read_u32(bytes, 4);
    let flags = read_u32(bytes, 8);
    let timestamp = u64::from_le_bytes([
        bytes[12], bytes[13], bytes[14], bytes[15], bytes[16], bytes[17], bytes[18], bytes[19],
    ]);
    let uncompressed_size = read_u32(bytes, 20);
    let metadata_size = read_u32(bytes, 24);
    let checksum = read_u32(bytes, 28);

    if format_version > HEADER_FORMAT_VERSION {
        return Err(SnapshotError::VersionMismatch {
            expected_max: HEADER_FORMAT_VERSION,
            found: format_version,
        });
    }

    let rest = &bytes[HEADER_SIZE..];
    let metadata_len = metadata_size as usize;
    if metadata_len > rest.len() {
        return Err(SnapshotError::Corrupt(format!(
            "metadata size {} exceeds remaining {} bytes",
            metadata_len,
            rest.len()
        )));
    }
    let (metadata, body) = rest.split_at(metadata_len);

    let computed = checksum_of(metadata, body);
    if computed != checksum {
        return Err(SnapshotError::Corrupt(format!(
            "checksum mismatch (expected {:#010X}, got {:#010X})",
            checksum, computed
        )));
    }

    Ok(UnwrappedSnapshot {
        header: SnapshotHeader {
            format_version,
            flags,
            timestamp,
            uncompressed_size,
            metadata_size,
            checksum,
        },
        metadata,
        body,
    })
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn checksum_of(metadata: &[u8], body: &[u8]) -> u32 {
    let mut joined = Vec::with_capacity(metadata.len() + body.len());
    joined.extend_from_slice(metadata);
    joined.extend_from_slice(body);
    xxh32(&joined, XXHASH_SEED)
}
