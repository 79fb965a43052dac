//! Startup check for artifacts of an interrupted session.
//!
//! Removes `.tmp` files left behind by interrupted atomic writes in the
//! session's snapshot directory and verifies the checksum of the slot the
//! resume pointer names, so a torn snapshot is never offered for resuming.

use std::path::{Path, PathBuf};

use bevy::prelude::*;
use history::{ResumePointer, SessionNamespace, SlotId};

use crate::file_header::unwrap_snapshot;
use crate::slot_files::SlotDirectory;

// =============================================================================
// Resources
// =============================================================================

/// Outcome of the startup scan, kept around for UI and diagnostics.
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq)]
pub struct CrashRecoveryState {
    /// Whether crash artifacts (`.tmp` files) were found.
    pub detected: bool,
    /// Number of `.tmp` files removed.
    pub tmp_files_cleaned: usize,
    /// `None` when there was no resume pointer, otherwise whether the slot
    /// it names passed validation.
    pub resume_slot_valid: Option<bool>,
    /// Snapshots from an earlier session that the started history no longer
    /// references, removed once the history is running.
    pub stale_snapshots_removed: usize,
}

// =============================================================================
// Core Logic
// =============================================================================

/// Removes all listed files, logging each removal. Returns how many were
/// removed.
pub(crate) fn clean_tmp_files(tmp_files: &[PathBuf]) -> usize {
    let mut cleaned = 0;
    for path in tmp_files {
        match std::fs::remove_file(path) {
            Ok(()) => {
                info!("Crash recovery: cleaned up tmp file: {}", path.display());
                cleaned += 1;
            }
            Err(e) => {
                warn!(
                    "Crash recovery: failed to remove tmp file {}: {}",
                    path.display(),
                    e
                );
            }
        }
    }
    cleaned
}

/// Whether `path` is a readable snapshot with an intact header and checksum.
pub fn validate_snapshot_file(path: &Path) -> bool {
    let Ok(bytes) = std::fs::read(path) else {
        return false;
    };
    unwrap_snapshot(&bytes).is_ok()
}

/// Cleans `.tmp` files in `namespace` and validates the resume slot.
pub fn perform_crash_recovery_scan(
    slots: &SlotDirectory,
    namespace: &SessionNamespace,
    resume: Option<ResumePointer>,
) -> CrashRecoveryState {
    let tmp_files = slots.tmp_files(namespace);
    let detected = !tmp_files.is_empty();
    if detected {
        info!(
            "Crash recovery: detected {} tmp file(s) in {}",
            tmp_files.len(),
            slots.namespace_dir(namespace).display()
        );
    }
    let tmp_files_cleaned = clean_tmp_files(&tmp_files);

    let resume_slot_valid = resume.map(|pointer| {
        let slot = SlotId::new(namespace.clone(), pointer.sequence);
        let path = slots.path_for(&slot);
        if !path.exists() {
            return false;
        }
        let valid = validate_snapshot_file(&path);
        if !valid {
            warn!("Crash recovery: resume snapshot {slot} is corrupted");
        }
        valid
    });

    CrashRecoveryState {
        detected,
        tmp_files_cleaned,
        resume_slot_valid,
        stale_snapshots_removed: 0,
    }
}

// =============================================================================
// Tests
// =============================================================================
