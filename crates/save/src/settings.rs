// ---------------------------------------------------------------------------
// settings – Editor settings file holding the machine id and resume pointer
// ---------------------------------------------------------------------------
//
// Stored as pretty JSON so users can inspect or delete it. Unknown or missing
// fields fall back to defaults; a file that does not parse at all is replaced.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bevy::prelude::*;
use history::{ResumePointer, ResumeStore, SessionNamespace};
use serde::{Deserialize, Serialize};

use crate::atomic_write::atomic_write;
use crate::snapshot_error::SnapshotError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Random per-install id. Names the snapshot namespace so two installs
    /// sharing a directory never overwrite each other's slots.
    pub machine_id: String,
    /// Where the history stood when the last session ended.
    pub last_autosave: Option<ResumePointer>,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            machine_id: generate_machine_id(),
            last_autosave: None,
        }
    }
}

impl EditorSettings {
    pub fn namespace(&self) -> SessionNamespace {
        SessionNamespace::new(&self.machine_id)
    }
}

pub fn generate_machine_id() -> String {
    format!("{:016x}", rand::random::<u64>())
}

/// [`EditorSettings`] bound to the file it is persisted in.
#[derive(Debug)]
pub struct SettingsFile {
    path: PathBuf,
    settings: EditorSettings,
    /// False when the file exists but could not be read; it is then left
    /// alone for the whole session.
    writable: bool,
}

impl SettingsFile {
    /// Reads the settings at `path`, creating the file when it is missing or
    /// does not parse.
    ///
    /// Any other read error keeps defaults in memory only, so a transient
    /// failure never replaces the stored machine id.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut writable = true;
        let (mut settings, mut needs_write) = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<EditorSettings>(&bytes) {
                Ok(settings) => (settings, false),
                Err(e) => {
                    warn!(
                        "Settings file {} is unreadable, starting fresh: {}",
                        path.display(),
                        e
                    );
                    (EditorSettings::default(), true)
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => (EditorSettings::default(), true),
            Err(e) => {
                warn!(
                    "Cannot read settings {}, using defaults for this session: {}",
                    path.display(),
                    e
                );
                writable = false;
                (EditorSettings::default(), false)
            }
        };

        if settings.machine_id.trim().is_empty() {
            settings.machine_id = generate_machine_id();
            needs_write = true;
        }

        let file = Self {
            path,
            settings,
            writable,
        };
        if needs_write && file.writable {
            if let Err(e) = file.persist() {
                warn!("Failed to write settings {}: {}", file.path.display(), e);
            }
        }
        file
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn persist(&self) -> Result<(), SnapshotError> {
        let bytes = serde_json::to_vec_pretty(&self.settings)?;
        atomic_write(&self.path, &bytes)?;
        Ok(())
    }
}

impl ResumeStore for SettingsFile {
    fn last_autosave(&self) -> Option<ResumePointer> {
        self.settings.last_autosave
    }

    fn set_last_autosave(&mut self, pointer: ResumePointer) {
        self.settings.last_autosave = Some(pointer);
        if !self.writable {
            debug!(
                "Settings {} not writable this session, resume pointer kept in memory",
                self.path.display()
            );
            return;
        }
        if let Err(e) = self.persist() {
            warn!(
                "Failed to persist resume pointer to {}: {}",
                self.path.display(),
                e
            );
        }
    }
}
