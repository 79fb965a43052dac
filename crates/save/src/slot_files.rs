//! Where snapshot slots live on disk.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bevy::prelude::*;
use history::{SessionNamespace, SlotId};

use crate::atomic_write::atomic_write;
use crate::level_snapshot::read_metadata;
use crate::snapshot_error::SnapshotError;
use crate::snapshot_metadata::SnapshotMetadata;

/// File extension of snapshot slots.
pub const SNAPSHOT_EXTENSION: &str = "snap";

/// Root directory of all snapshot slots. Each namespace gets its own
/// subdirectory: `<root>/<namespace>/AutoSave<sequence>.snap`.
#[derive(Resource, Debug, Clone, PartialEq, Eq)]
pub struct SlotDirectory {
    root: PathBuf,
}

impl SlotDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn namespace_dir(&self, namespace: &SessionNamespace) -> PathBuf {
        self.root.join(namespace.as_str())
    }

    pub fn path_for(&self, slot: &SlotId) -> PathBuf {
        self.namespace_dir(&slot.namespace)
            .join(format!("{}.{SNAPSHOT_EXTENSION}", slot.file_stem()))
    }

    pub fn exists(&self, slot: &SlotId) -> bool {
        self.path_for(slot).is_file()
    }

    pub fn write(&self, slot: &SlotId, bytes: &[u8]) -> Result<(), SnapshotError> {
        atomic_write(&self.path_for(slot), bytes)?;
        Ok(())
    }

    pub fn read(&self, slot: &SlotId) -> Result<Vec<u8>, SnapshotError> {
        let path = self.path_for(slot);
        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => SnapshotError::Missing(path),
            _ => SnapshotError::Io(e),
        })
    }

    /// Deletes the file behind `slot`. A slot with no file is not an error.
    pub fn remove(&self, slot: &SlotId) -> Result<(), SnapshotError> {
        match fs::remove_file(self.path_for(slot)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SnapshotError::Io(e)),
        }
    }

    /// Reads the metadata of `slot` without decoding the level.
    pub fn metadata(&self, slot: &SlotId) -> Result<SnapshotMetadata, SnapshotError> {
        read_metadata(&self.read(slot)?)
    }

    /// Every `.snap` file in `namespace`, sorted by path.
    pub fn snapshot_files(&self, namespace: &SessionNamespace) -> Vec<PathBuf> {
        self.files_with_extension(namespace, SNAPSHOT_EXTENSION)
    }

    /// Deletes every snapshot in `namespace` that is not one of `keep`.
    /// Returns how many files were removed.
    pub fn remove_unreferenced(&self, namespace: &SessionNamespace, keep: &[&SlotId]) -> usize {
        let keep: Vec<PathBuf> = keep.iter().map(|slot| self.path_for(slot)).collect();
        let mut removed = 0;
        for path in self.snapshot_files(namespace) {
            if keep.contains(&path) {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!("Removed stale snapshot {}", path.display());
                    removed += 1;
                }
                Err(e) => warn!("Failed to remove stale snapshot {}: {}", path.display(), e),
            }
        }
        removed
    }

    /// Leftover `.tmp` files from interrupted writes in `namespace`.
    pub fn tmp_files(&self, namespace: &SessionNamespace) -> Vec<PathBuf> {
        self.files_with_extension(namespace, "tmp")
    }

    fn files_with_extension(&self, namespace: &SessionNamespace, extension: &str) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(self.namespace_dir(namespace)) else {
            return Vec::new();
        };
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == extension))
            .collect();
        files.sort();
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_dir(name: &str) -> PathBuf {
        let dir = PathBuf::from(format!("/tmp/level_history_slot_files_test_{}", name));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn slot(sequence: u64) -> SlotId {
        SlotId::new(SessionNamespace::new("ns1"), sequence)
    }

    #[test]
    fn test_path_layout() {
        let slots = SlotDirectory::new("undo");
        assert_eq!(
            slots.path_for(&slot(12)),
            PathBuf::from("undo/ns1/AutoSave12.snap")
        );
    }

    #[test]
    fn test_write_read_exists() {
        let dir = test_dir("write_read");
        let slots = SlotDirectory::new(&dir);

        assert!(!slots.exists(&slot(0)));
        slots.write(&slot(0), b"bytes").unwrap();
        assert!(slots.exists(&slot(0)));
        assert_eq!(slots.read(&slot(0)).unwrap(), b"bytes");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_read_missing_slot() {
        let dir = test_dir("missing");
        let slots = SlotDirectory::new(&dir);
        let err = slots.read(&slot(3)).unwrap_err();
        assert!(matches!(err, SnapshotError::Missing(_)));
    }

    #[test]
    fn test_remove_slot() {
        let dir = test_dir("remove");
        let slots = SlotDirectory::new(&dir);
        slots.write(&slot(4), b"bytes").unwrap();

        slots.remove(&slot(4)).unwrap();
        assert!(!slots.exists(&slot(4)));
        // Already gone.
        slots.remove(&slot(4)).unwrap();

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_remove_unreferenced_keeps_listed_slots() {
        let dir = test_dir("unreferenced");
        let slots = SlotDirectory::new(&dir);
        let ns = SessionNamespace::new("ns1");
        for sequence in 0..5 {
            slots.write(&slot(sequence), b"bytes").unwrap();
        }
        let torn = slots.namespace_dir(&ns).join("AutoSave9.snap.tmp");
        fs::write(&torn, b"torn").unwrap();

        let removed = slots.remove_unreferenced(&ns, &[&slot(1), &slot(3)]);

        assert_eq!(removed, 3);
        assert_eq!(
            slots.snapshot_files(&ns),
            vec![slots.path_for(&slot(1)), slots.path_for(&slot(3))]
        );
        assert!(torn.exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_tmp_files_listed() {
        let dir = test_dir("tmp_files");
        let slots = SlotDirectory::new(&dir);
        let ns = SessionNamespace::new("ns1");
        assert!(slots.tmp_files(&ns).is_empty());

        slots.write(&slot(1), b"ok").unwrap();
        let ns_dir = slots.namespace_dir(&ns);
        fs::write(ns_dir.join("AutoSave2.snap.tmp"), b"torn").unwrap();

        let tmp = slots.tmp_files(&ns);
        assert_eq!(tmp, vec![ns_dir.join("AutoSave2.snap.tmp")]);

        let _ = fs::remove_dir_all(&dir);
    }
}
