//! File-backed snapshots for the undo history and the Bevy plugin that
//! drives it from an editor session.

mod atomic_write;
pub mod crash_recovery;
pub mod file_header;
pub mod history_plugin;
pub mod level_snapshot;
pub mod settings;
pub mod slot_files;
pub mod snapshot_error;
pub mod snapshot_metadata;
pub mod world_snapshotter;

pub use crash_recovery::CrashRecoveryState;
pub use history_plugin::{HistoryConfig, HistoryStatus, UndoHistoryPlugin};
pub use level_snapshot::EditableLevel;
pub use settings::{EditorSettings, SettingsFile};
pub use slot_files::SlotDirectory;
pub use snapshot_error::SnapshotError;
pub use snapshot_metadata::SnapshotMetadata;
pub use world_snapshotter::WorldSnapshotter;
