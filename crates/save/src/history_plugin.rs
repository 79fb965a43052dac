use std::marker::PhantomData;
use std::path::PathBuf;

use bevy::prelude::*;
use history::{
    HistoryNotice, HistoryRequest, LevelSerializer, ResumeStore, SlotId, UndoStack,
    DEFAULT_MAX_UNDO_LEVELS,
};

use crate::crash_recovery::{perform_crash_recovery_scan, CrashRecoveryState};
use crate::level_snapshot::EditableLevel;
use crate::settings::SettingsFile;
use crate::slot_files::SlotDirectory;
use crate::world_snapshotter::WorldSnapshotter;

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// Where and how the undo history persists its snapshots.
#[derive(Resource, Debug, Clone, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Directory holding one subdirectory of slots per machine namespace.
    pub snapshot_root: PathBuf,
    /// JSON file with the machine id and resume pointer.
    pub settings_path: PathBuf,
    /// History capacity at startup.
    pub max_undo_levels: usize,
    /// LZ4-compress snapshot bodies.
    pub compress: bool,
    /// Continue the previous session's history when its snapshot is intact.
    pub resume_on_start: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            snapshot_root: PathBuf::from("undo"),
            settings_path: PathBuf::from("undo/settings.json"),
            max_undo_levels: DEFAULT_MAX_UNDO_LEVELS,
            compress: true,
            resume_on_start: true,
        }
    }
}

/// Counters for the history UI, refreshed after every processed request.
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryStatus {
    pub num_undo: usize,
    pub num_redo: usize,
    pub max_undo_levels: usize,
    pub current_slot: Option<String>,
}

impl HistoryStatus {
    pub fn from_stack(stack: &UndoStack) -> Self {
        Self {
            num_undo: stack.num_undo(),
            num_redo: stack.num_redo(),
            max_undo_levels: stack.max_undo_level(),
            current_slot: stack.current_slot().map(|slot| slot.to_string()),
        }
    }
}

/// One reachable history position, for listing the history in a UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub slot: SlotId,
    pub level_name: String,
    pub saved_at: u64,
    /// Whether this is the slot loaded into the live level.
    pub current: bool,
}

/// Reachable history positions, oldest first. Only snapshot metadata is read;
/// slots whose metadata cannot be read are left out.
pub fn history_entries(stack: &UndoStack, slots: &SlotDirectory) -> Vec<HistoryEntry> {
    let current = stack.current_slot();
    stack
        .reachable_slots()
        .into_iter()
        .filter_map(|slot| match slots.metadata(slot) {
            Ok(metadata) => Some(HistoryEntry {
                slot: slot.clone(),
                level_name: metadata.level_name,
                saved_at: metadata.saved_at,
                current: current == Some(slot),
            }),
            Err(e) => {
                warn!("Skipping {slot} in history listing: {e}");
                None
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

/// Undo/redo for the level resource `L`, backed by snapshot files.
pub struct UndoHistoryPlugin<L: EditableLevel> {
    config: HistoryConfig,
    _level: PhantomData<fn() -> L>,
}

impl<L: EditableLevel> UndoHistoryPlugin<L> {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            config,
            _level: PhantomData,
        }
    }
}

impl<L: EditableLevel> Default for UndoHistoryPlugin<L> {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl<L: EditableLevel> Plugin for UndoHistoryPlugin<L> {
    fn build(&self, app: &mut App) {
        app.insert_resource(self.config.clone())
            .insert_resource(SlotDirectory::new(&self.config.snapshot_root))
            .init_resource::<L>()
            .init_resource::<HistoryStatus>()
            .init_resource::<CrashRecoveryState>()
            .add_event::<HistoryRequest>()
            .add_event::<HistoryNotice>();

        app.add_systems(Startup, start_history::<L>);
        app.add_systems(Update, process_history_requests::<L>);
    }
}

// ---------------------------------------------------------------------------
// Systems
// ---------------------------------------------------------------------------

/// Exclusive startup system: crash-recovery scan, then resume the previous
/// session or start a fresh history from the live level.
pub(crate) fn start_history<L: EditableLevel>(world: &mut World) {
    let Some(config) = world.get_resource::<HistoryConfig>().cloned() else {
        error!("Undo history not started: HistoryConfig is missing");
        return;
    };
    let slots = SlotDirectory::new(&config.snapshot_root);

    let settings = SettingsFile::open(&config.settings_path);
    let namespace = settings.settings().namespace();
    let recovery = perform_crash_recovery_scan(&slots, &namespace, settings.last_autosave());
    let resume_valid = recovery.resume_slot_valid == Some(true);
    if recovery.resume_slot_valid == Some(false) {
        warn!("Previous undo history cannot be resumed, starting fresh");
    }
    world.insert_resource(recovery);

    let capacity = if config.max_undo_levels == 0 {
        warn!(
            "max_undo_levels of 0 is invalid, using {}",
            DEFAULT_MAX_UNDO_LEVELS
        );
        DEFAULT_MAX_UNDO_LEVELS
    } else {
        config.max_undo_levels
    };
    let mut stack = match UndoStack::new(namespace, capacity, settings) {
        Ok(stack) => stack,
        Err(e) => {
            error!("Undo history not started: {e}");
            return;
        }
    };

    let mut notices = Vec::new();
    {
        let mut snapshotter = WorldSnapshotter::<L>::new(world, &slots, config.compress);
        let resumed = if config.resume_on_start && resume_valid {
            match stack.resume(&mut snapshotter) {
                Ok(resumed) => resumed,
                Err(e) => {
                    warn!("Failed to resume undo history: {e}");
                    notices.push(HistoryNotice::warning(format!(
                        "Previous undo history could not be restored: {e}"
                    )));
                    false
                }
            }
        } else {
            false
        };
        if !resumed {
            if let Err(e) = stack.init(&mut snapshotter) {
                error!("Failed to start undo history: {e}");
                notices.push(HistoryNotice::error(format!(
                    "Undo history is unavailable: {e}"
                )));
            }
        }
    }

    // Leave earlier snapshots alone when no history could be started.
    if stack.current_slot().is_some() {
        let removed = slots.remove_unreferenced(stack.namespace(), &stack.reachable_slots());
        if removed > 0 {
            info!("Removed {removed} snapshot(s) left over from an earlier session");
        }
        if let Some(mut recovery) = world.get_resource_mut::<CrashRecoveryState>() {
            recovery.stale_snapshots_removed = removed;
        }
    }

    world.insert_resource(HistoryStatus::from_stack(&stack));
    world.insert_resource(stack);
    for notice in notices {
        world.send_event(notice);
    }
}

/// Exclusive system applying every pending [`HistoryRequest`] in send order.
pub(crate) fn process_history_requests<L: EditableLevel>(world: &mut World) {
    let requests: Vec<HistoryRequest> = match world.get_resource_mut::<Events<HistoryRequest>>() {
        Some(mut events) => events.drain().collect(),
        None => return,
    };
    if requests.is_empty() {
        return;
    }

    let Some(mut stack) = world.remove_resource::<UndoStack>() else {
        warn!(
            "Dropped {} undo history request(s): history not started",
            requests.len()
        );
        return;
    };
    let slots = world
        .get_resource::<SlotDirectory>()
        .cloned()
        .unwrap_or_else(|| SlotDirectory::new(HistoryConfig::default().snapshot_root));
    let compress = world
        .get_resource::<HistoryConfig>()
        .map_or(true, |config| config.compress);

    let mut notices = Vec::new();
    {
        let mut snapshotter = WorldSnapshotter::<L>::new(world, &slots, compress);
        for request in requests {
            if let Some(notice) = apply_request(&mut stack, &mut snapshotter, request) {
                notices.push(notice);
            }
        }
    }

    world.insert_resource(HistoryStatus::from_stack(&stack));
    world.insert_resource(stack);
    for notice in notices {
        world.send_event(notice);
    }
}

fn apply_request<S: LevelSerializer>(
    stack: &mut UndoStack,
    serializer: &mut S,
    request: HistoryRequest,
) -> Option<HistoryNotice> {
    match request {
        HistoryRequest::Store => stack.store(serializer).err().map(|e| {
            warn!("Edit kept but not recorded: {e}");
            HistoryNotice::warning(format!("Edit kept but not recorded in undo history: {e}"))
        }),
        HistoryRequest::Overwrite => match stack.overwrite_top_of_stack(serializer) {
            Ok(true) => None,
            Ok(false) => {
                debug!("Nothing to overwrite in undo history");
                None
            }
            Err(e) => {
                warn!("Failed to overwrite current snapshot: {e}");
                Some(HistoryNotice::warning(format!(
                    "Change kept but not recorded in undo history: {e}"
                )))
            }
        },
        HistoryRequest::Undo => stack.undo(serializer).err().map(|e| {
            error!("Undo failed, level unchanged: {e}");
            HistoryNotice::error(format!("Undo failed, level unchanged: {e}"))
        }),
        HistoryRequest::Redo => stack.redo(serializer).err().map(|e| {
            error!("Redo failed, level unchanged: {e}");
            HistoryNotice::error(format!("Redo failed, level unchanged: {e}"))
        }),
        HistoryRequest::SetMaxUndoLevels(levels) => {
            stack.set_max_undo_level(serializer, levels).err().map(|e| {
                warn!("Undo history not resized: {e}");
                HistoryNotice::warning(format!("Undo history not resized: {e}"))
            })
        }
        HistoryRequest::Restart => match stack.init(serializer) {
            Ok(()) => Some(HistoryNotice::info("Undo history cleared")),
            Err(e) => {
                error!("Failed to restart undo history: {e}");
                Some(HistoryNotice::error(format!(
                    "Undo history could not be restarted: {e}"
                )))
            }
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
