//! Settings adapter over the command boundary and the local draft it feeds.

use std::sync::Arc;

use shared::domain::{SettingsField, SettingsRecord};
use tracing::{debug, warn};

use crate::{
    boundary::CommandBoundary,
    error::ControlError,
    outcome::{Admission, SkipReason},
};

/// Loads and saves the settings record through the backend. Nothing is
/// persisted locally and failures are never retried here.
#[derive(Clone)]
pub struct SettingsStore {
    boundary: Arc<dyn CommandBoundary>,
}

impl SettingsStore {
    pub fn new(boundary: Arc<dyn CommandBoundary>) -> Self {
        Self { boundary }
    }

    pub async fn load(&self) -> Result<SettingsRecord, ControlError> {
        debug!("loading settings");
        self.boundary.load_settings().await.map_err(|err| {
            warn!(command = %err.command(), "settings load failed: {}", err.reason());
            ControlError::from(err)
        })
    }

    pub async fn save(&self, record: &SettingsRecord) -> Result<(), ControlError> {
        debug!("saving settings");
        self.boundary.save_settings(record).await.map_err(|err| {
            warn!(command = %err.command(), "settings save failed: {}", err.reason());
            ControlError::from(err)
        })
    }
}

/// Snapshot of the draft taken when a save is issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveTicket {
    pub record: SettingsRecord,
    revision: u64,
}

/// Issue marker for an in-flight load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    revision: u64,
}

/// Editable copy of the settings plus the dirty flag.
///
/// `revision` counts edits, so a confirmation that arrives after further
/// edits does not discard them.
#[derive(Debug, Clone, Default)]
pub struct SettingsDraft {
    draft: SettingsRecord,
    committed: SettingsRecord,
    dirty: bool,
    revision: u64,
    loading: Option<u64>,
    saving: Option<u64>,
}

impl SettingsDraft {
    pub fn draft(&self) -> &SettingsRecord {
        &self.draft
    }

    /// Last record loaded from or confirmed by the backend.
    pub fn committed(&self) -> &SettingsRecord {
        &self.committed
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_some()
    }

    pub fn is_saving(&self) -> bool {
        self.saving.is_some()
    }

    /// Marks the draft dirty even when `value` equals the current one.
    pub fn edit(&mut self, field: SettingsField, value: impl Into<String>) {
        self.draft.set(field, value);
        self.dirty = true;
        self.revision += 1;
    }

    /// Loads and saves exclude each other.
    pub fn begin_load(&mut self) -> Admission<LoadTicket> {
        if self.loading.is_some() || self.saving.is_some() {
            return Admission::Skip(SkipReason::AlreadyPending);
        }
        self.loading = Some(self.revision);
        Admission::Proceed(LoadTicket {
            revision: self.revision,
        })
    }

    /// Applies a loaded record. Returns `false` when edits made during the
    /// load were kept instead of the loaded values.
    pub fn finish_load(&mut self, ticket: LoadTicket, record: SettingsRecord) -> bool {
        self.loading = None;
        self.committed = record;
        if self.revision != ticket.revision {
            return false;
        }
        self.draft = self.committed.clone();
        self.dirty = false;
        true
    }

    pub fn abort_load(&mut self) {
        self.loading = None;
    }

    pub fn begin_save(&mut self) -> Admission<SaveTicket> {
        if !self.dirty {
            return Admission::Skip(SkipReason::NotDirty);
        }
        if self.saving.is_some() || self.loading.is_some() {
            return Admission::Skip(SkipReason::AlreadyPending);
        }
        self.saving = Some(self.revision);
        Admission::Proceed(SaveTicket {
            record: self.draft.clone(),
            revision: self.revision,
        })
    }

    pub fn confirm_save(&mut self, ticket: SaveTicket) {
        self.saving = None;
        self.committed = ticket.record;
        if self.revision == ticket.revision {
            self.dirty = false;
        }
    }

    /// Leaves draft and dirty flag as they were before the save.
    pub fn abort_save(&mut self) {
        self.saving = None;
    }
}
