//! Coordinator owning every piece of UI-visible state.
//!
//! Operations take `&self` so a front end can keep reading snapshots while a
//! backend call is pending. The state lock is never held across a backend
//! call; each affordance carries its own pending flag, and a second call on a
//! pending affordance is skipped instead of interleaved.

use std::sync::Arc;

use shared::{
    domain::{RunState, SettingsField, SettingsRecord},
    protocol::CommandName,
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{
    boundary::CommandBoundary,
    device_catalog::{fetch_devices, CatalogStatus, DeviceCatalog},
    error::ControlError,
    lifecycle::{LifecycleController, RunTransition},
    outcome::{Admission, Outcome},
    settings_store::{SettingsDraft, SettingsStore},
};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    SettingsLoaded,
    SettingsSaved,
    DraftEdited(SettingsField),
    DevicesLoaded { count: usize },
    DeviceSelected(String),
    RunStateChanged(RunState),
    PendingChanged,
    Failed(ControlError),
}

/// Most recent failure, kept until the same command next succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceFailure {
    pub command: CommandName,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingCalls {
    pub load: bool,
    pub save: bool,
    pub fetch: bool,
    pub run_transition: Option<RunTransition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceSnapshot {
    pub draft: SettingsRecord,
    pub dirty: bool,
    pub devices: Vec<String>,
    pub catalog_status: CatalogStatus,
    pub selected_device: Option<String>,
    pub run_state: RunState,
    pub pending: PendingCalls,
    pub last_failure: Option<SurfaceFailure>,
}

/// Which controls a front end should enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Affordances {
    pub submit: bool,
    pub run: bool,
    pub stop: bool,
    pub select_device: bool,
}

impl SurfaceSnapshot {
    pub fn affordances(&self) -> Affordances {
        let transition_idle = self.pending.run_transition.is_none();
        Affordances {
            submit: self.dirty && !self.pending.save,
            run: self.run_state == RunState::Idle && transition_idle,
            stop: self.run_state == RunState::Running && transition_idle,
            select_device: self.catalog_status == CatalogStatus::Ready
                && !self.devices.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupReport {
    pub settings: Result<Outcome, ControlError>,
    pub devices: Result<Outcome, ControlError>,
}

impl StartupReport {
    pub fn is_ok(&self) -> bool {
        self.settings.is_ok() && self.devices.is_ok()
    }
}

#[derive(Default)]
struct SurfaceState {
    draft: SettingsDraft,
    catalog: DeviceCatalog,
    selected_device: Option<String>,
    lifecycle: LifecycleController,
    last_failure: Option<SurfaceFailure>,
}

impl SurfaceState {
    fn snapshot(&self) -> SurfaceSnapshot {
        SurfaceSnapshot {
            draft: self.draft.draft().clone(),
            dirty: self.draft.is_dirty(),
            devices: self.catalog.devices().to_vec(),
            catalog_status: self.catalog.status(),
            selected_device: self.selected_device.clone(),
            run_state: self.lifecycle.state(),
            pending: PendingCalls {
                load: self.draft.is_loading(),
                save: self.draft.is_saving(),
                fetch: self.catalog.status() == CatalogStatus::Fetching,
                run_transition: self.lifecycle.pending(),
            },
            last_failure: self.last_failure.clone(),
        }
    }

    fn record_failure(&mut self, err: &ControlError) {
        self.last_failure = Some(SurfaceFailure {
            command: err.command(),
            message: err.to_string(),
        });
    }

    fn clear_failure(&mut self, command: CommandName) {
        if self
            .last_failure
            .as_ref()
            .is_some_and(|failure| failure.command == command)
        {
            self.last_failure = None;
        }
    }
}

pub struct ControlSurface {
    boundary: Arc<dyn CommandBoundary>,
    settings: SettingsStore,
    inner: Mutex<SurfaceState>,
    events: broadcast::Sender<SurfaceEvent>,
}

impl ControlSurface {
    pub fn new(boundary: Arc<dyn CommandBoundary>) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            settings: SettingsStore::new(Arc::clone(&boundary)),
            boundary,
            inner: Mutex::new(SurfaceState::default()),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SurfaceEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> SurfaceSnapshot {
        self.inner.lock().await.snapshot()
    }

    fn emit(&self, event: SurfaceEvent) {
        let _ = self.events.send(event);
    }

    fn fail(&self, state: &mut SurfaceState, err: ControlError) -> ControlError {
        state.record_failure(&err);
        self.emit(SurfaceEvent::Failed(err.clone()));
        err
    }

    /// Loads settings and the device list concurrently. Neither result waits
    /// on the other before being applied.
    pub async fn on_startup(&self) -> StartupReport {
        info!("control surface starting up");
        let (settings, devices) = tokio::join!(self.reload_settings(), self.load_devices());
        StartupReport { settings, devices }
    }

    async fn reload_settings(&self) -> Result<Outcome, ControlError> {
        let ticket = match self.inner.lock().await.draft.begin_load() {
            Admission::Proceed(ticket) => ticket,
            Admission::Skip(reason) => return Ok(Outcome::Skipped(reason)),
        };
        self.emit(SurfaceEvent::PendingChanged);

        let result = self.settings.load().await;

        let mut state = self.inner.lock().await;
        match result {
            Ok(record) => {
                if !state.draft.finish_load(ticket, record) {
                    info!("kept local edits made while settings were loading");
                }
                state.clear_failure(CommandName::LoadSettings);
                self.emit(SurfaceEvent::SettingsLoaded);
                Ok(Outcome::Applied)
            }
            Err(err) => {
                state.draft.abort_load();
                Err(self.fail(&mut state, err))
            }
        }
    }

    async fn load_devices(&self) -> Result<Outcome, ControlError> {
        if let Admission::Skip(reason) = self.inner.lock().await.catalog.begin_fetch() {
            debug!(?reason, "device list not fetched");
            return Ok(Outcome::Skipped(reason));
        }
        self.emit(SurfaceEvent::PendingChanged);

        let result = fetch_devices(self.boundary.as_ref()).await;

        let mut state = self.inner.lock().await;
        let failure = result.as_ref().err().cloned();
        state.catalog.finish_fetch(result);
        match failure {
            None => {
                state.clear_failure(CommandName::DeviceList);
                let count = state.catalog.devices().len();
                self.emit(SurfaceEvent::DevicesLoaded { count });
                Ok(Outcome::Applied)
            }
            Some(err) => Err(self.fail(&mut state, err.into())),
        }
    }

    pub async fn on_field_edit(&self, field: SettingsField, value: impl Into<String>) {
        self.inner.lock().await.draft.edit(field, value);
        self.emit(SurfaceEvent::DraftEdited(field));
    }

    /// Saves the draft. A clean draft or a save already in flight is a no-op.
    pub async fn on_submit(&self) -> Result<Outcome, ControlError> {
        let ticket = match self.inner.lock().await.draft.begin_save() {
            Admission::Proceed(ticket) => ticket,
            Admission::Skip(reason) => {
                debug!(?reason, "submit skipped");
                return Ok(Outcome::Skipped(reason));
            }
        };
        self.emit(SurfaceEvent::PendingChanged);

        let result = self.settings.save(&ticket.record).await;

        let mut state = self.inner.lock().await;
        match result {
            Ok(()) => {
                state.draft.confirm_save(ticket);
                state.clear_failure(CommandName::SaveSettings);
                info!(dirty = state.draft.is_dirty(), "settings saved");
                self.emit(SurfaceEvent::SettingsSaved);
                Ok(Outcome::Applied)
            }
            Err(err) => {
                state.draft.abort_save();
                Err(self.fail(&mut state, err))
            }
        }
    }

    /// Overwrites the selection. Names are not checked against the catalog.
    pub async fn on_device_select(&self, name: impl Into<String>) {
        let name = name.into();
        {
            let mut state = self.inner.lock().await;
            if !state.catalog.contains(&name) {
                debug!(device = %name, "selected device is not in the fetched catalog");
            }
            state.selected_device = Some(name.clone());
        }
        self.emit(SurfaceEvent::DeviceSelected(name));
    }

    pub async fn on_run(&self) -> Result<Outcome, ControlError> {
        let device = {
            let mut state = self.inner.lock().await;
            let selected = state.selected_device.clone();
            match state.lifecycle.begin_start(selected.as_deref()) {
                Ok(Admission::Proceed(device)) => device,
                Ok(Admission::Skip(reason)) => {
                    debug!(?reason, "run skipped");
                    return Ok(Outcome::Skipped(reason));
                }
                Err(err) => {
                    warn!("run refused: {err}");
                    return Err(self.fail(&mut state, err));
                }
            }
        };
        self.emit(SurfaceEvent::PendingChanged);
        debug!(device = %device, "starting voice reader");

        let result = self.boundary.run_voice_reader(&device).await;

        let mut state = self.inner.lock().await;
        let run_state = state.lifecycle.finish_start(&result);
        self.emit(SurfaceEvent::RunStateChanged(run_state));
        match result {
            Ok(()) => {
                state.clear_failure(CommandName::RunVoiceReader);
                Ok(Outcome::Applied)
            }
            Err(err) => Err(self.fail(&mut state, err.into())),
        }
    }

    pub async fn on_stop(&self) -> Result<Outcome, ControlError> {
        if let Admission::Skip(reason) = self.inner.lock().await.lifecycle.begin_stop() {
            debug!(?reason, "stop skipped");
            return Ok(Outcome::Skipped(reason));
        }
        self.emit(SurfaceEvent::PendingChanged);

        let result = self.boundary.stop_voice_reader().await;

        let mut state = self.inner.lock().await;
        let run_state = state.lifecycle.finish_stop(&result);
        self.emit(SurfaceEvent::RunStateChanged(run_state));
        match result {
            Ok(()) => {
                state.clear_failure(CommandName::StopVoiceReader);
                Ok(Outcome::Applied)
            }
            Err(err) => Err(self.fail(&mut state, err.into())),
        }
    }
}

#[cfg(test)]
#[path = "tests/control_surface_tests.rs"]
mod tests;
