use super::*;

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex as StdMutex,
};

use async_trait::async_trait;
use shared::error::BoundaryError;
use tokio::sync::oneshot;

use crate::outcome::SkipReason;

struct Gate {
    entered: Option<oneshot::Sender<()>>,
    release: oneshot::Receiver<()>,
}

/// Faithful in-memory store with scripted failures and holdable replies.
struct ScriptedBoundary {
    stored: StdMutex<SettingsRecord>,
    devices: Vec<String>,
    failing: StdMutex<HashSet<CommandName>>,
    calls: StdMutex<Vec<CommandName>>,
    run_devices: StdMutex<Vec<String>>,
    gates: StdMutex<HashMap<CommandName, Gate>>,
}

impl ScriptedBoundary {
    fn new(stored: SettingsRecord, devices: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            stored: StdMutex::new(stored),
            devices: devices.iter().map(|name| name.to_string()).collect(),
            failing: StdMutex::new(HashSet::new()),
            calls: StdMutex::new(Vec::new()),
            run_devices: StdMutex::new(Vec::new()),
            gates: StdMutex::new(HashMap::new()),
        })
    }

    fn fail(&self, command: CommandName) {
        self.failing.lock().expect("failing").insert(command);
    }

    fn recover(&self, command: CommandName) {
        self.failing.lock().expect("failing").remove(&command);
    }

    /// Holds the next call of `command` until the returned sender fires.
    fn hold(&self, command: CommandName) -> (oneshot::Receiver<()>, oneshot::Sender<()>) {
        let (entered_tx, entered_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        self.gates.lock().expect("gates").insert(
            command,
            Gate {
                entered: Some(entered_tx),
                release: release_rx,
            },
        );
        (entered_rx, release_tx)
    }

    fn calls(&self, command: CommandName) -> usize {
        self.calls
            .lock()
            .expect("calls")
            .iter()
            .filter(|call| **call == command)
            .count()
    }

    fn stored(&self) -> SettingsRecord {
        self.stored.lock().expect("stored").clone()
    }

    async fn pass(&self, command: CommandName) -> Result<(), BoundaryError> {
        self.calls.lock().expect("calls").push(command);
        let gate = self.gates.lock().expect("gates").remove(&command);
        if let Some(mut gate) = gate {
            if let Some(entered) = gate.entered.take() {
                let _ = entered.send(());
            }
            let _ = gate.release.await;
        }
        if self.failing.lock().expect("failing").contains(&command) {
            return Err(BoundaryError::unreachable(command, "scripted failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl CommandBoundary for ScriptedBoundary {
    async fn load_settings(&self) -> Result<SettingsRecord, BoundaryError> {
        self.pass(CommandName::LoadSettings).await?;
        Ok(self.stored())
    }

    async fn save_settings(&self, settings: &SettingsRecord) -> Result<(), BoundaryError> {
        self.pass(CommandName::SaveSettings).await?;
        *self.stored.lock().expect("stored") = settings.clone();
        Ok(())
    }

    async fn device_list(&self) -> Result<Vec<String>, BoundaryError> {
        self.pass(CommandName::DeviceList).await?;
        Ok(self.devices.clone())
    }

    async fn run_voice_reader(&self, device: &str) -> Result<(), BoundaryError> {
        self.run_devices
            .lock()
            .expect("run devices")
            .push(device.to_string());
        self.pass(CommandName::RunVoiceReader).await
    }

    async fn stop_voice_reader(&self) -> Result<(), BoundaryError> {
        self.pass(CommandName::StopVoiceReader).await
    }
}

fn stored_t1() -> SettingsRecord {
    SettingsRecord {
        slack_token: "t1".into(),
        ..SettingsRecord::default()
    }
}

async fn started(devices: &[&str]) -> (Arc<ScriptedBoundary>, Arc<ControlSurface>) {
    let backend = ScriptedBoundary::new(stored_t1(), devices);
    let surface = ControlSurface::new(backend.clone());
    let report = surface.on_startup().await;
    assert!(report.is_ok(), "startup failed: {report:?}");
    (backend, surface)
}

#[tokio::test]
async fn startup_populates_draft_and_catalog() {
    let (_backend, surface) = started(&["Speakers", "Headset"]).await;

    let snapshot = surface.snapshot().await;
    assert_eq!(snapshot.draft, stored_t1());
    assert!(!snapshot.dirty);
    assert_eq!(snapshot.devices, vec!["Speakers", "Headset"]);
    assert_eq!(snapshot.catalog_status, CatalogStatus::Ready);
    assert_eq!(snapshot.selected_device, None);
    assert_eq!(snapshot.run_state, RunState::Idle);
    assert_eq!(snapshot.pending, PendingCalls::default());
    assert_eq!(
        snapshot.affordances(),
        Affordances {
            submit: false,
            run: true,
            stop: false,
            select_device: true,
        }
    );
}

#[tokio::test]
async fn failed_settings_load_does_not_block_device_list() {
    let backend = ScriptedBoundary::new(stored_t1(), &["Speakers"]);
    backend.fail(CommandName::LoadSettings);
    let surface = ControlSurface::new(backend.clone());

    let report = surface.on_startup().await;
    assert!(matches!(
        report.settings,
        Err(ControlError::BackendUnreachable {
            command: CommandName::LoadSettings,
            ..
        })
    ));
    assert_eq!(report.devices, Ok(Outcome::Applied));

    let snapshot = surface.snapshot().await;
    assert_eq!(snapshot.draft, SettingsRecord::default());
    assert!(!snapshot.dirty);
    assert_eq!(snapshot.devices, vec!["Speakers"]);
    assert_eq!(
        snapshot.last_failure.map(|failure| failure.command),
        Some(CommandName::LoadSettings)
    );
}

#[tokio::test]
async fn failed_device_list_does_not_block_settings() {
    let backend = ScriptedBoundary::new(stored_t1(), &["Speakers"]);
    backend.fail(CommandName::DeviceList);
    let surface = ControlSurface::new(backend.clone());

    let report = surface.on_startup().await;
    assert_eq!(report.settings, Ok(Outcome::Applied));
    assert!(report.devices.is_err());

    let snapshot = surface.snapshot().await;
    assert_eq!(snapshot.draft, stored_t1());
    assert_eq!(snapshot.catalog_status, CatalogStatus::Failed);
    assert!(!snapshot.affordances().select_device);
}

#[tokio::test]
async fn settings_apply_while_device_list_is_still_pending() {
    let backend = ScriptedBoundary::new(stored_t1(), &["Speakers"]);
    let (entered, release) = backend.hold(CommandName::DeviceList);
    let surface = ControlSurface::new(backend.clone());
    let mut events = surface.subscribe_events();

    let startup = tokio::spawn({
        let surface = surface.clone();
        async move { surface.on_startup().await }
    });
    entered.await.expect("device list entered");
    loop {
        if events.recv().await.expect("event") == SurfaceEvent::SettingsLoaded {
            break;
        }
    }

    let snapshot = surface.snapshot().await;
    assert_eq!(snapshot.draft, stored_t1());
    assert!(snapshot.pending.fetch);
    assert!(!snapshot.pending.load);
    assert!(snapshot.devices.is_empty());

    release.send(()).expect("release");
    assert!(startup.await.expect("join").is_ok());
    assert_eq!(surface.snapshot().await.devices, vec!["Speakers"]);
}

#[tokio::test]
async fn edits_keep_draft_dirty_until_submit_succeeds() {
    let (backend, surface) = started(&["Speakers"]).await;

    surface
        .on_field_edit(SettingsField::ThreadUrl, "http://x")
        .await;
    assert!(surface.snapshot().await.dirty);
    surface.on_field_edit(SettingsField::SpeakerStyleId, "3").await;
    surface.on_field_edit(SettingsField::SpeakerStyleId, "3").await;
    let snapshot = surface.snapshot().await;
    assert!(snapshot.dirty);
    assert!(snapshot.affordances().submit);

    assert_eq!(surface.on_submit().await, Ok(Outcome::Applied));
    let snapshot = surface.snapshot().await;
    assert!(!snapshot.dirty);
    assert!(!snapshot.affordances().submit);
    assert_eq!(backend.stored().thread_url, "http://x");
    assert_eq!(backend.stored().speaker_style_id, "3");
    assert_eq!(backend.stored().slack_token, "t1");
}

#[tokio::test]
async fn submit_on_clean_draft_makes_no_backend_call() {
    let (backend, surface) = started(&[]).await;

    assert_eq!(
        surface.on_submit().await,
        Ok(Outcome::Skipped(SkipReason::NotDirty))
    );
    assert_eq!(backend.calls(CommandName::SaveSettings), 0);
}

#[tokio::test]
async fn failed_submit_leaves_draft_dirty_and_is_retryable() {
    let (backend, surface) = started(&[]).await;
    surface
        .on_field_edit(SettingsField::VoicevoxUrl, "http://localhost:50021")
        .await;
    backend.fail(CommandName::SaveSettings);

    let err = surface.on_submit().await.expect_err("save must fail");
    assert_eq!(err.command(), CommandName::SaveSettings);
    let snapshot = surface.snapshot().await;
    assert!(snapshot.dirty);
    assert_eq!(snapshot.draft.voicevox_url, "http://localhost:50021");
    assert!(snapshot.affordances().submit);
    assert!(snapshot.last_failure.is_some());
    assert_eq!(backend.stored(), stored_t1());

    backend.recover(CommandName::SaveSettings);
    assert_eq!(surface.on_submit().await, Ok(Outcome::Applied));
    let snapshot = surface.snapshot().await;
    assert!(!snapshot.dirty);
    assert_eq!(snapshot.last_failure, None);
    assert_eq!(backend.calls(CommandName::SaveSettings), 2);
}

#[tokio::test]
async fn second_submit_while_saving_is_rejected() {
    let (backend, surface) = started(&[]).await;
    surface
        .on_field_edit(SettingsField::ThreadUrl, "http://x")
        .await;
    let (entered, release) = backend.hold(CommandName::SaveSettings);

    let first = tokio::spawn({
        let surface = surface.clone();
        async move { surface.on_submit().await }
    });
    entered.await.expect("save entered");

    let snapshot = surface.snapshot().await;
    assert!(snapshot.pending.save);
    assert!(!snapshot.affordances().submit);
    assert_eq!(
        surface.on_submit().await,
        Ok(Outcome::Skipped(SkipReason::AlreadyPending))
    );

    release.send(()).expect("release");
    assert_eq!(first.await.expect("join"), Ok(Outcome::Applied));
    assert_eq!(backend.calls(CommandName::SaveSettings), 1);
    assert!(!surface.snapshot().await.dirty);
}

#[tokio::test]
async fn edit_during_pending_save_stays_dirty() {
    let (backend, surface) = started(&[]).await;
    surface
        .on_field_edit(SettingsField::ThreadUrl, "http://x")
        .await;
    let (entered, release) = backend.hold(CommandName::SaveSettings);

    let save = tokio::spawn({
        let surface = surface.clone();
        async move { surface.on_submit().await }
    });
    entered.await.expect("save entered");
    surface
        .on_field_edit(SettingsField::ThreadUrl, "http://y")
        .await;
    release.send(()).expect("release");
    assert_eq!(save.await.expect("join"), Ok(Outcome::Applied));

    let snapshot = surface.snapshot().await;
    assert!(snapshot.dirty);
    assert_eq!(snapshot.draft.thread_url, "http://y");
    assert_eq!(backend.stored().thread_url, "http://x");
}

#[tokio::test]
async fn reload_waits_for_pending_save() {
    let (backend, surface) = started(&["Speakers"]).await;
    surface
        .on_field_edit(SettingsField::ThreadUrl, "http://x")
        .await;
    let (entered, release) = backend.hold(CommandName::SaveSettings);

    let save = tokio::spawn({
        let surface = surface.clone();
        async move { surface.on_submit().await }
    });
    entered.await.expect("save entered");

    let report = surface.on_startup().await;
    assert_eq!(
        report.settings,
        Ok(Outcome::Skipped(SkipReason::AlreadyPending))
    );
    assert_eq!(backend.calls(CommandName::LoadSettings), 1);

    release.send(()).expect("release");
    assert_eq!(save.await.expect("join"), Ok(Outcome::Applied));
    let snapshot = surface.snapshot().await;
    assert_eq!(snapshot.draft.thread_url, "http://x");
    assert_eq!(snapshot.draft, backend.stored());
    assert!(!snapshot.dirty);
}

#[tokio::test]
async fn submit_waits_for_pending_reload() {
    let (backend, surface) = started(&["Speakers"]).await;
    let (entered, release) = backend.hold(CommandName::LoadSettings);

    let reload = tokio::spawn({
        let surface = surface.clone();
        async move { surface.on_startup().await }
    });
    entered.await.expect("load entered");
    surface
        .on_field_edit(SettingsField::ThreadUrl, "http://x")
        .await;
    assert_eq!(
        surface.on_submit().await,
        Ok(Outcome::Skipped(SkipReason::AlreadyPending))
    );
    assert_eq!(backend.calls(CommandName::SaveSettings), 0);

    release.send(()).expect("release");
    assert!(reload.await.expect("join").is_ok());
    let snapshot = surface.snapshot().await;
    assert!(snapshot.dirty);
    assert_eq!(snapshot.draft.thread_url, "http://x");
    assert_eq!(surface.on_submit().await, Ok(Outcome::Applied));
    assert_eq!(backend.stored().thread_url, "http://x");
}

#[tokio::test]
async fn startup_reload_clears_dirty_without_refetching_devices() {
    let (backend, surface) = started(&["Speakers"]).await;
    surface.on_field_edit(SettingsField::SlackToken, "draft").await;

    let report = surface.on_startup().await;
    assert_eq!(report.settings, Ok(Outcome::Applied));
    assert_eq!(
        report.devices,
        Ok(Outcome::Skipped(SkipReason::AlreadyFetched))
    );

    let snapshot = surface.snapshot().await;
    assert!(!snapshot.dirty);
    assert_eq!(snapshot.draft, stored_t1());
    assert_eq!(backend.calls(CommandName::DeviceList), 1);
    assert_eq!(backend.calls(CommandName::LoadSettings), 2);
}

#[tokio::test]
async fn run_without_device_fails_locally() {
    let (backend, surface) = started(&["Speakers", "Headset"]).await;
    let mut events = surface.subscribe_events();

    assert_eq!(surface.on_run().await, Err(ControlError::NoDeviceSelected));
    assert_eq!(backend.calls(CommandName::RunVoiceReader), 0);
    assert_eq!(
        events.recv().await.expect("event"),
        SurfaceEvent::Failed(ControlError::NoDeviceSelected)
    );

    let snapshot = surface.snapshot().await;
    assert_eq!(snapshot.run_state, RunState::Idle);
    assert_eq!(
        snapshot.last_failure,
        Some(SurfaceFailure {
            command: CommandName::RunVoiceReader,
            message: "no playback device selected".to_string(),
        })
    );
}

#[tokio::test]
async fn run_with_selected_device_enters_running_once() {
    let (backend, surface) = started(&["Speakers", "Headset"]).await;
    surface.on_device_select("Speakers").await;
    surface.on_device_select("Headset").await;

    assert_eq!(surface.on_run().await, Ok(Outcome::Applied));
    let snapshot = surface.snapshot().await;
    assert_eq!(snapshot.run_state, RunState::Running);
    assert_eq!(snapshot.selected_device.as_deref(), Some("Headset"));
    assert!(!snapshot.affordances().run);
    assert!(snapshot.affordances().stop);

    assert_eq!(
        surface.on_run().await,
        Ok(Outcome::Skipped(SkipReason::AlreadyRunning))
    );
    assert_eq!(backend.calls(CommandName::RunVoiceReader), 1);
    assert_eq!(
        *backend.run_devices.lock().expect("run devices"),
        vec!["Headset".to_string()]
    );
}

#[tokio::test]
async fn failed_start_never_shows_running() {
    let (backend, surface) = started(&["Headset"]).await;
    surface.on_device_select("Headset").await;
    backend.fail(CommandName::RunVoiceReader);
    let (entered, release) = backend.hold(CommandName::RunVoiceReader);

    let run = tokio::spawn({
        let surface = surface.clone();
        async move { surface.on_run().await }
    });
    entered.await.expect("run entered");
    let pending = surface.snapshot().await;
    assert_eq!(pending.run_state, RunState::Idle);
    assert_eq!(pending.pending.run_transition, Some(RunTransition::Starting));
    assert!(!pending.affordances().run);
    assert!(!pending.affordances().stop);
    assert_eq!(
        surface.on_run().await,
        Ok(Outcome::Skipped(SkipReason::AlreadyPending))
    );

    release.send(()).expect("release");
    assert!(run.await.expect("join").is_err());
    let snapshot = surface.snapshot().await;
    assert_eq!(snapshot.run_state, RunState::Idle);
    assert!(snapshot.affordances().run);
    assert_eq!(backend.calls(CommandName::RunVoiceReader), 1);
}

#[tokio::test]
async fn stop_while_idle_is_a_no_op() {
    let (backend, surface) = started(&["Headset"]).await;
    assert_eq!(
        surface.on_stop().await,
        Ok(Outcome::Skipped(SkipReason::NotRunning))
    );
    assert_eq!(backend.calls(CommandName::StopVoiceReader), 0);
}

#[tokio::test]
async fn failed_stop_keeps_running() {
    let (backend, surface) = started(&["Headset"]).await;
    surface.on_device_select("Headset").await;
    surface.on_run().await.expect("run");
    backend.fail(CommandName::StopVoiceReader);

    assert!(surface.on_stop().await.is_err());
    assert_eq!(surface.snapshot().await.run_state, RunState::Running);

    backend.recover(CommandName::StopVoiceReader);
    assert_eq!(surface.on_stop().await, Ok(Outcome::Applied));
    let snapshot = surface.snapshot().await;
    assert_eq!(snapshot.run_state, RunState::Idle);
    assert_eq!(snapshot.last_failure, None);
}

#[tokio::test]
async fn selection_outside_catalog_is_accepted() {
    let (_backend, surface) = started(&["Speakers"]).await;
    surface.on_device_select("USB DAC").await;
    assert_eq!(
        surface.snapshot().await.selected_device.as_deref(),
        Some("USB DAC")
    );
}

#[tokio::test]
async fn run_publishes_pending_then_state_change() {
    let (_backend, surface) = started(&["Headset"]).await;
    surface.on_device_select("Headset").await;
    let mut events = surface.subscribe_events();

    surface.on_run().await.expect("run");
    assert_eq!(
        events.recv().await.expect("event"),
        SurfaceEvent::PendingChanged
    );
    assert_eq!(
        events.recv().await.expect("event"),
        SurfaceEvent::RunStateChanged(RunState::Running)
    );
}
