//! Runtime bridge between UI command queue and the control surface.

use std::{
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    thread,
};

use crossbeam_channel::{Receiver, Sender};
use surface_core::{
    CommandBoundary, ControlError, ControlSurface, Outcome, SurfaceEvent, SurfaceSnapshot,
};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiEvent};

pub fn launch(
    boundary: Arc<dyn CommandBoundary>,
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
) {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Backend worker starting...".to_string()));
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::backend_startup(format!(
                    "backend worker startup failure: failed to build runtime: {err}"
                ))));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let surface = ControlSurface::new(boundary);
            let events = surface.subscribe_events();
            let applied_edits = Arc::new(AtomicU64::new(0));
            tokio::spawn(forward_surface_events(
                Arc::clone(&surface),
                Arc::clone(&applied_edits),
                events,
                ui_tx.clone(),
            ));
            let _ = ui_tx.try_send(UiEvent::Info("Backend worker ready".to_string()));

            while let Ok(cmd) = cmd_rx.recv() {
                // Edits and selections apply inline, in queue order.
                match cmd {
                    BackendCommand::EditField { field, value, seq } => {
                        surface.on_field_edit(field, value).await;
                        applied_edits.store(seq, Ordering::Release);
                        let snapshot = surface.snapshot().await;
                        send_snapshot(&ui_tx, snapshot, false, seq);
                    }
                    BackendCommand::SelectDevice { name } => {
                        surface.on_device_select(name).await;
                    }
                    BackendCommand::Startup => {
                        let surface = Arc::clone(&surface);
                        let ui_tx = ui_tx.clone();
                        tokio::spawn(async move {
                            let report = surface.on_startup().await;
                            if report.is_ok() {
                                let _ = ui_tx
                                    .try_send(UiEvent::Info("Settings and devices loaded".into()));
                            }
                        });
                    }
                    BackendCommand::Submit => {
                        let surface = Arc::clone(&surface);
                        spawn_operation("Save", ui_tx.clone(), async move {
                            surface.on_submit().await
                        });
                    }
                    BackendCommand::Run => {
                        let surface = Arc::clone(&surface);
                        spawn_operation("Run", ui_tx.clone(), async move {
                            surface.on_run().await
                        });
                    }
                    BackendCommand::Stop => {
                        let surface = Arc::clone(&surface);
                        spawn_operation("Stop", ui_tx.clone(), async move {
                            surface.on_stop().await
                        });
                    }
                }
            }
            tracing::info!("ui command queue closed; backend worker exiting");
        });
    });
}

/// Reports successes and skips; failures arrive through the surface events.
fn spawn_operation<F>(label: &'static str, ui_tx: Sender<UiEvent>, operation: F)
where
    F: Future<Output = Result<Outcome, ControlError>> + Send + 'static,
{
    tokio::spawn(async move {
        let message = match operation.await {
            Ok(Outcome::Applied) => format!("{label} confirmed by backend"),
            Ok(Outcome::Skipped(reason)) => format!("{label} skipped: {reason}"),
            Err(err) => {
                tracing::debug!(operation = label, "operation failed: {err}");
                return;
            }
        };
        let _ = ui_tx.try_send(UiEvent::Info(message));
    });
}

fn send_snapshot(ui_tx: &Sender<UiEvent>, snapshot: SurfaceSnapshot, reload: bool, edits: u64) {
    let event = UiEvent::Snapshot {
        snapshot,
        reload,
        edits_applied: edits,
    };
    if ui_tx.try_send(event).is_err() {
        tracing::debug!("ui event queue unavailable; dropped surface snapshot");
    }
}

/// Draft edits are acknowledged by the command loop, so they are not
/// forwarded here.
async fn forward_surface_events(
    surface: Arc<ControlSurface>,
    applied_edits: Arc<AtomicU64>,
    mut events: broadcast::Receiver<SurfaceEvent>,
    ui_tx: Sender<UiEvent>,
) {
    loop {
        let reload = match events.recv().await {
            Ok(SurfaceEvent::DraftEdited(_)) => continue,
            Ok(SurfaceEvent::SettingsLoaded) => true,
            Ok(SurfaceEvent::Failed(err)) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_control(&err)));
                false
            }
            Ok(_) => false,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "ui event forwarder lagged behind the surface");
                true
            }
            Err(RecvError::Closed) => break,
        };

        // Read before the snapshot: every counted edit is in the draft.
        let edits = applied_edits.load(Ordering::Acquire);
        let snapshot = surface.snapshot().await;
        send_snapshot(&ui_tx, snapshot, reload, edits);
    }
}
