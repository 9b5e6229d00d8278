//! Reader control window: settings form, device picker, and run controls.

use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use shared::domain::{RunState, SettingsField, SettingsRecord};
use surface_core::{Affordances, CatalogStatus, SurfaceSnapshot};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorCategory, UiEvent};
use crate::controller::orchestration::dispatch_backend_command;

pub struct ThreadReaderApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    form: SettingsRecord,
    /// Last edit sequence number queued to the worker.
    sent_edits: u64,
    /// A reload arrived while queued edits were still unapplied.
    reload_pending: bool,
    snapshot: Option<SurfaceSnapshot>,
    status: String,
    status_banner: Option<UiError>,
}

impl ThreadReaderApp {
    pub fn new(cmd_tx: Sender<BackendCommand>, ui_rx: Receiver<UiEvent>) -> Self {
        let mut app = Self {
            cmd_tx,
            ui_rx,
            form: SettingsRecord::default(),
            sent_edits: 0,
            reload_pending: false,
            snapshot: None,
            status: "Starting...".to_string(),
            status_banner: None,
        };
        app.dispatch(BackendCommand::Startup);
        app
    }

    fn dispatch(&mut self, cmd: BackendCommand) -> bool {
        dispatch_backend_command(&self.cmd_tx, cmd, &mut self.status)
    }

    pub fn form(&self) -> &SettingsRecord {
        &self.form
    }

    pub fn status_banner(&self) -> Option<&UiError> {
        self.status_banner.as_ref()
    }

    /// Controls are disabled until the first snapshot arrives.
    pub fn affordances(&self) -> Affordances {
        self.snapshot
            .as_ref()
            .map(SurfaceSnapshot::affordances)
            .unwrap_or(Affordances {
                submit: false,
                run: false,
                stop: false,
                select_device: false,
            })
    }

    pub fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Info(message) => {
                    self.status = message;
                }
                UiEvent::Snapshot {
                    snapshot,
                    reload,
                    edits_applied,
                } => {
                    self.reload_pending |= reload;
                    // Replacing the form before queued edits land would drop keystrokes.
                    if self.reload_pending && edits_applied >= self.sent_edits {
                        self.form = snapshot.draft.clone();
                        self.reload_pending = false;
                    }
                    if let Some(banner) = &self.status_banner {
                        let still_failing = snapshot
                            .last_failure
                            .as_ref()
                            .is_some_and(|failure| Some(failure.command) == banner.command());
                        if banner.command().is_some() && !still_failing {
                            self.status_banner = None;
                        }
                    }
                    self.snapshot = Some(snapshot);
                }
                UiEvent::Error(err) => {
                    tracing::warn!(category = ?err.category(), "{}", err.message());
                    self.status = err.message().to_string();
                    self.status_banner = Some(err);
                }
            }
        }
    }

    pub fn edit_field(&mut self, field: SettingsField, value: String) {
        self.form.set(field, value.clone());
        let seq = self.sent_edits + 1;
        if self.dispatch(BackendCommand::EditField { field, value, seq }) {
            self.sent_edits = seq;
        }
    }

    fn show_status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let (run_text, run_color) = match self.snapshot.as_ref().map(|s| s.run_state) {
                    Some(RunState::Running) => ("Running", egui::Color32::from_rgb(67, 181, 129)),
                    Some(RunState::Idle) => ("Idle", egui::Color32::GRAY),
                    None => ("Connecting", egui::Color32::GRAY),
                };
                ui.colored_label(run_color, format!("Reader: {run_text}"));
                ui.separator();
                ui.label(self.status.as_str());
            });
        });
    }

    fn show_banner(&mut self, ui: &mut egui::Ui) {
        let Some(banner) = &self.status_banner else {
            return;
        };
        let color = match banner.category() {
            UiErrorCategory::Validation => egui::Color32::from_rgb(250, 166, 26),
            UiErrorCategory::Unreachable | UiErrorCategory::BackendStartup => {
                egui::Color32::from_rgb(240, 71, 71)
            }
        };
        let mut dismissed = false;
        ui.horizontal(|ui| {
            ui.colored_label(color, banner.message());
            if ui.small_button("Dismiss").clicked() {
                dismissed = true;
            }
        });
        if dismissed {
            self.status_banner = None;
        }
        ui.add_space(6.0);
    }

    fn show_settings_form(&mut self, ui: &mut egui::Ui, affordances: Affordances) {
        ui.heading("Settings");
        egui::Grid::new("settings_form")
            .num_columns(2)
            .spacing([12.0, 6.0])
            .show(ui, |ui| {
                for field in SettingsField::ALL {
                    ui.label(field.label());
                    let mut value = self.form.get(field).to_string();
                    let edit = egui::TextEdit::singleline(&mut value)
                        .desired_width(360.0)
                        .password(field == SettingsField::SlackToken);
                    if ui.add(edit).changed() {
                        self.edit_field(field, value);
                    }
                    ui.end_row();
                }
            });

        ui.horizontal(|ui| {
            if ui
                .add_enabled(affordances.submit, egui::Button::new("Save"))
                .clicked()
            {
                self.dispatch(BackendCommand::Submit);
            }
            let dirty = self.snapshot.as_ref().is_some_and(|s| s.dirty);
            let saving = self.snapshot.as_ref().is_some_and(|s| s.pending.save);
            if saving {
                ui.spinner();
                ui.label("Saving...");
            } else if dirty {
                ui.label("Unsaved changes");
            }
        });
    }

    fn show_device_picker(&mut self, ui: &mut egui::Ui, affordances: Affordances) {
        ui.heading("Playback device");
        let Some(snapshot) = self.snapshot.clone() else {
            ui.label("Waiting for backend...");
            return;
        };

        match snapshot.catalog_status {
            CatalogStatus::NotFetched | CatalogStatus::Fetching => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Listing devices...");
                });
            }
            CatalogStatus::Failed => {
                ui.horizontal(|ui| {
                    ui.label("Device list unavailable.");
                    if ui.button("Retry").clicked() {
                        self.dispatch(BackendCommand::Startup);
                    }
                });
            }
            CatalogStatus::Ready if snapshot.devices.is_empty() => {
                ui.label("The backend reported no playback devices.");
            }
            CatalogStatus::Ready => {}
        }

        ui.add_enabled_ui(affordances.select_device, |ui| {
            for device in &snapshot.devices {
                let selected = snapshot.selected_device.as_deref() == Some(device.as_str());
                if ui.radio(selected, device.as_str()).clicked() && !selected {
                    self.dispatch(BackendCommand::SelectDevice {
                        name: device.clone(),
                    });
                }
            }
        });
    }

    fn show_run_controls(&mut self, ui: &mut egui::Ui, affordances: Affordances) {
        ui.horizontal(|ui| {
            if ui
                .add_enabled(affordances.run, egui::Button::new("Run"))
                .clicked()
            {
                self.dispatch(BackendCommand::Run);
            }
            if ui
                .add_enabled(affordances.stop, egui::Button::new("Stop"))
                .clicked()
            {
                self.dispatch(BackendCommand::Stop);
            }
            let transition = self
                .snapshot
                .as_ref()
                .and_then(|snapshot| snapshot.pending.run_transition);
            if transition.is_some() {
                ui.spinner();
            }
        });
    }
}

impl eframe::App for ThreadReaderApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();
        let affordances = self.affordances();

        self.show_status_bar(ctx);
        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_banner(ui);
            self.show_settings_form(ui, affordances);
            ui.separator();
            self.show_device_picker(ui, affordances);
            ui.separator();
            self.show_run_controls(ui, affordances);
        });

        ctx.request_repaint_after(std::time::Duration::from_millis(100));
    }
}
