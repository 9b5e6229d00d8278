//! Backend commands queued from UI to backend worker.

use shared::domain::SettingsField;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCommand {
    /// Reload settings and list devices; also retries a failed device listing.
    Startup,
    /// `seq` counts edits sent by the window, starting at 1.
    EditField {
        field: SettingsField,
        value: String,
        seq: u64,
    },
    Submit,
    SelectDevice {
        name: String,
    },
    Run,
    Stop,
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BackendCommand::Startup => "startup",
            BackendCommand::EditField { .. } => "edit_field",
            BackendCommand::Submit => "submit",
            BackendCommand::SelectDevice { .. } => "select_device",
            BackendCommand::Run => "run",
            BackendCommand::Stop => "stop",
        }
    }
}
