//! UI/backend events and error modeling for desktop GUI controller.

use shared::protocol::CommandName;
use surface_core::{ControlError, SurfaceSnapshot};

pub enum UiEvent {
    Info(String),
    /// Latest surface state. `reload` is set when the form should be
    /// replaced by the snapshot's draft; `edits_applied` is the last edit
    /// sequence number already folded into that draft.
    Snapshot {
        snapshot: SurfaceSnapshot,
        reload: bool,
        edits_applied: u64,
    },
    Error(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    BackendStartup,
    Unreachable,
    Validation,
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    command: Option<CommandName>,
    message: String,
}

impl UiError {
    pub fn backend_startup(message: impl Into<String>) -> Self {
        Self {
            category: UiErrorCategory::BackendStartup,
            command: None,
            message: message.into(),
        }
    }

    pub fn from_control(err: &ControlError) -> Self {
        let category = if err.is_local() {
            UiErrorCategory::Validation
        } else {
            UiErrorCategory::Unreachable
        };
        Self {
            category,
            command: Some(err.command()),
            message: describe_failure(err),
        }
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn command(&self) -> Option<CommandName> {
        self.command
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

fn action_label(command: CommandName) -> &'static str {
    match command {
        CommandName::LoadSettings => "Loading settings",
        CommandName::SaveSettings => "Saving settings",
        CommandName::DeviceList => "Listing playback devices",
        CommandName::RunVoiceReader => "Starting the reader",
        CommandName::StopVoiceReader => "Stopping the reader",
    }
}

/// User-facing wording for a control failure.
pub fn describe_failure(err: &ControlError) -> String {
    let (command, reason) = match err {
        ControlError::NoDeviceSelected => {
            return "Select a playback device before starting the reader.".to_string();
        }
        ControlError::BackendUnreachable { command, reason } => (*command, reason),
    };

    let lower = reason.to_ascii_lowercase();
    if lower.contains("no backend address") {
        "No reader backend configured; set backend_url and relaunch.".to_string()
    } else if lower.contains("failed to connect")
        || lower.contains("connection refused")
        || lower.contains("timed out")
    {
        format!(
            "{} failed: reader backend unreachable; check that it is running and retry.",
            action_label(command)
        )
    } else {
        format!("{} failed: {reason}", action_label(command))
    }
}
