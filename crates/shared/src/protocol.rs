use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::SettingsRecord;

/// Commands the backend process exposes to the control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandName {
    LoadSettings,
    SaveSettings,
    DeviceList,
    RunVoiceReader,
    StopVoiceReader,
}

impl CommandName {
    pub const ALL: [CommandName; 5] = [
        CommandName::LoadSettings,
        CommandName::SaveSettings,
        CommandName::DeviceList,
        CommandName::RunVoiceReader,
        CommandName::StopVoiceReader,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CommandName::LoadSettings => "load_settings",
            CommandName::SaveSettings => "save_settings",
            CommandName::DeviceList => "device_list",
            CommandName::RunVoiceReader => "run_voice_reader",
            CommandName::StopVoiceReader => "stop_voice_reader",
        }
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoArgs {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveSettingsArgs {
    pub settings: SettingsRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunVoiceReaderArgs {
    pub device: String,
}

/// Body a backend may attach to a rejected command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandFailure {
    #[serde(default)]
    pub message: String,
}

impl CommandFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
