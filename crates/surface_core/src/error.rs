use shared::{error::BoundaryError, protocol::CommandName};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("backend unreachable while invoking {command}: {reason}")]
    BackendUnreachable { command: CommandName, reason: String },
    #[error("no playback device selected")]
    NoDeviceSelected,
}

impl ControlError {
    /// Command whose affordance this failure belongs to.
    pub fn command(&self) -> CommandName {
        match self {
            Self::BackendUnreachable { command, .. } => *command,
            Self::NoDeviceSelected => CommandName::RunVoiceReader,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::NoDeviceSelected)
    }
}

impl From<BoundaryError> for ControlError {
    fn from(value: BoundaryError) -> Self {
        match value {
            BoundaryError::Unreachable { command, reason } => {
                Self::BackendUnreachable { command, reason }
            }
        }
    }
}
