use thiserror::Error;

use crate::protocol::CommandName;

/// Failure of a boundary call. Timeouts, a crashed backend and rejected
/// commands are not distinguished by callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoundaryError {
    #[error("backend unreachable while invoking {command}: {reason}")]
    Unreachable { command: CommandName, reason: String },
}

impl BoundaryError {
    pub fn unreachable(command: CommandName, reason: impl Into<String>) -> Self {
        Self::Unreachable {
            command,
            reason: reason.into(),
        }
    }

    pub fn command(&self) -> CommandName {
        match self {
            Self::Unreachable { command, .. } => *command,
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            Self::Unreachable { reason, .. } => reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown settings field '{0}' (expected slackToken, threadUrl, voicevoxUrl or speakerStyleId)")]
pub struct UnknownSettingsField(pub String);
