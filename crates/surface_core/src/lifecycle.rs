//! Run/stop state of the reader pipeline as seen from the control surface.
//!
//! Transitions are two-phase: `begin_*` gates and marks the transition
//! pending, `finish_*` applies it only once the backend has answered. A
//! failed start therefore never shows `Running`, and a failed stop never
//! shows `Idle`.
//!
//! The backend cannot report that a run ended on its own, so `Running` only
//! leaves through `stop`.

use shared::{domain::RunState, error::BoundaryError};
use tracing::{info, warn};

use crate::{
    error::ControlError,
    outcome::{Admission, SkipReason},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunTransition {
    Starting,
    Stopping,
}

#[derive(Debug, Clone, Default)]
pub struct LifecycleController {
    state: RunState,
    pending: Option<RunTransition>,
}

impl LifecycleController {
    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn pending(&self) -> Option<RunTransition> {
        self.pending
    }

    /// Returns the device to hand to the backend.
    pub fn begin_start(&mut self, device: Option<&str>) -> Result<Admission<String>, ControlError> {
        if self.pending.is_some() {
            return Ok(Admission::Skip(SkipReason::AlreadyPending));
        }
        if self.state == RunState::Running {
            return Ok(Admission::Skip(SkipReason::AlreadyRunning));
        }
        let device = device
            .filter(|name| !name.trim().is_empty())
            .ok_or(ControlError::NoDeviceSelected)?;
        self.pending = Some(RunTransition::Starting);
        Ok(Admission::Proceed(device.to_string()))
    }

    pub fn finish_start(&mut self, result: &Result<(), BoundaryError>) -> RunState {
        self.pending = None;
        match result {
            Ok(()) => {
                self.state = RunState::Running;
                info!("voice reader running");
            }
            Err(err) => warn!("voice reader failed to start: {}", err.reason()),
        }
        self.state
    }

    pub fn begin_stop(&mut self) -> Admission<()> {
        if self.pending.is_some() {
            return Admission::Skip(SkipReason::AlreadyPending);
        }
        if self.state == RunState::Idle {
            return Admission::Skip(SkipReason::NotRunning);
        }
        self.pending = Some(RunTransition::Stopping);
        Admission::Proceed(())
    }

    pub fn finish_stop(&mut self, result: &Result<(), BoundaryError>) -> RunState {
        self.pending = None;
        match result {
            Ok(()) => {
                self.state = RunState::Idle;
                info!("voice reader stopped");
            }
            Err(err) => warn!("voice reader failed to stop: {}", err.reason()),
        }
        self.state
    }
}

#[cfg(test)]
#[path = "tests/lifecycle_tests.rs"]
mod tests;
