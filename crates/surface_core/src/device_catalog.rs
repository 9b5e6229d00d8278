use shared::error::BoundaryError;
use tracing::{info, warn};

use crate::{
    boundary::CommandBoundary,
    outcome::{Admission, SkipReason},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CatalogStatus {
    #[default]
    NotFetched,
    Fetching,
    Ready,
    Failed,
}

/// Playback devices as the backend enumerated them at startup.
///
/// Order is the backend's; names are neither sorted nor deduplicated. Once
/// ready the catalog is never refreshed for the rest of the session.
#[derive(Debug, Clone, Default)]
pub struct DeviceCatalog {
    status: CatalogStatus,
    devices: Vec<String>,
}

impl DeviceCatalog {
    pub fn status(&self) -> CatalogStatus {
        self.status
    }

    pub fn devices(&self) -> &[String] {
        &self.devices
    }

    pub fn contains(&self, name: &str) -> bool {
        self.devices.iter().any(|device| device == name)
    }

    /// A failed fetch may be issued again; a successful one may not.
    pub fn begin_fetch(&mut self) -> Admission<()> {
        match self.status {
            CatalogStatus::Fetching => Admission::Skip(SkipReason::AlreadyPending),
            CatalogStatus::Ready => Admission::Skip(SkipReason::AlreadyFetched),
            CatalogStatus::NotFetched | CatalogStatus::Failed => {
                self.status = CatalogStatus::Fetching;
                Admission::Proceed(())
            }
        }
    }

    pub fn finish_fetch(&mut self, result: Result<Vec<String>, BoundaryError>) {
        match result {
            Ok(devices) => {
                info!(count = devices.len(), "device catalog ready");
                self.devices = devices;
                self.status = CatalogStatus::Ready;
            }
            Err(err) => {
                warn!(command = %err.command(), "device list failed: {}", err.reason());
                self.status = CatalogStatus::Failed;
            }
        }
    }
}

pub async fn fetch_devices(boundary: &dyn CommandBoundary) -> Result<Vec<String>, BoundaryError> {
    boundary.device_list().await
}
