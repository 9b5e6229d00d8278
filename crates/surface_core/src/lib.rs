//! Control surface for the thread voice reader.
//!
//! The reader itself runs in a backend process reachable only through five
//! named commands. This crate keeps what a front end shows consistent with
//! that backend.

pub mod boundary;
pub mod config;
pub mod control_surface;
pub mod device_catalog;
pub mod error;
pub mod lifecycle;
pub mod outcome;
pub mod settings_store;

pub use boundary::{CommandBoundary, HttpCommandBoundary, MissingBackend};
pub use config::{load_config, SurfaceConfig};
pub use control_surface::{
    Affordances, ControlSurface, PendingCalls, StartupReport, SurfaceEvent, SurfaceFailure,
    SurfaceSnapshot,
};
pub use device_catalog::CatalogStatus;
pub use error::ControlError;
pub use lifecycle::RunTransition;
pub use outcome::{Outcome, SkipReason};
