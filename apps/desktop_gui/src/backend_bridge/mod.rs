//! Bridge between the egui thread and the backend worker owning the control surface.

pub mod commands;
pub mod runtime;
