//! Controller layer: UI events, failure wording, and command orchestration.

pub mod events;
pub mod orchestration;
