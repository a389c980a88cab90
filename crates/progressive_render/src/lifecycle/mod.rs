//! Render lifecycle
//!
//! The [`Renderer`] owns all per-frame state and exposes the update,
//! prepare, frame and swap phases; the [`FrameController`] is the clock that
//! sequences them into progressively refined images. Asynchronous resource
//! loads gate frames through [`LoadGate`].

pub mod controller;
pub mod loading;
pub mod renderer;
pub mod volume_pass;

#[cfg(test)]
mod tests;

pub use controller::{FrameController, TickOutcome};
pub use loading::{LoadEvent, LoadGate, LoadNotifier, LoadProgress, LoadStatus};
pub use renderer::{LifecycleState, PresentStats, Renderer};
pub use volume_pass::VolumePass;
