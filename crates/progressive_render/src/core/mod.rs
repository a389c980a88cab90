//! Core renderer state: configuration and change tracking

pub mod config;
pub mod change_tracker;

pub use change_tracker::{ChangeTracker, DirtyFlags, UnknownFlag};
pub use config::{CameraConfig, FramePrecision, RenderMode, RendererConfig, VolumeConfig};
