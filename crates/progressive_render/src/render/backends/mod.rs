//! Concrete [`RenderBackend`](crate::render::api::RenderBackend) implementations

pub mod software;

pub use software::{BackendCall, Fragment, SoftwareBackend};
