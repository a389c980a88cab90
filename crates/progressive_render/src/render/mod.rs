//! # Rendering System
//!
//! Backend-facing half of the progressive pipeline.
//!
//! ## Architecture
//!
//! - **api**: the [`RenderBackend`] trait and the opaque handles that cross it
//! - **primitives**: camera and geometry (including the volume cuboid)
//! - **resources**: bind-object dispatch ([`ResourceBinder`]) and materials
//! - **systems**: the jitter kernel and the accumulation stage
//! - **backends**: a headless software backend used by tests and the demo app
//!
//! Nothing in here owns a frame loop; [`crate::lifecycle`] drives these
//! pieces once per tick.

pub mod api;
pub mod primitives;
pub mod resources;
pub mod systems;
pub mod backends;

pub use api::{
    BackendCapabilities, BackendResult, BindObjectHandle, BindObjectSupport, BufferHandle,
    BufferUsage, ClearFlags, Color, DrawCall, Primitive, ProgramHandle, RenderBackend,
    RenderTargetHandle, TextureHandle, UniformLocation, UniformValue,
};
pub use primitives::{Camera, Geometry};
pub use resources::{Material, ResourceBinder};
pub use systems::{AccumulationSettings, AccumulationStage, AntiAliasingKernel};

use thiserror::Error;

use crate::config::ConfigError;
use crate::core::UnknownFlag;
use crate::scene::SceneError;

/// High-level rendering error types
///
/// Precondition violations (`Uninitialized`, `MultipleTransformComponents`,
/// `MissingTransformBinding`) are programmer or configuration errors and
/// abort the operation that hit them. `PresentationFailed` is produced by
/// backends on blit and is swallowed by the swap phase.
#[derive(Error, Debug)]
pub enum RenderError {
    /// An object was used before it was created or initialized
    #[error("{0} used before initialization")]
    Uninitialized(&'static str),

    /// A scene node carries more than one transform component
    #[error("scene node '{node}' has {count} transform components, at most one is allowed")]
    MultipleTransformComponents {
        /// Name of the offending node
        node: String,
        /// Number of transform components found
        count: usize,
    },

    /// The scene pass has no function to push the named transform
    #[error("{0} transform update is not bound")]
    MissingTransformBinding(&'static str),

    /// A node, geometry or material id does not resolve in the scene
    #[error("dangling scene reference: {0}")]
    DanglingReference(String),

    /// A dirty flag name did not match any declared flag
    #[error(transparent)]
    UnknownFlag(#[from] UnknownFlag),

    /// Scene editing failed
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// The renderer configuration was rejected
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Resource creation or management failed
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// Copy to the display target failed
    #[error("Presentation failed: {0}")]
    PresentationFailed(String),

    /// Backend-specific error occurred
    #[error("Backend error: {0}")]
    BackendError(String),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
