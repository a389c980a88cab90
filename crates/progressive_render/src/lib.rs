//! # Progressive Render
//!
//! Progressive multi-frame rendering core. A renderer draws the same view
//! several times with a sub-pixel jitter, folds every sub-frame into a
//! running mean and presents the mean after each sub-frame, so the image
//! sharpens while the view is still. Any change to the inputs restarts the
//! sequence.
//!
//! ## Features
//!
//! - **Jittered accumulation**: deterministic Halton kernel, equal-weight mean
//! - **Change tracking**: setters raise dirty flags, `prepare` reconciles once
//! - **Scene graph**: slotmap-backed nodes with composed transforms
//! - **Bind objects**: native, extension or emulated vertex-array dispatch
//! - **Load gating**: frames wait on resources reported from loader threads
//! - **Headless backend**: software rasterization target for tests and demos
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use progressive_render::prelude::*;
//!
//! fn main() -> Result<(), RenderError> {
//!     let config = RendererConfig::default().with_size(320, 240);
//!     let mut renderer = Renderer::new(SoftwareBackend::new(config.canvas_size), &config)?;
//!
//!     let backend = renderer.backend_mut();
//!     let program = backend.create_program("volume", &VolumePass::UNIFORMS);
//!     let volume = backend.create_texture("volume");
//!     let transfer = backend.create_texture("transfer");
//!     let pass = VolumePass::new(backend, program, volume, transfer, &config.volume)?;
//!     renderer.set_volume_pass(pass);
//!     renderer.initialize()?;
//!
//!     FrameController::new().run_until_idle(&mut renderer, 1000)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod core;
pub mod render;
pub mod scene;
pub mod input;
pub mod lifecycle;

/// Common imports for renderer users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError},
        core::{DirtyFlags, FramePrecision, RenderMode, RendererConfig},
        foundation::math::{Mat4, Transform, Vec2, Vec3},
        input::{Navigation, OrbitNavigation, ScriptedNavigation},
        lifecycle::{FrameController, LoadNotifier, PresentStats, Renderer, TickOutcome, VolumePass},
        render::{
            backends::SoftwareBackend, Camera, Color, Geometry, Material, RenderBackend, RenderError,
            RenderResult,
        },
        scene::{GeometryComponent, Scene, ScenePass, TransformComponent},
    };
}
