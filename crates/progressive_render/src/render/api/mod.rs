//! Public rendering API
//!
//! The backend trait and the handle and value types that cross it.

pub mod render_backend;

pub use render_backend::{
    BackendCapabilities, BackendResult, BindObjectHandle, BindObjectSupport, BufferHandle,
    BufferUsage, ClearFlags, Color, DrawCall, Primitive, ProgramHandle, RenderBackend,
    RenderTargetHandle, TextureHandle, UniformLocation, UniformValue,
};
