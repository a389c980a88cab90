//! Backend abstraction traits for the rendering system
//!
//! This module defines the trait a graphics backend implements so the
//! progressive pipeline can bind, draw, clear, accumulate and blit without
//! knowing which API sits underneath. Resources are referenced through
//! opaque `Copy` handles; the backend owns the actual GPU objects.

use bitflags::bitflags;

use crate::core::FramePrecision;
use crate::foundation::math::{IVec3, Mat4, Vec2, Vec3};
use crate::render::RenderError;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, RenderError>;

/// Handle to a vertex or index buffer stored in the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u64);

/// Handle to a bind object (vertex array object or equivalent)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindObjectHandle(pub u64);

/// Handle to an off-screen color + depth render target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderTargetHandle(pub u64);

/// Handle to a linked shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramHandle(pub u64);

/// Handle to a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u64);

/// Opaque uniform location returned by a program lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniformLocation(pub u32);

/// How the platform exposes bind objects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindObjectSupport {
    /// First-class API support
    Native,
    /// Available through an optional extension
    Extension,
    /// Not available; buffers must be bound for every draw
    Unsupported,
}

impl BindObjectSupport {
    /// Whether bind objects can be allocated at all
    pub fn is_available(self) -> bool {
        !matches!(self, Self::Unsupported)
    }
}

/// Capabilities queried once when resources are created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendCapabilities {
    /// Bind-object support tier
    pub bind_objects: BindObjectSupport,
}

bitflags! {
    /// Buffers affected by a clear
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u8 {
        /// Color attachment
        const COLOR = 1 << 0;
        /// Depth attachment
        const DEPTH = 1 << 1;
        /// Stencil attachment
        const STENCIL = 1 << 2;
    }
}

/// Linear RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    /// Red channel
    pub r: f32,
    /// Green channel
    pub g: f32,
    /// Blue channel
    pub b: f32,
    /// Alpha channel
    pub a: f32,
}

impl Color {
    /// Opaque white
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    /// Opaque black
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    /// Fully transparent black
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Create a color from its channels
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Same value in every channel
    pub const fn splat(value: f32) -> Self {
        Self::new(value, value, value, value)
    }

    /// Channels as an array
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Apply `f` to every channel
    pub fn map(self, mut f: impl FnMut(f32) -> f32) -> Self {
        Self::new(f(self.r), f(self.g), f(self.b), f(self.a))
    }

    /// Combine two colors channel by channel
    pub fn zip_map(self, other: Self, mut f: impl FnMut(f32, f32) -> f32) -> Self {
        Self::new(f(self.r, other.r), f(self.g, other.g), f(self.b, other.b), f(self.a, other.a))
    }
}

impl From<[f32; 4]> for Color {
    fn from(c: [f32; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }
}

/// Buffer role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Per-vertex attribute data
    Vertex,
    /// Element indices
    Index,
}

/// Value pushed to a program uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// 4x4 float matrix
    Mat4(Mat4),
    /// 2-component float vector
    Vec2(Vec2),
    /// 3-component float vector
    Vec3(Vec3),
    /// 3-component integer vector
    IVec3(IVec3),
    /// Float scalar
    Float(f32),
    /// Integer scalar (also used for sampler units)
    Int(i32),
}

/// Primitive topology of a draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// Independent triangles
    Triangles,
    /// Triangle strip
    TriangleStrip,
}

/// Parameters of a single draw call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    /// Topology
    pub primitive: Primitive,
    /// Vertex or index count
    pub count: u32,
    /// Whether `count` refers to the bound index buffer
    pub indexed: bool,
}

/// Graphics backend consumed by the progressive pipeline
///
/// Every method is called from the single render loop. Render target `None`
/// refers to the display target (default framebuffer / swapchain image).
pub trait RenderBackend {
    /// Capabilities of the device, queried once per resource creation
    fn capabilities(&self) -> BackendCapabilities;

    /// Allocate a bind object
    fn create_bind_object(&mut self) -> BackendResult<BindObjectHandle>;

    /// Activate a bind object, or restore the default with `None`
    fn bind_bind_object(&mut self, handle: Option<BindObjectHandle>);

    /// Release a bind object; the buffers it recorded are untouched
    fn delete_bind_object(&mut self, handle: BindObjectHandle);

    /// Upload a buffer
    fn create_buffer(&mut self, label: &str, usage: BufferUsage, data: &[u8]) -> BackendResult<BufferHandle>;

    /// Bind a buffer (and its attribute layout) for drawing
    fn bind_buffer(&mut self, buffer: BufferHandle);

    /// Unbind a buffer
    fn unbind_buffer(&mut self, buffer: BufferHandle);

    /// Release a buffer
    fn delete_buffer(&mut self, buffer: BufferHandle);

    /// Allocate an off-screen color + depth target
    fn create_render_target(
        &mut self,
        label: &str,
        size: (u32, u32),
        precision: FramePrecision,
    ) -> BackendResult<RenderTargetHandle>;

    /// Reallocate a target's attachments at a new size
    fn resize_render_target(&mut self, target: RenderTargetHandle, size: (u32, u32)) -> BackendResult<()>;

    /// Release a target
    fn delete_render_target(&mut self, target: RenderTargetHandle);

    /// Route subsequent draws and clears to `target`
    fn bind_render_target(&mut self, target: Option<RenderTargetHandle>);

    /// Default clear color of a target, used when it is presented over
    fn set_clear_color(&mut self, target: Option<RenderTargetHandle>, color: Color);

    /// Clear the attachments selected by `flags`
    fn clear(&mut self, target: Option<RenderTargetHandle>, flags: ClearFlags, color: Color, depth: f32);

    /// Set the rasterization viewport
    fn set_viewport(&mut self, width: u32, height: u32);

    /// Make `program` current
    fn bind_program(&mut self, program: ProgramHandle);

    /// Release the current program
    fn unbind_program(&mut self, program: ProgramHandle);

    /// Look up a named uniform of `program`
    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;

    /// Write a uniform of the current program
    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue);

    /// Bind a texture to a sampler unit
    fn bind_texture(&mut self, texture: TextureHandle, unit: u32);

    /// Clear a sampler unit
    fn unbind_texture(&mut self, unit: u32);

    /// Issue a draw with the currently bound state
    fn draw(&mut self, call: DrawCall) -> BackendResult<()>;

    /// Write the running mean of `previous` and `current` into `output`
    ///
    /// Every texel must equal
    /// [`accumulate_texel`](crate::render::systems::accumulation::accumulate_texel)
    /// of its inputs; with `previous == None` (or `frame_index == 0`) the
    /// output is a copy of `current`.
    fn accumulate(
        &mut self,
        previous: Option<RenderTargetHandle>,
        current: RenderTargetHandle,
        output: RenderTargetHandle,
        frame_index: u32,
    ) -> BackendResult<()>;

    /// Copy `source` to the display target
    fn blit(&mut self, source: RenderTargetHandle) -> BackendResult<()>;
}
