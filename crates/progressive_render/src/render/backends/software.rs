//! # Software Backend
//!
//! CPU implementation of [`RenderBackend`] for headless runs and tests.
//!
//! Render targets are plain `Vec<Color>` surfaces. Draws run an optional
//! fragment closure over every pixel of the viewport; without one a draw only
//! counts. Every trait call is appended to a call log so tests can assert on
//! bind/draw ordering, and accumulation uses
//! [`accumulate_color`](crate::render::systems::accumulate_color) texel by
//! texel, exactly like a GPU blend pass would.
//!
//! Storage precision is emulated: `Byte` targets quantize to 1/255, `Half`
//! and `Float` targets store `f32`.

use std::collections::HashMap;

use crate::core::FramePrecision;
use crate::render::api::{
    BackendCapabilities, BackendResult, BindObjectHandle, BindObjectSupport, BufferHandle,
    BufferUsage, ClearFlags, Color, DrawCall, ProgramHandle, RenderBackend, RenderTargetHandle,
    TextureHandle, UniformLocation, UniformValue,
};
use crate::render::systems::accumulate_color;
use crate::render::RenderError;

/// A recorded trait call
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    /// `create_bind_object`
    CreateBindObject(BindObjectHandle),
    /// `bind_bind_object`
    BindBindObject(Option<BindObjectHandle>),
    /// `delete_bind_object`
    DeleteBindObject(BindObjectHandle),
    /// `create_buffer`
    CreateBuffer(BufferHandle),
    /// `bind_buffer`
    BindBuffer(BufferHandle),
    /// `unbind_buffer`
    UnbindBuffer(BufferHandle),
    /// `delete_buffer`
    DeleteBuffer(BufferHandle),
    /// `create_render_target`
    CreateRenderTarget(RenderTargetHandle),
    /// `resize_render_target`
    ResizeRenderTarget {
        /// Resized target
        target: RenderTargetHandle,
        /// New size
        size: (u32, u32),
    },
    /// `delete_render_target`
    DeleteRenderTarget(RenderTargetHandle),
    /// `bind_render_target`
    BindRenderTarget(Option<RenderTargetHandle>),
    /// `set_clear_color`
    SetClearColor {
        /// Target, `None` for the display
        target: Option<RenderTargetHandle>,
        /// New clear color
        color: Color,
    },
    /// `clear`
    Clear {
        /// Target, `None` for the display
        target: Option<RenderTargetHandle>,
        /// Cleared attachments
        flags: ClearFlags,
        /// Clear color
        color: Color,
    },
    /// `set_viewport`
    SetViewport {
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
    },
    /// `bind_program`
    BindProgram(ProgramHandle),
    /// `unbind_program`
    UnbindProgram(ProgramHandle),
    /// `set_uniform`
    SetUniform(UniformLocation, UniformValue),
    /// `bind_texture`
    BindTexture {
        /// Bound texture
        texture: TextureHandle,
        /// Sampler unit
        unit: u32,
    },
    /// `unbind_texture`
    UnbindTexture(u32),
    /// `draw`
    Draw(DrawCall),
    /// `accumulate`
    Accumulate {
        /// Previous mean, if any
        previous: Option<RenderTargetHandle>,
        /// New sub-frame
        current: RenderTargetHandle,
        /// Destination
        output: RenderTargetHandle,
        /// Sub-frame index
        frame_index: u32,
    },
    /// `blit`
    Blit(RenderTargetHandle),
}

/// Per-pixel input of a fragment closure
#[derive(Debug)]
pub struct Fragment<'a> {
    /// Pixel column, growing right
    pub x: u32,
    /// Pixel row, growing up
    pub y: u32,
    /// Viewport width
    pub width: u32,
    /// Viewport height
    pub height: u32,
    /// Number of draws issued before this one
    pub draw_index: u64,
    uniforms: &'a HashMap<UniformLocation, UniformValue>,
    textures: &'a HashMap<u32, TextureHandle>,
}

impl Fragment<'_> {
    /// Current value of a uniform
    pub fn uniform(&self, location: UniformLocation) -> Option<UniformValue> {
        self.uniforms.get(&location).copied()
    }

    /// Texture bound to a sampler unit
    pub fn texture(&self, unit: u32) -> Option<TextureHandle> {
        self.textures.get(&unit).copied()
    }
}

type FragmentShader = Box<dyn FnMut(&Fragment<'_>) -> Color>;

fn quantize(precision: FramePrecision, color: Color) -> Color {
    match precision {
        FramePrecision::Byte => color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() / 255.0),
        FramePrecision::Half | FramePrecision::Float => color,
    }
}

/// Reject empty targets and targets with more than `u32::MAX` texels
fn check_target_size(label: &str, size: (u32, u32)) -> BackendResult<()> {
    match size.0.checked_mul(size.1) {
        Some(texels) if texels > 0 => Ok(()),
        Some(_) => Err(RenderError::ResourceCreationFailed(format!(
            "render target '{}' has empty size {}x{}",
            label, size.0, size.1
        ))),
        None => Err(RenderError::ResourceCreationFailed(format!(
            "render target '{}' is too large at {}x{}",
            label, size.0, size.1
        ))),
    }
}

#[derive(Debug, Clone)]
struct Surface {
    label: String,
    size: (u32, u32),
    precision: FramePrecision,
    clear_color: Color,
    pixels: Vec<Color>,
    depth: Vec<f32>,
}

impl Surface {
    fn new(label: &str, size: (u32, u32), precision: FramePrecision) -> Self {
        let len = size.0 as usize * size.1 as usize;
        Self {
            label: label.to_string(),
            size,
            precision,
            clear_color: Color::TRANSPARENT,
            pixels: vec![Color::TRANSPARENT; len],
            depth: vec![1.0; len],
        }
    }

    fn resize(&mut self, size: (u32, u32)) {
        let len = size.0 as usize * size.1 as usize;
        self.size = size;
        self.pixels = vec![Color::TRANSPARENT; len];
        self.depth = vec![1.0; len];
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.size.0 && y < self.size.1).then(|| y as usize * self.size.0 as usize + x as usize)
    }

    fn write(&mut self, x: u32, y: u32, color: Color) {
        let color = quantize(self.precision, color);
        if let Some(index) = self.index(x, y) {
            self.pixels[index] = color;
        }
    }

    fn fill(&mut self, color: Color) {
        let color = quantize(self.precision, color);
        self.pixels.fill(color);
    }
}

#[derive(Debug)]
struct Buffer {
    usage: BufferUsage,
    data: Vec<u8>,
}

/// Headless recording backend
pub struct SoftwareBackend {
    capabilities: BackendCapabilities,
    next_id: u64,
    next_location: u32,
    calls: Vec<BackendCall>,
    display: Surface,
    targets: HashMap<u64, Surface>,
    buffers: HashMap<u64, Buffer>,
    bind_objects: HashMap<u64, Vec<BufferHandle>>,
    programs: HashMap<u64, HashMap<String, UniformLocation>>,
    textures: HashMap<u64, String>,
    bound_target: Option<RenderTargetHandle>,
    bound_bind_object: Option<BindObjectHandle>,
    bound_program: Option<ProgramHandle>,
    bound_textures: HashMap<u32, TextureHandle>,
    uniforms: HashMap<UniformLocation, UniformValue>,
    viewport: (u32, u32),
    shader: Option<FragmentShader>,
    draw_count: u64,
    fail_blits: u32,
    presented_from: Option<RenderTargetHandle>,
}

impl std::fmt::Debug for SoftwareBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareBackend")
            .field("capabilities", &self.capabilities)
            .field("display_size", &self.display.size)
            .field("render_targets", &self.targets.len())
            .field("draw_count", &self.draw_count)
            .finish_non_exhaustive()
    }
}

impl SoftwareBackend {
    /// Create a backend with a display of `canvas_size` and native bind objects
    pub fn new(canvas_size: (u32, u32)) -> Self {
        Self::with_capabilities(
            canvas_size,
            BackendCapabilities {
                bind_objects: BindObjectSupport::Native,
            },
        )
    }

    /// Create a backend reporting the given capabilities
    pub fn with_capabilities(canvas_size: (u32, u32), capabilities: BackendCapabilities) -> Self {
        log::debug!(
            "Software backend {}x{} with {:?} bind objects",
            canvas_size.0,
            canvas_size.1,
            capabilities.bind_objects
        );
        Self {
            capabilities,
            next_id: 1,
            next_location: 0,
            calls: Vec::new(),
            display: Surface::new("display", canvas_size, FramePrecision::Byte),
            targets: HashMap::new(),
            buffers: HashMap::new(),
            bind_objects: HashMap::new(),
            programs: HashMap::new(),
            textures: HashMap::new(),
            bound_target: None,
            bound_bind_object: None,
            bound_program: None,
            bound_textures: HashMap::new(),
            uniforms: HashMap::new(),
            viewport: canvas_size,
            shader: None,
            draw_count: 0,
            fail_blits: 0,
            presented_from: None,
        }
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn record(&mut self, call: BackendCall) {
        log::trace!("{:?}", call);
        self.calls.push(call);
    }

    fn surface(&self, target: Option<RenderTargetHandle>) -> Option<&Surface> {
        match target {
            Some(target) => self.targets.get(&target.0),
            None => Some(&self.display),
        }
    }

    fn surface_mut(&mut self, target: Option<RenderTargetHandle>) -> Option<&mut Surface> {
        match target {
            Some(target) => self.targets.get_mut(&target.0),
            None => Some(&mut self.display),
        }
    }

    /// Create a texture; volume and lookup data are not modeled
    pub fn create_texture(&mut self, label: &str) -> TextureHandle {
        let id = self.allocate_id();
        self.textures.insert(id, label.to_string());
        TextureHandle(id)
    }

    /// Create a program exposing the named uniforms
    pub fn create_program(&mut self, name: &str, uniforms: &[&str]) -> ProgramHandle {
        let id = self.allocate_id();
        let mut locations = HashMap::new();
        for uniform in uniforms {
            locations.insert((*uniform).to_string(), UniformLocation(self.next_location));
            self.next_location += 1;
        }
        log::debug!("Program '{}' created with {} uniforms", name, locations.len());
        self.programs.insert(id, locations);
        ProgramHandle(id)
    }

    /// Install the closure run for every pixel of every draw
    pub fn set_fragment_shader(&mut self, shader: impl FnMut(&Fragment<'_>) -> Color + 'static) {
        self.shader = Some(Box::new(shader));
    }

    /// Every trait call since creation or the last [`clear_calls`](Self::clear_calls)
    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    /// Forget recorded calls
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of draws issued
    pub fn draw_count(&self) -> u64 {
        self.draw_count
    }

    /// Number of bind objects not yet deleted
    pub fn live_bind_objects(&self) -> usize {
        self.bind_objects.len()
    }

    /// Buffers recorded by a live bind object
    pub fn bind_object_buffers(&self, handle: BindObjectHandle) -> Option<&[BufferHandle]> {
        self.bind_objects.get(&handle.0).map(Vec::as_slice)
    }

    /// Number of render targets not yet deleted
    pub fn live_render_targets(&self) -> usize {
        self.targets.len()
    }

    /// Byte length of a live buffer
    pub fn buffer_len(&self, buffer: BufferHandle) -> Option<usize> {
        self.buffers.get(&buffer.0).map(|b| b.data.len())
    }

    /// Role of a live buffer
    pub fn buffer_usage(&self, buffer: BufferHandle) -> Option<BufferUsage> {
        self.buffers.get(&buffer.0).map(|b| b.usage)
    }

    /// Size of a live render target
    pub fn target_size(&self, target: RenderTargetHandle) -> Option<(u32, u32)> {
        self.targets.get(&target.0).map(|s| s.size)
    }

    /// Pixels of a live render target, row-major from the bottom row
    pub fn target_pixels(&self, target: RenderTargetHandle) -> Option<&[Color]> {
        self.targets.get(&target.0).map(|s| s.pixels.as_slice())
    }

    /// A single pixel of a live render target
    pub fn pixel(&self, target: RenderTargetHandle, x: u32, y: u32) -> Option<Color> {
        let surface = self.targets.get(&target.0)?;
        surface.index(x, y).map(|i| surface.pixels[i])
    }

    /// Pixels of the display
    pub fn display_pixels(&self) -> &[Color] {
        &self.display.pixels
    }

    /// Display size in pixels
    pub fn canvas_size(&self) -> (u32, u32) {
        self.display.size
    }

    /// Clear color last set for a target, `None` for the display
    pub fn clear_color(&self, target: Option<RenderTargetHandle>) -> Option<Color> {
        self.surface(target).map(|s| s.clear_color)
    }

    /// Current value written to a uniform location
    pub fn uniform_value(&self, location: UniformLocation) -> Option<UniformValue> {
        self.uniforms.get(&location).copied()
    }

    /// Source of the last successful blit
    pub fn presented_from(&self) -> Option<RenderTargetHandle> {
        self.presented_from
    }

    /// Make the next `count` blits fail
    pub fn fail_next_blits(&mut self, count: u32) {
        self.fail_blits = count;
    }
}

impl RenderBackend for SoftwareBackend {
    fn capabilities(&self) -> BackendCapabilities {
        self.capabilities
    }

    fn create_bind_object(&mut self) -> BackendResult<BindObjectHandle> {
        if !self.capabilities.bind_objects.is_available() {
            return Err(RenderError::ResourceCreationFailed(
                "bind objects are not supported".to_string(),
            ));
        }
        let handle = BindObjectHandle(self.allocate_id());
        self.bind_objects.insert(handle.0, Vec::new());
        self.record(BackendCall::CreateBindObject(handle));
        Ok(handle)
    }

    fn bind_bind_object(&mut self, handle: Option<BindObjectHandle>) {
        self.record(BackendCall::BindBindObject(handle));
        self.bound_bind_object = handle;
    }

    fn delete_bind_object(&mut self, handle: BindObjectHandle) {
        self.record(BackendCall::DeleteBindObject(handle));
        if self.bind_objects.remove(&handle.0).is_none() {
            log::warn!("Deleting unknown bind object {:?}", handle);
        }
        if self.bound_bind_object == Some(handle) {
            self.bound_bind_object = None;
        }
    }

    fn create_buffer(&mut self, label: &str, usage: BufferUsage, data: &[u8]) -> BackendResult<BufferHandle> {
        let handle = BufferHandle(self.allocate_id());
        log::trace!("Buffer '{}' ({:?}, {} bytes) -> {:?}", label, usage, data.len(), handle);
        self.buffers.insert(
            handle.0,
            Buffer {
                usage,
                data: data.to_vec(),
            },
        );
        self.record(BackendCall::CreateBuffer(handle));
        Ok(handle)
    }

    fn bind_buffer(&mut self, buffer: BufferHandle) {
        self.record(BackendCall::BindBuffer(buffer));
        let recorded = self.bound_bind_object.and_then(|b| self.bind_objects.get_mut(&b.0));
        if let Some(recorded) = recorded {
            if !recorded.contains(&buffer) {
                recorded.push(buffer);
            }
        }
    }

    fn unbind_buffer(&mut self, buffer: BufferHandle) {
        self.record(BackendCall::UnbindBuffer(buffer));
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        self.record(BackendCall::DeleteBuffer(buffer));
        self.buffers.remove(&buffer.0);
    }

    fn create_render_target(
        &mut self,
        label: &str,
        size: (u32, u32),
        precision: FramePrecision,
    ) -> BackendResult<RenderTargetHandle> {
        check_target_size(label, size)?;
        let handle = RenderTargetHandle(self.allocate_id());
        self.targets.insert(handle.0, Surface::new(label, size, precision));
        self.record(BackendCall::CreateRenderTarget(handle));
        Ok(handle)
    }

    fn resize_render_target(&mut self, target: RenderTargetHandle, size: (u32, u32)) -> BackendResult<()> {
        self.record(BackendCall::ResizeRenderTarget { target, size });
        check_target_size(&format!("{:?}", target), size)?;
        let surface = self
            .targets
            .get_mut(&target.0)
            .ok_or_else(|| RenderError::BackendError(format!("unknown render target {:?}", target)))?;
        log::trace!("Render target '{}' resized to {}x{}", surface.label, size.0, size.1);
        surface.resize(size);
        Ok(())
    }

    fn delete_render_target(&mut self, target: RenderTargetHandle) {
        self.record(BackendCall::DeleteRenderTarget(target));
        self.targets.remove(&target.0);
        if self.bound_target == Some(target) {
            self.bound_target = None;
        }
    }

    fn bind_render_target(&mut self, target: Option<RenderTargetHandle>) {
        self.record(BackendCall::BindRenderTarget(target));
        self.bound_target = target;
    }

    fn set_clear_color(&mut self, target: Option<RenderTargetHandle>, color: Color) {
        self.record(BackendCall::SetClearColor { target, color });
        match self.surface_mut(target) {
            Some(surface) => surface.clear_color = color,
            None => log::warn!("Clear color set on unknown render target {:?}", target),
        }
    }

    fn clear(&mut self, target: Option<RenderTargetHandle>, flags: ClearFlags, color: Color, depth: f32) {
        self.record(BackendCall::Clear { target, flags, color });
        let Some(surface) = self.surface_mut(target) else {
            log::warn!("Clearing unknown render target {:?}", target);
            return;
        };
        if flags.contains(ClearFlags::COLOR) {
            surface.fill(color);
        }
        if flags.contains(ClearFlags::DEPTH) {
            surface.depth.fill(depth);
        }
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.record(BackendCall::SetViewport { width, height });
        self.viewport = (width, height);
    }

    fn bind_program(&mut self, program: ProgramHandle) {
        self.record(BackendCall::BindProgram(program));
        self.bound_program = Some(program);
    }

    fn unbind_program(&mut self, program: ProgramHandle) {
        self.record(BackendCall::UnbindProgram(program));
        if self.bound_program == Some(program) {
            self.bound_program = None;
        }
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        self.programs.get(&program.0)?.get(name).copied()
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        self.record(BackendCall::SetUniform(location, value));
        self.uniforms.insert(location, value);
    }

    fn bind_texture(&mut self, texture: TextureHandle, unit: u32) {
        self.record(BackendCall::BindTexture { texture, unit });
        if !self.textures.contains_key(&texture.0) {
            log::warn!("Binding unknown texture {:?} to unit {}", texture, unit);
        }
        self.bound_textures.insert(unit, texture);
    }

    fn unbind_texture(&mut self, unit: u32) {
        self.record(BackendCall::UnbindTexture(unit));
        self.bound_textures.remove(&unit);
    }

    fn draw(&mut self, call: DrawCall) -> BackendResult<()> {
        self.record(BackendCall::Draw(call));
        let draw_index = self.draw_count;
        self.draw_count += 1;

        let Some(shader) = self.shader.as_mut() else {
            return Ok(());
        };
        let surface = match self.bound_target {
            Some(target) => self
                .targets
                .get_mut(&target.0)
                .ok_or_else(|| RenderError::BackendError(format!("draw into unknown render target {:?}", target)))?,
            None => &mut self.display,
        };

        let (width, height) = self.viewport;
        for y in 0..height.min(surface.size.1) {
            for x in 0..width.min(surface.size.0) {
                let fragment = Fragment {
                    x,
                    y,
                    width,
                    height,
                    draw_index,
                    uniforms: &self.uniforms,
                    textures: &self.bound_textures,
                };
                let color = shader(&fragment);
                surface.write(x, y, color);
            }
        }
        Ok(())
    }

    fn accumulate(
        &mut self,
        previous: Option<RenderTargetHandle>,
        current: RenderTargetHandle,
        output: RenderTargetHandle,
        frame_index: u32,
    ) -> BackendResult<()> {
        self.record(BackendCall::Accumulate {
            previous,
            current,
            output,
            frame_index,
        });

        let lookup = |handle: RenderTargetHandle| {
            self.targets
                .get(&handle.0)
                .ok_or_else(|| RenderError::BackendError(format!("unknown render target {:?}", handle)))
        };
        let current_surface = lookup(current)?;
        let output_size = lookup(output)?.size;
        if current_surface.size != output_size {
            return Err(RenderError::BackendError(format!(
                "accumulating a {:?} sub-frame into a {:?} target",
                current_surface.size, output_size
            )));
        }

        let blended: Vec<Color> = match previous.filter(|_| frame_index > 0) {
            Some(previous) => {
                let previous_surface = lookup(previous)?;
                if previous_surface.size != output_size {
                    return Err(RenderError::BackendError(format!(
                        "previous mean is {:?}, expected {:?}",
                        previous_surface.size, output_size
                    )));
                }
                previous_surface
                    .pixels
                    .iter()
                    .zip(&current_surface.pixels)
                    .map(|(acc, sub)| accumulate_color(*acc, *sub, frame_index))
                    .collect()
            }
            None => current_surface.pixels.clone(),
        };

        let surface = self
            .targets
            .get_mut(&output.0)
            .ok_or_else(|| RenderError::BackendError(format!("unknown render target {:?}", output)))?;
        let precision = surface.precision;
        for (texel, color) in surface.pixels.iter_mut().zip(blended) {
            *texel = quantize(precision, color);
        }
        Ok(())
    }

    fn blit(&mut self, source: RenderTargetHandle) -> BackendResult<()> {
        self.record(BackendCall::Blit(source));
        if self.fail_blits > 0 {
            self.fail_blits -= 1;
            return Err(RenderError::PresentationFailed(format!("blit from {:?} rejected", source)));
        }

        let surface = self
            .targets
            .get(&source.0)
            .ok_or_else(|| RenderError::PresentationFailed(format!("unknown render target {:?}", source)))?;
        let (sw, sh) = surface.size;
        let (dw, dh) = self.display.size;
        let mut pixels = Vec::with_capacity(dw as usize * dh as usize);
        for y in 0..dh {
            for x in 0..dw {
                let sx = (x as u64 * sw as u64 / dw as u64) as u32;
                let sy = (y as u64 * sh as u64 / dh as u64) as u32;
                pixels.push(quantize(self.display.precision, surface.pixels[sy as usize * sw as usize + sx as usize]));
            }
        }
        self.display.pixels = pixels;
        self.presented_from = Some(source);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::api::Primitive;
    use approx::assert_relative_eq;

    const TRIANGLES: DrawCall = DrawCall {
        primitive: Primitive::Triangles,
        count: 3,
        indexed: false,
    };

    #[test]
    fn test_byte_targets_quantize() {
        let mut backend = SoftwareBackend::new((2, 2));
        let byte = backend.create_render_target("byte", (2, 2), FramePrecision::Byte).unwrap();
        let float = backend.create_render_target("float", (2, 2), FramePrecision::Float).unwrap();

        backend.clear(Some(byte), ClearFlags::COLOR, Color::splat(0.5), 1.0);
        backend.clear(Some(float), ClearFlags::COLOR, Color::splat(0.3), 1.0);

        assert_relative_eq!(backend.pixel(byte, 0, 0).unwrap().r, 128.0 / 255.0);
        assert_eq!(backend.pixel(float, 1, 1).unwrap().r, 0.3);
    }

    #[test]
    fn test_draw_runs_fragment_shader_over_viewport() {
        let mut backend = SoftwareBackend::new((4, 4));
        let target = backend.create_render_target("rt", (4, 4), FramePrecision::Float).unwrap();
        let program = backend.create_program("gradient", &["u_scale"]);
        let scale = backend.uniform_location(program, "u_scale").unwrap();

        backend.set_fragment_shader(move |fragment| {
            let Some(UniformValue::Float(s)) = fragment.uniform(scale) else {
                return Color::BLACK;
            };
            Color::splat(fragment.x as f32 * s)
        });
        backend.bind_render_target(Some(target));
        backend.set_viewport(2, 4);
        backend.bind_program(program);
        backend.set_uniform(scale, UniformValue::Float(0.5));
        backend.draw(TRIANGLES).unwrap();

        assert_eq!(backend.pixel(target, 1, 3).unwrap().r, 0.5);
        // Outside the viewport
        assert_eq!(backend.pixel(target, 3, 0).unwrap(), Color::TRANSPARENT);
        assert_eq!(backend.draw_count(), 1);
    }

    #[test]
    fn test_accumulate_blends_running_mean() {
        let mut backend = SoftwareBackend::new((2, 1));
        let acc = backend.create_render_target("acc", (2, 1), FramePrecision::Float).unwrap();
        let out = backend.create_render_target("out", (2, 1), FramePrecision::Float).unwrap();
        let sub = backend.create_render_target("sub", (2, 1), FramePrecision::Float).unwrap();

        backend.clear(Some(acc), ClearFlags::COLOR, Color::splat(1.0), 1.0);
        backend.clear(Some(sub), ClearFlags::COLOR, Color::splat(4.0), 1.0);
        backend.accumulate(Some(acc), sub, out, 2).unwrap();

        assert_relative_eq!(backend.pixel(out, 0, 0).unwrap().r, 2.0);
    }

    #[test]
    fn test_accumulate_rejects_mismatched_sizes() {
        let mut backend = SoftwareBackend::new((2, 2));
        let sub = backend.create_render_target("sub", (2, 2), FramePrecision::Float).unwrap();
        let out = backend.create_render_target("out", (4, 4), FramePrecision::Float).unwrap();

        assert!(matches!(backend.accumulate(None, sub, out, 0), Err(RenderError::BackendError(_))));
    }

    #[test]
    fn test_blit_nearest_samples_into_display() {
        let mut backend = SoftwareBackend::new((4, 2));
        let source = backend.create_render_target("src", (2, 1), FramePrecision::Float).unwrap();
        backend.set_fragment_shader(|fragment| Color::splat(if fragment.x == 0 { 0.0 } else { 1.0 }));
        backend.bind_render_target(Some(source));
        backend.set_viewport(2, 1);
        backend.draw(TRIANGLES).unwrap();

        backend.blit(source).unwrap();

        let row: Vec<f32> = backend.display_pixels()[..4].iter().map(|c| c.r).collect();
        assert_eq!(row, vec![0.0, 0.0, 1.0, 1.0]);
        assert_eq!(backend.presented_from(), Some(source));
    }

    #[test]
    fn test_failing_blit_leaves_display_untouched() {
        let mut backend = SoftwareBackend::new((2, 2));
        let source = backend.create_render_target("src", (2, 2), FramePrecision::Float).unwrap();
        backend.clear(Some(source), ClearFlags::COLOR, Color::WHITE, 1.0);
        backend.fail_next_blits(1);

        assert!(matches!(backend.blit(source), Err(RenderError::PresentationFailed(_))));
        assert_eq!(backend.presented_from(), None);
        assert!(backend.display_pixels().iter().all(|c| *c == Color::TRANSPARENT));

        backend.blit(source).unwrap();
        assert_eq!(backend.display_pixels()[0], Color::WHITE);
    }

    #[test]
    fn test_unsupported_bind_objects_cannot_be_created() {
        let mut backend = SoftwareBackend::with_capabilities(
            (1, 1),
            BackendCapabilities {
                bind_objects: BindObjectSupport::Unsupported,
            },
        );
        assert!(backend.create_bind_object().is_err());
    }

    #[test]
    fn test_empty_render_target_is_rejected() {
        let mut backend = SoftwareBackend::new((1, 1));
        let result = backend.create_render_target("empty", (0, 4), FramePrecision::Byte);
        assert!(matches!(result, Err(RenderError::ResourceCreationFailed(_))));
    }

    #[test]
    fn test_oversized_render_target_is_rejected() {
        let mut backend = SoftwareBackend::new((1, 1));
        let result = backend.create_render_target("huge", (65_536, 65_536), FramePrecision::Byte);
        assert!(matches!(result, Err(RenderError::ResourceCreationFailed(_))));
        assert_eq!(backend.live_render_targets(), 0);

        let target = backend.create_render_target("small", (2, 2), FramePrecision::Byte).unwrap();
        assert!(backend.resize_render_target(target, (u32::MAX, 2)).is_err());
        assert_eq!(backend.target_size(target), Some((2, 2)));
    }
}
