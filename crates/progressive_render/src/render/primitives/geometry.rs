//! Drawable geometry
//!
//! A geometry is a set of buffer handles, the draw call that consumes them,
//! and a [`ResourceBinder`] that binds them (through a bind object when the
//! backend has one). Buffers may be shared between geometries; only the
//! buffers a geometry created itself are released on [`Geometry::delete`].

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::Vec3;
use crate::render::api::{BufferHandle, BufferUsage, DrawCall, Primitive, RenderBackend};
use crate::render::resources::ResourceBinder;
use crate::render::RenderResult;

/// Vertex layout of the volume cuboid
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CuboidVertex {
    /// Object-space position
    pub position: [f32; 3],
}

/// Triangle indices of a cuboid, counter-clockwise seen from outside
const CUBOID_INDICES: [u16; 36] = [
    4, 5, 6, 4, 6, 7, // +z
    1, 0, 3, 1, 3, 2, // -z
    0, 4, 7, 0, 7, 3, // -x
    5, 1, 2, 5, 2, 6, // +x
    7, 6, 2, 7, 2, 3, // +y
    0, 1, 5, 0, 5, 4, // -y
];

/// Buffers plus the draw call that consumes them
#[derive(Debug)]
pub struct Geometry {
    label: String,
    buffers: Vec<BufferHandle>,
    owned_buffers: bool,
    draw_call: DrawCall,
    binder: ResourceBinder,
}

impl Geometry {
    /// Wrap existing buffers
    ///
    /// `buffers` are bound in order and unbound in reverse. They stay owned
    /// by the caller.
    pub fn new(
        backend: &mut dyn RenderBackend,
        label: impl Into<String>,
        buffers: Vec<BufferHandle>,
        draw_call: DrawCall,
    ) -> RenderResult<Self> {
        Self::build(backend, label.into(), buffers, draw_call, false)
    }

    /// Create a cuboid centered at the origin with the given edge lengths
    pub fn cuboid(backend: &mut dyn RenderBackend, extent: Vec3) -> RenderResult<Self> {
        let half = extent * 0.5;
        let vertices: Vec<CuboidVertex> = (0..8)
            .map(|corner: u32| {
                let x = if matches!(corner, 1 | 2 | 5 | 6) { half.x } else { -half.x };
                let y = if matches!(corner, 2 | 3 | 6 | 7) { half.y } else { -half.y };
                let z = if corner >= 4 { half.z } else { -half.z };
                CuboidVertex { position: [x, y, z] }
            })
            .collect();

        let vertex_buffer = backend.create_buffer("cuboid-vertices", BufferUsage::Vertex, bytemuck::cast_slice(&vertices))?;
        let index_buffer = backend.create_buffer("cuboid-indices", BufferUsage::Index, bytemuck::cast_slice(&CUBOID_INDICES))?;

        let draw_call = DrawCall {
            primitive: Primitive::Triangles,
            count: CUBOID_INDICES.len() as u32,
            indexed: true,
        };
        Self::build(backend, "cuboid".to_string(), vec![vertex_buffer, index_buffer], draw_call, true)
    }

    fn build(
        backend: &mut dyn RenderBackend,
        label: String,
        buffers: Vec<BufferHandle>,
        draw_call: DrawCall,
        owned_buffers: bool,
    ) -> RenderResult<Self> {
        let mut binder = ResourceBinder::new(label.clone());
        let bind_list = buffers.clone();
        let unbind_list = buffers.clone();
        binder.create(
            backend,
            move |backend| {
                for buffer in &bind_list {
                    backend.bind_buffer(*buffer);
                }
            },
            move |backend| {
                for buffer in unbind_list.iter().rev() {
                    backend.unbind_buffer(*buffer);
                }
            },
        )?;

        Ok(Self {
            label,
            buffers,
            owned_buffers,
            draw_call,
            binder,
        })
    }

    /// Bind the geometry's buffers
    pub fn bind(&mut self, backend: &mut dyn RenderBackend) -> RenderResult<()> {
        self.binder.bind(backend)
    }

    /// Unbind the geometry's buffers
    pub fn unbind(&mut self, backend: &mut dyn RenderBackend) -> RenderResult<()> {
        self.binder.unbind(backend)
    }

    /// Issue the draw call; the geometry must be bound
    pub fn draw(&self, backend: &mut dyn RenderBackend) -> RenderResult<()> {
        backend.draw(self.draw_call)
    }

    /// Release the binder and any buffers this geometry created
    pub fn delete(&mut self, backend: &mut dyn RenderBackend) {
        self.binder.delete(backend);
        if self.owned_buffers {
            for buffer in self.buffers.drain(..) {
                backend.delete_buffer(buffer);
            }
        }
    }

    /// Label used in diagnostics
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Buffers wrapped by this geometry
    pub fn buffers(&self) -> &[BufferHandle] {
        &self.buffers
    }

    /// Draw call issued by [`draw`](Self::draw)
    pub fn draw_call(&self) -> DrawCall {
        self.draw_call
    }

    /// The binder dispatching this geometry's binds
    pub fn binder(&self) -> &ResourceBinder {
        &self.binder
    }
}
