//! Volume cuboid pass
//!
//! Draws a cuboid whose fragments ray-march a 3D texture (unit 0) through a
//! transfer function (unit 1). The program is expected to expose the
//! uniforms named in [`VolumePass::UNIFORMS`]; sub-pixel jitter is already
//! folded into the view-projection it receives.

use crate::core::VolumeConfig;
use crate::foundation::math::{IVec3, Mat4, Vec3};
use crate::render::api::{ProgramHandle, RenderBackend, TextureHandle, UniformLocation, UniformValue};
use crate::render::{Camera, Geometry, RenderError, RenderResult};

/// Sampler unit of the volume texture
pub const VOLUME_UNIT: u32 = 0;
/// Sampler unit of the transfer function
pub const TRANSFER_UNIT: u32 = 1;

#[derive(Debug, Clone, Copy)]
struct VolumeUniforms {
    view_projection: UniformLocation,
    eye_position: UniformLocation,
    volume_scale: UniformLocation,
    volume_dims: UniformLocation,
    dt_scale: UniformLocation,
}

/// Cuboid, program and textures of the volume pass
#[derive(Debug)]
pub struct VolumePass {
    cuboid: Geometry,
    program: ProgramHandle,
    volume: TextureHandle,
    transfer: TextureHandle,
    uniforms: VolumeUniforms,
    scale: Vec3,
    dimensions: IVec3,
    dt_scale: f32,
}

impl VolumePass {
    /// Uniforms the volume program must expose
    pub const UNIFORMS: [&'static str; 5] = [
        "u_viewProjection",
        "u_eyePosition",
        "u_volumeScale",
        "u_volumeDims",
        "u_dtScale",
    ];

    /// Create the cuboid and resolve the program's uniforms
    pub fn new(
        backend: &mut dyn RenderBackend,
        program: ProgramHandle,
        volume: TextureHandle,
        transfer: TextureHandle,
        config: &VolumeConfig,
    ) -> RenderResult<Self> {
        let lookup = |backend: &dyn RenderBackend, name: &str| {
            backend.uniform_location(program, name).ok_or_else(|| {
                RenderError::ResourceCreationFailed(format!("volume program has no uniform '{}'", name))
            })
        };
        let [view_projection, eye_position, volume_scale, volume_dims, dt_scale] = Self::UNIFORMS;
        let uniforms = VolumeUniforms {
            view_projection: lookup(&*backend, view_projection)?,
            eye_position: lookup(&*backend, eye_position)?,
            volume_scale: lookup(&*backend, volume_scale)?,
            volume_dims: lookup(&*backend, volume_dims)?,
            dt_scale: lookup(&*backend, dt_scale)?,
        };

        let scale = Vec3::from(config.extent);
        let cuboid = Geometry::cuboid(backend, scale)?;
        log::debug!(
            "Volume pass: extent {:?}, {:?} voxels, step scale {}",
            config.extent,
            config.dimensions,
            config.dt_scale
        );

        Ok(Self {
            cuboid,
            program,
            volume,
            transfer,
            uniforms,
            scale,
            dimensions: IVec3::from(config.dimensions),
            dt_scale: config.dt_scale,
        })
    }

    /// Draw the cuboid into the bound target
    pub fn draw(&mut self, backend: &mut dyn RenderBackend, camera: &Camera, view_projection: &Mat4) -> RenderResult<()> {
        backend.bind_program(self.program);
        backend.bind_texture(self.volume, VOLUME_UNIT);
        backend.bind_texture(self.transfer, TRANSFER_UNIT);

        let u = self.uniforms;
        backend.set_uniform(u.view_projection, UniformValue::Mat4(*view_projection));
        backend.set_uniform(u.eye_position, UniformValue::Vec3(camera.eye()));
        backend.set_uniform(u.volume_scale, UniformValue::Vec3(self.scale));
        backend.set_uniform(u.volume_dims, UniformValue::IVec3(self.dimensions));
        backend.set_uniform(u.dt_scale, UniformValue::Float(self.dt_scale));

        self.cuboid.bind(backend)?;
        self.cuboid.draw(backend)?;
        self.cuboid.unbind(backend)?;

        backend.unbind_texture(TRANSFER_UNIT);
        backend.unbind_texture(VOLUME_UNIT);
        backend.unbind_program(self.program);
        Ok(())
    }

    /// Location of the view-projection uniform
    pub fn view_projection_location(&self) -> UniformLocation {
        self.uniforms.view_projection
    }

    /// The cuboid geometry
    pub fn cuboid(&self) -> &Geometry {
        &self.cuboid
    }

    /// Release the cuboid
    pub fn release(&mut self, backend: &mut dyn RenderBackend) {
        self.cuboid.delete(backend);
    }
}
