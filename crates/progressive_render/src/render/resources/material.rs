//! Material state bound around a geometry draw
//!
//! A material is a list of texture bindings plus uniform values. It does not
//! own a program; the scene pass binds the program and the material only
//! fills in its inputs.

use crate::render::api::{RenderBackend, TextureHandle, UniformLocation, UniformValue};

/// Texture bound to a sampler unit while the material is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureBinding {
    /// Sampler unit
    pub unit: u32,
    /// Texture to bind
    pub texture: TextureHandle,
}

/// Textures and uniform values applied for a draw
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Material {
    label: String,
    textures: Vec<TextureBinding>,
    uniforms: Vec<(UniformLocation, UniformValue)>,
}

impl Material {
    /// Create an empty material
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            textures: Vec::new(),
            uniforms: Vec::new(),
        }
    }

    /// Add a texture binding (builder pattern)
    pub fn with_texture(mut self, unit: u32, texture: TextureHandle) -> Self {
        self.textures.push(TextureBinding { unit, texture });
        self
    }

    /// Add a uniform value (builder pattern)
    pub fn with_uniform(mut self, location: UniformLocation, value: UniformValue) -> Self {
        self.uniforms.push((location, value));
        self
    }

    /// Replace the value of a uniform, adding it if absent
    pub fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        match self.uniforms.iter_mut().find(|(loc, _)| *loc == location) {
            Some(entry) => entry.1 = value,
            None => self.uniforms.push((location, value)),
        }
    }

    /// Bind textures in declaration order, then push uniforms
    pub fn bind(&self, backend: &mut dyn RenderBackend) {
        for binding in &self.textures {
            backend.bind_texture(binding.texture, binding.unit);
        }
        for (location, value) in &self.uniforms {
            backend.set_uniform(*location, *value);
        }
    }

    /// Unbind textures in reverse order
    pub fn unbind(&self, backend: &mut dyn RenderBackend) {
        for binding in self.textures.iter().rev() {
            backend.unbind_texture(binding.unit);
        }
    }

    /// Label used in diagnostics
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Texture bindings in declaration order
    pub fn textures(&self) -> &[TextureBinding] {
        &self.textures
    }
}
