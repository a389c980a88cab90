//! Forward scene pass
//!
//! Walks the scene graph depth-first and draws every geometry component with
//! the pass program. Per node:
//!
//! 1. compose the node transform with its parent's (identity if it has none)
//! 2. bind the program
//! 3. for each geometry/material pair: bind geometry, bind material, push
//!    the model and view-projection transforms, draw, unbind material,
//!    unbind geometry
//! 4. unbind the program and recurse into the children in declared order
//!
//! The pass does not own uniform names; callers provide the two functions
//! that push the model and view-projection matrices to the program.

use slotmap::SlotMap;

use crate::foundation::math::Mat4;
use crate::render::api::{
    ClearFlags, Color, ProgramHandle, RenderBackend, RenderTargetHandle, UniformValue,
};
use crate::render::{Geometry, Material, RenderError, RenderResult};
use crate::scene::scene_graph::{GeometryId, MaterialId, NodeId, Scene, SceneNode};

/// Pushes a transform to the bound program
pub type TransformUpdate = Box<dyn Fn(&mut dyn RenderBackend, &Mat4)>;

/// Depth-first forward pass over a [`Scene`]
pub struct ScenePass {
    program: ProgramHandle,
    update_model: Option<TransformUpdate>,
    update_view_projection: Option<TransformUpdate>,
    view_projection: Mat4,
}

impl std::fmt::Debug for ScenePass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenePass")
            .field("program", &self.program)
            .field("update_model", &self.update_model.is_some())
            .field("update_view_projection", &self.update_view_projection.is_some())
            .finish_non_exhaustive()
    }
}

struct Visit<'a> {
    nodes: &'a SlotMap<NodeId, SceneNode>,
    geometries: &'a mut SlotMap<GeometryId, Geometry>,
    materials: &'a SlotMap<MaterialId, Material>,
    update_model: &'a TransformUpdate,
    update_view_projection: &'a TransformUpdate,
}

impl ScenePass {
    /// Create a pass without transform bindings
    pub fn new(program: ProgramHandle) -> Self {
        Self {
            program,
            update_model: None,
            update_view_projection: None,
            view_projection: Mat4::identity(),
        }
    }

    /// Create a pass pushing both transforms to named `Mat4` uniforms of `program`
    pub fn with_uniforms(
        backend: &dyn RenderBackend,
        program: ProgramHandle,
        model: &str,
        view_projection: &str,
    ) -> RenderResult<Self> {
        let lookup = |name: &str| {
            backend
                .uniform_location(program, name)
                .ok_or_else(|| RenderError::ResourceCreationFailed(format!("program has no uniform '{}'", name)))
        };
        let model = lookup(model)?;
        let view_projection = lookup(view_projection)?;

        let mut pass = Self::new(program);
        pass.set_model_update(move |backend, m| backend.set_uniform(model, UniformValue::Mat4(*m)));
        pass.set_view_projection_update(move |backend, m| {
            backend.set_uniform(view_projection, UniformValue::Mat4(*m));
        });
        Ok(pass)
    }

    /// Set the function that pushes the model transform
    pub fn set_model_update(&mut self, update: impl Fn(&mut dyn RenderBackend, &Mat4) + 'static) {
        self.update_model = Some(Box::new(update));
    }

    /// Set the function that pushes the view-projection transform
    pub fn set_view_projection_update(&mut self, update: impl Fn(&mut dyn RenderBackend, &Mat4) + 'static) {
        self.update_view_projection = Some(Box::new(update));
    }

    /// View-projection pushed with every draw
    pub fn set_view_projection(&mut self, view_projection: Mat4) {
        self.view_projection = view_projection;
    }

    /// Program bound around each node
    pub fn program(&self) -> ProgramHandle {
        self.program
    }

    /// Clear `target` and render the whole scene from the root
    pub fn frame(
        &self,
        backend: &mut dyn RenderBackend,
        scene: &mut Scene,
        target: Option<RenderTargetHandle>,
        clear_color: Color,
    ) -> RenderResult<()> {
        backend.bind_render_target(target);
        backend.clear(target, ClearFlags::COLOR | ClearFlags::DEPTH, clear_color, 1.0);
        let root = scene.root();
        self.render_node(backend, scene, root, &Mat4::identity())
    }

    /// Render `node` and its subtree under `parent_transform`
    pub fn render_node(
        &self,
        backend: &mut dyn RenderBackend,
        scene: &mut Scene,
        node: NodeId,
        parent_transform: &Mat4,
    ) -> RenderResult<()> {
        let update_model = self
            .update_model
            .as_ref()
            .ok_or(RenderError::MissingTransformBinding("model"))?;
        let update_view_projection = self
            .update_view_projection
            .as_ref()
            .ok_or(RenderError::MissingTransformBinding("view-projection"))?;

        let (nodes, geometries, materials) = scene.split_mut();
        let mut visit = Visit {
            nodes,
            geometries,
            materials,
            update_model,
            update_view_projection,
        };
        self.visit(backend, &mut visit, node, parent_transform)
    }

    fn visit(
        &self,
        backend: &mut dyn RenderBackend,
        visit: &mut Visit<'_>,
        id: NodeId,
        parent_transform: &Mat4,
    ) -> RenderResult<()> {
        let nodes = visit.nodes;
        let node = nodes
            .get(id)
            .ok_or_else(|| RenderError::DanglingReference(format!("node {:?}", id)))?;

        let count = node.transform_count();
        if count > 1 {
            return Err(RenderError::MultipleTransformComponents {
                node: node.name().to_string(),
                count,
            });
        }
        let transform = match node.transform() {
            Some(local) => parent_transform * local.matrix,
            None => *parent_transform,
        };

        backend.bind_program(self.program);
        for component in node.geometries() {
            let geometry = visit.geometries.get_mut(component.geometry).ok_or_else(|| {
                RenderError::DanglingReference(format!("geometry of node '{}'", node.name()))
            })?;
            let material = visit.materials.get(component.material).ok_or_else(|| {
                RenderError::DanglingReference(format!("material of node '{}'", node.name()))
            })?;

            geometry.bind(backend)?;
            material.bind(backend);
            (visit.update_model)(&mut *backend, &transform);
            (visit.update_view_projection)(&mut *backend, &self.view_projection);
            geometry.draw(backend)?;
            material.unbind(backend);
            geometry.unbind(backend)?;
        }
        backend.unbind_program(self.program);

        for child in node.children() {
            self.visit(backend, visit, *child, &transform)?;
        }
        Ok(())
    }
}
