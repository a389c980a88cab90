//! Hierarchical scene graph
//!
//! Nodes live in a slot-map arena and refer to each other by [`NodeId`].
//! A node's parent link is non-owning; removing a node removes its whole
//! subtree. Geometries and materials are stored next to the nodes so that a
//! traversal can borrow the node tree immutably while binding geometries.

use slotmap::{new_key_type, SlotMap};
use thiserror::Error;

use crate::foundation::math::Mat4;
use crate::render::api::RenderBackend;
use crate::render::{Geometry, Material};
use crate::scene::components::{Component, GeometryComponent, TransformComponent};

new_key_type! {
    /// Key of a node in a [`Scene`]
    pub struct NodeId;
    /// Key of a geometry in a [`Scene`]
    pub struct GeometryId;
    /// Key of a material in a [`Scene`]
    pub struct MaterialId;
}

/// Scene editing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// A second transform component was attached to a node
    #[error("node '{0}' already has a transform component")]
    DuplicateTransform(String),

    /// Node id does not resolve
    #[error("unknown scene node")]
    UnknownNode,

    /// Geometry id does not resolve
    #[error("unknown geometry")]
    UnknownGeometry,

    /// Material id does not resolve
    #[error("unknown material")]
    UnknownMaterial,

    /// The root node cannot be removed
    #[error("the root node cannot be removed")]
    RemoveRoot,
}

/// A node of the scene graph
#[derive(Debug, Clone)]
pub struct SceneNode {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    components: Vec<Component>,
}

impl SceneNode {
    fn new(name: String, parent: Option<NodeId>) -> Self {
        Self {
            name,
            parent,
            children: Vec::new(),
            components: Vec::new(),
        }
    }

    /// Node name, used in diagnostics
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent node, `None` for the root
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in declared order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Components in attachment order
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Unchecked component access
    ///
    /// Bypasses the single-transform check of [`Scene::add_component`];
    /// traversal rejects nodes that end up with more than one transform.
    pub fn components_mut(&mut self) -> &mut Vec<Component> {
        &mut self.components
    }

    /// Number of transform components
    pub fn transform_count(&self) -> usize {
        self.components.iter().filter(|c| c.is_transform()).count()
    }

    /// The first transform component, if any
    pub fn transform(&self) -> Option<&TransformComponent> {
        self.components.iter().find_map(|c| match c {
            Component::Transform(t) => Some(t),
            Component::Geometry(_) => None,
        })
    }

    /// Geometry components in attachment order
    pub fn geometries(&self) -> impl Iterator<Item = &GeometryComponent> {
        self.components.iter().filter_map(|c| match c {
            Component::Geometry(g) => Some(g),
            Component::Transform(_) => None,
        })
    }
}

/// Node arena plus the geometry and material stores it references
#[derive(Debug)]
pub struct Scene {
    nodes: SlotMap<NodeId, SceneNode>,
    root: NodeId,
    geometries: SlotMap<GeometryId, Geometry>,
    materials: SlotMap<MaterialId, Material>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Create a scene holding only an empty root node
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(SceneNode::new("root".to_string(), None));
        Self {
            nodes,
            root,
            geometries: SlotMap::with_key(),
            materials: SlotMap::with_key(),
        }
    }

    /// The root node
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false; the root always exists
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append a child to `parent`
    pub fn add_node(&mut self, parent: NodeId, name: impl Into<String>) -> Result<NodeId, SceneError> {
        if !self.nodes.contains_key(parent) {
            return Err(SceneError::UnknownNode);
        }
        let id = self.nodes.insert(SceneNode::new(name.into(), Some(parent)));
        if let Some(parent) = self.nodes.get_mut(parent) {
            parent.children.push(id);
        }
        Ok(id)
    }

    /// Remove a node and its subtree
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), SceneError> {
        if id == self.root {
            return Err(SceneError::RemoveRoot);
        }
        let node = self.nodes.get(id).ok_or(SceneError::UnknownNode)?;
        if let Some(parent) = node.parent.and_then(|p| self.nodes.get_mut(p)) {
            parent.children.retain(|child| *child != id);
        }

        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if let Some(removed) = self.nodes.remove(next) {
                pending.extend(removed.children);
            }
        }
        Ok(())
    }

    /// Look up a node
    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    /// Look up a node mutably
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id)
    }

    /// Attach a component
    ///
    /// A node holds at most one transform component. Geometry components
    /// must reference geometries and materials stored in this scene.
    pub fn add_component(&mut self, id: NodeId, component: impl Into<Component>) -> Result<(), SceneError> {
        let component = component.into();
        if let Component::Geometry(g) = &component {
            if !self.geometries.contains_key(g.geometry) {
                return Err(SceneError::UnknownGeometry);
            }
            if !self.materials.contains_key(g.material) {
                return Err(SceneError::UnknownMaterial);
            }
        }

        let node = self.nodes.get_mut(id).ok_or(SceneError::UnknownNode)?;
        if component.is_transform() && node.transform_count() > 0 {
            return Err(SceneError::DuplicateTransform(node.name.clone()));
        }
        node.components.push(component);
        Ok(())
    }

    /// Set a node's transform, replacing the existing one
    pub fn set_transform(&mut self, id: NodeId, matrix: Mat4) -> Result<(), SceneError> {
        let node = self.nodes.get_mut(id).ok_or(SceneError::UnknownNode)?;
        match node.components.iter_mut().find(|c| c.is_transform()) {
            Some(existing) => *existing = Component::Transform(TransformComponent::new(matrix)),
            None => node.components.push(Component::Transform(TransformComponent::new(matrix))),
        }
        Ok(())
    }

    /// Store a geometry
    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryId {
        self.geometries.insert(geometry)
    }

    /// Store a material
    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.insert(material)
    }

    /// Look up a geometry
    pub fn geometry(&self, id: GeometryId) -> Option<&Geometry> {
        self.geometries.get(id)
    }

    /// Look up a material
    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id)
    }

    /// Look up a material mutably
    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id)
    }

    /// Depth-first node order from the root, children in declared order
    pub fn depth_first(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut pending = vec![self.root];
        while let Some(id) = pending.pop() {
            if let Some(node) = self.nodes.get(id) {
                order.push(id);
                pending.extend(node.children.iter().rev());
            }
        }
        order
    }

    /// Release the backend resources of every stored geometry
    pub fn release(&mut self, backend: &mut dyn RenderBackend) {
        for (_, mut geometry) in self.geometries.drain() {
            geometry.delete(backend);
        }
    }

    pub(crate) fn split_mut(
        &mut self,
    ) -> (
        &SlotMap<NodeId, SceneNode>,
        &mut SlotMap<GeometryId, Geometry>,
        &SlotMap<MaterialId, Material>,
    ) {
        (&self.nodes, &mut self.geometries, &self.materials)
    }
}
