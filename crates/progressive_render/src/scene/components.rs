//! Components attached to scene nodes

use crate::foundation::math::{Mat4, Transform};
use crate::scene::scene_graph::{GeometryId, MaterialId};

/// Local transform of a node relative to its parent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformComponent {
    /// Local-to-parent matrix
    pub matrix: Mat4,
}

impl TransformComponent {
    /// Wrap a matrix
    pub fn new(matrix: Mat4) -> Self {
        Self { matrix }
    }

    /// Identity transform
    pub fn identity() -> Self {
        Self::new(Mat4::identity())
    }
}

impl From<&Transform> for TransformComponent {
    fn from(transform: &Transform) -> Self {
        Self::new(transform.to_matrix())
    }
}

/// A geometry drawn with a material
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryComponent {
    /// Geometry in the scene's geometry store
    pub geometry: GeometryId,
    /// Material in the scene's material store
    pub material: MaterialId,
}

/// Anything a node can carry
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Component {
    /// At most one per node
    Transform(TransformComponent),
    /// Drawn in attachment order
    Geometry(GeometryComponent),
}

impl Component {
    /// Whether this is a transform component
    pub fn is_transform(&self) -> bool {
        matches!(self, Self::Transform(_))
    }
}

impl From<TransformComponent> for Component {
    fn from(component: TransformComponent) -> Self {
        Self::Transform(component)
    }
}

impl From<GeometryComponent> for Component {
    fn from(component: GeometryComponent) -> Self {
        Self::Geometry(component)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Point3, Vec3};
    use approx::assert_relative_eq;

    #[test]
    fn test_transform_component_from_transform() {
        let transform = Transform {
            position: Vec3::new(0.0, 1.0, 0.0),
            scale: Vec3::new(3.0, 3.0, 3.0),
            ..Transform::identity()
        };
        let component = TransformComponent::from(&transform);

        let moved = component.matrix.transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(moved, Point3::new(3.0, 1.0, 0.0), epsilon = 1e-6);
        assert!(Component::from(component).is_transform());
    }
}
