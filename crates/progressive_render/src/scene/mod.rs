//! Scene management
//!
//! A [`Scene`] is a slot-map arena of nodes carrying transform and
//! geometry/material components; [`ScenePass`] walks it depth-first and
//! issues one draw per geometry component.
//!
//! ```text
//! root (T_r)
//!  ├── a (T_a, mesh)      drawn with T_r·T_a
//!  │    └── b (T_b, mesh) drawn with T_r·T_a·T_b
//!  └── c (mesh)           drawn with T_r
//! ```

mod components;
mod scene_graph;
mod scene_renderer;

pub use components::{Component, GeometryComponent, TransformComponent};
pub use scene_graph::{GeometryId, MaterialId, NodeId, Scene, SceneError, SceneNode};
pub use scene_renderer::{ScenePass, TransformUpdate};
