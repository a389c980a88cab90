//! Rendering primitives: camera and geometry

pub mod camera;
pub mod geometry;

pub use camera::Camera;
pub use geometry::{CuboidVertex, Geometry};
