//! GPU-facing resources: bind-object dispatch and material state

pub mod resource_binder;
pub mod material;

pub use resource_binder::{BufferBindFn, ResourceBinder};
pub use material::{Material, TextureBinding};
