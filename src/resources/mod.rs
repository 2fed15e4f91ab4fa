//! Resource management
//!
//! Registries for the materials and texture assets referenced by scene
//! geometry.

mod material;
mod texture;

pub use material::*;
pub use texture::*;
