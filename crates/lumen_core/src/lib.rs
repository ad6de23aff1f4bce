//! Lumen Core - scene data model for the path tracer.
//!
//! This crate provides:
//!
//! - **Geometry**: `Mesh` input and the flattened `Vertex`/`Triangle` arrays of a `Scene`
//! - **Materials**: `Material` parameters and the enumerated `BrdfKind`
//! - **Lights**: point, triangle-area and environment lights with power-proportional selection
//!
//! # Example
//!
//! ```ignore
//! use lumen_core::{Material, Mesh, Scene};
//!
//! let mut scene = Scene::new("box");
//! let lamp = scene.add_material(Material::emitter("lamp", Color::splat(10.0)))?;
//! scene.add_mesh(&Mesh::quad(p0, p1, p2, p3), lamp)?;
//! scene.compute_light_distribution();
//! ```

pub mod error;
pub mod light;
pub mod material;
pub mod mesh;
pub mod scene;
pub mod texture;

// Re-export commonly used types
pub use error::{SceneError, SceneResult};
pub use light::{Light, LightSample, PointLight, SkyLight, TriangleLight};
pub use material::{BrdfKind, Material};
pub use mesh::Mesh;
pub use scene::{Scene, Triangle, Vertex};
pub use texture::{Texture, TextureId};
