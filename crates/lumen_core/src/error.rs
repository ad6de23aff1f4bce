//! Errors raised while assembling a scene.

use thiserror::Error;

/// Errors that can occur while adding geometry, materials or textures to a scene.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("Index count {0} is not a multiple of three")]
    RaggedIndices(usize),

    #[error("Face {face} references vertex {index}, mesh has {vertex_count} vertices")]
    InvalidVertexIndex {
        face: usize,
        index: u32,
        vertex_count: usize,
    },

    #[error("Mesh has {actual} {attribute} for {expected} vertices")]
    AttributeLength {
        attribute: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Material id {id} out of range ({count} materials)")]
    MaterialOutOfRange { id: u32, count: usize },

    #[error("Texture id {id} out of range ({count} textures)")]
    TextureOutOfRange { id: u32, count: usize },

    #[error("Texture has zero extent ({width}x{height})")]
    EmptyTexture { width: u32, height: u32 },

    #[error("Texture of {width}x{height} needs {expected} texels, got {actual}")]
    TexelCount {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Unknown BRDF '{0}'")]
    UnknownBrdf(String),
}

pub type SceneResult<T> = Result<T, SceneError>;
