//! In-memory textures for material albedo and environment lighting.
//!
//! Textures are built from already decoded linear RGB texel data; reading image
//! files is left to the caller.

use lumen_math::{Color, Vec2};

use crate::error::{SceneError, SceneResult};

/// Index of a texture owned by a [`crate::Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub(crate) u32);

impl TextureId {
    /// Position of the texture in the scene's texture list.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A texture with linear RGB texels, stored row-major with row 0 at `v = 0`.
#[derive(Clone, Debug)]
pub struct Texture {
    /// Texture width in pixels
    pub width: u32,

    /// Texture height in pixels
    pub height: u32,

    /// Texel data in linear RGB
    pub texels: Vec<Color>,

    /// Name for diagnostics
    pub name: String,
}

impl Texture {
    /// Create a new texture from texel data.
    ///
    /// Fails if either dimension is zero or the texel count does not match.
    pub fn new(
        width: u32,
        height: u32,
        texels: Vec<Color>,
        name: impl Into<String>,
    ) -> SceneResult<Self> {
        if width == 0 || height == 0 {
            return Err(SceneError::EmptyTexture { width, height });
        }
        let expected = width as usize * height as usize;
        if texels.len() != expected {
            return Err(SceneError::TexelCount {
                width,
                height,
                expected,
                actual: texels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            texels,
            name: name.into(),
        })
    }

    /// Create a solid color texture (1x1).
    pub fn solid_color(color: Color) -> Self {
        Self {
            width: 1,
            height: 1,
            texels: vec![color],
            name: "<solid>".to_string(),
        }
    }

    /// Texel at integer coordinates.
    #[inline]
    pub fn texel(&self, x: u32, y: u32) -> Color {
        self.texels[(y * self.width + x) as usize]
    }

    /// Texel covering `uv`, with coordinates wrapped into `[0, 1)`.
    ///
    /// Nearest lookup: texel `(x, y)` covers `[x/w, (x+1)/w) × [y/h, (y+1)/h)`,
    /// the same binning a [`lumen_math::Distribution2D`] over the texels uses.
    pub fn sample(&self, uv: Vec2) -> Color {
        let u = uv.x.rem_euclid(1.0);
        let v = uv.y.rem_euclid(1.0);
        let x = ((u * self.width as f32) as u32).min(self.width - 1);
        let y = ((v * self.height as f32) as u32).min(self.height - 1);
        self.texel(x, y)
    }

    /// Get total size in bytes (approximate).
    pub fn size_bytes(&self) -> usize {
        self.texels.len() * std::mem::size_of::<Color>()
    }
}
