//! Mesh geometry handed to a scene.
//!
//! A `Mesh` is the indexed triangle soup produced by whatever loads or builds
//! geometry. [`crate::Scene::add_mesh`] validates it and flattens it into the
//! scene's vertex and triangle arrays.

use lumen_math::{Aabb, Vec2, Vec3};

use crate::error::{SceneError, SceneResult};

/// A mesh consisting of vertex positions, optional normals and uvs, and triangle indices.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// Vertex normals (optional - smooth normals are generated if missing)
    pub normals: Option<Vec<Vec3>>,

    /// Texture coordinates (optional - one per vertex)
    pub uvs: Option<Vec<Vec2>>,

    /// Triangle indices (every 3 indices form a triangle, counter-clockwise)
    pub indices: Vec<u32>,

    /// Axis-aligned bounding box
    pub bounds: Aabb,
}

impl Mesh {
    /// Create a new mesh from positions and indices, optionally with normals.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>, normals: Option<Vec<Vec3>>) -> Self {
        let bounds = Self::compute_bounds(&positions);
        Self {
            positions,
            normals,
            uvs: None,
            indices,
            bounds,
        }
    }

    /// Attach texture coordinates.
    pub fn with_uvs(mut self, uvs: Vec<Vec2>) -> Self {
        self.uvs = Some(uvs);
        self
    }

    /// Planar quad from four corners in counter-clockwise order, split along `p0`-`p2`.
    ///
    /// Uvs run from `(0, 0)` at `p0` to `(1, 1)` at `p2`.
    pub fn quad(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3) -> Self {
        let mut mesh = Self::new(vec![p0, p1, p2, p3], vec![0, 1, 2, 0, 2, 3], None)
            .with_uvs(vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ]);
        mesh.compute_normals();
        mesh
    }

    fn compute_bounds(positions: &[Vec3]) -> Aabb {
        let mut bounds = Aabb::EMPTY;
        for p in positions {
            bounds.grow(*p);
        }
        bounds
    }

    /// Smooth vertex normals, the normalized sum of the adjacent face normals.
    ///
    /// Faces are area weighted since the cross product is not normalized.
    /// Faces with out of range indices are ignored; [`Mesh::validate`] reports them.
    pub fn smooth_normals(&self) -> Vec<Vec3> {
        let vertex_count = self.positions.len();
        let mut normals = vec![Vec3::ZERO; vertex_count];

        for face in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [face[0] as usize, face[1] as usize, face[2] as usize];
            if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
                continue;
            }

            let p0 = self.positions[i0];
            let face_normal = (self.positions[i1] - p0).cross(self.positions[i2] - p0);

            normals[i0] += face_normal;
            normals[i1] += face_normal;
            normals[i2] += face_normal;
        }

        for normal in &mut normals {
            *normal = normal.try_normalize().unwrap_or(Vec3::Y);
        }
        normals
    }

    /// Compute and store smooth normals, replacing any existing ones.
    pub fn compute_normals(&mut self) {
        self.normals = Some(self.smooth_normals());
    }

    /// Check if the mesh has normals.
    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    /// Check if the mesh has UV coordinates.
    pub fn has_uvs(&self) -> bool {
        self.uvs.is_some()
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Check index and attribute consistency.
    pub fn validate(&self) -> SceneResult<()> {
        if self.indices.len() % 3 != 0 {
            return Err(SceneError::RaggedIndices(self.indices.len()));
        }

        let vertex_count = self.positions.len();
        if let Some(normals) = &self.normals {
            if normals.len() != vertex_count {
                return Err(SceneError::AttributeLength {
                    attribute: "normals",
                    expected: vertex_count,
                    actual: normals.len(),
                });
            }
        }
        if let Some(uvs) = &self.uvs {
            if uvs.len() != vertex_count {
                return Err(SceneError::AttributeLength {
                    attribute: "uvs",
                    expected: vertex_count,
                    actual: uvs.len(),
                });
            }
        }

        for (face, chunk) in self.indices.chunks_exact(3).enumerate() {
            if let Some(&index) = chunk.iter().find(|i| **i as usize >= vertex_count) {
                return Err(SceneError::InvalidVertexIndex {
                    face,
                    index,
                    vertex_count,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_triangle() -> Mesh {
        Mesh::new(
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            vec![0, 1, 2],
            None,
        )
    }

    #[test]
    fn test_mesh_creation() {
        let mesh = single_triangle();

        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert!(!mesh.has_normals());
        assert!(!mesh.has_uvs());
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_compute_normals() {
        // Counter-clockwise seen from +Z, so the normal points to +Z.
        let mut mesh = single_triangle();
        mesh.compute_normals();

        let normals = mesh.normals.as_ref().expect("normals were computed");
        for normal in normals {
            assert!((normal.z - 1.0).abs() < 0.001);
        }
    }

    #[test]
    fn test_bounds_computation() {
        let mesh = Mesh::new(
            vec![
                Vec3::new(-1.0, -2.0, -3.0),
                Vec3::new(4.0, 5.0, 6.0),
                Vec3::new(0.0, 0.0, 0.0),
            ],
            vec![0, 1, 2],
            None,
        );

        assert_eq!(mesh.bounds.min, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(mesh.bounds.max, Vec3::new(4.0, 5.0, 6.0));
    }

    #[test]
    fn test_quad() {
        let quad = Mesh::quad(
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
        );
        assert_eq!(quad.triangle_count(), 2);
        assert!(quad.validate().is_ok());
        // (+x) x (+x+z) points down.
        for n in quad.normals.as_ref().expect("quad has normals") {
            assert!((*n - Vec3::NEG_Y).length() < 1e-5);
        }
    }

    #[test]
    fn test_validate_reports_bad_input() {
        let mut mesh = single_triangle();
        mesh.indices = vec![0, 1, 5];
        assert_eq!(
            mesh.validate(),
            Err(SceneError::InvalidVertexIndex {
                face: 0,
                index: 5,
                vertex_count: 3
            })
        );

        mesh.indices = vec![0, 1];
        assert_eq!(mesh.validate(), Err(SceneError::RaggedIndices(2)));

        let mesh = single_triangle().with_uvs(vec![Vec2::ZERO]);
        assert!(matches!(
            mesh.validate(),
            Err(SceneError::AttributeLength { attribute: "uvs", .. })
        ));
    }
}
