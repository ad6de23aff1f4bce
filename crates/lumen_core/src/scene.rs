//! Scene storage: flattened geometry, materials, textures and lights.
//!
//! The scene exclusively owns everything a render reads. Accelerators refer to
//! triangles by index and may reorder [`Scene::triangles`] while building;
//! lights copy the vertex data they need so that reordering never invalidates
//! them.

use std::ops::Range;
use std::sync::Arc;

use lumen_math::sampling::luminance;
use lumen_math::{Aabb, Color, Distribution1D, Vec2, Vec3};

use crate::error::{SceneError, SceneResult};
use crate::light::{Light, PointLight, SkyLight, TriangleLight};
use crate::material::Material;
use crate::mesh::Mesh;
use crate::texture::{Texture, TextureId};

/// A mesh vertex in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Position
    pub pos: Vec3,
    /// Shading normal (unit length)
    pub norm: Vec3,
    /// Texture coordinate
    pub tc: Vec2,
}

/// Three indices into [`Scene::vertices`] plus a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Triangle {
    pub a: u32,
    pub b: u32,
    pub c: u32,
    pub material_id: u32,
}

/// A complete scene ready for rendering.
#[derive(Debug, Default)]
pub struct Scene {
    /// Scene name (diagnostics only)
    pub name: String,

    pub vertices: Vec<Vertex>,

    /// Triangle list; the accelerator build may permute it
    pub triangles: Vec<Triangle>,

    pub materials: Vec<Material>,

    pub textures: Vec<Texture>,

    point_lights: Vec<PointLight>,
    sky: Option<Arc<SkyLight>>,

    /// Derived by `compute_light_distribution`
    lights: Vec<Light>,
    light_distribution: Option<Distribution1D>,

    bounds: Aabb,
}

impl Scene {
    /// Create an empty scene.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bounds: Aabb::EMPTY,
            ..Default::default()
        }
    }

    /// Add a texture and return its id.
    pub fn add_texture(&mut self, texture: Texture) -> TextureId {
        let id = TextureId(self.textures.len() as u32);
        self.textures.push(texture);
        id
    }

    /// Add a material and return its id.
    pub fn add_material(&mut self, material: Material) -> SceneResult<u32> {
        if let Some(tex) = material.albedo_texture {
            if tex.index() >= self.textures.len() {
                return Err(SceneError::TextureOutOfRange {
                    id: tex.0,
                    count: self.textures.len(),
                });
            }
        }
        let id = self.materials.len() as u32;
        self.materials.push(material);
        Ok(id)
    }

    /// Append a mesh with the given material, returning the range of new triangles.
    ///
    /// Missing normals are replaced by smooth normals, missing uvs by zero.
    pub fn add_mesh(&mut self, mesh: &Mesh, material_id: u32) -> SceneResult<Range<usize>> {
        mesh.validate()?;
        if material_id as usize >= self.materials.len() {
            return Err(SceneError::MaterialOutOfRange {
                id: material_id,
                count: self.materials.len(),
            });
        }

        let generated;
        let normals = match &mesh.normals {
            Some(normals) => normals,
            None => {
                generated = mesh.smooth_normals();
                &generated
            }
        };

        let index_offset = self.vertices.len() as u32;
        for (i, pos) in mesh.positions.iter().enumerate() {
            let tc = mesh.uvs.as_ref().map_or(Vec2::ZERO, |uvs| uvs[i]);
            self.vertices.push(Vertex {
                pos: *pos,
                norm: normals[i].normalize_or_zero(),
                tc,
            });
            self.bounds.grow(*pos);
        }

        let start = self.triangles.len();
        self.triangles
            .extend(mesh.indices.chunks_exact(3).map(|face| Triangle {
                a: face[0] + index_offset,
                b: face[1] + index_offset,
                c: face[2] + index_offset,
                material_id,
            }));

        log::debug!(
            "Added mesh with {} vertices, {} triangles (material '{}')",
            mesh.vertex_count(),
            mesh.triangle_count(),
            self.materials[material_id as usize].name
        );
        Ok(start..self.triangles.len())
    }

    /// Add an isotropic point light.
    pub fn add_point_light(&mut self, position: Vec3, color: Color) {
        self.point_lights.push(PointLight::new(position, color));
    }

    /// Use `texture` as an environment light scaled by `intensity`.
    pub fn set_sky(&mut self, texture: Texture, intensity: f32) {
        self.sky = Some(Arc::new(SkyLight::new(texture, intensity)));
    }

    pub fn sky(&self) -> Option<&SkyLight> {
        self.sky.as_deref()
    }

    /// Bounding box of all vertices added so far.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Collect all lights and build the power proportional selection distribution.
    ///
    /// Emissive triangles come first (in triangle order), then point lights,
    /// then the sky. Must run before rendering and again after any light
    /// relevant change.
    pub fn compute_light_distribution(&mut self) {
        self.lights.clear();
        self.light_distribution = None;

        for index in 0..self.triangles.len() {
            if self.material_of(&self.triangles[index]).is_emissive() {
                let light = TriangleLight::from_triangle(self, index);
                self.lights.push(Light::Triangle(light));
            }
        }
        let emissive_triangles = self.lights.len();
        self.lights
            .extend(self.point_lights.iter().cloned().map(Light::Point));
        if let Some(sky) = &mut self.sky {
            Arc::make_mut(sky).set_scene_bounds(&self.bounds);
            self.lights.push(Light::Sky(Arc::clone(sky)));
        }

        if self.lights.is_empty() {
            log::warn!("Scene '{}' has neither emissive geometry nor lights", self.name);
            return;
        }

        let power: Vec<f32> = self.lights.iter().map(|l| luminance(l.power())).collect();
        let distribution = Distribution1D::new(power);
        if distribution.integral() <= 0.0 {
            log::warn!("All lights of scene '{}' have zero power", self.name);
        }
        log::info!(
            "Light distribution over {} lights ({} emissive triangles, {} point lights, sky: {})",
            self.lights.len(),
            emissive_triangles,
            self.point_lights.len(),
            self.sky.is_some()
        );
        self.light_distribution = Some(distribution);
    }

    /// Lights collected by the last `compute_light_distribution`.
    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn light_distribution(&self) -> Option<&Distribution1D> {
        self.light_distribution.as_ref()
    }

    /// Pick a light proportional to power, returning it with its selection probability.
    ///
    /// `None` when the scene has no lights.
    pub fn sample_light(&self, xi: f32) -> Option<(&Light, f32)> {
        let distribution = self.light_distribution.as_ref()?;
        let (index, pmf) = distribution.sample_index(xi);
        Some((&self.lights[index], pmf))
    }

    /// Selection probability of a light that emits `power`.
    pub fn light_selection_pdf(&self, power: Color) -> f32 {
        match &self.light_distribution {
            Some(d) if d.integral() > 0.0 => luminance(power) / d.integral(),
            _ => 0.0,
        }
    }

    /// The three vertices of a triangle.
    #[inline]
    pub fn triangle_vertices(&self, tri: &Triangle) -> [Vertex; 3] {
        [
            self.vertices[tri.a as usize],
            self.vertices[tri.b as usize],
            self.vertices[tri.c as usize],
        ]
    }

    /// The three vertex positions of a triangle.
    #[inline]
    pub fn triangle_positions(&self, tri: &Triangle) -> [Vec3; 3] {
        [
            self.vertices[tri.a as usize].pos,
            self.vertices[tri.b as usize].pos,
            self.vertices[tri.c as usize].pos,
        ]
    }

    #[inline]
    pub fn material_of(&self, tri: &Triangle) -> &Material {
        &self.materials[tri.material_id as usize]
    }

    pub fn texture(&self, id: TextureId) -> &Texture {
        &self.textures[id.index()]
    }

    /// Albedo of `material` at texture coordinate `tc`.
    pub fn albedo(&self, material: &Material, tc: Vec2) -> Color {
        match material.albedo_texture {
            Some(id) => self.texture(id).sample(tc),
            None => material.albedo,
        }
    }

    /// Get triangle count.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Get vertex count.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor_and_lamp() -> Scene {
        let mut scene = Scene::new("test");
        let grey = scene
            .add_material(Material::new("grey", Color::splat(0.5)))
            .expect("material");
        let lamp = scene
            .add_material(Material::emitter("lamp", Color::splat(10.0)))
            .expect("material");

        let floor = Mesh::quad(
            Vec3::new(-1.0, 0.0, -1.0),
            Vec3::new(-1.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, -1.0),
        );
        scene.add_mesh(&floor, grey).expect("floor");
        let light = Mesh::quad(
            Vec3::new(-0.5, 2.0, -0.5),
            Vec3::new(0.5, 2.0, -0.5),
            Vec3::new(0.5, 2.0, 0.5),
            Vec3::new(-0.5, 2.0, 0.5),
        );
        scene.add_mesh(&light, lamp).expect("light");
        scene
    }

    #[test]
    fn test_add_mesh_flattens_geometry() {
        let scene = floor_and_lamp();
        assert_eq!(scene.vertex_count(), 8);
        assert_eq!(scene.triangle_count(), 4);
        assert_eq!(scene.triangles[2].a, 4);
        assert_eq!(scene.triangles[2].material_id, 1);
        assert_eq!(scene.bounds().min, Vec3::new(-1.0, 0.0, -1.0));
        assert_eq!(scene.bounds().max, Vec3::new(1.0, 2.0, 1.0));
        // The floor is wound to face up, the lamp to face down.
        assert!((scene.vertices[0].norm - Vec3::Y).length() < 1e-5);
        assert!((scene.vertices[4].norm - Vec3::NEG_Y).length() < 1e-5);
    }

    #[test]
    fn test_add_mesh_rejects_bad_material() {
        let mut scene = Scene::new("test");
        let mesh = Mesh::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2], None);
        assert_eq!(
            scene.add_mesh(&mesh, 0),
            Err(SceneError::MaterialOutOfRange { id: 0, count: 0 })
        );
    }

    #[test]
    fn test_add_material_checks_texture() {
        let mut scene = Scene::new("test");
        let material = Material::default().with_albedo_texture(TextureId(3));
        assert!(matches!(
            scene.add_material(material),
            Err(SceneError::TextureOutOfRange { id: 3, count: 0 })
        ));

        let tex = scene.add_texture(Texture::solid_color(Color::X));
        let id = scene
            .add_material(Material::default().with_albedo_texture(tex))
            .expect("texture exists");
        assert_eq!(scene.albedo(&scene.materials[id as usize], Vec2::ZERO), Color::X);
    }

    #[test]
    fn test_light_distribution() {
        let mut scene = floor_and_lamp();
        scene.add_point_light(Vec3::new(0.0, 1.0, 0.0), Color::splat(1.0));
        scene.compute_light_distribution();

        let lights = scene.lights();
        assert_eq!(lights.len(), 3);
        assert!(matches!(lights[0], Light::Triangle(_)));
        assert!(matches!(lights[2], Light::Point(_)));

        // Each lamp triangle: area 0.5, power 10 * 0.5 * pi. Point light: 4 pi.
        let distribution = scene.light_distribution().expect("lights exist");
        let total = 2.0 * 5.0 * std::f32::consts::PI + 4.0 * std::f32::consts::PI;
        assert!((distribution.integral() - total).abs() < 1e-3);
        assert!((scene.light_selection_pdf(lights[0].power()) - distribution.pdf(0)).abs() < 1e-6);

        let (light, pmf) = scene.sample_light(0.99).expect("lights exist");
        assert!(matches!(light, Light::Point(_)));
        assert!((pmf - 4.0 / 14.0).abs() < 1e-5);
    }

    #[test]
    fn test_scene_without_lights() {
        let mut scene = Scene::new("dark");
        scene.compute_light_distribution();
        assert!(scene.lights().is_empty());
        assert!(scene.sample_light(0.5).is_none());
        assert_eq!(scene.light_selection_pdf(Color::ONE), 0.0);
    }

    #[test]
    fn test_sky_joins_light_list() {
        let mut scene = floor_and_lamp();
        scene.set_sky(Texture::solid_color(Color::ONE), 1.0);
        scene.compute_light_distribution();
        assert!(matches!(scene.lights().last(), Some(Light::Sky(_))));
        assert!(scene.sky().is_some());

        // Recomputing must not duplicate lights.
        scene.compute_light_distribution();
        assert_eq!(scene.lights().len(), 3);
    }
}
