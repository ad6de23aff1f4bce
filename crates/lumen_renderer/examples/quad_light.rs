//! Renders a small room lit by a quad lamp, a point light and a sky.
//!
//! Usage: `quad_light [settings.json] [output.ppm]`
//!
//! Set `RUST_LOG=info` (or `debug` for per-bucket progress) to see timings.

use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::{Context, Result};
use lumen_core::{BrdfKind, Material, Mesh, Scene, Texture};
use lumen_renderer::{
    color_to_rgba, commit, render, Camera, Color, ImageBuffer, RenderContext, RenderSettings, Vec3,
};

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let settings = match args.next() {
        Some(path) => RenderSettings::load(&path).with_context(|| format!("loading {}", path))?,
        None => RenderSettings::default(),
    };
    let filename = args.next().unwrap_or_else(|| "quad_light.ppm".to_string());

    let mut scene = build_scene()?;
    let mut tracer = settings.make_tracer();
    commit(&mut scene, tracer.as_mut());
    let integrator = settings.make_integrator();

    let mut camera = Camera::new()
        .with_resolution(320, 240)
        .with_position(Vec3::new(0.0, 1.0, 3.2), Vec3::new(0.0, 0.8, 0.0), Vec3::Y)
        .with_fov(50.0);
    camera.initialize();

    let ctx = RenderContext::new(&scene, tracer.as_ref());
    let image = render(&ctx, &camera, integrator.as_ref(), &settings);

    save_ppm(&image, &filename).with_context(|| format!("writing {}", filename))?;
    log::info!("Saved to {}", filename);
    Ok(())
}

fn build_scene() -> Result<Scene> {
    let mut scene = Scene::new("quad light room");

    let floor = scene.add_material(
        Material::new("floor", Color::new(0.6, 0.55, 0.5))
            .with_brdf(BrdfKind::LayeredGtr2)
            .with_roughness(0.2),
    )?;
    let wall = scene.add_material(Material::new("wall", Color::splat(0.7)))?;
    let red = scene.add_material(Material::new("red wall", Color::new(0.6, 0.1, 0.1)))?;
    let block = scene.add_material(
        Material::new("block", Color::new(0.2, 0.3, 0.6))
            .with_brdf(BrdfKind::LayeredPhong)
            .with_roughness(0.1)
            .with_ior(1.5),
    )?;
    let lamp = scene.add_material(Material::emitter("lamp", Color::splat(12.0)))?;

    // Floor and two walls, open towards the camera and the sky.
    scene.add_mesh(
        &Mesh::quad(
            Vec3::new(-1.5, 0.0, -1.5),
            Vec3::new(-1.5, 0.0, 1.5),
            Vec3::new(1.5, 0.0, 1.5),
            Vec3::new(1.5, 0.0, -1.5),
        ),
        floor,
    )?;
    scene.add_mesh(
        &Mesh::quad(
            Vec3::new(-1.5, 0.0, -1.5),
            Vec3::new(1.5, 0.0, -1.5),
            Vec3::new(1.5, 2.0, -1.5),
            Vec3::new(-1.5, 2.0, -1.5),
        ),
        wall,
    )?;
    scene.add_mesh(
        &Mesh::quad(
            Vec3::new(-1.5, 0.0, 1.5),
            Vec3::new(-1.5, 0.0, -1.5),
            Vec3::new(-1.5, 2.0, -1.5),
            Vec3::new(-1.5, 2.0, 1.5),
        ),
        red,
    )?;
    scene.add_mesh(&cuboid(Vec3::new(-0.4, 0.0, -0.6), Vec3::new(0.4, 0.8, 0.2)), block)?;

    // Lamp facing down.
    scene.add_mesh(
        &Mesh::quad(
            Vec3::new(-0.4, 1.9, -0.4),
            Vec3::new(0.4, 1.9, -0.4),
            Vec3::new(0.4, 1.9, 0.4),
            Vec3::new(-0.4, 1.9, 0.4),
        ),
        lamp,
    )?;
    scene.add_point_light(Vec3::new(1.0, 1.5, 1.0), Color::new(2.0, 1.6, 1.2));
    scene.set_sky(sky_gradient(32, 16)?, 0.5);

    Ok(scene)
}

/// Axis aligned box with outward facing sides.
fn cuboid(min: Vec3, max: Vec3) -> Mesh {
    let p = |x: f32, y: f32, z: f32| Vec3::new(x, y, z);
    let (a, b) = (min, max);
    let corners = vec![
        p(a.x, a.y, a.z),
        p(b.x, a.y, a.z),
        p(b.x, b.y, a.z),
        p(a.x, b.y, a.z),
        p(a.x, a.y, b.z),
        p(b.x, a.y, b.z),
        p(b.x, b.y, b.z),
        p(a.x, b.y, b.z),
    ];
    #[rustfmt::skip]
    let indices = vec![
        0, 3, 2, 0, 2, 1, // -z
        4, 5, 6, 4, 6, 7, // +z
        0, 4, 7, 0, 7, 3, // -x
        1, 2, 6, 1, 6, 5, // +x
        3, 7, 6, 3, 6, 2, // +y
        0, 1, 5, 0, 5, 4, // -y
    ];
    Mesh::new(corners, indices, None)
}

/// Latitude-longitude sky fading from white at the horizon to blue at the zenith.
fn sky_gradient(width: u32, height: u32) -> Result<Texture> {
    let white = Color::ONE;
    let blue = Color::new(0.5, 0.7, 1.0);
    let mut texels = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        let t = 1.0 - (y as f32 + 0.5) / height as f32;
        let color = white.lerp(blue, t.clamp(0.0, 1.0));
        texels.extend(std::iter::repeat(color).take(width as usize));
    }
    Ok(Texture::new(width, height, texels, "sky gradient")?)
}

fn save_ppm(image: &ImageBuffer, filename: &str) -> std::io::Result<()> {
    let file = File::create(filename)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "P3")?;
    writeln!(writer, "{} {}", image.width, image.height)?;
    writeln!(writer, "255")?;

    for y in 0..image.height {
        for x in 0..image.width {
            let rgba = color_to_rgba(image.get(x, y));
            writeln!(writer, "{} {} {}", rgba[0], rgba[1], rgba[2])?;
        }
    }

    writer.flush()
}
