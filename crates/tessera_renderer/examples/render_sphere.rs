//! Renders a small studio scene and writes it to a PNG.
//!
//! Usage: `cargo run --release --example render_sphere -- [settings.json] [output.png]`
//!
//! Set `RUST_LOG=info` to see progress.

use anyhow::Context;
use tessera_core::{Light, Material, Mesh, Object3D, Scene, Transform};
use tessera_math::{Color, DVec3};
use tessera_renderer::{RenderSettings, RenderStatus, Renderer};

fn build_scene() -> Scene {
    let mut scene = Scene::new();

    let red = scene
        .materials_mut()
        .add(Material::new("RedPlastic", Color::new(0.8, 0.15, 0.1)).with_roughness(0.4));
    let chrome = scene.materials_mut().add(
        Material::new("Chrome", Color::new(0.9, 0.9, 0.9))
            .with_metallic(1.0)
            .with_roughness(0.1),
    );
    let glass = scene.materials_mut().add(
        Material::new("Glass", Color::ONE)
            .with_transmission(1.0)
            .with_ior(1.5)
            .with_roughness(0.0),
    );
    let lamp = scene
        .materials_mut()
        .add(Material::new("Lamp", Color::ZERO).with_emission(Color::new(1.0, 0.9, 0.7), 4.0));
    let floor = scene.materials().default_material();

    scene.add_object(Object3D::new("floor", Mesh::plane(20.0, 20.0), floor));
    scene.add_object(
        Object3D::new("plastic", Mesh::sphere(1.0, 64, 32), red)
            .with_transform(Transform::from_position(DVec3::new(-2.2, 1.0, 0.0))),
    );
    scene.add_object(
        Object3D::new("chrome", Mesh::sphere(1.0, 64, 32), chrome)
            .with_transform(Transform::from_position(DVec3::new(0.0, 1.0, 0.0))),
    );
    scene.add_object(
        Object3D::new("glass", Mesh::sphere(1.0, 64, 32), glass)
            .with_transform(Transform::from_position(DVec3::new(2.2, 1.0, 0.0))),
    );
    scene.add_object(
        Object3D::new("lamp", Mesh::cube(0.5), lamp)
            .with_transform(Transform::from_position(DVec3::new(0.0, 4.0, -2.0))),
    );

    scene.add_light(Light::point("key", DVec3::new(4.0, 6.0, 4.0)).with_intensity(60.0));
    scene.add_light(
        Light::directional("fill", DVec3::new(-0.3, -1.0, -0.5))
            .with_color(Color::new(0.7, 0.8, 1.0))
            .with_intensity(0.6),
    );
    scene.build_acceleration_structures();

    let camera = scene.camera_mut();
    camera.set_position(DVec3::new(0.0, 2.5, 8.0));
    camera.look_at(DVec3::new(0.0, 1.0, 0.0));
    camera.set_focus_distance(8.0);
    camera.set_aperture(8.0);

    scene
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let settings = match args.next() {
        Some(path) => RenderSettings::load(&path).with_context(|| format!("loading settings from {path}"))?,
        None => RenderSettings::default()
            .with_resolution(640, 360)
            .with_samples_per_pixel(16)
            .with_max_bounces(4),
    };
    let output = args.next().unwrap_or_else(|| "render_sphere.png".to_string());

    let scene = build_scene();
    log::info!(
        "Scene: {} objects, {} triangles, {} lights",
        scene.objects().len(),
        scene.total_triangle_count(),
        scene.lights().len()
    );

    let mut renderer = Renderer::new(settings);
    renderer.on_stats().add(|stats| {
        log::debug!(
            "chunk {}/{} ({:.1}s elapsed, ~{:.1}s left)",
            stats.current_chunk,
            stats.total_chunks,
            stats.elapsed,
            stats.remaining
        );
    });

    let status = renderer.render_frame(&scene)?;
    if status == RenderStatus::Cancelled {
        anyhow::bail!("render was cancelled");
    }
    log::info!("Rendered in {:.2}s", renderer.stats().elapsed);

    let framebuffer = renderer.framebuffer_mut();
    framebuffer.convert_to_srgb_color_space();
    let props = framebuffer.properties();
    let image = image::RgbaImage::from_raw(props.width, props.height, framebuffer.to_rgba8())
        .context("framebuffer size does not match the image")?;
    image.save(&output).with_context(|| format!("writing {output}"))?;
    log::info!("Saved {output}");

    Ok(())
}
