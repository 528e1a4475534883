//! Example: render a Cornell box to PNG.
//!
//! Run with: cargo run --release --example cornell -- [config.json] [out.png]
//!
//! The optional JSON file is a `RenderConfig`; missing fields keep their
//! defaults.

use std::env;
use std::fs;

use anyhow::{Context, Result};
use lumen_core::Material;
use lumen_math::{hex_color, Color, DMat4, DVec3};
use lumen_renderer::{
    Camera, Channel, Cube, PathSampler, Plane, RenderConfig, Renderer, SamplerConfig, Scene,
    Sphere, SpecularMode,
};

fn cornell_box() -> Scene {
    let white = Material::diffuse(hex_color(0xD6D6D6));
    let red = Material::diffuse(hex_color(0xA83232));
    let green = Material::diffuse(hex_color(0x3A8A3A));

    let mut scene = Scene::new();
    scene.add(Plane::new(DVec3::new(0.0, -1.0, 0.0), DVec3::Y, white.clone()));
    scene.add(Plane::new(DVec3::new(0.0, 1.0, 0.0), -DVec3::Y, white.clone()));
    scene.add(Plane::new(DVec3::new(0.0, 0.0, -1.0), DVec3::Z, white.clone()));
    scene.add(Plane::new(DVec3::new(-1.0, 0.0, 0.0), DVec3::X, red));
    scene.add(Plane::new(DVec3::new(1.0, 0.0, 0.0), -DVec3::X, green));

    scene.add(Cube::new(
        DVec3::new(-0.3, 0.98, -0.3),
        DVec3::new(0.3, 1.0, 0.3),
        Material::light(Color::ONE, 12.0),
    ));

    let mut block = Cube::new(DVec3::ZERO, DVec3::new(0.5, 1.1, 0.5), white).to_mesh();
    block.transform(DMat4::from_rotation_y(0.3));
    block.move_to(DVec3::new(-0.35, -1.0, -0.35), DVec3::new(0.5, 0.0, 0.5));
    scene.add(block);

    scene.add(Sphere::new(
        DVec3::new(0.4, -0.65, 0.25),
        0.35,
        Material::clear(1.5, 0.0),
    ));
    scene
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = env::args().collect();
    let config = match args.get(1) {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path))?
        }
        None => RenderConfig::default()
            .with_resolution(320, 320)
            .with_samples(16, true)
            .with_adaptive(32, 0.5, 1.0)
            .with_fireflies(64, 1.0),
    };
    let output = args.get(2).map_or("cornell.png", String::as_str);

    let camera = Camera::look_at(DVec3::new(0.0, 0.0, 3.4), DVec3::ZERO, DVec3::Y, 40.0);
    let sampler = PathSampler::new(SamplerConfig {
        max_bounces: 6,
        specular_mode: SpecularMode::First,
        ..SamplerConfig::default()
    })?;

    let mut renderer = Renderer::new(cornell_box(), camera, sampler, config)?;
    let stats = renderer.render();
    log::info!(
        "{} samples, {} rays in {:.2?}",
        stats.samples(),
        stats.rays,
        stats.elapsed
    );

    renderer
        .buffer()
        .to_rgb8(Channel::Color)
        .save(output)
        .with_context(|| format!("writing {}", output))?;
    log::info!("Wrote {}", output);
    Ok(())
}
