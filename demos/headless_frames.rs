//! # Headless Frames Demo
//!
//! Renders the deferred pipeline on the headless device and prints what each
//! frame did: pass order, batches, object reuse and submissions.
//!
//! ```bash
//! cargo run --example headless_frames -- --frames 5 --render-scale 0.5
//! RUST_LOG=debug cargo run --example headless_frames -- --settings frame_graph.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use glam::{Vec3, Vec4};

use framegraph_engine::backend::QueueCapabilities;
use framegraph_engine::scene::{DirectionalLight, Light, Mesh, PointLight, RenderObject};
use framegraph_engine::{DeferredConfig, Engine, FrameGraphSettings, HeadlessDevice, Scene};

/// Frame graph engine headless demo.
#[derive(Parser, Debug)]
#[command(name = "headless_frames", about = "Render frames on the headless device", version)]
struct Args {
    /// Number of frames to render.
    #[arg(long, default_value = "3")]
    frames: u64,

    /// Back buffer width in pixels.
    #[arg(long, default_value = "1280")]
    width: u32,

    /// Back buffer height in pixels.
    #[arg(long, default_value = "720")]
    height: u32,

    /// TOML file with frame graph settings.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Override the render scale from the settings.
    #[arg(long)]
    render_scale: Option<f32>,

    /// Execute independent passes on the rayon pool.
    #[arg(long)]
    parallel: bool,

    /// Expose only the render queue.
    #[arg(long)]
    render_only: bool,

    /// Skip the shadow mapping pass.
    #[arg(long)]
    no_shadows: bool,

    /// Number of cubes in the scene.
    #[arg(long, default_value = "9")]
    cubes: u32,
}

fn load_settings(args: &Args) -> Result<FrameGraphSettings, Box<dyn std::error::Error>> {
    let mut settings = match &args.settings {
        Some(path) => FrameGraphSettings::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => FrameGraphSettings::default(),
    };
    if let Some(scale) = args.render_scale {
        settings.render_scale = scale;
    }
    settings.parallel_execute |= args.parallel;
    Ok(settings)
}

fn build_scene(cubes: u32) -> Scene {
    let cube = Arc::new(Mesh::cube("cube"));
    let mut scene = Scene::new();
    let side = (cubes as f32).sqrt().ceil().max(1.0) as u32;
    for i in 0..cubes {
        let x = (i % side) as f32 * 2.0 - side as f32;
        let z = (i / side) as f32 * 2.0 - side as f32;
        let mut object = RenderObject::new(cube.clone()).with_position(Vec3::new(x, 0.0, z));
        if i % 4 == 3 {
            object = object.with_albedo(Vec4::new(0.3, 0.6, 1.0, 0.5));
        }
        scene.add_object(object);
    }
    scene.add_light(Light::Directional(DirectionalLight::default()));
    scene.add_light(Light::Point(
        PointLight::new(Vec3::new(0.0, 4.0, 0.0), Vec3::new(1.0, 0.9, 0.8), 3.0, 12.0)
            .with_shadows(),
    ));
    scene
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let settings = load_settings(&args)?;
    log::info!("Settings:\n{}", settings.to_toml_string()?);

    let mut device = HeadlessDevice::new(args.width, args.height);
    if args.render_only {
        device = device.with_queues(QueueCapabilities::render_only());
    }
    let config = DeferredConfig {
        enable_shadows: !args.no_shadows,
        ..Default::default()
    };
    let mut engine = Engine::with_deferred_pipeline(device, settings, &config)?;
    let scene = build_scene(args.cubes);

    for _ in 0..args.frames {
        let report = engine.render_frame(&scene)?;
        println!("Frame {}", report.frame_index);
        println!("  order:   {}", report.pass_order.join(" -> "));
        for (depth, batch) in report.batches.iter().enumerate() {
            println!("  batch {}: {}", depth, batch.join(", "));
        }
        println!(
            "  objects: {} created, {} reused, {} transient ({} aliased)",
            report.created, report.reused, report.transient_objects, report.aliased
        );
        println!(
            "  submit:  {} buffers in {} submissions, {} queue fallbacks",
            report.execution.command_buffers,
            report.execution.submissions,
            report.execution.queue_fallbacks
        );
    }

    engine.shutdown();
    println!(
        "Device objects: {} created, {} destroyed, {} live",
        engine.device().created_count(),
        engine.device().destroyed_count(),
        engine.device().live_count()
    );
    Ok(())
}
