//! Headless volume demo
//!
//! Renders the accumulated volume cuboid into the software backend while a
//! loader thread "reads" the volume, then replays a short orbit and reports
//! how the image converged after each move.
//!
//! Usage: `volume_headless [config.toml | config.ron]`

use std::time::Duration;

use progressive_render::foundation::logging;
use progressive_render::foundation::math::Vec4;
use progressive_render::prelude::*;
use progressive_render::render::api::{UniformLocation, UniformValue};
use progressive_render::render::backends::Fragment;
use thiserror::Error;

/// Upper bound on ticks per converged image
const MAX_TICKS: u32 = 10_000;

/// Radius of the stand-in volume silhouette, in NDC units
const SILHOUETTE_RADIUS: f32 = 0.5;

#[derive(Error, Debug)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("volume failed to load")]
    LoadFailed,

    #[error("volume loader thread panicked")]
    LoaderPanicked,

    #[error("image did not converge within {0} ticks")]
    NotConverged(u32),
}

fn load_config() -> Result<RendererConfig, ConfigError> {
    match std::env::args().nth(1) {
        Some(path) => RendererConfig::load_from_file(path),
        None => Ok(RendererConfig::default()),
    }
}

/// Black disc around the projected volume center on a white background
///
/// The center is projected with the jittered view-projection, so edge pixels
/// converge to their coverage once every sub-frame is accumulated.
fn silhouette(fragment: &Fragment<'_>, view_projection: UniformLocation) -> Color {
    let Some(UniformValue::Mat4(matrix)) = fragment.uniform(view_projection) else {
        return Color::WHITE;
    };
    let clip = matrix * Vec4::new(0.0, 0.0, 0.0, 1.0);
    if clip.w <= 0.0 {
        return Color::WHITE;
    }

    let center = Vec2::new(clip.x / clip.w, clip.y / clip.w);
    let pixel = Vec2::new(
        (fragment.x as f32 + 0.5) / fragment.width as f32 * 2.0 - 1.0,
        (fragment.y as f32 + 0.5) / fragment.height as f32 * 2.0 - 1.0,
    );
    if (pixel - center).norm() < SILHOUETTE_RADIUS {
        Color::BLACK
    } else {
        Color::WHITE
    }
}

/// Tick until the image converges and no load is pending
fn converge(controller: &mut FrameController, renderer: &mut Renderer<SoftwareBackend>) -> Result<u32, AppError> {
    let mut rendered = 0;
    for _ in 0..MAX_TICKS {
        if renderer.load_failed() {
            return Err(AppError::LoadFailed);
        }
        match controller.tick(renderer)? {
            TickOutcome::Rendered(_) => rendered += 1,
            TickOutcome::Loading => std::thread::sleep(Duration::from_millis(1)),
            TickOutcome::Idle => return Ok(rendered),
        }
    }
    Err(AppError::NotConverged(MAX_TICKS))
}

/// Fraction of display pixels that are neither black nor white
fn edge_fraction(backend: &SoftwareBackend) -> f32 {
    let pixels = backend.display_pixels();
    if pixels.is_empty() {
        return 0.0;
    }
    let partial = pixels.iter().filter(|p| p.r > 0.0 && p.r < 1.0).count();
    partial as f32 / pixels.len() as f32
}

fn run() -> Result<(), AppError> {
    let config = load_config()?;
    logging::init_with_level(&config.log_level);
    log::info!("Starting headless volume demo: {:?}", config.render_mode);

    let mut renderer = Renderer::new(SoftwareBackend::new(config.canvas_size), &config)?;

    let backend = renderer.backend_mut();
    let program = backend.create_program("volume", &VolumePass::UNIFORMS);
    let volume = backend.create_texture("volume");
    let transfer = backend.create_texture("transfer");
    let pass = VolumePass::new(backend, program, volume, transfer, &config.volume)?;
    let view_projection = pass.view_projection_location();
    backend.set_fragment_shader(move |fragment| silhouette(fragment, view_projection));
    renderer.set_volume_pass(pass);

    renderer.expect_resource("volume");
    let notifier = renderer.load_notifier();
    let dimensions = config.volume.dimensions;
    let loader = std::thread::spawn(move || {
        let voxels: i64 = dimensions.iter().map(|d| i64::from(*d)).product();
        log::info!("Loading {} voxels", voxels);
        std::thread::sleep(Duration::from_millis(20));
        notifier.finished("volume");
    });

    renderer.initialize()?;
    let mut controller = FrameController::new();

    let rendered = converge(&mut controller, &mut renderer)?;
    loader.join().map_err(|_| AppError::LoaderPanicked)?;
    log::info!(
        "Initial image converged: {} sub-frames, {:.1}% edge pixels",
        rendered,
        edge_fraction(renderer.backend()) * 100.0
    );

    let eye = renderer.camera().eye();
    let orbit = vec![
        Vec3::new(eye.x + 0.5, eye.y, eye.z),
        Vec3::new(eye.x + 1.0, eye.y + 0.25, eye.z),
    ];
    for (step, eye) in orbit.into_iter().enumerate() {
        renderer.set_navigation(Box::new(ScriptedNavigation::new(vec![eye])));
        let rendered = converge(&mut controller, &mut renderer)?;
        log::info!("Orbit step {} converged after {} sub-frames", step + 1, rendered);
    }

    let stats = renderer.stats();
    log::info!(
        "Presented {} images ({} failed), {} draws over {} ticks",
        stats.presented,
        stats.failed,
        renderer.backend().draw_count(),
        controller.ticks()
    );

    renderer.uninitialize();
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        log::error!("{}", err);
        eprintln!("volume_headless: {}", err);
        std::process::exit(1);
    }
}
