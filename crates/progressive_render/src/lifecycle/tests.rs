//! Renderer lifecycle tests against the software backend

use super::*;
use crate::core::{DirtyFlags, FramePrecision, RenderMode, RendererConfig};
use crate::foundation::math::{Mat4, Vec3};
use crate::input::ScriptedNavigation;
use crate::render::api::{Color, ProgramHandle, RenderBackend, UniformValue};
use crate::render::backends::SoftwareBackend;
use crate::render::{Geometry, Material, RenderError};
use crate::scene::{GeometryComponent, Scene, ScenePass};
use approx::assert_relative_eq;

fn small_config(multi_frame_number: u32) -> RendererConfig {
    RendererConfig::default()
        .with_size(4, 4)
        .with_multi_frame_number(multi_frame_number)
}

fn volume_renderer(config: RendererConfig) -> (Renderer<SoftwareBackend>, ProgramHandle) {
    let backend = SoftwareBackend::new(config.canvas_size);
    let mut renderer = Renderer::new(backend, &config).unwrap();

    let backend = renderer.backend_mut();
    let program = backend.create_program("volume", &VolumePass::UNIFORMS);
    let volume = backend.create_texture("volume");
    let transfer = backend.create_texture("transfer");
    let pass = VolumePass::new(backend, program, volume, transfer, &config.volume).unwrap();

    renderer.set_volume_pass(pass);
    renderer.initialize().unwrap();
    (renderer, program)
}

#[test]
fn test_phases_require_initialization() {
    let mut renderer = Renderer::new(SoftwareBackend::new((4, 4)), &small_config(4)).unwrap();

    assert!(matches!(renderer.update(), Err(RenderError::Uninitialized(_))));
    assert!(matches!(renderer.prepare(), Err(RenderError::Uninitialized(_))));
    assert!(matches!(renderer.frame(0), Err(RenderError::Uninitialized(_))));
    assert!(matches!(renderer.swap(), Err(RenderError::Uninitialized(_))));
    assert_eq!(renderer.state(), LifecycleState::Uninitialized);
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = small_config(0);
    let result = Renderer::new(SoftwareBackend::new((4, 4)), &config);
    assert!(matches!(result, Err(RenderError::Config(_))));
}

#[test]
fn test_state_transitions() {
    let (mut renderer, _) = volume_renderer(small_config(2));
    assert_eq!(renderer.state(), LifecycleState::Initialized);

    FrameController::new().tick(&mut renderer).unwrap();
    assert_eq!(renderer.state(), LifecycleState::Idle);

    renderer.uninitialize();
    assert_eq!(renderer.state(), LifecycleState::Uninitialized);
}

#[test]
fn test_single_frame_swap_presents_intermediate() {
    let config = RendererConfig::default().with_multi_frame_number(1);
    let (mut renderer, _) = volume_renderer(config);
    let mut controller = FrameController::new();

    assert_eq!(controller.tick(&mut renderer).unwrap(), TickOutcome::Rendered(0));
    assert!(renderer.accumulation().output().is_none());
    assert_eq!(renderer.backend().presented_from(), renderer.intermediate_target());
    assert_eq!(renderer.backend().canvas_size(), (800, 600));

    assert_eq!(controller.tick(&mut renderer).unwrap(), TickOutcome::Idle);
    assert_eq!(renderer.stats(), PresentStats { presented: 1, failed: 0 });
}

#[test]
fn test_sixty_four_sub_frames_weighted_equally() {
    let config = small_config(64).with_frame_precision(FramePrecision::Float);
    let (mut renderer, _) = volume_renderer(config);
    renderer
        .backend_mut()
        .set_fragment_shader(|fragment| Color::splat(fragment.draw_index as f32));

    let rendered = FrameController::new().run_until_idle(&mut renderer, 1000).unwrap();
    assert_eq!(rendered, 64);

    let output = renderer.accumulation().output().unwrap();
    for pixel in renderer.backend().target_pixels(output).unwrap() {
        assert_relative_eq!(pixel.r, 31.5, epsilon = 1e-3);
    }
    assert_eq!(renderer.backend().presented_from(), Some(output));
    assert_eq!(renderer.accumulation().accumulated_frames(), 64);
}

#[test]
fn test_default_precision_keeps_exact_mean() {
    let (mut renderer, _) = volume_renderer(small_config(64));
    renderer
        .backend_mut()
        .set_fragment_shader(|fragment| Color::splat(fragment.draw_index as f32 / 63.0));

    assert_eq!(FrameController::new().run_until_idle(&mut renderer, 1000).unwrap(), 64);

    // Byte sub-frames i/63 and (63-i)/63 quantize to values summing to 1
    let output = renderer.accumulation().output().unwrap();
    for pixel in renderer.backend().target_pixels(output).unwrap() {
        assert_relative_eq!(pixel.r, 0.5, epsilon = 1e-4);
    }
}

#[test]
fn test_each_sub_frame_uses_its_jitter() {
    let (mut renderer, program) = volume_renderer(small_config(4));
    let location = renderer
        .backend()
        .uniform_location(program, "u_viewProjection")
        .unwrap();
    let mut controller = FrameController::new();

    let mut pushed = Vec::new();
    for i in 0..4 {
        assert_eq!(controller.tick(&mut renderer).unwrap(), TickOutcome::Rendered(i));
        let expected = renderer.jittered_view_projection(i);
        assert_eq!(
            renderer.backend().uniform_value(location),
            Some(UniformValue::Mat4(expected))
        );
        pushed.push(expected);
    }

    assert_eq!(pushed[0], renderer.camera().view_projection());
    assert_ne!(pushed[0], pushed[1]);
}

#[test]
fn test_update_reports_only_real_changes() {
    let (mut renderer, _) = volume_renderer(small_config(2));
    assert!(renderer.update().unwrap());
    renderer.prepare().unwrap();
    assert!(!renderer.update().unwrap());

    renderer.set_clear_color(Color::WHITE);
    assert!(renderer.update().unwrap());
    renderer.prepare().unwrap();
    assert_eq!(renderer.backend().clear_color(None), Some(Color::WHITE));

    renderer.set_clear_color(Color::WHITE);
    assert!(!renderer.update().unwrap());

    renderer.camera_mut().set_eye(Vec3::new(1.0, 1.0, 1.0));
    assert!(renderer.update().unwrap());
    renderer.prepare().unwrap();
    assert!(!renderer.update().unwrap());
}

#[test]
fn test_alter_named_flags() {
    let (mut renderer, _) = volume_renderer(small_config(2));
    renderer.update().unwrap();
    renderer.prepare().unwrap();

    renderer.alter_named("clear_color").unwrap();
    assert_eq!(renderer.altered(), DirtyFlags::CLEAR_COLOR);
    assert!(matches!(renderer.alter_named("no_such_flag"), Err(RenderError::UnknownFlag(_))));
}

#[test]
fn test_discard_reconciles_everything() {
    let (mut renderer, _) = volume_renderer(small_config(2));
    renderer.update().unwrap();
    renderer.prepare().unwrap();

    renderer.discard();
    assert_eq!(renderer.altered(), DirtyFlags::all());
    assert!(renderer.update().unwrap());
}

#[test]
fn test_invalidate_forces_restart() {
    let (mut renderer, _) = volume_renderer(small_config(2));
    let mut controller = FrameController::new();
    assert_eq!(controller.run_until_idle(&mut renderer, 10).unwrap(), 2);

    renderer.invalidate(false);
    assert_eq!(controller.tick(&mut renderer).unwrap(), TickOutcome::Idle);

    renderer.invalidate(true);
    assert_eq!(controller.tick(&mut renderer).unwrap(), TickOutcome::Rendered(0));
}

#[test]
fn test_frame_size_change_restarts_and_resizes() {
    let (mut renderer, _) = volume_renderer(small_config(4));
    let mut controller = FrameController::new();
    controller.tick(&mut renderer).unwrap();
    controller.tick(&mut renderer).unwrap();

    renderer.set_frame_size((8, 2)).unwrap();
    assert_eq!(controller.tick(&mut renderer).unwrap(), TickOutcome::Rendered(0));

    let intermediate = renderer.intermediate_target().unwrap();
    assert_eq!(renderer.backend().target_size(intermediate), Some((8, 2)));
    for target in renderer.accumulation().targets().unwrap() {
        assert_eq!(renderer.backend().target_size(target), Some((8, 2)));
    }
    assert_eq!(renderer.camera().viewport(), (8, 2));
    assert_eq!(renderer.accumulation().accumulated_frames(), 1);
}

#[test]
fn test_canvas_size_sets_aspect() {
    let (mut renderer, _) = volume_renderer(small_config(2));
    renderer.set_canvas_size((200, 100)).unwrap();
    renderer.update().unwrap();
    renderer.prepare().unwrap();

    assert_relative_eq!(renderer.camera().aspect(), 2.0);
    assert_eq!(renderer.camera().viewport(), (200, 100));
    assert!(renderer.set_canvas_size((0, 100)).is_err());
}

#[test]
fn test_precision_change_recreates_intermediate() {
    let (mut renderer, _) = volume_renderer(small_config(4));
    let mut controller = FrameController::new();
    controller.tick(&mut renderer).unwrap();
    let before = renderer.intermediate_target();

    renderer.set_frame_precision(FramePrecision::Float);
    controller.tick(&mut renderer).unwrap();

    assert_ne!(renderer.intermediate_target(), before);
    assert_eq!(renderer.backend().live_render_targets(), 3);
}

#[test]
fn test_multi_frame_number_change_regenerates_kernel() {
    let (mut renderer, _) = volume_renderer(small_config(4));
    let mut controller = FrameController::new();
    controller.run_until_idle(&mut renderer, 10).unwrap();

    renderer.set_multi_frame_number(8);
    assert_eq!(controller.run_until_idle(&mut renderer, 20).unwrap(), 8);
    assert_eq!(renderer.kernel().len(), 8);
    assert_eq!(renderer.accumulation().accumulated_frames(), 8);
}

#[test]
fn test_non_accumulating_mode_is_pass_through() {
    let config = small_config(8).with_render_mode(RenderMode::Cuboid);
    let (mut renderer, _) = volume_renderer(config);
    let mut controller = FrameController::new();

    assert_eq!(controller.tick(&mut renderer).unwrap(), TickOutcome::Rendered(0));
    assert_eq!(controller.tick(&mut renderer).unwrap(), TickOutcome::Idle);
    assert!(renderer.accumulation().is_pass_through());
    assert_eq!(renderer.backend().presented_from(), renderer.intermediate_target());
    assert_eq!(renderer.backend().live_render_targets(), 1);
}

#[test]
fn test_frames_skipped_while_loading() {
    let (mut renderer, _) = volume_renderer(small_config(2));
    renderer.expect_resource("volume");
    let notifier = renderer.load_notifier();
    let mut controller = FrameController::new();

    assert_eq!(controller.tick(&mut renderer).unwrap(), TickOutcome::Loading);
    assert_eq!(controller.run_until_idle(&mut renderer, 10).unwrap(), 0);
    assert!(renderer.is_loading());
    assert_eq!(controller.frame_index(), 0);
    assert_eq!(renderer.backend().draw_count(), 0);
    assert_eq!(renderer.stats(), PresentStats::default());

    std::thread::spawn(move || notifier.finished("volume"))
        .join()
        .unwrap();

    assert_eq!(controller.tick(&mut renderer).unwrap(), TickOutcome::Rendered(0));
    assert!(!renderer.is_loading());
    assert_eq!(renderer.backend().draw_count(), 1);
    assert_eq!(renderer.stats().presented, 1);
}

#[test]
fn test_failed_load_gates_forever() {
    let (mut renderer, _) = volume_renderer(small_config(2));
    renderer.expect_resource("volume");
    renderer.load_notifier().failed("volume", "checksum mismatch");

    let mut controller = FrameController::new();
    for _ in 0..5 {
        assert_eq!(controller.tick(&mut renderer).unwrap(), TickOutcome::Loading);
    }
    renderer.load_notifier().finished("volume");
    assert_eq!(controller.tick(&mut renderer).unwrap(), TickOutcome::Loading);

    assert!(renderer.load_failed());
    assert!(renderer.is_loading());
    assert_eq!(renderer.backend().draw_count(), 0);
    assert_eq!(renderer.stats().presented, 0);
}

#[test]
fn test_blit_failure_is_swallowed_and_counted() {
    let (mut renderer, _) = volume_renderer(small_config(2));
    renderer.backend_mut().fail_next_blits(1);
    let mut controller = FrameController::new();

    assert_eq!(controller.tick(&mut renderer).unwrap(), TickOutcome::Rendered(0));
    assert_eq!(renderer.stats(), PresentStats { presented: 0, failed: 1 });

    assert_eq!(controller.tick(&mut renderer).unwrap(), TickOutcome::Rendered(1));
    assert_eq!(renderer.stats(), PresentStats { presented: 1, failed: 1 });
}

#[test]
fn test_navigation_restarts_accumulation() {
    let (mut renderer, _) = volume_renderer(small_config(2));
    let mut controller = FrameController::new();
    assert_eq!(controller.run_until_idle(&mut renderer, 10).unwrap(), 2);

    renderer.set_navigation(Box::new(ScriptedNavigation::new(vec![Vec3::new(0.0, 1.0, 2.0)])));
    assert_eq!(controller.tick(&mut renderer).unwrap(), TickOutcome::Rendered(0));
    assert_eq!(controller.tick(&mut renderer).unwrap(), TickOutcome::Rendered(1));
    assert_eq!(controller.tick(&mut renderer).unwrap(), TickOutcome::Idle);
    assert_eq!(renderer.camera().eye(), Vec3::new(0.0, 1.0, 2.0));
}

fn scene_renderer(multi_frame_number: u32) -> Renderer<SoftwareBackend> {
    let config = small_config(multi_frame_number).with_render_mode(RenderMode::SceneGraph);
    let mut renderer = Renderer::new(SoftwareBackend::new((4, 4)), &config).unwrap();

    let backend = renderer.backend_mut();
    let program = backend.create_program("forward", &["u_model", "u_viewProjection"]);
    let pass = ScenePass::with_uniforms(&*backend, program, "u_model", "u_viewProjection").unwrap();
    let mut scene = Scene::new();
    let cuboid = Geometry::cuboid(backend, Vec3::new(1.0, 1.0, 1.0)).unwrap();
    let geometry = scene.add_geometry(cuboid);
    let material = scene.add_material(Material::new("plain"));
    for name in ["a", "b"] {
        let node = scene.add_node(scene.root(), name).unwrap();
        scene.add_component(node, GeometryComponent { geometry, material }).unwrap();
    }

    renderer.set_scene(scene, pass);
    renderer.initialize().unwrap();
    renderer
}

#[test]
fn test_scene_mode_draws_every_geometry_component() {
    let mut renderer = scene_renderer(2);
    let rendered = FrameController::new().run_until_idle(&mut renderer, 10).unwrap();

    assert_eq!(rendered, 2);
    assert_eq!(renderer.backend().draw_count(), 4);
    assert_eq!(renderer.scene().unwrap().len(), 3);
}

#[test]
fn test_scene_edit_restarts_converged_image() {
    let mut renderer = scene_renderer(2);
    let mut controller = FrameController::new();
    assert_eq!(controller.run_until_idle(&mut renderer, 10).unwrap(), 2);
    assert_eq!(controller.tick(&mut renderer).unwrap(), TickOutcome::Idle);

    let scene = renderer.scene_mut().unwrap();
    let root = scene.root();
    scene.set_transform(root, Mat4::new_scaling(5.0)).unwrap();

    assert_eq!(controller.tick(&mut renderer).unwrap(), TickOutcome::Rendered(0));
    assert_eq!(renderer.backend().draw_count(), 6);
    assert_eq!(renderer.accumulation().accumulated_frames(), 1);
}

#[test]
fn test_scene_edit_mid_sequence_restarts_mean() {
    let mut renderer = scene_renderer(4);
    let mut controller = FrameController::new();
    controller.tick(&mut renderer).unwrap();
    controller.tick(&mut renderer).unwrap();

    let scene = renderer.scene_mut().unwrap();
    let root = scene.root();
    scene.add_node(root, "late").unwrap();

    assert_eq!(controller.tick(&mut renderer).unwrap(), TickOutcome::Rendered(0));
    assert_eq!(renderer.accumulation().accumulated_frames(), 1);
    assert_eq!(controller.run_until_idle(&mut renderer, 10).unwrap(), 3);
}

#[test]
fn test_missing_volume_pass_is_an_error() {
    let mut renderer = Renderer::new(SoftwareBackend::new((4, 4)), &small_config(2)).unwrap();
    renderer.initialize().unwrap();
    renderer.update().unwrap();
    renderer.prepare().unwrap();

    assert!(matches!(renderer.frame(0), Err(RenderError::Uninitialized("volume pass"))));
    assert_eq!(renderer.state(), LifecycleState::Idle);
}

#[test]
fn test_uninitialize_releases_backend_resources() {
    let (mut renderer, _) = volume_renderer(small_config(4));
    FrameController::new().run_until_idle(&mut renderer, 10).unwrap();
    assert_eq!(renderer.backend().live_render_targets(), 3);

    renderer.uninitialize();

    assert_eq!(renderer.backend().live_render_targets(), 0);
    assert_eq!(renderer.backend().live_bind_objects(), 0);
    assert!(renderer.intermediate_target().is_none());
}
