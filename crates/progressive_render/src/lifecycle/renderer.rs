//! # Progressive Renderer
//!
//! Owns the backend and every piece of per-frame state, and exposes the four
//! phases a frame clock drives:
//!
//! ```text
//! update() -> bool     drain loads, poll navigation, report staleness
//! prepare()            reconcile dirty flags once, then clear them
//! frame(i)             draw sub-frame i with jitter i, fold into the mean
//! swap()               present the mean (or the raw sub-frame)
//! ```
//!
//! Setters never touch the backend; they only raise dirty flags that the
//! next `prepare` reconciles. Blit failures are logged, counted and
//! swallowed.

use crate::core::{ChangeTracker, DirtyFlags, FramePrecision, RenderMode, RendererConfig};
use crate::foundation::math::{Mat4, Vec2};
use crate::input::Navigation;
use crate::lifecycle::loading::{LoadGate, LoadNotifier};
use crate::lifecycle::volume_pass::VolumePass;
use crate::render::api::{ClearFlags, Color, RenderBackend, RenderTargetHandle};
use crate::render::{
    AccumulationSettings, AccumulationStage, AntiAliasingKernel, Camera, RenderError, RenderResult,
};
use crate::scene::{Scene, ScenePass};

/// Clear color of the intermediate target
const INTERMEDIATE_CLEAR: Color = Color::WHITE;

/// Phase the renderer is in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No backend resources allocated
    Uninitialized,
    /// Resources allocated, no phase has run yet
    Initialized,
    /// Between phases
    Idle,
    /// Inside `update`
    Updating,
    /// Inside `prepare`
    Preparing,
    /// Inside `frame`
    Framing,
    /// Inside `swap`
    Swapping,
}

/// Presentation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PresentStats {
    /// Successful blits
    pub presented: u64,
    /// Blits that failed and were skipped
    pub failed: u64,
}

/// A scene and the pass that draws it
#[derive(Debug)]
struct SceneSetup {
    scene: Scene,
    pass: ScenePass,
}

/// Progressive multi-frame renderer over a backend `B`
pub struct Renderer<B: RenderBackend> {
    backend: B,
    state: LifecycleState,
    mode: RenderMode,
    frame_size: (u32, u32),
    canvas_size: (u32, u32),
    multi_frame_number: u32,
    clear_color: Color,
    precision: FramePrecision,
    altered: ChangeTracker<DirtyFlags>,
    camera: Camera,
    navigation: Option<Box<dyn Navigation>>,
    kernel: AntiAliasingKernel,
    intermediate: Option<RenderTargetHandle>,
    intermediate_precision: FramePrecision,
    accumulation: AccumulationStage,
    volume: Option<VolumePass>,
    scene: Option<SceneSetup>,
    loads: LoadGate,
    forced: bool,
    stats: PresentStats,
}

impl<B: RenderBackend> std::fmt::Debug for Renderer<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("state", &self.state)
            .field("mode", &self.mode)
            .field("frame_size", &self.frame_size)
            .field("multi_frame_number", &self.multi_frame_number)
            .field("altered", &self.altered.altered())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<B: RenderBackend> Renderer<B> {
    /// Create an uninitialized renderer from a validated configuration
    pub fn new(backend: B, config: &RendererConfig) -> RenderResult<Self> {
        config.validate()?;

        let mut altered = ChangeTracker::new();
        altered.alter_all();

        Ok(Self {
            backend,
            state: LifecycleState::Uninitialized,
            mode: config.render_mode,
            frame_size: config.frame_size,
            canvas_size: config.canvas_size,
            multi_frame_number: config.multi_frame_number,
            clear_color: Color::from(config.clear_color),
            precision: config.frame_precision,
            altered,
            camera: Camera::from_config(&config.camera),
            navigation: None,
            kernel: AntiAliasingKernel::new(config.multi_frame_number),
            intermediate: None,
            intermediate_precision: config.frame_precision,
            accumulation: AccumulationStage::new(),
            volume: None,
            scene: None,
            loads: LoadGate::new(),
            forced: false,
            stats: PresentStats::default(),
        })
    }

    fn require_initialized(&self) -> RenderResult<()> {
        match self.state {
            LifecycleState::Uninitialized => Err(RenderError::Uninitialized("renderer")),
            _ => Ok(()),
        }
    }

    fn run_phase<T>(
        &mut self,
        state: LifecycleState,
        phase: impl FnOnce(&mut Self) -> RenderResult<T>,
    ) -> RenderResult<T> {
        self.require_initialized()?;
        self.state = state;
        let result = phase(self);
        self.state = LifecycleState::Idle;
        result
    }

    /// Allocate the intermediate target
    ///
    /// Every flag is altered so the first prepare reconciles everything.
    pub fn initialize(&mut self) -> RenderResult<()> {
        if self.state != LifecycleState::Uninitialized {
            log::debug!("Renderer already initialized");
            return Ok(());
        }

        let target = self
            .backend
            .create_render_target("intermediate", self.frame_size, self.precision)?;
        self.backend.set_clear_color(Some(target), INTERMEDIATE_CLEAR);
        self.intermediate = Some(target);
        self.intermediate_precision = self.precision;

        self.altered.alter_all();
        self.camera.mark_altered();
        self.state = LifecycleState::Initialized;
        log::info!(
            "Renderer initialized: {:?}, {}x{} frame, {} sub-frames",
            self.mode,
            self.frame_size.0,
            self.frame_size.1,
            self.multi_frame_number
        );
        Ok(())
    }

    /// Release every renderer-owned backend resource
    pub fn uninitialize(&mut self) {
        if self.state == LifecycleState::Uninitialized {
            return;
        }
        self.accumulation.release(&mut self.backend);
        if let Some(target) = self.intermediate.take() {
            self.backend.delete_render_target(target);
        }
        if let Some(volume) = self.volume.as_mut() {
            volume.release(&mut self.backend);
        }
        self.volume = None;
        if let Some(setup) = self.scene.as_mut() {
            setup.scene.release(&mut self.backend);
        }
        self.scene = None;

        self.state = LifecycleState::Uninitialized;
        log::info!("Renderer uninitialized");
    }

    /// The backend context was lost; reconcile everything on the next prepare
    pub fn discard(&mut self) {
        log::info!("Renderer context discarded");
        self.altered.alter_all();
        self.camera.mark_altered();
    }

    /// Request a new image
    ///
    /// With `force` the next update reports a redraw even when nothing is
    /// altered; without it the request only takes effect if state changed.
    pub fn invalidate(&mut self, force: bool) {
        log::trace!("Renderer invalidated (force: {})", force);
        self.forced |= force;
    }

    /// Set the intermediate resolution
    pub fn set_frame_size(&mut self, size: (u32, u32)) -> RenderResult<()> {
        if size.0 == 0 || size.1 == 0 {
            return Err(RenderError::ResourceCreationFailed(format!(
                "frame size {}x{} is empty",
                size.0, size.1
            )));
        }
        if size != self.frame_size {
            self.frame_size = size;
            self.altered.alter(DirtyFlags::FRAME_SIZE);
        }
        Ok(())
    }

    /// Set the display resolution
    pub fn set_canvas_size(&mut self, size: (u32, u32)) -> RenderResult<()> {
        if size.0 == 0 || size.1 == 0 {
            return Err(RenderError::ResourceCreationFailed(format!(
                "canvas size {}x{} is empty",
                size.0, size.1
            )));
        }
        if size != self.canvas_size {
            self.canvas_size = size;
            self.altered.alter(DirtyFlags::CANVAS_SIZE);
        }
        Ok(())
    }

    /// Set the display clear color
    pub fn set_clear_color(&mut self, color: Color) {
        if color != self.clear_color {
            self.clear_color = color;
            self.altered.alter(DirtyFlags::CLEAR_COLOR);
        }
    }

    /// Set the number of sub-frames per image (0 is treated as 1)
    pub fn set_multi_frame_number(&mut self, count: u32) {
        let count = count.max(1);
        if count != self.multi_frame_number {
            self.multi_frame_number = count;
            self.altered.alter(DirtyFlags::MULTI_FRAME_NUMBER);
        }
    }

    /// Set the storage precision of the intermediate and accumulation targets
    pub fn set_frame_precision(&mut self, precision: FramePrecision) {
        if precision != self.precision {
            self.precision = precision;
            self.altered.alter(DirtyFlags::FRAME_PRECISION);
        }
    }

    /// Switch what each sub-frame draws
    pub fn set_render_mode(&mut self, mode: RenderMode) {
        if mode != self.mode {
            self.mode = mode;
            self.altered.alter(DirtyFlags::MULTI_FRAME_NUMBER);
        }
    }

    /// Replace the camera
    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
        self.altered.alter(DirtyFlags::CAMERA);
    }

    /// Alter a dirty flag by its declared name
    pub fn alter_named(&mut self, name: &str) -> RenderResult<()> {
        self.altered.alter_named(name)?;
        Ok(())
    }

    /// Install the navigation polled by every update
    pub fn set_navigation(&mut self, navigation: Box<dyn Navigation>) {
        self.navigation = Some(navigation);
    }

    /// Install the volume pass drawn in cuboid modes
    pub fn set_volume_pass(&mut self, pass: VolumePass) {
        if let Some(mut previous) = self.volume.replace(pass) {
            previous.release(&mut self.backend);
        }
        self.forced = true;
    }

    /// Install the scene drawn in scene-graph mode
    pub fn set_scene(&mut self, scene: Scene, pass: ScenePass) {
        if let Some(mut previous) = self.scene.replace(SceneSetup { scene, pass }) {
            previous.scene.release(&mut self.backend);
        }
        self.forced = true;
    }

    /// Register a resource that must load before frames are drawn
    pub fn expect_resource(&mut self, resource: impl Into<String>) {
        self.loads.expect(resource);
    }

    /// Notifier for loader threads
    pub fn load_notifier(&self) -> LoadNotifier {
        self.loads.notifier()
    }

    /// Update phase: returns whether the current image is stale
    ///
    /// Never touches the backend.
    pub fn update(&mut self) -> RenderResult<bool> {
        self.run_phase(LifecycleState::Updating, |renderer| {
            let progress = renderer.loads.drain();
            if progress.finished > 0 {
                renderer.invalidate(true);
            }

            if let Some(navigation) = renderer.navigation.as_mut() {
                navigation.update(&mut renderer.camera);
            }

            let redraw = renderer.altered.any() || renderer.camera.altered() || renderer.forced;
            renderer.forced = false;
            if redraw {
                log::trace!("Redraw requested, altered {:?}", renderer.altered.altered());
            }
            Ok(redraw)
        })
    }

    /// Prepare phase: reconcile every altered input once
    pub fn prepare(&mut self) -> RenderResult<()> {
        self.run_phase(LifecycleState::Preparing, |renderer| {
            let altered = renderer.altered.altered();
            let intermediate = renderer
                .intermediate
                .ok_or(RenderError::Uninitialized("intermediate target"))?;

            if renderer.precision != renderer.intermediate_precision {
                renderer.backend.delete_render_target(intermediate);
                let target = renderer.backend.create_render_target(
                    "intermediate",
                    renderer.frame_size,
                    renderer.precision,
                )?;
                renderer.backend.set_clear_color(Some(target), INTERMEDIATE_CLEAR);
                renderer.intermediate = Some(target);
                renderer.intermediate_precision = renderer.precision;
                log::debug!("Intermediate target recreated at {:?} precision", renderer.precision);
            } else if altered.contains(DirtyFlags::FRAME_SIZE) {
                renderer.backend.resize_render_target(intermediate, renderer.frame_size)?;
            }

            if altered.contains(DirtyFlags::FRAME_SIZE) {
                renderer.camera.set_viewport(renderer.frame_size);
            }
            if altered.contains(DirtyFlags::CANVAS_SIZE) {
                let (width, height) = renderer.canvas_size;
                renderer.camera.set_aspect(width as f32 / height as f32);
                renderer.camera.set_viewport(renderer.canvas_size);
            }
            if altered.contains(DirtyFlags::CLEAR_COLOR) {
                renderer.backend.set_clear_color(None, renderer.clear_color);
            }
            if altered.contains(DirtyFlags::MULTI_FRAME_NUMBER) {
                renderer.kernel = AntiAliasingKernel::new(renderer.multi_frame_number);
                log::debug!("Jitter kernel regenerated with {} samples", renderer.kernel.len());
            }

            let settings = AccumulationSettings {
                frame_size: renderer.frame_size,
                multi_frame_number: renderer.multi_frame_number,
                enabled: renderer.mode.accumulates(),
            };
            renderer.accumulation.update(&mut renderer.backend, altered, settings)?;

            renderer.altered.reset();
            renderer.camera.clear_altered();
            Ok(())
        })
    }

    /// Frame phase: draw sub-frame `frame_index` and fold it into the mean
    ///
    /// Skipped while any expected resource is still loading.
    pub fn frame(&mut self, frame_index: u32) -> RenderResult<()> {
        self.run_phase(LifecycleState::Framing, |renderer| {
            if !renderer.loads.is_ready() {
                log::trace!("Sub-frame {} skipped while loading", frame_index);
                return Ok(());
            }

            let intermediate = renderer
                .intermediate
                .ok_or(RenderError::Uninitialized("intermediate target"))?;
            let view_projection = renderer.jittered_view_projection(frame_index);
            let (width, height) = renderer.frame_size;

            match renderer.mode {
                RenderMode::Cuboid | RenderMode::AccumulatedCuboid => {
                    let volume = renderer
                        .volume
                        .as_mut()
                        .ok_or(RenderError::Uninitialized("volume pass"))?;
                    renderer.backend.bind_render_target(Some(intermediate));
                    renderer.backend.clear(
                        Some(intermediate),
                        ClearFlags::COLOR | ClearFlags::DEPTH,
                        INTERMEDIATE_CLEAR,
                        1.0,
                    );
                    renderer.backend.set_viewport(width, height);
                    volume.draw(&mut renderer.backend, &renderer.camera, &view_projection)?;
                }
                RenderMode::SceneGraph => {
                    let setup = renderer
                        .scene
                        .as_mut()
                        .ok_or(RenderError::Uninitialized("scene"))?;
                    renderer.backend.set_viewport(width, height);
                    setup.pass.set_view_projection(view_projection);
                    setup
                        .pass
                        .frame(&mut renderer.backend, &mut setup.scene, Some(intermediate), renderer.clear_color)?;
                }
            }

            renderer.accumulation.accumulate(&mut renderer.backend, intermediate, frame_index)?;
            log::trace!("Sub-frame {} rendered", frame_index);
            Ok(())
        })
    }

    /// Swap phase: present the mean, or the intermediate target when there is none
    pub fn swap(&mut self) -> RenderResult<()> {
        self.run_phase(LifecycleState::Swapping, |renderer| {
            let source = renderer
                .accumulation
                .output()
                .or(renderer.intermediate)
                .ok_or(RenderError::Uninitialized("intermediate target"))?;

            match renderer.backend.blit(source) {
                Ok(()) => renderer.stats.presented += 1,
                Err(err) => {
                    log::warn!("Skipping presentation: {}", err);
                    renderer.stats.failed += 1;
                }
            }
            Ok(())
        })
    }

    /// View-projection for sub-frame `frame_index`, jittered when accumulating
    pub fn jittered_view_projection(&self, frame_index: u32) -> Mat4 {
        let offset = if self.accumulates() {
            self.kernel.ndc_offset(frame_index, self.frame_size)
        } else {
            Vec2::zeros()
        };
        self.camera.jittered_view_projection(offset)
    }

    fn accumulates(&self) -> bool {
        self.mode.accumulates() && self.multi_frame_number > 1
    }

    /// Number of sub-frames that make up one converged image
    pub fn frames_per_image(&self) -> u32 {
        if self.accumulates() {
            self.multi_frame_number
        } else {
            1
        }
    }

    /// Current phase
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Active render mode
    pub fn render_mode(&self) -> RenderMode {
        self.mode
    }

    /// Intermediate resolution
    pub fn frame_size(&self) -> (u32, u32) {
        self.frame_size
    }

    /// Display resolution
    pub fn canvas_size(&self) -> (u32, u32) {
        self.canvas_size
    }

    /// Configured sub-frame count
    pub fn multi_frame_number(&self) -> u32 {
        self.multi_frame_number
    }

    /// Display clear color
    pub fn clear_color(&self) -> Color {
        self.clear_color
    }

    /// Pending dirty flags
    pub fn altered(&self) -> DirtyFlags {
        self.altered.altered()
    }

    /// The camera
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Mutable camera; setters raise its `altered` flag
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// The jitter kernel in use
    pub fn kernel(&self) -> &AntiAliasingKernel {
        &self.kernel
    }

    /// The accumulation stage
    pub fn accumulation(&self) -> &AccumulationStage {
        &self.accumulation
    }

    /// The intermediate target, once initialized
    pub fn intermediate_target(&self) -> Option<RenderTargetHandle> {
        self.intermediate
    }

    /// Mutable scene, in scene-graph setups
    ///
    /// Borrowing the scene marks the image stale: the next update reports a
    /// redraw and the running mean restarts at sub-frame 0.
    pub fn scene_mut(&mut self) -> Option<&mut Scene> {
        let setup = self.scene.as_mut()?;
        self.forced = true;
        Some(&mut setup.scene)
    }

    /// The scene, in scene-graph setups
    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref().map(|setup| &setup.scene)
    }

    /// Whether frames are waiting for resources
    pub fn is_loading(&self) -> bool {
        !self.loads.is_ready()
    }

    /// Whether a resource failed to load
    pub fn load_failed(&self) -> bool {
        self.loads.has_failed()
    }

    /// Presentation counters
    pub fn stats(&self) -> PresentStats {
        self.stats
    }

    /// The backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable backend, for creating resources
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}
