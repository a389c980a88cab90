//! Frame clock driving a [`Renderer`]
//!
//! Each tick runs the update phase. A stale image restarts the sub-frame
//! sequence at 0; while the sequence is incomplete the tick renders one
//! sub-frame (prepare, frame, swap). Once every sub-frame of the image has
//! been accumulated the renderer is converged and ticks are idle until
//! something changes. While an expected resource is loading no sub-frame is
//! drawn or presented and the sequence does not advance.

use crate::lifecycle::renderer::Renderer;
use crate::render::api::RenderBackend;
use crate::render::RenderResult;

/// What a tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Sub-frame with this index was rendered and presented
    Rendered(u32),
    /// The image is converged; nothing was rendered
    Idle,
    /// Frames are gated on a resource load; nothing was rendered
    Loading,
}

/// Sub-frame sequencing for one renderer
#[derive(Debug, Clone, Default)]
pub struct FrameController {
    frame_index: u32,
    ticks: u64,
}

impl FrameController {
    /// Create a controller at sub-frame 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one update and, unless converged, one prepare/frame/swap cycle
    pub fn tick<B: RenderBackend>(&mut self, renderer: &mut Renderer<B>) -> RenderResult<TickOutcome> {
        self.ticks += 1;
        if renderer.update()? {
            if self.frame_index > 0 {
                log::debug!("Image stale after {} sub-frames, restarting", self.frame_index);
            }
            self.frame_index = 0;
        }

        if renderer.is_loading() {
            return Ok(TickOutcome::Loading);
        }
        if self.frame_index >= renderer.frames_per_image() {
            return Ok(TickOutcome::Idle);
        }

        let index = self.frame_index;
        renderer.prepare()?;
        renderer.frame(index)?;
        renderer.swap()?;
        self.frame_index += 1;

        if self.frame_index == renderer.frames_per_image() {
            log::debug!("Image converged after {} sub-frames", self.frame_index);
        }
        Ok(TickOutcome::Rendered(index))
    }

    /// Tick until the image converges, frames are gated on a load, or
    /// `max_ticks` is reached
    ///
    /// Returns the number of sub-frames rendered.
    pub fn run_until_idle<B: RenderBackend>(
        &mut self,
        renderer: &mut Renderer<B>,
        max_ticks: u32,
    ) -> RenderResult<u32> {
        let mut rendered = 0;
        for _ in 0..max_ticks {
            match self.tick(renderer)? {
                TickOutcome::Rendered(_) => rendered += 1,
                TickOutcome::Idle | TickOutcome::Loading => break,
            }
        }
        Ok(rendered)
    }

    /// Index of the next sub-frame
    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    /// Ticks run so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
