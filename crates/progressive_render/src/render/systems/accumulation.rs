//! # Accumulation Stage
//!
//! Blends successive jittered sub-frames into a running mean:
//!
//! ```text
//! acc_0 = s_0
//! acc_i = acc_{i-1} + (s_i - acc_{i-1}) / (i + 1)
//! ```
//!
//! which equals `mean(s_0..=s_i)` exactly in real arithmetic. The stage keeps
//! two render targets and ping-pongs between them: one holds the previous
//! mean while the other receives the new one.
//!
//! Both targets are stored at [`ACCUMULATION_PRECISION`] whatever the
//! sub-frame precision is; rounding the mean after every step would shrink
//! the share of late sub-frames.
//!
//! With a single sample, or a render mode that does not accumulate, the
//! stage is a pass-through and [`AccumulationStage::output`] is `None`; the
//! swap phase then presents the intermediate target directly.

use crate::core::{DirtyFlags, FramePrecision};
use crate::render::api::{Color, RenderBackend, RenderTargetHandle};
use crate::render::{RenderError, RenderResult};

/// Storage precision of the running mean
pub const ACCUMULATION_PRECISION: FramePrecision = FramePrecision::Float;

/// One texel of the running mean after sub-frame `frame_index`
pub fn accumulate_texel(accumulated: f32, sub_frame: f32, frame_index: u32) -> f32 {
    accumulated + (sub_frame - accumulated) / (frame_index as f32 + 1.0)
}

/// [`accumulate_texel`] applied to every channel
pub fn accumulate_color(accumulated: Color, sub_frame: Color, frame_index: u32) -> Color {
    accumulated.zip_map(sub_frame, |acc, sub| accumulate_texel(acc, sub, frame_index))
}

/// Inputs the stage reads on every [`AccumulationStage::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccumulationSettings {
    /// Size of the sub-frames being blended
    pub frame_size: (u32, u32),
    /// Number of sub-frames per converged image
    pub multi_frame_number: u32,
    /// Whether the active render mode accumulates at all
    pub enabled: bool,
}

impl AccumulationSettings {
    fn needs_targets(&self) -> bool {
        self.enabled && self.multi_frame_number > 1
    }
}

/// Ping-pong running-mean accumulator
#[derive(Debug, Default)]
pub struct AccumulationStage {
    targets: Option<[RenderTargetHandle; 2]>,
    write: usize,
    accumulated: u32,
    size: (u32, u32),
}

impl AccumulationStage {
    const TRACKED: DirtyFlags = DirtyFlags::FRAME_SIZE
        .union(DirtyFlags::MULTI_FRAME_NUMBER)
        .union(DirtyFlags::FRAME_PRECISION);

    /// Create an empty stage; targets are allocated by the first [`update`](Self::update)
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the targets in line with `settings`
    ///
    /// Called once per prepare. Resets the running mean when the frame size,
    /// sample count or sub-frame precision changed, resizing the targets if
    /// needed, and releases the targets when accumulation is not needed.
    pub fn update(
        &mut self,
        backend: &mut dyn RenderBackend,
        altered: DirtyFlags,
        settings: AccumulationSettings,
    ) -> RenderResult<()> {
        if !settings.needs_targets() {
            if self.targets.is_some() {
                log::debug!("Accumulation disabled, releasing targets");
                self.release(backend);
            }
            return Ok(());
        }

        match self.targets {
            Some(_) if !altered.intersects(Self::TRACKED) => return Ok(()),
            Some(targets) => {
                if settings.frame_size != self.size {
                    for target in targets {
                        backend.resize_render_target(target, settings.frame_size)?;
                    }
                }
            }
            None => {
                let first = backend.create_render_target("accumulation-0", settings.frame_size, ACCUMULATION_PRECISION)?;
                let second = backend.create_render_target("accumulation-1", settings.frame_size, ACCUMULATION_PRECISION)?;
                self.targets = Some([first, second]);
            }
        }

        log::debug!(
            "Accumulation reset: {}x{}, {} sub-frames",
            settings.frame_size.0,
            settings.frame_size.1,
            settings.multi_frame_number
        );
        self.size = settings.frame_size;
        self.write = 0;
        self.accumulated = 0;
        Ok(())
    }

    /// Blend `sub_frame` into the running mean as sample `frame_index`
    ///
    /// A no-op in pass-through mode. Frame index 0 starts a new mean.
    pub fn accumulate(
        &mut self,
        backend: &mut dyn RenderBackend,
        sub_frame: RenderTargetHandle,
        frame_index: u32,
    ) -> RenderResult<()> {
        let Some(targets) = self.targets else {
            return Ok(());
        };

        let output = targets[self.write];
        let previous = (frame_index > 0 && self.accumulated > 0).then_some(targets[1 - self.write]);
        if frame_index > 0 && previous.is_none() {
            log::debug!("Accumulating sub-frame {} without a previous mean", frame_index);
        }

        backend.accumulate(previous, sub_frame, output, frame_index)?;
        self.accumulated = frame_index + 1;
        self.write = 1 - self.write;
        Ok(())
    }

    /// Target holding the most recent mean, `None` before the first
    /// accumulation or in pass-through mode
    pub fn output(&self) -> Option<RenderTargetHandle> {
        match self.targets {
            Some(targets) if self.accumulated > 0 => Some(targets[1 - self.write]),
            _ => None,
        }
    }

    /// Whether sub-frames bypass the stage
    pub fn is_pass_through(&self) -> bool {
        self.targets.is_none()
    }

    /// Number of sub-frames in the current mean
    pub fn accumulated_frames(&self) -> u32 {
        self.accumulated
    }

    /// Release both targets
    pub fn release(&mut self, backend: &mut dyn RenderBackend) {
        if let Some(targets) = self.targets.take() {
            for target in targets {
                backend.delete_render_target(target);
            }
        }
        self.write = 0;
        self.accumulated = 0;
    }

    /// Both targets, for diagnostics
    pub fn targets(&self) -> RenderResult<[RenderTargetHandle; 2]> {
        self.targets.ok_or(RenderError::Uninitialized("accumulation targets"))
    }
}
