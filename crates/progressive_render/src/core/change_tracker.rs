//! Dirty-flag tracking with consumer-driven reset
//!
//! External setters `alter` a flag; the consumer (the renderer's prepare
//! phase) reads the accumulated set and resets it as one batch. Between two
//! resets flags only accumulate, so several changes to the same input are
//! reconciled once.

use bitflags::{bitflags, Flags};

bitflags! {
    /// Renderer inputs that need reconciliation before the next frame
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DirtyFlags: u32 {
        /// Display target size changed
        const CANVAS_SIZE = 1 << 0;
        /// Display clear color changed
        const CLEAR_COLOR = 1 << 1;
        /// Intermediate frame size changed
        const FRAME_SIZE = 1 << 2;
        /// Number of accumulated sub-frames changed
        const MULTI_FRAME_NUMBER = 1 << 3;
        /// Camera was replaced
        const CAMERA = 1 << 4;
        /// Storage precision of intermediate targets changed
        const FRAME_PRECISION = 1 << 5;
    }
}

/// Name passed to [`ChangeTracker::alter_named`] matched no declared flag
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown change flag '{0}'")]
pub struct UnknownFlag(pub String);

/// Set of named dirty flags
///
/// The aggregate [`any`](Self::any) bit is derived from the set, so it can
/// never disagree with the individual flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeTracker<F: Flags + Copy = DirtyFlags> {
    altered: F,
}

impl<F: Flags + Copy> Default for ChangeTracker<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Flags + Copy> ChangeTracker<F> {
    /// Create a tracker with every flag cleared
    pub fn new() -> Self {
        Self { altered: F::empty() }
    }

    /// Mark `flags` as altered. Altering an already altered flag is a no-op.
    pub fn alter(&mut self, flags: F) {
        self.altered.insert(flags);
    }

    /// Mark the flag with the given declared name, e.g. `"FRAME_SIZE"` or `"frame_size"`
    pub fn alter_named(&mut self, name: &str) -> Result<(), UnknownFlag> {
        let flag = F::from_name(&name.to_ascii_uppercase())
            .ok_or_else(|| UnknownFlag(name.to_string()))?;
        self.alter(flag);
        Ok(())
    }

    /// Mark every declared flag
    pub fn alter_all(&mut self) {
        self.altered = F::all();
    }

    /// Whether any flag is set
    pub fn any(&self) -> bool {
        !self.altered.is_empty()
    }

    /// Whether every flag in `flags` is set
    pub fn is_altered(&self, flags: F) -> bool {
        self.altered.contains(flags)
    }

    /// Snapshot of the currently altered set
    pub fn altered(&self) -> F {
        self.altered
    }

    /// Clear every flag
    pub fn reset(&mut self) {
        self.altered = F::empty();
    }
}
