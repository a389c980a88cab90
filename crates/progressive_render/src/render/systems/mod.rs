//! Per-frame rendering systems: sub-pixel jitter and accumulation

pub mod accumulation;
pub mod antialiasing;

pub use accumulation::{
    accumulate_color, accumulate_texel, AccumulationSettings, AccumulationStage, ACCUMULATION_PRECISION,
};
pub use antialiasing::AntiAliasingKernel;
