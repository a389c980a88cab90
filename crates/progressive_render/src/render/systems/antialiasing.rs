//! Sub-pixel jitter kernel for multi-frame anti-aliasing
//!
//! Offsets come from the Halton (2, 3) low-discrepancy sequence, shifted
//! toroidally by half a pixel so that the first sample is the pixel center:
//!
//! ```text
//! offset_i = (fract(h2(i) + 0.5) - 0.5, fract(h3(i) + 0.5) - 0.5)
//! ```
//!
//! Every offset lies in `[-0.5, 0.5)²` (pixel units) and the sequence only
//! depends on the sample count, so repeated accumulation runs are
//! reproducible.

use crate::foundation::math::Vec2;

/// Largest representable offset strictly below half a pixel
const MAX_OFFSET: f32 = 0.5 - f32::EPSILON;

/// Van der Corput radical inverse of `index` in `base`
fn radical_inverse(mut index: u32, base: u32) -> f64 {
    let inv_base = 1.0 / f64::from(base);
    let mut factor = inv_base;
    let mut result = 0.0;
    while index > 0 {
        result += f64::from(index % base) * factor;
        index /= base;
        factor *= inv_base;
    }
    result
}

fn centered(value: f64) -> f32 {
    let shifted = ((value + 0.5).fract() - 0.5) as f32;
    shifted.min(MAX_OFFSET)
}

/// Ordered jitter offsets for N accumulated sub-frames
#[derive(Debug, Clone, PartialEq)]
pub struct AntiAliasingKernel {
    offsets: Vec<Vec2>,
}

impl AntiAliasingKernel {
    /// Build the kernel for `sample_count` sub-frames (0 is treated as 1)
    pub fn new(sample_count: u32) -> Self {
        Self {
            offsets: Self::generate(sample_count),
        }
    }

    /// The offset sequence for `sample_count` sub-frames
    pub fn generate(sample_count: u32) -> Vec<Vec2> {
        (0..sample_count.max(1))
            .map(|i| Vec2::new(centered(radical_inverse(i, 2)), centered(radical_inverse(i, 3))))
            .collect()
    }

    /// Number of offsets
    pub fn len(&self) -> u32 {
        self.offsets.len() as u32
    }

    /// Always false; a kernel holds at least one sample
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Offset in pixel units for `frame_index`, wrapping around the kernel
    pub fn at(&self, frame_index: u32) -> Vec2 {
        self.offsets[(frame_index % self.len()) as usize]
    }

    /// Offset for `frame_index` converted to NDC units for a target of `frame_size` pixels
    pub fn ndc_offset(&self, frame_index: u32, frame_size: (u32, u32)) -> Vec2 {
        let offset = self.at(frame_index);
        Vec2::new(
            2.0 * offset.x / frame_size.0.max(1) as f32,
            2.0 * offset.y / frame_size.1.max(1) as f32,
        )
    }

    /// All offsets in sample order
    pub fn offsets(&self) -> &[Vec2] {
        &self.offsets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_generate_length_and_range() {
        for n in [1, 2, 3, 4, 8, 16, 17, 64, 128, 1000] {
            let offsets = AntiAliasingKernel::generate(n);
            assert_eq!(offsets.len(), n as usize);
            for offset in &offsets {
                assert!((-0.5..0.5).contains(&offset.x), "x = {} out of range for n = {}", offset.x, n);
                assert!((-0.5..0.5).contains(&offset.y), "y = {} out of range for n = {}", offset.y, n);
            }
        }
    }

    #[test]
    fn test_generate_is_deterministic() {
        assert_eq!(AntiAliasingKernel::generate(64), AntiAliasingKernel::generate(64));
        assert_eq!(AntiAliasingKernel::new(7), AntiAliasingKernel::new(7));
    }

    #[test]
    fn test_first_sample_is_pixel_center() {
        let kernel = AntiAliasingKernel::new(1);
        assert_eq!(kernel.offsets(), &[Vec2::zeros()]);
    }

    #[test]
    fn test_prefix_property() {
        // A larger kernel starts with the smaller kernel's samples
        let small = AntiAliasingKernel::generate(8);
        let large = AntiAliasingKernel::generate(64);
        assert_eq!(&large[..8], &small[..]);
    }

    #[test]
    fn test_offsets_are_distinct() {
        let offsets = AntiAliasingKernel::generate(64);
        for (i, a) in offsets.iter().enumerate() {
            for b in &offsets[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_zero_samples_treated_as_one() {
        let kernel = AntiAliasingKernel::new(0);
        assert_eq!(kernel.len(), 1);
        assert!(!kernel.is_empty());
    }

    #[test]
    fn test_at_wraps_around() {
        let kernel = AntiAliasingKernel::new(4);
        assert_eq!(kernel.at(1), kernel.at(5));
        assert_eq!(kernel.at(0), kernel.at(400));
    }

    #[test]
    fn test_known_halton_values() {
        let kernel = AntiAliasingKernel::new(4);
        // h2(1) = 0.5, h3(1) = 1/3
        assert_relative_eq!(kernel.at(1).x, 0.0, epsilon = 1e-7);
        assert_relative_eq!(kernel.at(1).y, -1.0 / 6.0, epsilon = 1e-6);
        // h2(2) = 0.25, h3(2) = 2/3
        assert_relative_eq!(kernel.at(2).x, -0.25, epsilon = 1e-7);
        assert_relative_eq!(kernel.at(2).y, 1.0 / 6.0, epsilon = 1e-6);
    }

    #[test]
    fn test_ndc_offset_scales_by_frame_size() {
        let kernel = AntiAliasingKernel::new(4);
        let pixel = kernel.at(2);
        let ndc = kernel.ndc_offset(2, (800, 600));

        assert_relative_eq!(ndc.x, 2.0 * pixel.x / 800.0, epsilon = 1e-9);
        assert_relative_eq!(ndc.y, 2.0 * pixel.y / 600.0, epsilon = 1e-9);
    }
}
