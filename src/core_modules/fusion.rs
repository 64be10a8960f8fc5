// THEORY:
// The `MeanFusionAccumulator` reduces an ordered stack of same-cell captures
// into one noise-reduced frame. The operation is a masked per-pixel mean:
// every capture derives its own validity mask, widened samples are summed
// only at mask-valid positions, and the sum is divided by the *declared*
// group length at the end.
//
// Key architectural principles:
// 1.  **Widened intermediate precision**: sums are held in 16-bit samples so
//     that a full stack of 8-bit captures cannot overflow mid-accumulation.
//     The precision is an explicit property of this module, not an incidental
//     cast: `MAX_GROUP_LENGTH` is the largest group whose all-white sums
//     still fit. Adds saturate as a second line of defence.
// 2.  **Division by declared length**: the divisor is the number of captures
//     supplied for the cell, including ones that failed to load and frames
//     whose mask contributed nothing at a given pixel. A partially covered
//     pixel therefore averages darker than its covered samples. That is the
//     upstream system's contract and callers rely on it; a per-pixel
//     contributor count would be the "fixed" variant, and this module
//     deliberately does not implement it.
// 3.  **Order irrelevance**: addition is commutative, so the stack's order
//     never affects the result. Only the first *loaded* capture is special:
//     it sizes the accumulator.
//
// A group that yields no loaded capture at all cannot size an accumulator,
// and fusing it is a fatal `EmptyGroup` error for the caller to handle; the
// surrounding pipeline aborts the whole invocation rather than inventing a
// blank cell.

use crate::core_modules::mask::mask::produce_mask;
use crate::core_modules::pixel_buffer::pixel_buffer::{
    Byte, CellSource, PixelBuffer, WidePixelBuffer, WideSample,
};
use log::warn;
use thiserror::Error;

/// The largest declared group length whose sums cannot saturate the widened
/// accumulator even if every sample of every capture is 255.
pub const MAX_GROUP_LENGTH: usize = (WideSample::MAX / Byte::MAX as WideSample) as usize;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FusionError {
    /// Every capture in the group failed to load; there is nothing to fuse.
    #[error("fusion group yielded no loadable captures")]
    EmptyGroup,
    /// The declared group length exceeds what the accumulator precision can
    /// sum without saturating.
    #[error("fusion group of {declared} captures exceeds the supported maximum of {MAX_GROUP_LENGTH}")]
    GroupTooLarge { declared: usize },
}

/// Accumulates a stack of same-cell captures into a widened running sum.
pub struct MeanFusionAccumulator {
    sums: WidePixelBuffer,
}

impl MeanFusionAccumulator {
    /// Creates a zeroed accumulator for captures of the given geometry.
    pub fn new(width: u32, height: u32, channels: u32) -> Self {
        Self {
            sums: WidePixelBuffer::new(width, height, channels),
        }
    }

    /// Adds one capture's samples into the running sums at the positions its
    /// own validity mask marks as carrying data. Mask-invalid positions are
    /// left untouched.
    ///
    /// Returns `false` (and accumulates nothing) when the capture's geometry
    /// does not match the accumulator; the loader contract makes such a
    /// capture equivalent to a failed decode.
    pub fn accumulate(&mut self, capture: &PixelBuffer) -> bool {
        if capture.width != self.sums.width
            || capture.height != self.sums.height
            || capture.channels != self.sums.channels
        {
            return false;
        }

        let mask = produce_mask(capture);
        let channels = capture.channels as usize;
        for (pixel_index, &mask_sample) in mask.data.iter().enumerate() {
            if mask_sample == 0 {
                continue;
            }
            let base = pixel_index * channels;
            for offset in base..base + channels {
                let slot = &mut self.sums.data[offset];
                *slot = slot.saturating_add(capture.data[offset] as WideSample);
            }
        }
        true
    }

    /// Divides every sample by the declared group length, rounding to
    /// nearest, and returns the fused frame at widened precision.
    pub fn finish(mut self, declared_length: usize) -> WidePixelBuffer {
        let divisor = declared_length.max(1) as u32;
        for sample in &mut self.sums.data {
            *sample = ((*sample as u32 + divisor / 2) / divisor) as WideSample;
        }
        self.sums
    }
}

/// Fuses one cell's capture group into a single frame.
///
/// The accumulator is sized from the first loaded capture; captures that
/// failed to load are skipped but still count toward the declared length the
/// sums are divided by.
pub fn fuse_group(group: &[CellSource]) -> Result<WidePixelBuffer, FusionError> {
    let declared_length = group.len();
    if declared_length == 0 {
        return Err(FusionError::EmptyGroup);
    }
    if declared_length > MAX_GROUP_LENGTH {
        return Err(FusionError::GroupTooLarge {
            declared: declared_length,
        });
    }

    let mut accumulator: Option<MeanFusionAccumulator> = None;
    for (capture_index, source) in group.iter().enumerate() {
        let Some(capture) = source.as_loaded() else {
            continue;
        };
        let accumulator = accumulator.get_or_insert_with(|| {
            MeanFusionAccumulator::new(capture.width, capture.height, capture.channels)
        });
        if !accumulator.accumulate(capture) {
            warn!(
                "skipping capture {} of fusion group: {}x{} ({} ch) does not match the group geometry",
                capture_index, capture.width, capture.height, capture.channels
            );
        }
    }

    match accumulator {
        Some(accumulator) => Ok(accumulator.finish(declared_length)),
        None => Err(FusionError::EmptyGroup),
    }
}
