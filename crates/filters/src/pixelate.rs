//! Block-averaging pixelation.
//!
//! The region is tiled into square blocks anchored at the region's top-left
//! corner. Each block is replaced by its per-channel mean (truncated).
//! Trailing blocks may be partial and are averaged over their in-bounds
//! pixels only.

use maskframe_model::PixelBounds;

use crate::frame::{FrameBuffer, CHANNELS};

/// Smallest block used when pixelating through mask settings.
pub const MIN_BLOCK_SIZE: usize = 2;

/// Block edge for a region whose shorter side is `min_side`.
///
/// `floor(min_side * intensity / 100)`, capped at a quarter of the shorter
/// side, then raised to at least [`MIN_BLOCK_SIZE`]. On small regions where
/// the cap falls below the minimum, the minimum wins.
pub fn pixelate_block_size(min_side: usize, intensity: u8) -> usize {
    let scaled = min_side * intensity as usize / 100;
    let cap = min_side / 4;
    scaled.min(cap).max(MIN_BLOCK_SIZE)
}

/// Pixelate `bounds` using the intensity-derived block size.
pub fn pixelate(frame: &mut FrameBuffer, bounds: PixelBounds, intensity: u8) {
    if bounds.is_empty() {
        return;
    }
    let block = pixelate_block_size(bounds.min_side(), intensity);
    pixelate_blocks(frame, bounds, block);
}

/// Pixelate `bounds` with an explicit block edge. A block of 1 leaves the
/// frame unchanged.
pub fn pixelate_blocks(frame: &mut FrameBuffer, bounds: PixelBounds, block: usize) {
    if bounds.is_empty() || block <= 1 {
        return;
    }

    let x_end = bounds.x + bounds.width;
    let y_end = bounds.y + bounds.height;

    for by in (bounds.y..y_end).step_by(block) {
        let bh = block.min(y_end - by);
        for bx in (bounds.x..x_end).step_by(block) {
            let bw = block.min(x_end - bx);

            let mut sums = [0u64; CHANNELS];
            for y in by..by + bh {
                let start = frame.offset(bx, y);
                let row = &frame.as_bytes()[start..start + bw * CHANNELS];
                for px in row.chunks_exact(CHANNELS) {
                    for (sum, &v) in sums.iter_mut().zip(px) {
                        *sum += v as u64;
                    }
                }
            }

            let count = (bw * bh) as u64;
            let mean = sums.map(|s| (s / count) as u8);

            for y in by..by + bh {
                let start = frame.offset(bx, y);
                let row = &mut frame.as_bytes_mut()[start..start + bw * CHANNELS];
                for px in row.chunks_exact_mut(CHANNELS) {
                    px.copy_from_slice(&mean);
                }
            }
        }
    }
}
