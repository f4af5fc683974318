//! Solid fill.

use maskframe_model::PixelBounds;

use crate::frame::{FrameBuffer, CHANNELS};

/// Paint every pixel inside `bounds` with `rgba`.
pub fn fill_solid(frame: &mut FrameBuffer, bounds: PixelBounds, rgba: [u8; 4]) {
    if bounds.is_empty() {
        return;
    }
    for y in bounds.y..bounds.y + bounds.height {
        let start = frame.offset(bounds.x, y);
        let row = &mut frame.as_bytes_mut()[start..start + bounds.width * CHANNELS];
        for px in row.chunks_exact_mut(CHANNELS) {
            px.copy_from_slice(&rgba);
        }
    }
}
