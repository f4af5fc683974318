//! Separable box blur.
//!
//! Two sliding-window passes over the region: horizontal into a scratch
//! buffer, then vertical from the scratch buffer back into the frame. Pass 2
//! never reads raw frame pixels. The window is clipped to the region, so near
//! the edges the divisor shrinks instead of replicating border pixels.
//! Means are rounded to nearest after each pass, exact halves to even.

use maskframe_model::PixelBounds;

use crate::frame::{FrameBuffer, CHANNELS};

/// Upper bound on the blur radius, in pixels.
pub const MAX_BLUR_RADIUS: usize = 30;

/// Radius for a region whose shorter side is `min_side`.
///
/// `clamp(intensity, 0, min(floor(min_side * 0.2), 30))`.
pub fn blur_radius(min_side: usize, intensity: u8) -> usize {
    let cap = (min_side / 5).min(MAX_BLUR_RADIUS);
    (intensity as usize).min(cap)
}

/// Blur `bounds` using the intensity-derived radius.
pub fn blur(frame: &mut FrameBuffer, bounds: PixelBounds, intensity: u8, scratch: &mut Vec<u8>) {
    if bounds.is_empty() {
        return;
    }
    let radius = blur_radius(bounds.min_side(), intensity);
    box_blur(frame, bounds, radius, scratch);
}

/// Box blur `bounds` with an explicit radius. `scratch` is resized as needed
/// and may be reused across calls.
pub fn box_blur(frame: &mut FrameBuffer, bounds: PixelBounds, radius: usize, scratch: &mut Vec<u8>) {
    if bounds.is_empty() || radius == 0 {
        return;
    }

    let w = bounds.width;
    let h = bounds.height;
    scratch.clear();
    scratch.resize(w * h * CHANNELS, 0);

    // Pass 1: rows of the frame region into the scratch buffer.
    for row in 0..h {
        let src_start = frame.offset(bounds.x, bounds.y + row);
        let src = &frame.as_bytes()[src_start..src_start + w * CHANNELS];
        let dst = &mut scratch[row * w * CHANNELS..(row + 1) * w * CHANNELS];
        blur_line(src, CHANNELS, dst, CHANNELS, w, radius);
    }

    // Pass 2: columns of the scratch buffer back into the frame region.
    let stride = frame.width() * CHANNELS;
    let region_start = frame.offset(bounds.x, bounds.y);
    let data = frame.as_bytes_mut();
    for col in 0..w {
        let src = &scratch[col * CHANNELS..];
        let dst = &mut data[region_start + col * CHANNELS..];
        blur_line(src, w * CHANNELS, dst, stride, h, radius);
    }
}

/// Sliding-window mean over `len` pixels spaced `src_step` bytes apart in
/// `src`, written `dst_step` bytes apart in `dst`.
fn blur_line(src: &[u8], src_step: usize, dst: &mut [u8], dst_step: usize, len: usize, radius: usize) {
    let at = |i: usize, c: usize| src[i * src_step + c] as u32;

    let mut sums = [0u32; CHANNELS];
    let initial = radius.min(len - 1);
    for i in 0..=initial {
        for (c, sum) in sums.iter_mut().enumerate() {
            *sum += at(i, c);
        }
    }
    let mut count = (initial + 1) as u32;

    for i in 0..len {
        let o = i * dst_step;
        for (c, sum) in sums.iter().enumerate() {
            dst[o + c] = rounded_mean(*sum, count);
        }

        let entering = i + radius + 1;
        if entering < len {
            for (c, sum) in sums.iter_mut().enumerate() {
                *sum += at(entering, c);
            }
            count += 1;
        }
        if i >= radius {
            let leaving = i - radius;
            for (c, sum) in sums.iter_mut().enumerate() {
                *sum -= at(leaving, c);
            }
            count -= 1;
        }
    }
}

/// `sum / count` rounded to nearest, exact halves to the even neighbour.
fn rounded_mean(sum: u32, count: u32) -> u8 {
    let quotient = sum / count;
    let twice_rem = (sum % count) * 2;
    let up = twice_rem > count || (twice_rem == count && quotient % 2 == 1);
    (quotient + up as u32) as u8
}
