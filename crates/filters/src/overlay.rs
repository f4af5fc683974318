//! Mask overlay drawing for previews.
//!
//! Each mask is shown as a translucent red fill with a solid red outline
//! straddling its edges. The overlay is drawn on a copy of the frame and
//! never reaches the encoder.

use maskframe_model::Rect;

use crate::frame::FrameBuffer;

/// Fill colour, non-premultiplied.
pub const OVERLAY_FILL: [u8; 3] = [255, 0, 0];
/// Fill opacity, 0.3 quantized to 8 bits.
pub const OVERLAY_ALPHA: u8 = 77;
/// Outline colour.
pub const OVERLAY_STROKE: [u8; 4] = [255, 0, 0, 255];
/// Outline width in pixels, centred on the rectangle edge.
pub const OVERLAY_STROKE_WIDTH: f64 = 2.0;

/// Paint every mask outline onto `frame`.
pub fn draw_mask_overlay<'a>(frame: &mut FrameBuffer, masks: impl IntoIterator<Item = &'a Rect>) {
    for rect in masks {
        fill_translucent(frame, rect);
        stroke(frame, rect);
    }
}

fn fill_translucent(frame: &mut FrameBuffer, rect: &Rect) {
    let b = rect.pixel_bounds(frame.width(), frame.height());
    for y in b.y..b.y + b.height {
        for x in b.x..b.x + b.width {
            let px = frame.pixel(x, y);
            frame.set_pixel(x, y, blend_over(px));
        }
    }
}

/// Source-over composite of the overlay fill onto one pixel.
fn blend_over(dst: [u8; 4]) -> [u8; 4] {
    let sa = OVERLAY_ALPHA as u32;
    // Destination weight and output alpha, both scaled by 255 * 255.
    let dst_weight = dst[3] as u32 * (255 - sa);
    let out_alpha = sa * 255 + dst_weight;
    let channel = |s: u8, d: u8| -> u8 {
        ((s as u32 * sa * 255 + d as u32 * dst_weight + out_alpha / 2) / out_alpha) as u8
    };
    [
        channel(OVERLAY_FILL[0], dst[0]),
        channel(OVERLAY_FILL[1], dst[1]),
        channel(OVERLAY_FILL[2], dst[2]),
        ((out_alpha + 127) / 255) as u8,
    ]
}

fn stroke(frame: &mut FrameBuffer, rect: &Rect) {
    let half = OVERLAY_STROKE_WIDTH / 2.0;
    let outer = Rect::new(
        rect.x - half,
        rect.y - half,
        rect.width + OVERLAY_STROKE_WIDTH,
        rect.height + OVERLAY_STROKE_WIDTH,
    )
    .pixel_bounds(frame.width(), frame.height());

    // Pixels fully inside the inner edge of the outline are left alone.
    let inner_x0 = (rect.x + half).ceil();
    let inner_y0 = (rect.y + half).ceil();
    let inner_x1 = (rect.right() - half).floor();
    let inner_y1 = (rect.bottom() - half).floor();
    let interior = |x: usize, y: usize| {
        let (xf, yf) = (x as f64, y as f64);
        xf >= inner_x0 && xf < inner_x1 && yf >= inner_y0 && yf < inner_y1
    };

    for y in outer.y..outer.y + outer.height {
        for x in outer.x..outer.x + outer.width {
            if !interior(x, y) {
                frame.set_pixel(x, y, OVERLAY_STROKE);
            }
        }
    }
}
