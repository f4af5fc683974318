//! Mask rectangles and their integer pixel footprint.

use serde::{Deserialize, Serialize};

/// Minimum mask edge, in source pixels. Rectangles whose width or height is
/// at or below this value are discarded when drawn.
pub const MIN_MASK_SIZE: f64 = 5.0;

/// An axis-aligned mask rectangle in native frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build the rectangle spanned by two corner points, in any order.
    pub fn from_corners(ax: f64, ay: f64, bx: f64, by: f64) -> Self {
        Self {
            x: ax.min(bx),
            y: ay.min(by),
            width: (bx - ax).abs(),
            height: (by - ay).abs(),
        }
    }

    /// Right edge.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Whether both edges are strictly larger than `min_size`.
    pub fn exceeds(&self, min_size: f64) -> bool {
        self.width > min_size && self.height > min_size
    }

    /// Whether all coordinates are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// Clip the rectangle to `[0, frame_width] x [0, frame_height]`.
    pub fn clamp_to(&self, frame_width: f64, frame_height: f64) -> Rect {
        if self.x >= 0.0
            && self.y >= 0.0
            && self.right() <= frame_width
            && self.bottom() <= frame_height
        {
            return *self;
        }

        let left = self.x.clamp(0.0, frame_width);
        let top = self.y.clamp(0.0, frame_height);
        let right = self.right().clamp(0.0, frame_width);
        let bottom = self.bottom().clamp(0.0, frame_height);
        Rect {
            x: left,
            y: top,
            width: (right - left).max(0.0),
            height: (bottom - top).max(0.0),
        }
    }

    /// Integer pixel footprint inside a `frame_width x frame_height` raster.
    ///
    /// The origin is floored and the extent ceiled, then the result is
    /// clipped against the raster. May be empty.
    pub fn pixel_bounds(&self, frame_width: usize, frame_height: usize) -> PixelBounds {
        if !self.is_finite() {
            return PixelBounds::EMPTY;
        }

        let x0 = self.x.floor();
        let y0 = self.y.floor();
        let x1 = x0 + self.width.max(0.0).ceil();
        let y1 = y0 + self.height.max(0.0).ceil();

        let clip = |v: f64, max: usize| -> usize { v.clamp(0.0, max as f64) as usize };

        let left = clip(x0, frame_width);
        let top = clip(y0, frame_height);
        let right = clip(x1, frame_width);
        let bottom = clip(y1, frame_height);

        PixelBounds {
            x: left,
            y: top,
            width: right.saturating_sub(left),
            height: bottom.saturating_sub(top),
        }
    }
}

/// Integer rectangle inside a raster, always within bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelBounds {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl PixelBounds {
    pub const EMPTY: PixelBounds = PixelBounds {
        x: 0,
        y: 0,
        width: 0,
        height: 0,
    };

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// The shorter edge, used to scale effect parameters.
    pub fn min_side(&self) -> usize {
        self.width.min(self.height)
    }

    pub fn contains(&self, px: usize, py: usize) -> bool {
        px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_corners_normalizes_drag_direction() {
        let rect = Rect::from_corners(40.0, 30.0, 10.0, 5.0);
        assert_eq!(rect, Rect::new(10.0, 5.0, 30.0, 25.0));
    }

    #[test]
    fn test_exceeds_is_strict() {
        assert!(Rect::new(0.0, 0.0, 5.1, 6.0).exceeds(MIN_MASK_SIZE));
        assert!(!Rect::new(0.0, 0.0, 5.0, 60.0).exceeds(MIN_MASK_SIZE));
        assert!(!Rect::new(0.0, 0.0, 60.0, 4.0).exceeds(MIN_MASK_SIZE));
    }

    #[test]
    fn test_pixel_bounds_floors_origin_and_ceils_extent() {
        let bounds = Rect::new(10.6, 3.2, 4.1, 2.0).pixel_bounds(100, 100);
        assert_eq!(
            bounds,
            PixelBounds {
                x: 10,
                y: 3,
                width: 5,
                height: 2
            }
        );
    }

    #[test]
    fn test_pixel_bounds_clips_against_raster() {
        let bounds = Rect::new(-5.0, 90.0, 20.0, 30.0).pixel_bounds(100, 100);
        assert_eq!(
            bounds,
            PixelBounds {
                x: 0,
                y: 90,
                width: 15,
                height: 10
            }
        );

        let outside = Rect::new(150.0, 10.0, 20.0, 20.0).pixel_bounds(100, 100);
        assert!(outside.is_empty());
    }

    #[test]
    fn test_pixel_bounds_zero_area() {
        assert!(Rect::new(5.0, 5.0, 0.0, 10.0)
            .pixel_bounds(100, 100)
            .is_empty());
        assert!(Rect::new(f64::NAN, 5.0, 3.0, 10.0)
            .pixel_bounds(100, 100)
            .is_empty());
    }

    #[test]
    fn test_clamp_to_frame() {
        let rect = Rect::new(90.0, -10.0, 30.0, 30.0).clamp_to(100.0, 100.0);
        assert_eq!(rect, Rect::new(90.0, 0.0, 10.0, 20.0));
    }
}
