//! Display-space to native-space coordinate mapping.
//!
//! The drawing surface is laid out at some on-screen size while masks are
//! stored in the source's native pixel space. Pointer positions are
//! remapped here before a rectangle is admitted into the mask set.

use serde::{Deserialize, Serialize};

use crate::rect::Rect;

/// A width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Linear mapping from the displayed surface to native frame pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayMapping {
    native: Size,
    display: Size,
}

impl DisplayMapping {
    /// Returns `None` if either size is degenerate.
    pub fn new(native: Size, display: Size) -> Option<Self> {
        let valid = |s: Size| s.width > 0.0 && s.height > 0.0 && s.width.is_finite() && s.height.is_finite();
        if !valid(native) || !valid(display) {
            return None;
        }
        Some(Self { native, display })
    }

    /// Mapping for a surface shown at native size.
    pub fn identity(native: Size) -> Option<Self> {
        Self::new(native, native)
    }

    pub fn scale_x(&self) -> f64 {
        self.native.width / self.display.width
    }

    pub fn scale_y(&self) -> f64 {
        self.native.height / self.display.height
    }

    /// Map a point relative to the surface's top-left corner.
    pub fn to_native(&self, x: f64, y: f64) -> (f64, f64) {
        (x * self.scale_x(), y * self.scale_y())
    }

    /// Map a display-space rectangle into native pixels.
    pub fn rect_to_native(&self, rect: &Rect) -> Rect {
        let (x, y) = self.to_native(rect.x, rect.y);
        Rect::new(x, y, rect.width * self.scale_x(), rect.height * self.scale_y())
    }

    pub fn native(&self) -> Size {
        self.native
    }
}

/// A pointer drag in progress on the drawing surface, in native pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragGesture {
    start: (f64, f64),
    current: (f64, f64),
}

impl DragGesture {
    pub fn begin(x: f64, y: f64) -> Self {
        Self {
            start: (x, y),
            current: (x, y),
        }
    }

    pub fn update(&mut self, x: f64, y: f64) {
        self.current = (x, y);
    }

    /// The rectangle spanned so far; dragging up or left is allowed.
    pub fn rect(&self) -> Rect {
        Rect::from_corners(self.start.0, self.start.1, self.current.0, self.current.1)
    }

    /// Finish the drag and return the spanned rectangle.
    pub fn finish(self) -> Rect {
        self.rect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_scales_each_axis() {
        let mapping =
            DisplayMapping::new(Size::new(1920.0, 1080.0), Size::new(960.0, 360.0)).unwrap();
        assert_eq!(mapping.to_native(100.0, 100.0), (200.0, 300.0));
        let rect = mapping.rect_to_native(&Rect::new(10.0, 10.0, 20.0, 20.0));
        assert_eq!(rect, Rect::new(20.0, 30.0, 40.0, 60.0));
    }

    #[test]
    fn test_mapping_rejects_degenerate_sizes() {
        assert!(DisplayMapping::new(Size::new(0.0, 10.0), Size::new(10.0, 10.0)).is_none());
        assert!(DisplayMapping::new(Size::new(10.0, 10.0), Size::new(10.0, f64::NAN)).is_none());
    }

    #[test]
    fn test_identity_mapping() {
        let mapping = DisplayMapping::identity(Size::new(640.0, 480.0)).unwrap();
        assert_eq!(mapping.to_native(12.5, 7.0), (12.5, 7.0));
    }

    #[test]
    fn test_drag_up_and_left() {
        let mut drag = DragGesture::begin(50.0, 50.0);
        drag.update(20.0, 10.0);
        assert_eq!(drag.finish(), Rect::new(20.0, 10.0, 30.0, 40.0));
    }
}
