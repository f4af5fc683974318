//! Mask effect dispatch.

use maskframe_model::{MaskSettings, MaskType, Rect};

use crate::blur::blur;
use crate::frame::{FrameBuffer, BLACK};
use crate::pixelate::pixelate;
use crate::solid::fill_solid;

/// A fully-resolved region transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskEffect {
    Solid { rgba: [u8; 4] },
    Pixelate { intensity: u8 },
    Blur { intensity: u8 },
}

impl MaskEffect {
    pub fn from_settings(settings: &MaskSettings) -> Self {
        match settings.mask_type {
            MaskType::Solid => MaskEffect::Solid { rgba: BLACK },
            MaskType::Pixelate => MaskEffect::Pixelate {
                intensity: settings.intensity,
            },
            MaskType::Blur => MaskEffect::Blur {
                intensity: settings.intensity,
            },
        }
    }

    /// Apply this effect to `rect`, clipped to the frame. Zero-area regions
    /// are left alone. `scratch` holds blur intermediates between calls.
    pub fn apply(&self, frame: &mut FrameBuffer, rect: &Rect, scratch: &mut Vec<u8>) {
        let bounds = rect.pixel_bounds(frame.width(), frame.height());
        if bounds.is_empty() {
            return;
        }
        match *self {
            MaskEffect::Solid { rgba } => fill_solid(frame, bounds, rgba),
            MaskEffect::Pixelate { intensity } => pixelate(frame, bounds, intensity),
            MaskEffect::Blur { intensity } => blur(frame, bounds, intensity, scratch),
        }
    }
}

impl From<&MaskSettings> for MaskEffect {
    fn from(settings: &MaskSettings) -> Self {
        Self::from_settings(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_settings() {
        let solid = MaskSettings::new(MaskType::Solid, 17, false);
        assert_eq!(MaskEffect::from(&solid), MaskEffect::Solid { rgba: BLACK });

        let blur = MaskSettings::new(MaskType::Blur, 40, false);
        assert_eq!(
            MaskEffect::from_settings(&blur),
            MaskEffect::Blur { intensity: 20 }
        );
    }

    #[test]
    fn test_apply_clips_out_of_bounds_rect() {
        let mut frame = FrameBuffer::filled(10, 10, [9, 9, 9, 255]);
        let mut scratch = Vec::new();
        MaskEffect::Solid { rgba: BLACK }.apply(
            &mut frame,
            &Rect::new(8.0, -3.0, 10.0, 5.0),
            &mut scratch,
        );
        assert_eq!(frame.pixel(9, 0), BLACK);
        assert_eq!(frame.pixel(8, 1), BLACK);
        assert_eq!(frame.pixel(7, 0), [9, 9, 9, 255]);
        assert_eq!(frame.pixel(9, 2), [9, 9, 9, 255]);
    }

    #[test]
    fn test_apply_zero_area_is_noop() {
        let mut frame = FrameBuffer::filled(10, 10, [9, 9, 9, 255]);
        let before = frame.clone();
        let mut scratch = Vec::new();
        MaskEffect::Pixelate { intensity: 10 }.apply(
            &mut frame,
            &Rect::new(3.0, 3.0, 0.0, 4.0),
            &mut scratch,
        );
        assert_eq!(frame, before);
    }
}
