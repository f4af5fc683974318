//! Frame renderer: decoded frame in, masked frame out.

use maskframe_model::{MaskSet, MaskSettings};

use crate::effect::MaskEffect;
use crate::frame::FrameBuffer;

/// Applies a mask set to decoded frames.
///
/// Masks are applied in set order and each one reads the output of the one
/// before it, so overlapping blur/pixelate masks compose sequentially.
#[derive(Debug, Default)]
pub struct FrameRenderer {
    scratch: Vec<u8>,
    rendered: u64,
}

impl FrameRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy `source` into a fresh buffer and mask it.
    pub fn render(
        &mut self,
        source: &FrameBuffer,
        masks: &MaskSet,
        settings: &MaskSettings,
    ) -> FrameBuffer {
        let mut frame = source.clone();
        self.apply_masks(&mut frame, masks, settings);
        frame
    }

    /// Copy `source` into `target` (reusing its allocation) and mask it.
    pub fn render_into(
        &mut self,
        source: &FrameBuffer,
        masks: &MaskSet,
        settings: &MaskSettings,
        target: &mut FrameBuffer,
    ) {
        target.copy_from(source);
        self.apply_masks(target, masks, settings);
    }

    /// Mask `frame` in place.
    pub fn apply_masks(&mut self, frame: &mut FrameBuffer, masks: &MaskSet, settings: &MaskSettings) {
        let effect = MaskEffect::from_settings(&settings.normalized());
        for rect in masks {
            effect.apply(frame, rect, &mut self.scratch);
        }
        self.rendered += 1;
        if self.rendered == 1 {
            tracing::debug!(
                masks = masks.len(),
                effect = ?effect,
                width = frame.width(),
                height = frame.height(),
                "Rendering first masked frame"
            );
        }
    }

    /// Frames rendered so far.
    pub fn frames_rendered(&self) -> u64 {
        self.rendered
    }
}
