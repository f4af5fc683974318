//! Ordered mask collection.
//!
//! Insertion order is application order: the renderer applies masks
//! front to back, each one reading the output of the previous.

use maskframe_common::error::{MaskframeError, MaskframeResult};
use serde::{Deserialize, Serialize};

use crate::rect::Rect;

/// Ordered, index-addressable sequence of mask rectangles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaskSet {
    masks: Vec<Rect>,
}

impl MaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a mask. Size filtering is the caller's responsibility.
    pub fn add(&mut self, rect: Rect) {
        self.masks.push(rect);
    }

    /// Admit a rectangle produced by the drawing surface.
    ///
    /// Rectangles with either edge at or below `min_size` are discarded.
    /// Accepted rectangles are clipped to the frame when its size is known.
    /// Returns the index of the new mask.
    pub fn add_drawn(
        &mut self,
        rect: Rect,
        min_size: f64,
        frame: Option<(f64, f64)>,
    ) -> Option<usize> {
        if !rect.is_finite() || !rect.exceeds(min_size) {
            tracing::debug!(?rect, min_size, "Discarding undersized mask");
            return None;
        }

        let rect = match frame {
            Some((w, h)) => rect.clamp_to(w, h),
            None => rect,
        };
        if rect.area() <= 0.0 {
            tracing::debug!(?rect, "Discarding mask outside the frame");
            return None;
        }

        self.masks.push(rect);
        Some(self.masks.len() - 1)
    }

    /// Remove the mask at `index`, preserving the order of the rest.
    pub fn remove_at(&mut self, index: usize) -> MaskframeResult<Rect> {
        if index >= self.masks.len() {
            return Err(MaskframeError::InvalidIndex {
                index,
                len: self.masks.len(),
            });
        }
        Ok(self.masks.remove(index))
    }

    pub fn clear(&mut self) {
        self.masks.clear();
    }

    pub fn len(&self) -> usize {
        self.masks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Rect> {
        self.masks.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rect> {
        self.masks.iter()
    }

    pub fn as_slice(&self) -> &[Rect] {
        &self.masks
    }
}

impl FromIterator<Rect> for MaskSet {
    fn from_iter<I: IntoIterator<Item = Rect>>(iter: I) -> Self {
        Self {
            masks: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a MaskSet {
    type Item = &'a Rect;
    type IntoIter = std::slice::Iter<'a, Rect>;

    fn into_iter(self) -> Self::IntoIter {
        self.masks.iter()
    }
}

#[cfg(test)]
mod tests {
    use maskframe_common::error::ErrorKind;
    use proptest::prelude::*;

    use super::*;
    use crate::rect::MIN_MASK_SIZE;

    #[test]
    fn test_remove_preserves_order() {
        let mut set: MaskSet = (0..4)
            .map(|i| Rect::new(i as f64 * 10.0, 0.0, 8.0, 8.0))
            .collect();
        let removed = set.remove_at(1).unwrap();
        assert_eq!(removed.x, 10.0);
        let xs: Vec<f64> = set.iter().map(|r| r.x).collect();
        assert_eq!(xs, vec![0.0, 20.0, 30.0]);
    }

    #[test]
    fn test_remove_out_of_bounds() {
        let mut set = MaskSet::new();
        set.add(Rect::new(0.0, 0.0, 10.0, 10.0));
        let err = set.remove_at(1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidIndex);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut set = MaskSet::new();
        set.add(Rect::new(0.0, 0.0, 10.0, 10.0));
        set.add(Rect::new(0.0, 0.0, 10.0, 10.0));
        set.clear();
        assert!(set.is_empty());
    }

    #[test]
    fn test_overlapping_masks_are_kept() {
        let mut set = MaskSet::new();
        let rect = Rect::new(1.0, 1.0, 10.0, 10.0);
        set.add(rect);
        set.add(rect);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_add_drawn_clips_to_frame() {
        let mut set = MaskSet::new();
        let idx = set.add_drawn(
            Rect::new(90.0, 90.0, 20.0, 20.0),
            MIN_MASK_SIZE,
            Some((100.0, 100.0)),
        );
        assert_eq!(idx, Some(0));
        assert_eq!(set.get(0), Some(&Rect::new(90.0, 90.0, 10.0, 10.0)));
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let set: MaskSet = vec![Rect::new(1.0, 2.0, 30.0, 40.0)].into_iter().collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"[{"x":1.0,"y":2.0,"width":30.0,"height":40.0}]"#);
    }

    proptest! {
        #[test]
        fn drawn_rects_above_threshold_are_added_once(
            x in 0.0f64..50.0,
            y in 0.0f64..50.0,
            w in 5.01f64..50.0,
            h in 5.01f64..50.0,
            existing in 0usize..4,
        ) {
            let mut set: MaskSet = (0..existing)
                .map(|_| Rect::new(0.0, 0.0, 10.0, 10.0))
                .collect();
            let rect = Rect::new(x, y, w, h);
            let idx = set.add_drawn(rect, MIN_MASK_SIZE, Some((100.0, 100.0)));
            prop_assert_eq!(idx, Some(existing));
            prop_assert_eq!(set.len(), existing + 1);
            prop_assert_eq!(set.get(existing), Some(&rect));
        }

        #[test]
        fn drawn_rects_at_or_below_threshold_are_discarded(
            x in 0.0f64..50.0,
            y in 0.0f64..50.0,
            small in 0.0f64..=5.0,
            other in 0.0f64..50.0,
            small_is_width in any::<bool>(),
        ) {
            let mut set = MaskSet::new();
            let rect = if small_is_width {
                Rect::new(x, y, small, other)
            } else {
                Rect::new(x, y, other, small)
            };
            prop_assert_eq!(set.add_drawn(rect, MIN_MASK_SIZE, Some((100.0, 100.0))), None);
            prop_assert!(set.is_empty());
        }
    }
}
