//! Mask plan files.
//!
//! A plan captures everything a user would set up interactively before
//! pressing "process": the effect settings and the rectangles they drew.
//! Rectangles may be given in display space, in which case `display`
//! names the surface size they were drawn on.

use std::path::Path;
use std::str::FromStr;

use maskframe_common::error::{MaskframeError, MaskframeResult};
use serde::{Deserialize, Serialize};

use crate::display::{DisplayMapping, Size};
use crate::mask_set::MaskSet;
use crate::rect::Rect;
use crate::settings::MaskSettings;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaskPlan {
    #[serde(default)]
    pub settings: MaskSettings,

    /// Surface size the rectangles were drawn on. `None` means native pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<Size>,

    #[serde(default)]
    pub masks: Vec<Rect>,
}

/// Result of admitting a plan's rectangles against a concrete frame size.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanOutcome {
    pub masks: MaskSet,
    /// Rectangles rejected by the size threshold or lying outside the frame.
    pub discarded: Vec<Rect>,
}

impl MaskPlan {
    /// Read a plan from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> MaskframeResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MaskframeError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path)?;
        let plan: MaskPlan = serde_json::from_str(&text).map_err(|e| {
            MaskframeError::config(format!("Invalid mask plan {}: {e}", path.display()))
        })?;
        Ok(plan.normalized())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> MaskframeResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Clamp settings into their accepted ranges.
    pub fn normalized(mut self) -> Self {
        self.settings = self.settings.normalized();
        self
    }

    /// Run every rectangle through the drawing-surface admission rules for a
    /// `native` frame, remapping from display space first when needed.
    pub fn admit(&self, native: Size, min_size: f64) -> PlanOutcome {
        let mapping = self
            .display
            .and_then(|display| DisplayMapping::new(native, display));
        if self.display.is_some() && mapping.is_none() {
            tracing::warn!(display = ?self.display, ?native, "Ignoring unusable display size in mask plan");
        }

        let mut outcome = PlanOutcome::default();
        for rect in &self.masks {
            let native_rect = match &mapping {
                Some(m) => m.rect_to_native(rect),
                None => *rect,
            };
            let admitted = outcome.masks.add_drawn(
                native_rect,
                min_size,
                Some((native.width, native.height)),
            );
            if admitted.is_none() {
                outcome.discarded.push(*rect);
            }
        }
        outcome
    }
}

/// Parse an `x,y,w,h` rectangle as given on a command line.
pub fn parse_rect(s: &str) -> MaskframeResult<Rect> {
    Rect::from_str(s)
}

impl FromStr for Rect {
    type Err = MaskframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(MaskframeError::invalid_input(format!(
                "Expected x,y,width,height but got '{s}'"
            )));
        }
        let mut values = [0.0f64; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part.parse::<f64>().map_err(|_| {
                MaskframeError::invalid_input(format!("Not a number: '{part}' in '{s}'"))
            })?;
        }
        let rect = Rect::new(values[0], values[1], values[2], values[3]);
        if !rect.is_finite() || rect.width < 0.0 || rect.height < 0.0 {
            return Err(MaskframeError::invalid_input(format!(
                "Rectangle must be finite with non-negative size: '{s}'"
            )));
        }
        Ok(rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rect::MIN_MASK_SIZE;
    use crate::settings::MaskType;

    #[test]
    fn test_parse_plan_with_defaults() {
        let plan: MaskPlan =
            serde_json::from_str(r#"{"masks":[{"x":1,"y":2,"width":30,"height":40}]}"#).unwrap();
        assert_eq!(plan.settings, MaskSettings::default());
        assert!(plan.display.is_none());
        assert_eq!(plan.masks, vec![Rect::new(1.0, 2.0, 30.0, 40.0)]);
    }

    #[test]
    fn test_admit_applies_threshold_and_clamp() {
        let plan = MaskPlan {
            settings: MaskSettings::new(MaskType::Blur, 5, false),
            display: None,
            masks: vec![
                Rect::new(10.0, 10.0, 20.0, 20.0),
                Rect::new(0.0, 0.0, 5.0, 50.0),
                Rect::new(90.0, 90.0, 30.0, 30.0),
                Rect::new(200.0, 200.0, 30.0, 30.0),
            ],
        };
        let outcome = plan.admit(Size::new(100.0, 100.0), MIN_MASK_SIZE);
        assert_eq!(outcome.masks.len(), 2);
        assert_eq!(outcome.masks.get(1), Some(&Rect::new(90.0, 90.0, 10.0, 10.0)));
        assert_eq!(outcome.discarded.len(), 2);
    }

    #[test]
    fn test_admit_remaps_display_space() {
        let plan = MaskPlan {
            display: Some(Size::new(50.0, 50.0)),
            masks: vec![Rect::new(5.0, 5.0, 10.0, 10.0), Rect::new(0.0, 0.0, 2.5, 2.5)],
            ..MaskPlan::default()
        };
        let outcome = plan.admit(Size::new(100.0, 100.0), MIN_MASK_SIZE);
        assert_eq!(outcome.masks.as_slice(), &[Rect::new(10.0, 10.0, 20.0, 20.0)]);
        assert_eq!(outcome.discarded, vec![Rect::new(0.0, 0.0, 2.5, 2.5)]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = MaskPlan::load("/nonexistent/maskframe/plan.json").unwrap_err();
        assert!(matches!(err, MaskframeError::FileNotFound { .. }));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir()
            .join(format!("maskframe-plan-{}", std::process::id()))
            .join("plan.json");
        let plan = MaskPlan {
            settings: MaskSettings::new(MaskType::Pixelate, 12, true),
            display: Some(Size::new(640.0, 360.0)),
            masks: vec![Rect::new(1.0, 2.0, 30.0, 40.0)],
        };
        plan.save(&path).unwrap();
        let loaded = MaskPlan::load(&path).unwrap();
        assert_eq!(loaded, plan);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_parse_rect() {
        assert_eq!(parse_rect("10, 10,20,20").unwrap(), Rect::new(10.0, 10.0, 20.0, 20.0));
        assert!(parse_rect("1,2,3").is_err());
        assert!(parse_rect("1,2,x,4").is_err());
        assert!(parse_rect("1,2,-3,4").is_err());
    }
}
