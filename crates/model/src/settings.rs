//! User-settable mask parameters.

use std::fmt;
use std::str::FromStr;

use maskframe_common::error::MaskframeError;
use serde::{Deserialize, Serialize};

/// Lowest accepted effect intensity.
pub const MIN_INTENSITY: u8 = 1;
/// Highest accepted effect intensity.
pub const MAX_INTENSITY: u8 = 20;

/// How a masked region is obscured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaskType {
    /// Two-pass separable box blur.
    Blur,
    /// Block averaging.
    Pixelate,
    /// Opaque black fill.
    #[default]
    Solid,
}

impl MaskType {
    pub const ALL: [MaskType; 3] = [MaskType::Blur, MaskType::Pixelate, MaskType::Solid];

    pub fn as_str(self) -> &'static str {
        match self {
            MaskType::Blur => "blur",
            MaskType::Pixelate => "pixelate",
            MaskType::Solid => "solid",
        }
    }

    /// Whether the intensity setting has any effect.
    pub fn uses_intensity(self) -> bool {
        !matches!(self, MaskType::Solid)
    }
}

impl fmt::Display for MaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaskType {
    type Err = MaskframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blur" => Ok(MaskType::Blur),
            "pixelate" | "pixel" => Ok(MaskType::Pixelate),
            "solid" | "fill" => Ok(MaskType::Solid),
            other => Err(MaskframeError::config(format!(
                "Unknown mask type: {other}. Use: blur, pixelate, solid"
            ))),
        }
    }
}

/// Effect kind, intensity and audio handling for one processing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskSettings {
    pub mask_type: MaskType,

    /// Effect strength in `[1, 20]`; ignored for solid masks.
    pub intensity: u8,

    /// Strip the audio track from the output.
    pub remove_audio: bool,
}

impl MaskSettings {
    pub fn new(mask_type: MaskType, intensity: u8, remove_audio: bool) -> Self {
        Self {
            mask_type,
            intensity: clamp_intensity(intensity),
            remove_audio,
        }
    }

    /// Copy with the intensity forced into the accepted range.
    pub fn normalized(self) -> Self {
        Self {
            intensity: clamp_intensity(self.intensity),
            ..self
        }
    }
}

impl Default for MaskSettings {
    fn default() -> Self {
        Self {
            mask_type: MaskType::Solid,
            intensity: 10,
            remove_audio: false,
        }
    }
}

pub fn clamp_intensity(intensity: u8) -> u8 {
    intensity.clamp(MIN_INTENSITY, MAX_INTENSITY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = MaskSettings::default();
        assert_eq!(settings.mask_type, MaskType::Solid);
        assert!(!settings.remove_audio);
    }

    #[test]
    fn test_intensity_is_clamped() {
        assert_eq!(MaskSettings::new(MaskType::Blur, 0, false).intensity, 1);
        assert_eq!(MaskSettings::new(MaskType::Blur, 99, false).intensity, 20);
        let raw = MaskSettings {
            intensity: 42,
            ..MaskSettings::default()
        };
        assert_eq!(raw.normalized().intensity, 20);
    }

    #[test]
    fn test_mask_type_parsing() {
        assert_eq!("Blur".parse::<MaskType>().unwrap(), MaskType::Blur);
        assert_eq!("pixelate".parse::<MaskType>().unwrap(), MaskType::Pixelate);
        assert!("sepia".parse::<MaskType>().is_err());
        for kind in MaskType::ALL {
            assert_eq!(kind.as_str().parse::<MaskType>().unwrap(), kind);
        }
    }

    #[test]
    fn test_settings_serde_uses_lowercase_names() {
        let json = serde_json::to_string(&MaskSettings::new(MaskType::Pixelate, 7, true)).unwrap();
        assert!(json.contains(r#""mask_type":"pixelate""#));
        let parsed: MaskSettings = serde_json::from_str(r#"{"mask_type":"blur"}"#).unwrap();
        assert_eq!(parsed.mask_type, MaskType::Blur);
        assert_eq!(parsed.intensity, 10);
    }
}
