//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory where processed videos are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Default mask settings.
    #[serde(default)]
    pub masking: MaskingDefaults,

    /// Default capture/encode settings.
    #[serde(default)]
    pub capture: CaptureDefaults,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Default mask parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskingDefaults {
    /// Default effect: "blur", "pixelate" or "solid".
    pub mask_type: String,

    /// Default effect intensity, 1..=20.
    pub intensity: u8,

    /// Whether to strip the audio track by default.
    pub remove_audio: bool,

    /// Rectangles at or below this size (source pixels) on either axis are discarded.
    pub min_mask_size: f64,
}

/// Default capture stream and encoder parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureDefaults {
    /// Fixed frame rate of the output capture stream.
    pub fps: u32,

    /// Size of the encoder output chunks delivered to the pipeline.
    pub chunk_bytes: usize,

    /// Bitrate used when the source size/duration cannot produce an estimate.
    pub fallback_bitrate_bps: u64,

    /// Re-encode into the preferred container when a fallback one was used.
    pub transcode_to_preferred: bool,

    /// Decode the source at its native playback speed.
    pub realtime_pacing: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "maskframe_capture=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            masking: MaskingDefaults::default(),
            capture: CaptureDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for MaskingDefaults {
    fn default() -> Self {
        Self {
            mask_type: "solid".to_string(),
            intensity: 10,
            remove_audio: false,
            min_mask_size: 5.0,
        }
    }
}

impl Default for CaptureDefaults {
    fn default() -> Self {
        Self {
            fps: 30,
            chunk_bytes: 256 * 1024,
            fallback_bitrate_bps: 8_000_000,
            transcode_to_preferred: true,
            realtime_pacing: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("maskframe").join("config.json")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_surface() {
        let config = AppConfig::default();
        assert_eq!(config.masking.mask_type, "solid");
        assert_eq!(config.masking.intensity, 10);
        assert!(!config.masking.remove_audio);
        assert_eq!(config.capture.fps, 30);
        assert_eq!(config.capture.fallback_bitrate_bps, 8_000_000);
    }

    #[test]
    fn partial_config_fills_missing_sections() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "masking": { "mask_type": "blur" } }"#).unwrap();
        assert_eq!(config.masking.mask_type, "blur");
        assert_eq!(config.masking.intensity, 10);
        assert_eq!(config.capture.chunk_bytes, 256 * 1024);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.output_dir, PathBuf::from("."));
    }
}
