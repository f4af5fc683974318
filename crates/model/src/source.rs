//! Source video metadata.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Bitrate used when the source size or duration is unknown.
pub const FALLBACK_BITRATE_BPS: u64 = 8_000_000;

/// Metadata for the loaded source video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceVideo {
    pub path: PathBuf,

    /// MIME type as reported by the host or derived from the extension.
    pub mime: String,

    pub size_bytes: u64,
    pub duration_secs: f64,

    /// Native pixel dimensions.
    pub width: u32,
    pub height: u32,

    pub frame_rate: f64,
    pub has_audio: bool,
}

impl SourceVideo {
    /// Display name of the file.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn is_video(&self) -> bool {
        is_video_mime(&self.mime)
    }

    /// Native frame size as floats, for clamping drawn rectangles.
    pub fn frame_size(&self) -> (f64, f64) {
        (self.width as f64, self.height as f64)
    }

    /// Capture quality target in bits per second.
    pub fn estimated_bitrate_bps(&self) -> u64 {
        estimated_bitrate_bps(self.size_bytes, self.duration_secs, FALLBACK_BITRATE_BPS)
    }
}

/// `size * 8 / duration`, or `fallback` when either input is unusable.
pub fn estimated_bitrate_bps(size_bytes: u64, duration_secs: f64, fallback: u64) -> u64 {
    if size_bytes == 0 || !duration_secs.is_finite() || duration_secs <= 0.0 {
        return fallback;
    }
    let bps = (size_bytes as f64 * 8.0 / duration_secs).round() as u64;
    if bps == 0 {
        fallback
    } else {
        bps
    }
}

/// Whether a MIME type names a video.
pub fn is_video_mime(mime: &str) -> bool {
    mime.trim().to_ascii_lowercase().starts_with("video/")
}

/// Best-effort MIME type from a file extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "ogv" => "video/ogg",
        "mpeg" | "mpg" => "video/mpeg",
        "ts" => "video/mp2t",
        "3gp" => "video/3gpp",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "txt" => "text/plain",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}

/// Format seconds as `MM:SS`, with minutes allowed past 59.
pub fn format_time(secs: f64) -> String {
    let total = if secs.is_finite() && secs > 0.0 {
        secs.floor() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SourceVideo {
        SourceVideo {
            path: PathBuf::from("/tmp/clip.mp4"),
            mime: "video/mp4".into(),
            size_bytes: 2_000_000,
            duration_secs: 4.0,
            width: 1280,
            height: 720,
            frame_rate: 30.0,
            has_audio: true,
        }
    }

    #[test]
    fn test_bitrate_estimate() {
        assert_eq!(sample().estimated_bitrate_bps(), 4_000_000);
    }

    #[test]
    fn test_bitrate_falls_back_without_duration() {
        let mut source = sample();
        source.duration_secs = 0.0;
        assert_eq!(source.estimated_bitrate_bps(), FALLBACK_BITRATE_BPS);
        assert_eq!(estimated_bitrate_bps(0, 3.0, 42), 42);
        assert_eq!(estimated_bitrate_bps(10, f64::NAN, 42), 42);
    }

    #[test]
    fn test_video_mime_detection() {
        assert!(is_video_mime("video/webm"));
        assert!(is_video_mime("Video/MP4"));
        assert!(!is_video_mime("image/png"));
        assert!(!is_video_mime(""));
    }

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path(Path::new("a/b/Clip.MOV")), "video/quicktime");
        assert_eq!(mime_for_path(Path::new("notes.txt")), "text/plain");
        assert_eq!(mime_for_path(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn test_name_and_frame_size() {
        let source = sample();
        assert_eq!(source.name(), "clip.mp4");
        assert_eq!(source.frame_size(), (1280.0, 720.0));
        assert!(source.is_video());
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "00:00");
        assert_eq!(format_time(65.9), "01:05");
        assert_eq!(format_time(3725.0), "62:05");
        assert_eq!(format_time(f64::NAN), "00:00");
    }
}
