//! Single-frame extraction for previews.

use std::process::Stdio;

use maskframe_common::error::{MaskframeError, MaskframeResult};
use maskframe_filters::{FrameBuffer, CHANNELS};
use maskframe_model::SourceVideo;
use tokio::process::Command;

use crate::args::snapshot_args;

/// Latest seek position that still lands on a frame.
pub fn clamp_snapshot_time(source: &SourceVideo, secs: f64) -> f64 {
    let secs = if secs.is_finite() { secs.max(0.0) } else { 0.0 };
    if source.duration_secs <= 0.0 || !source.duration_secs.is_finite() {
        return secs;
    }
    let last_frame = if source.frame_rate > 0.0 {
        (source.duration_secs - 1.0 / source.frame_rate).max(0.0)
    } else {
        source.duration_secs
    };
    secs.min(last_frame)
}

/// Decode the frame shown at `secs` at native resolution.
pub async fn snapshot_frame(source: &SourceVideo, secs: f64) -> MaskframeResult<FrameBuffer> {
    let at = clamp_snapshot_time(source, secs);
    let output = Command::new("ffmpeg")
        .args(snapshot_args(&source.path, at))
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| MaskframeError::media(format!("Failed to start ffmpeg: {e}")))?;
    if !output.status.success() {
        return Err(MaskframeError::media(format!(
            "ffmpeg snapshot failed (status {}): {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let (width, height) = (source.width as usize, source.height as usize);
    let expected = width * height * CHANNELS;
    if output.stdout.len() != expected {
        return Err(MaskframeError::media(format!(
            "snapshot at {at:.3}s returned {} bytes, expected {expected}",
            output.stdout.len()
        )));
    }
    tracing::debug!(source = %source.name(), at, "Captured preview frame");
    FrameBuffer::from_rgba(width, height, output.stdout)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn source(duration_secs: f64, frame_rate: f64) -> SourceVideo {
        SourceVideo {
            path: PathBuf::from("clip.mp4"),
            mime: "video/mp4".to_string(),
            size_bytes: 0,
            duration_secs,
            width: 4,
            height: 4,
            frame_rate,
            has_audio: false,
        }
    }

    #[test]
    fn test_clamp_snapshot_time() {
        let s = source(2.0, 10.0);
        assert_eq!(clamp_snapshot_time(&s, 1.0), 1.0);
        assert!((clamp_snapshot_time(&s, 5.0) - 1.9).abs() < 1e-9);
        assert_eq!(clamp_snapshot_time(&s, -3.0), 0.0);
        assert_eq!(clamp_snapshot_time(&s, f64::NAN), 0.0);
        assert_eq!(clamp_snapshot_time(&source(0.0, 30.0), 7.5), 7.5);
    }
}
