//! Source inspection through ffprobe, and tool discovery.

use std::path::Path;
use std::process::Stdio;

use maskframe_common::error::{MaskframeError, MaskframeResult};
use maskframe_model::{mime_for_path, SourceVideo};
use serde::Deserialize;
use tokio::process::Command;

use crate::args::EncoderSupport;

/// Frame rate assumed when the stream does not declare one.
pub const DEFAULT_FRAME_RATE: f64 = 30.0;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
    size: Option<String>,
}

/// Whether `binary` resolves on `PATH`.
pub fn command_exists(binary: &str) -> bool {
    std::process::Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Parse an ffprobe rational such as `30000/1001`.
pub fn parse_frame_rate(raw: &str) -> Option<f64> {
    let rate = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.trim().parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

fn parse_secs(raw: Option<&str>) -> Option<f64> {
    raw?.trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d > 0.0)
}

/// Build source metadata from `ffprobe -of json -show_format -show_streams`
/// output. `file_size` is used when the format block has no size.
pub fn parse_probe(path: &Path, json: &str, file_size: u64) -> MaskframeResult<SourceVideo> {
    let probe: ProbeOutput = serde_json::from_str(json)?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| {
            MaskframeError::invalid_input(format!("{} has no video stream", path.display()))
        })?;
    let (width, height) = match (video.width, video.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(MaskframeError::media(format!(
                "{} reports no frame size",
                path.display()
            )))
        }
    };

    let frame_rate = [&video.avg_frame_rate, &video.r_frame_rate]
        .into_iter()
        .flatten()
        .find_map(|r| parse_frame_rate(r))
        .unwrap_or(DEFAULT_FRAME_RATE);
    let format = probe.format.as_ref();
    let duration_secs = parse_secs(format.and_then(|f| f.duration.as_deref()))
        .or_else(|| parse_secs(video.duration.as_deref()))
        .unwrap_or(0.0);
    let size_bytes = format
        .and_then(|f| f.size.as_deref())
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(file_size);
    let has_audio = probe
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(SourceVideo {
        path: path.to_path_buf(),
        mime: mime_for_path(path).to_string(),
        size_bytes,
        duration_secs,
        width,
        height,
        frame_rate,
        has_audio,
    })
}

/// Inspect a video file with ffprobe.
pub async fn probe_source(path: &Path) -> MaskframeResult<SourceVideo> {
    let meta = tokio::fs::metadata(path).await.map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            MaskframeError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            MaskframeError::Io(err)
        }
    })?;

    let output = Command::new("ffprobe")
        .args(["-v", "error", "-of", "json", "-show_format", "-show_streams"])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| MaskframeError::media(format!("Failed to start ffprobe: {e}")))?;
    if !output.status.success() {
        return Err(MaskframeError::media(format!(
            "ffprobe failed on {} (status {}): {}",
            path.display(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let json = String::from_utf8_lossy(&output.stdout);
    let source = parse_probe(path, &json, meta.len())?;
    tracing::debug!(
        path = %path.display(),
        width = source.width,
        height = source.height,
        duration_secs = source.duration_secs,
        frame_rate = source.frame_rate,
        has_audio = source.has_audio,
        "Probed source"
    );
    Ok(source)
}

/// List the encoders the local ffmpeg build provides.
pub async fn probe_encoders() -> MaskframeResult<EncoderSupport> {
    let output = Command::new("ffmpeg")
        .args(["-hide_banner", "-encoders"])
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| MaskframeError::media(format!("Failed to start ffmpeg: {e}")))?;
    if !output.status.success() {
        return Err(MaskframeError::media(format!(
            "ffmpeg -encoders failed (status {})",
            output.status
        )));
    }
    let support = EncoderSupport::parse(&String::from_utf8_lossy(&output.stdout));
    tracing::debug!(encoders = support.len(), containers = ?support.containers(), "Probed ffmpeg encoders");
    Ok(support)
}
