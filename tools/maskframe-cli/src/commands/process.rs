//! Mask a video and write the result.

use std::path::{Path, PathBuf};

use maskframe_common::config::AppConfig;
use maskframe_media::{FfmpegHost, FfmpegOptions};

use super::{build_session, print_rects, MaskArgs};

/// Per-run capture overrides.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides {
    pub fps: Option<u32>,
    pub no_transcode: bool,
    pub realtime: bool,
}

pub async fn run(
    config: &AppConfig,
    input: PathBuf,
    masks: MaskArgs,
    overrides: Overrides,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut config = config.clone();
    if let Some(fps) = overrides.fps {
        anyhow::ensure!(fps > 0, "--fps must be positive");
        config.capture.fps = fps;
    }
    if overrides.no_transcode {
        config.capture.transcode_to_preferred = false;
    }
    if overrides.realtime {
        config.capture.realtime_pacing = true;
    }

    let mut host = FfmpegHost::open(&input, FfmpegOptions::from(&config.capture))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open {}: {e}", input.display()))?;
    let mut session = build_session(&config, host.source().clone(), &masks)?;

    let settings = session.settings();
    println!("Processing: {}", input.display());
    println!(
        "  Effect: {} (intensity {}){}",
        settings.mask_type,
        settings.intensity,
        if settings.remove_audio {
            ", audio removed"
        } else {
            ""
        }
    );
    println!("  Masks: {}", session.masks().len());
    print_rects("mask", session.masks());

    let artifact = session
        .process(&mut host)
        .await
        .map_err(|e| anyhow::anyhow!("Processing failed: {e}"))?;
    let filename = artifact.filename();
    let container = artifact.container();
    let frames = artifact.frames();
    let duration = artifact.duration_secs();
    let bytes = artifact.len();

    let target = resolve_output(output, &config.output_dir, &filename, container.extension());
    if let Some(artifact) = session.output() {
        artifact
            .write_to(&target)
            .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", target.display()))?;
    }

    let stats = session.stats();
    println!();
    println!("[OK] Wrote {}", target.display());
    println!("  Container: {} ({})", container.mime_type(), container.extension());
    println!("  Frames: {frames} ({duration:.2}s)");
    println!("  Size: {bytes} bytes");
    println!(
        "  Passes: {}, dropped frames: {} ({:.1}%)",
        stats.passes,
        stats.frames_dropped,
        stats.drop_rate()
    );
    Ok(())
}

/// Pick the output path. An explicit path whose extension disagrees with
/// the produced container is corrected so the file opens as what it is.
fn resolve_output(
    explicit: Option<PathBuf>,
    output_dir: &Path,
    filename: &str,
    extension: &str,
) -> PathBuf {
    match explicit {
        None => output_dir.join(filename),
        Some(path) => {
            let matches = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(extension));
            if matches {
                path
            } else {
                let fixed = path.with_extension(extension);
                tracing::warn!(
                    requested = %path.display(),
                    written = %fixed.display(),
                    "Output extension does not match the container"
                );
                fixed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_uses_artifact_name() {
        let path = resolve_output(None, Path::new("/out"), "masked-video.webm", "webm");
        assert_eq!(path, PathBuf::from("/out/masked-video.webm"));
    }

    #[test]
    fn test_explicit_output_extension_is_corrected() {
        let keep = resolve_output(Some("clip.MP4".into()), Path::new("."), "x.mp4", "mp4");
        assert_eq!(keep, PathBuf::from("clip.MP4"));
        let fixed = resolve_output(Some("clip.mp4".into()), Path::new("."), "x.webm", "webm");
        assert_eq!(fixed, PathBuf::from("clip.webm"));
        let bare = resolve_output(Some("clip".into()), Path::new("."), "x.mp4", "mp4");
        assert_eq!(bare, PathBuf::from("clip.mp4"));
    }
}
