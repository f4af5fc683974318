//! Runs the real ffmpeg host when ffmpeg and ffprobe are installed.

use std::path::PathBuf;
use std::process::Command;

use maskframe_capture::MaskerSession;
use maskframe_media::{command_exists, probe_source, snapshot_frame, FfmpegHost, FfmpegOptions};

fn tools_available() -> bool {
    let ok = command_exists("ffmpeg") && command_exists("ffprobe");
    if !ok {
        eprintln!("ffmpeg/ffprobe not found; skipping");
    }
    ok
}

/// One second of 64x48 test pattern at 10 fps with a sine audio track.
fn generate_source(name: &str) -> Option<PathBuf> {
    let path = std::env::temp_dir().join(format!("maskframe-test-{}-{name}.mkv", std::process::id()));
    let status = Command::new("ffmpeg")
        .args([
            "-hide_banner",
            "-v",
            "error",
            "-y",
            "-f",
            "lavfi",
            "-i",
            "testsrc=size=64x48:rate=10:duration=1",
            "-f",
            "lavfi",
            "-i",
            "sine=frequency=440:duration=1",
            "-c:v",
            "ffv1",
            "-c:a",
            "pcm_s16le",
            "-shortest",
        ])
        .arg(&path)
        .status()
        .ok()?;
    status.success().then_some(path)
}

#[tokio::test]
async fn test_probe_and_snapshot() {
    if !tools_available() {
        return;
    }
    let Some(path) = generate_source("probe") else {
        eprintln!("lavfi sources unavailable; skipping");
        return;
    };

    let source = probe_source(&path).await.unwrap();
    assert_eq!((source.width, source.height), (64, 48));
    assert!(source.has_audio);
    assert!((source.frame_rate - 10.0).abs() < 1e-6);
    assert!(source.is_video());

    let frame = snapshot_frame(&source, 0.5).await.unwrap();
    assert_eq!(frame.dimensions(), (64, 48));

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn test_process_with_ffmpeg() {
    if !tools_available() {
        return;
    }
    let Some(path) = generate_source("process") else {
        eprintln!("lavfi sources unavailable; skipping");
        return;
    };

    let mut host = FfmpegHost::open(&path, FfmpegOptions::default()).await.unwrap();
    if host.support().containers().is_empty() {
        eprintln!("ffmpeg build has no usable encoders; skipping");
        let _ = std::fs::remove_file(path);
        return;
    }

    let mut session = MaskerSession::default();
    session.load_source(host.source().clone()).unwrap();
    assert_eq!(session.on_rectangle_drawn(8.0, 8.0, 20.0, 20.0), Some(0));

    let artifact = session.process(&mut host).await.unwrap();
    assert!(!artifact.is_empty());
    assert!((29..=31).contains(&artifact.frames()));
    assert!(host.support().supports(artifact.container()));
    assert!(artifact
        .filename()
        .ends_with(artifact.container().extension()));

    let _ = std::fs::remove_file(path);
}
