//! End-to-end capture runs against the in-memory host.

use maskframe_capture::synthetic::{decode, SyntheticHost, SyntheticSource};
use maskframe_capture::{
    CaptureOptions, CaptureRequest, CaptureSession, ContainerFormat, MaskerSession,
};
use maskframe_common::error::ErrorKind;
use maskframe_filters::{FrameRenderer, BLACK};
use maskframe_model::{MaskSet, MaskSettings, MaskType, Rect};

fn two_second_source(has_audio: bool) -> SyntheticSource {
    SyntheticSource::gradient(100, 100, 30.0, 2.0, has_audio)
}

fn session_with_mask(source: &SyntheticSource, options: CaptureOptions) -> MaskerSession {
    let mut session = MaskerSession::new(options);
    session.load_source(source.describe("clip.mp4")).unwrap();
    assert_eq!(session.on_rectangle_drawn(10.0, 10.0, 20.0, 20.0), Some(0));
    session
}

fn inside_mask(x: usize, y: usize) -> bool {
    (10..30).contains(&x) && (10..30).contains(&y)
}

#[tokio::test]
async fn test_solid_mask_end_to_end() {
    let source = two_second_source(true);
    let mut host = SyntheticHost::new(source.clone());
    let mut session = session_with_mask(&source, CaptureOptions::default());

    let artifact = session.process(&mut host).await.unwrap();
    assert_eq!(artifact.container(), ContainerFormat::Mp4H264Aac);
    assert!(artifact.has_audio());
    let video = decode(artifact.bytes()).unwrap();

    let interval = 1.0 / 30.0;
    assert!((video.duration_secs() - source.duration_secs()).abs() <= interval + 1e-9);
    assert!(video.frames.len().abs_diff(60) <= 1);
    assert!(video.has_audio);

    for (i, frame) in video.frames.iter().enumerate() {
        let original = &source.frames[i.min(source.frames.len() - 1)];
        for y in 0..100 {
            for x in 0..100 {
                if inside_mask(x, y) {
                    assert_eq!(frame.pixel(x, y), BLACK, "frame {i} at ({x},{y})");
                } else {
                    assert_eq!(frame.pixel(x, y), original.pixel(x, y), "frame {i} at ({x},{y})");
                }
            }
        }
    }

    assert_eq!(session.download_filename().as_deref(), Some("masked-video.mp4"));
    assert!(session.controls_enabled());
    assert_eq!(host.calls().stop_encoder, 1);
    assert_eq!(session.stats().passes, 1);
}

#[tokio::test]
async fn test_processing_rewinds_playback() {
    let source = two_second_source(false);
    let mut host = SyntheticHost::new(source.clone());
    let mut session = session_with_mask(&source, CaptureOptions::default());
    assert_eq!(session.seek(1.0), 1.0);

    session.process(&mut host).await.unwrap();
    assert_eq!(session.playback_secs(), 0.0);

    session.seek(1.5);
    let mut failing = SyntheticHost::new(source.clone()).with_supported(&[]);
    assert!(session.process(&mut failing).await.is_err());
    assert_eq!(session.playback_secs(), 0.0);
}

#[tokio::test]
async fn test_remove_audio_without_masks() {
    let source = two_second_source(true);
    let mut host = SyntheticHost::new(source.clone());
    let mut session = MaskerSession::default();
    session.load_source(source.describe("clip.mp4")).unwrap();
    session.set_remove_audio(true);

    let artifact = session.process(&mut host).await.unwrap();
    assert!(!artifact.has_audio());
    let video = decode(artifact.bytes()).unwrap();
    assert!(!video.has_audio);
    assert_eq!(video.frames, source.frames);
    assert_eq!(host.calls().attach_audio, 0);
}

#[tokio::test]
async fn test_silent_source_produces_silent_output() {
    let source = two_second_source(false);
    let mut host = SyntheticHost::new(source.clone());
    let mut session = session_with_mask(&source, CaptureOptions::default());

    let artifact = session.process(&mut host).await.unwrap();
    assert!(!artifact.has_audio());
    assert_eq!(host.calls().attach_audio, 1);
}

#[tokio::test]
async fn test_nothing_to_do_has_no_side_effects() {
    let source = two_second_source(true);
    let mut host = SyntheticHost::new(source.clone());
    let mut session = MaskerSession::default();
    session.load_source(source.describe("clip.mp4")).unwrap();

    let err = session.process(&mut host).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoMasksAndAudioKept);
    assert!(err.is_validation());
    assert!(!host.calls().any_side_effects());
    assert!(session.output().is_none());
    assert!(session.controls_enabled());
}

#[tokio::test]
async fn test_start_while_capturing_is_rejected() {
    let source = two_second_source(true);
    let mut host = SyntheticHost::new(source.clone());
    let masks: MaskSet = vec![Rect::new(10.0, 10.0, 20.0, 20.0)].into_iter().collect();
    let request = CaptureRequest {
        source: source.describe("clip.mp4"),
        masks,
        settings: MaskSettings::default(),
    };

    let mut pipeline = CaptureSession::new(CaptureOptions::default());
    pipeline.start(&mut host, request.clone()).await.unwrap();
    assert_eq!(pipeline.state().name(), "capturing");

    let calls_before = host.calls().clone();
    let err = pipeline.start(&mut host, request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SessionBusy);
    assert_eq!(host.calls(), &calls_before);
    assert_eq!(pipeline.state().name(), "capturing");

    let artifact = pipeline.drive(&mut host).await.unwrap();
    assert_eq!(artifact.frames(), 60);
    assert!(pipeline.is_idle());
}

#[tokio::test]
async fn test_requested_pause_finalizes_early() {
    let source = two_second_source(true);
    let mut host = SyntheticHost::new(source.clone());
    let mut pipeline = CaptureSession::new(CaptureOptions::default());

    let idle_err = pipeline.request_pause(&mut host).await.unwrap_err();
    assert_eq!(idle_err.kind(), ErrorKind::InvalidInput);

    let request = CaptureRequest {
        source: source.describe("clip.mp4"),
        masks: vec![Rect::new(10.0, 10.0, 20.0, 20.0)].into_iter().collect(),
        settings: MaskSettings::default(),
    };
    pipeline.start(&mut host, request).await.unwrap();
    pipeline.request_pause(&mut host).await.unwrap();

    let artifact = pipeline.drive(&mut host).await.unwrap();
    assert_eq!(artifact.frames(), 0);
    assert_eq!(host.calls().pause, 1);
    assert_eq!(host.calls().stop_encoder, 1);
    assert!(pipeline.is_idle());
}

#[tokio::test]
async fn test_drive_without_start_is_rejected() {
    let mut host = SyntheticHost::new(two_second_source(false));
    let mut pipeline = CaptureSession::new(CaptureOptions::default());
    let err = pipeline.drive(&mut host).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[tokio::test]
async fn test_pause_stops_encoder_once() {
    let source = two_second_source(true);
    let mut host = SyntheticHost::new(source.clone()).pause_after(30);
    let mut session = session_with_mask(&source, CaptureOptions::default());

    let artifact = session.process(&mut host).await.unwrap();
    assert_eq!(artifact.frames(), 30);
    assert!(artifact.duration_secs() < source.duration_secs());
    assert_eq!(decode(artifact.bytes()).unwrap().frames.len(), 30);
    assert_eq!(host.calls().stop_encoder, 1);
    assert_eq!(session.stats().encoder_stops, 1);
}

#[tokio::test]
async fn test_rejected_playback_leaves_session_usable() {
    let source = two_second_source(true);
    let mut session = session_with_mask(&source, CaptureOptions::default());

    let mut blocked = SyntheticHost::new(source.clone()).rejecting_playback();
    let err = session.process(&mut blocked).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PlaybackRejected);
    assert!(session.output().is_none());
    assert!(session.controls_enabled());
    assert_eq!(blocked.calls().abort, 1);

    let mut host = SyntheticHost::new(source);
    let artifact = session.process(&mut host).await.unwrap();
    assert_eq!(artifact.frames(), 60);
}

#[tokio::test]
async fn test_mid_capture_failure_exposes_nothing() {
    let source = two_second_source(true);
    let mut session = session_with_mask(&source, CaptureOptions::default());

    let mut ok_host = SyntheticHost::new(source.clone());
    session.process(&mut ok_host).await.unwrap();

    let mut failing = SyntheticHost::new(source.clone()).fail_after(10);
    let err = session.process(&mut failing).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CaptureAborted);
    assert_eq!(failing.calls().abort, 1);
    assert!(session.controls_enabled());
    // The previous complete output is still the one on offer.
    assert_eq!(session.output().map(|a| a.frames()), Some(60));
}

#[tokio::test]
async fn test_no_supported_container() {
    let source = two_second_source(true);
    let mut host = SyntheticHost::new(source.clone()).with_supported(&[]);
    let mut session = session_with_mask(&source, CaptureOptions::default());

    let err = session.process(&mut host).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EncoderUnavailable);
    assert!(!host.calls().any_side_effects());
    assert!(session.controls_enabled());
}

#[tokio::test]
async fn test_webm_fallback_is_labelled_webm() {
    let source = two_second_source(true);
    let mut host = SyntheticHost::new(source.clone())
        .with_supported(&[ContainerFormat::WebmVp8Vorbis, ContainerFormat::WebmVp9Opus]);
    let mut session = session_with_mask(&source, CaptureOptions::default());

    let artifact = session.process(&mut host).await.unwrap();
    assert_eq!(artifact.container(), ContainerFormat::WebmVp9Opus);
    assert_eq!(artifact.filename(), "masked-video.webm");
    assert_eq!(
        decode(artifact.bytes()).unwrap().container,
        ContainerFormat::WebmVp9Opus
    );
    assert_eq!(session.stats().passes, 1);
}

#[tokio::test]
async fn test_transcode_pass_does_not_remask() {
    let source = two_second_source(true);
    let mut host = SyntheticHost::new(source.clone())
        .with_supported(&[ContainerFormat::WebmVp9Opus])
        .with_transcode(&[ContainerFormat::Mp4H264Aac]);
    let mut session = session_with_mask(&source, CaptureOptions::default());
    session.set_mask_type(MaskType::Blur);
    session.set_intensity(4);

    let artifact = session.process(&mut host).await.unwrap();
    assert_eq!(artifact.container(), ContainerFormat::Mp4H264Aac);
    assert_eq!(artifact.filename(), "masked-video.mp4");
    let video = decode(artifact.bytes()).unwrap();

    let containers: Vec<_> = host.encoder_history().iter().map(|s| s.container).collect();
    assert_eq!(
        containers,
        vec![ContainerFormat::WebmVp9Opus, ContainerFormat::Mp4H264Aac]
    );
    assert_eq!(host.calls().open_intermediate, 1);
    assert_eq!(session.stats().passes, 2);

    // Each output frame carries exactly one application of the blur.
    let masks = session.masks().clone();
    let settings = session.settings();
    let mut renderer = FrameRenderer::new();
    assert_eq!(video.frames.len(), source.frames.len());
    for (out, src) in video.frames.iter().zip(&source.frames) {
        assert_eq!(out, &renderer.render(src, &masks, &settings));
    }
}

#[tokio::test]
async fn test_transcode_disabled_keeps_fallback() {
    let source = two_second_source(true);
    let mut host = SyntheticHost::new(source.clone())
        .with_supported(&[ContainerFormat::WebmVp9Opus])
        .with_transcode(&[ContainerFormat::Mp4H264Aac]);
    let options = CaptureOptions {
        transcode_to_preferred: false,
        ..CaptureOptions::default()
    };
    let mut session = session_with_mask(&source, options);

    let artifact = session.process(&mut host).await.unwrap();
    assert_eq!(artifact.container(), ContainerFormat::WebmVp9Opus);
    assert_eq!(session.download_filename().as_deref(), Some("masked-video.webm"));
    assert_eq!(host.calls().open_intermediate, 0);
}

#[tokio::test]
async fn test_low_rate_output_holds_frames() {
    let source = two_second_source(false);
    let mut host = SyntheticHost::new(source.clone());
    let options = CaptureOptions {
        fps: 10,
        ..CaptureOptions::default()
    };
    let mut session = session_with_mask(&source, options);

    let artifact = session.process(&mut host).await.unwrap();
    assert_eq!(artifact.fps(), 10);
    assert!((artifact.duration_secs() - 2.0).abs() <= 0.1 + 1e-9);
    assert!(session.stats().frames_dropped > 0);
}
