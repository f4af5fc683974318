//! In-memory media host.
//!
//! Plays a list of RGBA frames as the source and "encodes" pushed frames
//! into a simple raw container so outputs can be decoded and inspected
//! pixel for pixel. Knobs simulate autoplay rejection, early pause, mid-run
//! failure and partial container support.
//!
//! Encoded layout: `SYNV`, container tag (u8), width, height, fps (u32 LE),
//! audio flag (u8), then raw RGBA frames back to back.

use std::collections::VecDeque;
use std::path::PathBuf;

use maskframe_common::error::{MaskframeError, MaskframeResult};
use maskframe_filters::{FrameBuffer, CHANNELS};
use maskframe_model::SourceVideo;

use crate::artifact::OutputArtifact;
use crate::container::ContainerFormat;
use crate::host::{DecodedFrame, EncoderSettings, HostEvent, MediaHost};

const MAGIC: &[u8; 4] = b"SYNV";
const HEADER_LEN: usize = 4 + 1 + 4 * 3 + 1;

/// Source media for the synthetic host.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    pub width: usize,
    pub height: usize,
    pub fps: f64,
    pub frames: Vec<FrameBuffer>,
    pub has_audio: bool,
}

impl SyntheticSource {
    /// Generate `round(duration * fps)` frames, painting each pixel with
    /// `paint(frame_index, x, y)`.
    pub fn generated(
        width: usize,
        height: usize,
        fps: f64,
        duration_secs: f64,
        has_audio: bool,
        paint: impl Fn(usize, usize, usize) -> [u8; 4],
    ) -> Self {
        let count = (duration_secs * fps).round().max(0.0) as usize;
        let frames = (0..count)
            .map(|i| {
                let mut frame = FrameBuffer::new(width, height);
                for y in 0..height {
                    for x in 0..width {
                        frame.set_pixel(x, y, paint(i, x, y));
                    }
                }
                frame
            })
            .collect();
        Self {
            width,
            height,
            fps,
            frames,
            has_audio,
        }
    }

    /// Opaque frames whose colour depends on position and frame index.
    pub fn gradient(width: usize, height: usize, fps: f64, duration_secs: f64, has_audio: bool) -> Self {
        Self::generated(width, height, fps, duration_secs, has_audio, |i, x, y| {
            [
                (x * 2 + i) as u8,
                (y * 2) as u8,
                ((x + y) as u8).wrapping_mul(3),
                255,
            ]
        })
    }

    pub fn duration_secs(&self) -> f64 {
        if self.fps <= 0.0 {
            return 0.0;
        }
        self.frames.len() as f64 / self.fps
    }

    /// Metadata as a host would report it for a file called `name`.
    pub fn describe(&self, name: &str) -> SourceVideo {
        let path = PathBuf::from(name);
        SourceVideo {
            mime: maskframe_model::mime_for_path(&path).to_string(),
            path,
            size_bytes: (self.width * self.height * self.frames.len() / 10) as u64,
            duration_secs: self.duration_secs(),
            width: self.width as u32,
            height: self.height as u32,
            frame_rate: self.fps,
            has_audio: self.has_audio,
        }
    }
}

/// Number of calls made to each host operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostCalls {
    pub reset_playback: u32,
    pub attach_capture_stream: u32,
    pub attach_audio: u32,
    pub start_encoder: u32,
    pub play: u32,
    pub push_frame: u64,
    pub stop_encoder: u32,
    pub pause: u32,
    pub abort: u32,
    pub open_intermediate: u32,
}

impl HostCalls {
    /// Whether any playback or encoding side effect happened.
    pub fn any_side_effects(&self) -> bool {
        *self != HostCalls::default()
    }
}

#[derive(Debug)]
struct Encoder {
    settings: EncoderSettings,
    pending: Vec<u8>,
    frames_since_chunk: usize,
}

/// A [`MediaHost`] backed by in-memory frames.
#[derive(Debug)]
pub struct SyntheticHost {
    source: SyntheticSource,
    supported: Vec<ContainerFormat>,
    transcode_to: Vec<ContainerFormat>,
    replaying_intermediate: bool,
    reject_playback: bool,
    pause_after: Option<usize>,
    fail_after: Option<usize>,
    chunk_every: usize,
    position: usize,
    playing: bool,
    stream_size: Option<(usize, usize)>,
    encoder: Option<Encoder>,
    events: VecDeque<HostEvent>,
    calls: HostCalls,
    encoder_history: Vec<EncoderSettings>,
}

impl SyntheticHost {
    pub fn new(source: SyntheticSource) -> Self {
        Self {
            source,
            supported: ContainerFormat::PRIORITY.to_vec(),
            transcode_to: Vec::new(),
            replaying_intermediate: false,
            reject_playback: false,
            pause_after: None,
            fail_after: None,
            chunk_every: 8,
            position: 0,
            playing: false,
            stream_size: None,
            encoder: None,
            events: VecDeque::new(),
            calls: HostCalls::default(),
            encoder_history: Vec::new(),
        }
    }

    /// Restrict the containers the encoder can produce.
    pub fn with_supported(mut self, formats: &[ContainerFormat]) -> Self {
        self.supported = formats.to_vec();
        self
    }

    /// Containers reachable only by re-encoding a finished artifact.
    pub fn with_transcode(mut self, formats: &[ContainerFormat]) -> Self {
        self.transcode_to = formats.to_vec();
        self
    }

    /// Refuse `play()` as an autoplay policy would.
    pub fn rejecting_playback(mut self) -> Self {
        self.reject_playback = true;
        self
    }

    /// Report a pause after `frames` source frames.
    pub fn pause_after(mut self, frames: usize) -> Self {
        self.pause_after = Some(frames);
        self
    }

    /// Report a host failure after `frames` source frames.
    pub fn fail_after(mut self, frames: usize) -> Self {
        self.fail_after = Some(frames);
        self
    }

    /// Emit an encoder chunk every `frames` pushed frames.
    pub fn chunk_every(mut self, frames: usize) -> Self {
        self.chunk_every = frames.max(1);
        self
    }

    pub fn source(&self) -> &SyntheticSource {
        &self.source
    }

    pub fn calls(&self) -> &HostCalls {
        &self.calls
    }

    /// Settings of every encoder session started, in order.
    pub fn encoder_history(&self) -> &[EncoderSettings] {
        &self.encoder_history
    }

    fn emit_pending(&mut self) {
        if let Some(encoder) = self.encoder.as_mut() {
            if !encoder.pending.is_empty() {
                let chunk = std::mem::take(&mut encoder.pending);
                self.events.push_back(HostEvent::Chunk(chunk));
            }
            encoder.frames_since_chunk = 0;
        }
    }
}

#[async_trait::async_trait]
impl MediaHost for SyntheticHost {
    fn supports_container(&self, format: ContainerFormat) -> bool {
        self.supported.contains(&format)
    }

    fn supports_transcode(&self, format: ContainerFormat) -> bool {
        self.transcode_to.contains(&format)
    }

    async fn reset_playback(&mut self) -> MaskframeResult<()> {
        self.calls.reset_playback += 1;
        self.position = 0;
        self.playing = false;
        Ok(())
    }

    async fn attach_capture_stream(
        &mut self,
        width: usize,
        height: usize,
        _fps: u32,
    ) -> MaskframeResult<()> {
        self.calls.attach_capture_stream += 1;
        self.stream_size = Some((width, height));
        Ok(())
    }

    async fn attach_audio(&mut self) -> MaskframeResult<bool> {
        self.calls.attach_audio += 1;
        Ok(self.source.has_audio)
    }

    async fn start_encoder(&mut self, settings: &EncoderSettings) -> MaskframeResult<()> {
        self.calls.start_encoder += 1;
        let usable = self.supports_container(settings.container)
            || (self.replaying_intermediate && self.supports_transcode(settings.container));
        if !usable {
            return Err(MaskframeError::encoder_unavailable(format!(
                "{} is not supported",
                settings.container
            )));
        }
        if self.stream_size != Some((settings.width, settings.height)) {
            return Err(MaskframeError::media(
                "encoder size does not match the capture stream",
            ));
        }

        let mut pending = Vec::with_capacity(HEADER_LEN);
        pending.extend_from_slice(MAGIC);
        pending.push(settings.container.tag());
        pending.extend_from_slice(&(settings.width as u32).to_le_bytes());
        pending.extend_from_slice(&(settings.height as u32).to_le_bytes());
        pending.extend_from_slice(&settings.fps.to_le_bytes());
        pending.push(settings.with_audio as u8);

        self.encoder_history.push(*settings);
        self.encoder = Some(Encoder {
            settings: *settings,
            pending,
            frames_since_chunk: 0,
        });
        Ok(())
    }

    async fn play(&mut self) -> MaskframeResult<()> {
        self.calls.play += 1;
        if self.reject_playback {
            return Err(MaskframeError::playback_rejected(
                "play() was blocked by the autoplay policy",
            ));
        }
        self.playing = true;
        Ok(())
    }

    async fn push_frame(&mut self, frame: &FrameBuffer) -> MaskframeResult<()> {
        self.calls.push_frame += 1;
        let chunk_every = self.chunk_every;
        let encoder = self
            .encoder
            .as_mut()
            .ok_or_else(|| MaskframeError::media("no encoder running"))?;
        if frame.dimensions() != (encoder.settings.width, encoder.settings.height) {
            return Err(MaskframeError::media("frame size does not match the encoder"));
        }
        encoder.pending.extend_from_slice(frame.as_bytes());
        encoder.frames_since_chunk += 1;
        if encoder.frames_since_chunk >= chunk_every {
            self.emit_pending();
        }
        Ok(())
    }

    async fn stop_encoder(&mut self) -> MaskframeResult<()> {
        self.calls.stop_encoder += 1;
        if self.encoder.is_some() {
            self.emit_pending();
            self.encoder = None;
            self.events.push_back(HostEvent::EncoderStopped);
        }
        Ok(())
    }

    async fn pause(&mut self) -> MaskframeResult<()> {
        self.calls.pause += 1;
        if self.playing {
            self.playing = false;
            self.events.push_back(HostEvent::Paused);
        }
        Ok(())
    }

    async fn abort(&mut self) {
        self.calls.abort += 1;
        self.playing = false;
        self.encoder = None;
        self.events.clear();
    }

    async fn open_intermediate(&mut self, artifact: &OutputArtifact) -> MaskframeResult<()> {
        self.calls.open_intermediate += 1;
        let video = decode(artifact.bytes())?;
        self.source = SyntheticSource {
            width: video.width,
            height: video.height,
            fps: video.fps as f64,
            frames: video.frames,
            has_audio: video.has_audio,
        };
        self.replaying_intermediate = true;
        // Playback knobs apply to the original source only.
        self.pause_after = None;
        self.fail_after = None;
        self.position = 0;
        self.playing = false;
        Ok(())
    }

    async fn next_event(&mut self) -> Option<HostEvent> {
        if let Some(event) = self.events.pop_front() {
            return Some(event);
        }
        if !self.playing {
            return None;
        }

        if self.fail_after == Some(self.position) {
            self.playing = false;
            return Some(HostEvent::Failed(MaskframeError::capture_aborted(
                "source decoder stopped unexpectedly",
            )));
        }
        if self.pause_after == Some(self.position) {
            self.playing = false;
            return Some(HostEvent::Paused);
        }

        match self.source.frames.get(self.position) {
            Some(frame) => {
                let pts_secs = self.position as f64 / self.source.fps;
                self.position += 1;
                Some(HostEvent::Frame(DecodedFrame {
                    frame: frame.clone(),
                    pts_secs,
                }))
            }
            None => {
                self.playing = false;
                Some(HostEvent::Ended)
            }
        }
    }
}

/// A decoded synthetic artifact.
#[derive(Debug, Clone)]
pub struct DecodedVideo {
    pub container: ContainerFormat,
    pub width: usize,
    pub height: usize,
    pub fps: u32,
    pub has_audio: bool,
    pub frames: Vec<FrameBuffer>,
}

impl DecodedVideo {
    pub fn duration_secs(&self) -> f64 {
        self.frames.len() as f64 / self.fps.max(1) as f64
    }
}

/// Parse bytes produced by the synthetic encoder.
pub fn decode(bytes: &[u8]) -> MaskframeResult<DecodedVideo> {
    if bytes.len() < HEADER_LEN || &bytes[..4] != MAGIC {
        return Err(MaskframeError::media("not a synthetic video"));
    }
    let container = ContainerFormat::from_tag(bytes[4])
        .ok_or_else(|| MaskframeError::media(format!("unknown container tag {}", bytes[4])))?;
    let read_u32 = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
    let width = read_u32(5) as usize;
    let height = read_u32(9) as usize;
    let fps = read_u32(13);
    let has_audio = bytes[17] != 0;

    let frame_len = width * height * CHANNELS;
    let body = &bytes[HEADER_LEN..];
    if frame_len == 0 || body.len() % frame_len != 0 {
        return Err(MaskframeError::media(format!(
            "truncated synthetic video: {} body bytes for {width}x{height} frames",
            body.len()
        )));
    }
    let frames = body
        .chunks_exact(frame_len)
        .map(|raw| FrameBuffer::from_rgba(width, height, raw.to_vec()))
        .collect::<MaskframeResult<Vec<_>>>()?;

    Ok(DecodedVideo {
        container,
        width,
        height,
        fps,
        has_audio,
        frames,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_encode_decode_via_host() {
        let source = SyntheticSource::gradient(4, 3, 10.0, 0.3, true);
        let mut host = SyntheticHost::new(source.clone()).chunk_every(2);
        host.attach_capture_stream(4, 3, 10).await.unwrap();
        host.start_encoder(&EncoderSettings {
            container: ContainerFormat::WebmVp8Vorbis,
            width: 4,
            height: 3,
            fps: 10,
            bitrate_bps: 1,
            with_audio: true,
        })
        .await
        .unwrap();
        for frame in &source.frames {
            host.push_frame(frame).await.unwrap();
        }
        host.stop_encoder().await.unwrap();

        let mut chunks = Vec::new();
        while let Some(event) = host.next_event().await {
            match event {
                HostEvent::Chunk(bytes) => chunks.push(bytes),
                HostEvent::EncoderStopped => break,
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(chunks.len(), 2);
        let artifact =
            OutputArtifact::from_chunks(ContainerFormat::WebmVp8Vorbis, chunks, true, 3, 10);
        let video = decode(artifact.bytes()).unwrap();
        assert_eq!(video.container, ContainerFormat::WebmVp8Vorbis);
        assert!(video.has_audio);
        assert_eq!(video.frames, source.frames);
    }

    #[tokio::test]
    async fn test_playback_emits_frames_then_end() {
        let source = SyntheticSource::gradient(2, 2, 10.0, 0.2, false);
        let mut host = SyntheticHost::new(source);
        assert!(host.next_event().await.is_none());
        host.play().await.unwrap();
        assert!(matches!(host.next_event().await, Some(HostEvent::Frame(f)) if f.pts_secs == 0.0));
        assert!(matches!(host.next_event().await, Some(HostEvent::Frame(_))));
        assert!(matches!(host.next_event().await, Some(HostEvent::Ended)));
        assert!(host.next_event().await.is_none());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode(b"nope").is_err());
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&[1, 2, 0, 0, 0, 2, 0, 0, 0, 30, 0, 0, 0, 0, 7]);
        assert!(decode(&bytes).is_err());
    }

    #[test]
    fn test_describe_reports_metadata() {
        let source = SyntheticSource::gradient(8, 6, 30.0, 2.0, true);
        let meta = source.describe("clip.webm");
        assert_eq!(meta.mime, "video/webm");
        assert_eq!((meta.width, meta.height), (8, 6));
        assert!((meta.duration_secs - 2.0).abs() < 1e-9);
        assert!(meta.has_audio);
    }
}
