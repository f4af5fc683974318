//! Host media interface.
//!
//! The host owns decoding, playback, the capture stream sink and the
//! encoder. The pipeline only invokes it and reacts to the events it emits.

use maskframe_common::error::{MaskframeError, MaskframeResult};
use maskframe_filters::FrameBuffer;

use crate::artifact::OutputArtifact;
use crate::container::ContainerFormat;

/// A decoded source frame and its presentation time.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub frame: FrameBuffer,
    pub pts_secs: f64,
}

/// Encoder configuration for one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderSettings {
    pub container: ContainerFormat,
    pub width: usize,
    pub height: usize,
    pub fps: u32,
    /// Quality target; hosts may treat it as a hint.
    pub bitrate_bps: u64,
    /// Whether the source audio track is muxed into the output.
    pub with_audio: bool,
}

/// Notifications delivered by the host, in the order they occurred.
#[derive(Debug)]
pub enum HostEvent {
    /// The source advanced to a new frame while playing.
    Frame(DecodedFrame),
    /// Playback paused before the end of the source.
    Paused,
    /// Playback reached end-of-stream.
    Ended,
    /// The encoder delivered a chunk of output bytes.
    Chunk(Vec<u8>),
    /// The encoder finished after a stop request; no more chunks follow.
    EncoderStopped,
    /// The host hit an unrecoverable error.
    Failed(MaskframeError),
}

/// Decode, playback and encode primitives supplied by the environment.
#[async_trait::async_trait]
pub trait MediaHost: Send {
    /// Whether the live capture encoder can produce `format`.
    fn supports_container(&self, format: ContainerFormat) -> bool;

    /// Whether a finished artifact can be re-encoded into `format` by
    /// replaying it through [`MediaHost::open_intermediate`].
    fn supports_transcode(&self, _format: ContainerFormat) -> bool {
        false
    }

    /// Seek the source back to time zero.
    async fn reset_playback(&mut self) -> MaskframeResult<()>;

    /// Prepare the continuous raster feed consumed by the encoder.
    async fn attach_capture_stream(
        &mut self,
        width: usize,
        height: usize,
        fps: u32,
    ) -> MaskframeResult<()>;

    /// Route the source's audio track into the output stream. Returns
    /// `false` when the source has no audio.
    async fn attach_audio(&mut self) -> MaskframeResult<bool>;

    async fn start_encoder(&mut self, settings: &EncoderSettings) -> MaskframeResult<()>;

    /// Start source playback. May fail with `PlaybackRejected`.
    async fn play(&mut self) -> MaskframeResult<()>;

    /// Emit one frame on the capture stream.
    async fn push_frame(&mut self, frame: &FrameBuffer) -> MaskframeResult<()>;

    /// Ask the encoder to finish. Completion is signalled by
    /// [`HostEvent::EncoderStopped`].
    async fn stop_encoder(&mut self) -> MaskframeResult<()>;

    async fn pause(&mut self) -> MaskframeResult<()>;

    /// Tear down playback and encoding after a failure, discarding output.
    async fn abort(&mut self);

    /// Use a finished artifact as the source for the next pass.
    async fn open_intermediate(&mut self, artifact: &OutputArtifact) -> MaskframeResult<()>;

    /// Wait for the next host event. `None` means the host shut down.
    async fn next_event(&mut self) -> Option<HostEvent>;
}
