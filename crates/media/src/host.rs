//! [`MediaHost`] backed by ffmpeg subprocesses.
//!
//! Playback is an ffmpeg decoder writing raw RGBA frames to a pipe, read on
//! a tokio task and forwarded over a bounded channel. The encoder is a
//! second ffmpeg reading raw frames from stdin and streaming the container
//! to stdout, which another task drains into fixed-size chunks.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;

use maskframe_capture::{
    ContainerFormat, DecodedFrame, EncoderSettings, HostEvent, MediaHost, OutputArtifact,
};
use maskframe_common::config::CaptureDefaults;
use maskframe_common::error::{MaskframeError, MaskframeResult};
use maskframe_filters::{FrameBuffer, CHANNELS};
use maskframe_model::SourceVideo;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStderr, ChildStdin, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::args::{decoder_args, encoder_args, EncoderSupport};
use crate::probe::{probe_encoders, probe_source, DEFAULT_FRAME_RATE};

/// Decoded frames buffered ahead of the pipeline.
const FRAME_QUEUE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FfmpegOptions {
    /// Size of the encoder output chunks.
    pub chunk_bytes: usize,

    /// Decode at the source's native speed (`-re`).
    pub realtime_pacing: bool,
}

impl Default for FfmpegOptions {
    fn default() -> Self {
        Self {
            chunk_bytes: 256 * 1024,
            realtime_pacing: false,
        }
    }
}

impl From<&CaptureDefaults> for FfmpegOptions {
    fn from(defaults: &CaptureDefaults) -> Self {
        Self {
            chunk_bytes: defaults.chunk_bytes.max(1),
            realtime_pacing: defaults.realtime_pacing,
        }
    }
}

#[derive(Debug)]
pub struct FfmpegHost {
    source: SourceVideo,
    support: EncoderSupport,
    options: FfmpegOptions,
    stream_size: Option<(usize, usize)>,
    audio_attached: bool,
    pending: VecDeque<HostEvent>,
    decoder: Option<JoinHandle<()>>,
    frames: Option<mpsc::Receiver<HostEvent>>,
    encoder_stdin: Option<ChildStdin>,
    encoder: Option<JoinHandle<()>>,
    chunks: Option<mpsc::UnboundedReceiver<HostEvent>>,
}

impl FfmpegHost {
    /// Probe `path` and the local ffmpeg build.
    pub async fn open(path: impl Into<PathBuf>, options: FfmpegOptions) -> MaskframeResult<Self> {
        let path = path.into();
        let source = probe_source(&path).await?;
        let support = probe_encoders().await?;
        Ok(Self::new(source, support, options))
    }

    pub fn new(source: SourceVideo, support: EncoderSupport, options: FfmpegOptions) -> Self {
        Self {
            source,
            support,
            options,
            stream_size: None,
            audio_attached: false,
            pending: VecDeque::new(),
            decoder: None,
            frames: None,
            encoder_stdin: None,
            encoder: None,
            chunks: None,
        }
    }

    /// The media currently used as the playback source.
    pub fn source(&self) -> &SourceVideo {
        &self.source
    }

    pub fn support(&self) -> &EncoderSupport {
        &self.support
    }

    fn frame_rate(&self) -> f64 {
        if self.source.frame_rate.is_finite() && self.source.frame_rate > 0.0 {
            self.source.frame_rate
        } else {
            DEFAULT_FRAME_RATE
        }
    }

    fn stop_decoder(&mut self) {
        if let Some(task) = self.decoder.take() {
            task.abort();
        }
        self.frames = None;
    }

    fn stop_encoder_task(&mut self) {
        self.encoder_stdin = None;
        if let Some(task) = self.encoder.take() {
            task.abort();
        }
        self.chunks = None;
    }

    fn spawn_decoder(&mut self) -> MaskframeResult<()> {
        let fps = self.frame_rate();
        let args = decoder_args(&self.source.path, fps, self.options.realtime_pacing);
        tracing::debug!(args = ?args, "Starting ffmpeg decoder");

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                MaskframeError::playback_rejected(format!("Failed to start ffmpeg decoder: {e}"))
            })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MaskframeError::media("Failed to capture decoder stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MaskframeError::media("Failed to capture decoder stderr"))?;

        let (tx, rx) = mpsc::channel(FRAME_QUEUE);
        let size = (self.source.width as usize, self.source.height as usize);
        tracing::info!(
            pid = child.id(),
            source = %self.source.name(),
            fps,
            realtime = self.options.realtime_pacing,
            "ffmpeg decoder started"
        );
        self.decoder = Some(tokio::spawn(run_decoder(child, stdout, stderr, size, fps, tx)));
        self.frames = Some(rx);
        Ok(())
    }

    fn spawn_encoder(&mut self, settings: &EncoderSettings) -> MaskframeResult<()> {
        let audio_source = self.audio_attached.then(|| self.source.path.clone());
        let args = encoder_args(settings, audio_source.as_deref());
        tracing::debug!(args = ?args, "Starting ffmpeg encoder");

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                MaskframeError::encoder_unavailable(format!("Failed to start ffmpeg encoder: {e}"))
            })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| MaskframeError::media("Failed to capture encoder stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MaskframeError::media("Failed to capture encoder stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MaskframeError::media("Failed to capture encoder stderr"))?;

        // Unbounded: stdout must keep draining while frames are written.
        let (tx, rx) = mpsc::unbounded_channel();
        tracing::info!(
            pid = child.id(),
            container = %settings.container,
            bitrate_bps = settings.bitrate_bps,
            with_audio = audio_source.is_some(),
            "ffmpeg encoder started"
        );
        self.encoder = Some(tokio::spawn(run_encoder_output(
            child,
            stdout,
            stderr,
            self.options.chunk_bytes.max(1),
            tx,
        )));
        self.encoder_stdin = Some(stdin);
        self.chunks = Some(rx);
        Ok(())
    }
}

impl Drop for FfmpegHost {
    fn drop(&mut self) {
        self.stop_decoder();
        self.stop_encoder_task();
    }
}

#[async_trait::async_trait]
impl MediaHost for FfmpegHost {
    fn supports_container(&self, format: ContainerFormat) -> bool {
        self.support.supports(format)
    }

    async fn reset_playback(&mut self) -> MaskframeResult<()> {
        self.stop_decoder();
        self.pending.clear();
        self.audio_attached = false;
        Ok(())
    }

    async fn attach_capture_stream(
        &mut self,
        width: usize,
        height: usize,
        _fps: u32,
    ) -> MaskframeResult<()> {
        let native = (self.source.width as usize, self.source.height as usize);
        if (width, height) != native {
            return Err(MaskframeError::media(format!(
                "capture stream {width}x{height} does not match source {}x{}",
                native.0, native.1
            )));
        }
        self.stream_size = Some((width, height));
        Ok(())
    }

    async fn attach_audio(&mut self) -> MaskframeResult<bool> {
        self.audio_attached = self.source.has_audio;
        Ok(self.audio_attached)
    }

    async fn start_encoder(&mut self, settings: &EncoderSettings) -> MaskframeResult<()> {
        if !self.support.supports(settings.container) {
            return Err(MaskframeError::encoder_unavailable(format!(
                "ffmpeg lacks encoders for {}",
                settings.container
            )));
        }
        if self.stream_size != Some((settings.width, settings.height)) {
            return Err(MaskframeError::media(
                "encoder size does not match the capture stream",
            ));
        }
        self.stop_encoder_task();
        self.spawn_encoder(settings)
    }

    async fn play(&mut self) -> MaskframeResult<()> {
        if !self.source.path.exists() {
            return Err(MaskframeError::playback_rejected(format!(
                "{} is no longer available",
                self.source.path.display()
            )));
        }
        self.stop_decoder();
        self.spawn_decoder()
    }

    async fn push_frame(&mut self, frame: &FrameBuffer) -> MaskframeResult<()> {
        let stdin = self
            .encoder_stdin
            .as_mut()
            .ok_or_else(|| MaskframeError::media("no encoder running"))?;
        stdin
            .write_all(frame.as_bytes())
            .await
            .map_err(|e| MaskframeError::capture_aborted(format!("Encoder input closed: {e}")))
    }

    async fn stop_encoder(&mut self) -> MaskframeResult<()> {
        // Closing stdin lets ffmpeg flush and exit; the output task then
        // reports EncoderStopped.
        if let Some(mut stdin) = self.encoder_stdin.take() {
            if let Err(err) = stdin.shutdown().await {
                tracing::debug!(error = %err, "Encoder stdin already closed");
            }
        }
        Ok(())
    }

    async fn pause(&mut self) -> MaskframeResult<()> {
        if self.decoder.is_some() {
            self.stop_decoder();
            self.pending.push_back(HostEvent::Paused);
        }
        Ok(())
    }

    async fn abort(&mut self) {
        self.stop_decoder();
        self.stop_encoder_task();
        self.pending.clear();
        tracing::debug!("ffmpeg processes torn down");
    }

    // Live encoding and transcoding would draw on the same encoder set, so a
    // container this host cannot record is one it cannot transcode to either.
    async fn open_intermediate(&mut self, artifact: &OutputArtifact) -> MaskframeResult<()> {
        Err(MaskframeError::encoder_unavailable(format!(
            "ffmpeg host cannot replay a {} intermediate",
            artifact.container().extension()
        )))
    }

    async fn next_event(&mut self) -> Option<HostEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }

        loop {
            let (encoding, decoding) = (self.chunks.is_some(), self.frames.is_some());
            // Encoder output first so chunks never back up behind frames.
            let next = tokio::select! {
                biased;
                event = recv_unbounded(&mut self.chunks), if encoding => Channel::Encoder(event),
                event = recv_bounded(&mut self.frames), if decoding => Channel::Decoder(event),
                else => return None,
            };
            match next {
                Channel::Encoder(Some(event)) | Channel::Decoder(Some(event)) => {
                    if matches!(event, HostEvent::Ended) {
                        self.decoder = None;
                    }
                    return Some(event);
                }
                Channel::Encoder(None) => {
                    self.chunks = None;
                    self.encoder = None;
                }
                Channel::Decoder(None) => {
                    self.frames = None;
                    self.decoder = None;
                }
            }
        }
    }
}

enum Channel {
    Encoder(Option<HostEvent>),
    Decoder(Option<HostEvent>),
}

async fn recv_unbounded(rx: &mut Option<mpsc::UnboundedReceiver<HostEvent>>) -> Option<HostEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn recv_bounded(rx: &mut Option<mpsc::Receiver<HostEvent>>) -> Option<HostEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Read until `buf` is full or the stream ends. Returns bytes read.
async fn read_full<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

fn drain_stderr(stderr: ChildStderr) -> JoinHandle<String> {
    // ffmpeg blocks once a full stderr pipe is left unread.
    tokio::spawn(async move {
        let mut reader = stderr;
        let mut output = String::new();
        match reader.read_to_string(&mut output).await {
            Ok(_) => output,
            Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
        }
    })
}

async fn run_decoder(
    mut child: Child,
    mut stdout: tokio::process::ChildStdout,
    stderr: ChildStderr,
    (width, height): (usize, usize),
    fps: f64,
    tx: mpsc::Sender<HostEvent>,
) {
    let stderr_task = drain_stderr(stderr);
    let mut buf = vec![0u8; width * height * CHANNELS];
    let mut index = 0u64;

    loop {
        match read_full(&mut stdout, &mut buf).await {
            Ok(0) => break,
            Ok(n) if n == buf.len() => {
                let frame = match FrameBuffer::from_rgba(width, height, buf.clone()) {
                    Ok(frame) => frame,
                    Err(err) => {
                        let _ = tx.send(HostEvent::Failed(err)).await;
                        return;
                    }
                };
                let pts_secs = index as f64 / fps;
                index += 1;
                if tx
                    .send(HostEvent::Frame(DecodedFrame { frame, pts_secs }))
                    .await
                    .is_err()
                {
                    return;
                }
            }
            Ok(n) => {
                tracing::warn!(bytes = n, frames = index, "Decoder output ended mid-frame");
                break;
            }
            Err(err) => {
                let _ = tx
                    .send(HostEvent::Failed(MaskframeError::capture_aborted(format!(
                        "Failed reading decoded frames: {err}"
                    ))))
                    .await;
                return;
            }
        }
    }

    let status = child.wait().await;
    let stderr_output = stderr_task.await.unwrap_or_default();
    let event = match status {
        Ok(status) if status.success() => {
            tracing::debug!(frames = index, "Decoder reached end of stream");
            HostEvent::Ended
        }
        Ok(status) => HostEvent::Failed(MaskframeError::capture_aborted(format!(
            "ffmpeg decoder failed (status {status}): {}",
            stderr_output.trim()
        ))),
        Err(err) => HostEvent::Failed(MaskframeError::capture_aborted(format!(
            "Failed to wait on ffmpeg decoder: {err}"
        ))),
    };
    let _ = tx.send(event).await;
}

async fn run_encoder_output(
    mut child: Child,
    mut stdout: tokio::process::ChildStdout,
    stderr: ChildStderr,
    chunk_bytes: usize,
    tx: mpsc::UnboundedSender<HostEvent>,
) {
    let stderr_task = drain_stderr(stderr);
    let mut buf = vec![0u8; chunk_bytes];
    let mut total = 0u64;

    loop {
        match read_full(&mut stdout, &mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                total += n as u64;
                if tx.send(HostEvent::Chunk(buf[..n].to_vec())).is_err() {
                    return;
                }
                if n < buf.len() {
                    break;
                }
            }
            Err(err) => {
                let _ = tx.send(HostEvent::Failed(MaskframeError::capture_aborted(format!(
                    "Failed reading encoder output: {err}"
                ))));
                return;
            }
        }
    }

    let status = child.wait().await;
    let stderr_output = stderr_task.await.unwrap_or_default();
    let event = match status {
        Ok(status) if status.success() => {
            tracing::debug!(bytes = total, "Encoder finished");
            HostEvent::EncoderStopped
        }
        Ok(status) => HostEvent::Failed(MaskframeError::capture_aborted(format!(
            "ffmpeg encoder failed (status {status}): {}",
            stderr_output.trim()
        ))),
        Err(err) => HostEvent::Failed(MaskframeError::capture_aborted(format!(
            "Failed to wait on ffmpeg encoder: {err}"
        ))),
    };
    let _ = tx.send(event);
}
