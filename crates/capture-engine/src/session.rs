//! Capture session driver.
//!
//! Feeds host events through the pure state machine in [`crate::state`] and
//! carries out the resulting effects against a [`MediaHost`].

use std::collections::VecDeque;

use maskframe_common::clock::SessionClock;
use maskframe_common::config::CaptureDefaults;
use maskframe_common::error::{MaskframeError, MaskframeResult};
use maskframe_filters::FrameRenderer;
use maskframe_model::{estimated_bitrate_bps, MaskSet, MaskSettings, SourceVideo};

use crate::artifact::OutputArtifact;
use crate::container::{select_container, ContainerFormat};
use crate::host::{DecodedFrame, HostEvent, MediaHost};
use crate::state::{transition, Effect, PassPlan, PipelineEvent, PipelineState, Transition};
use crate::stream::CaptureStream;

/// Tunables for capture runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureOptions {
    /// Fixed frame rate of the output capture stream.
    pub fps: u32,

    /// Bitrate target when the source gives no usable estimate.
    pub fallback_bitrate_bps: u64,

    /// Re-encode fallback-container output into the preferred container.
    pub transcode_to_preferred: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            fps: 30,
            fallback_bitrate_bps: maskframe_model::FALLBACK_BITRATE_BPS,
            transcode_to_preferred: true,
        }
    }
}

impl From<&CaptureDefaults> for CaptureOptions {
    fn from(defaults: &CaptureDefaults) -> Self {
        Self {
            fps: defaults.fps.max(1),
            fallback_bitrate_bps: defaults.fallback_bitrate_bps,
            transcode_to_preferred: defaults.transcode_to_preferred,
        }
    }
}

/// Everything one processing run needs.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    pub source: SourceVideo,
    pub masks: MaskSet,
    pub settings: MaskSettings,
}

/// Refuse runs that would not change anything.
pub fn validate_request(masks: &MaskSet, settings: &MaskSettings) -> MaskframeResult<()> {
    if masks.is_empty() && !settings.remove_audio {
        return Err(MaskframeError::NoMasksAndAudioKept);
    }
    Ok(())
}

/// Counters for the most recent run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Source frames rendered onto the canvas.
    pub source_frames: u64,

    /// Output frames pushed to the encoder, including repeats.
    pub frames_captured: u64,

    /// Source frames superseded before their output slot came up.
    pub frames_dropped: u64,

    /// Encoder bytes received.
    pub bytes_written: u64,

    /// Encoder chunks received.
    pub chunks: u64,

    /// Encoder sessions started.
    pub passes: u32,

    /// Stop requests sent to the encoder.
    pub encoder_stops: u32,
}

impl PipelineStats {
    /// Drop rate as a percentage of rendered source frames.
    pub fn drop_rate(&self) -> f64 {
        if self.source_frames == 0 {
            return 0.0;
        }
        self.frames_dropped as f64 / self.source_frames as f64 * 100.0
    }
}

#[derive(Debug)]
struct ActiveJob {
    masks: MaskSet,
    settings: MaskSettings,
    /// Duration of the current pass's source.
    duration_secs: f64,
}

/// Drives one capture at a time through the pipeline state machine.
#[derive(Debug)]
pub struct CaptureSession {
    options: CaptureOptions,
    state: PipelineState,
    renderer: FrameRenderer,
    job: Option<ActiveJob>,
    stream: Option<CaptureStream>,
    chunks: Vec<Vec<u8>>,
    audio_attached: bool,
    encoder_audio: bool,
    flushed: bool,
    assembled: Option<OutputArtifact>,
    completed: Option<OutputArtifact>,
    failure: Option<MaskframeError>,
    stats: PipelineStats,
    clock: Option<SessionClock>,
}

impl CaptureSession {
    pub fn new(options: CaptureOptions) -> Self {
        Self {
            options,
            state: PipelineState::Idle,
            renderer: FrameRenderer::new(),
            job: None,
            stream: None,
            chunks: Vec::new(),
            audio_attached: false,
            encoder_audio: false,
            flushed: false,
            assembled: None,
            completed: None,
            failure: None,
            stats: PipelineStats::default(),
            clock: None,
        }
    }

    pub fn options(&self) -> &CaptureOptions {
        &self.options
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state.is_idle()
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Start a run and drive it to completion.
    pub async fn run<H>(
        &mut self,
        host: &mut H,
        request: CaptureRequest,
    ) -> MaskframeResult<OutputArtifact>
    where
        H: MediaHost + ?Sized,
    {
        self.start(host, request).await?;
        self.drive(host).await
    }

    /// Validate the request and prime the host.
    ///
    /// Validation failures and a busy pipeline are reported before any host
    /// call is made.
    pub async fn start<H>(&mut self, host: &mut H, request: CaptureRequest) -> MaskframeResult<()>
    where
        H: MediaHost + ?Sized,
    {
        if !self.state.is_idle() {
            tracing::warn!(state = self.state.name(), "Rejecting start while a capture is active");
            return Err(MaskframeError::SessionBusy);
        }
        validate_request(&request.masks, &request.settings)?;

        let source = &request.source;
        if source.width == 0 || source.height == 0 {
            return Err(MaskframeError::invalid_input(format!(
                "source {} has no video dimensions",
                source.name()
            )));
        }

        let container = select_container(|f| host.supports_container(f))?;
        let transcode_target = (self.options.transcode_to_preferred
            && !container.is_preferred_kind()
            && host.supports_transcode(ContainerFormat::PREFERRED))
        .then_some(ContainerFormat::PREFERRED);

        let plan = PassPlan {
            container,
            keep_audio: !request.settings.remove_audio,
            width: source.width as usize,
            height: source.height as usize,
            fps: self.options.fps.max(1),
            bitrate_bps: estimated_bitrate_bps(
                source.size_bytes,
                source.duration_secs,
                self.options.fallback_bitrate_bps,
            ),
            transcode_target,
        };

        tracing::info!(
            source = %source.name(),
            masks = request.masks.len(),
            mask_type = %request.settings.mask_type,
            intensity = request.settings.intensity,
            remove_audio = request.settings.remove_audio,
            container = %plan.container,
            transcode = ?plan.transcode_target,
            bitrate_bps = plan.bitrate_bps,
            fps = plan.fps,
            "Starting capture"
        );

        self.reset_run(ActiveJob {
            duration_secs: source.duration_secs,
            masks: request.masks,
            settings: request.settings.normalized(),
        });
        let clock = SessionClock::start();
        tracing::debug!(started_at = %clock.started_at().to_rfc3339(), "Capture clock started");
        self.clock = Some(clock);

        self.apply(host, PipelineEvent::Prime(plan)).await;

        if self.state.is_terminal() {
            return Err(self.finish_failed());
        }
        Ok(())
    }

    /// Pump host events until the run finishes.
    pub async fn drive<H>(&mut self, host: &mut H) -> MaskframeResult<OutputArtifact>
    where
        H: MediaHost + ?Sized,
    {
        if self.state.is_idle() {
            return Err(MaskframeError::invalid_input("no capture in progress"));
        }

        while self.state.is_active() {
            let event = match host.next_event().await {
                Some(event) => host_event(event),
                None => PipelineEvent::HostFailed(MaskframeError::capture_aborted(
                    "host closed its event stream mid-capture",
                )),
            };
            self.apply(host, event).await;
        }

        match self.state {
            PipelineState::Done => {
                self.state = self.state.settled();
                let elapsed = self.clock.as_ref().map(|c| c.elapsed_secs()).unwrap_or(0.0);
                let artifact = self.completed.take().ok_or_else(|| {
                    MaskframeError::capture_aborted("pipeline finished without an artifact")
                })?;
                tracing::info!(
                    frames = self.stats.frames_captured,
                    dropped = self.stats.frames_dropped,
                    drop_rate = self.stats.drop_rate(),
                    bytes = artifact.len(),
                    passes = self.stats.passes,
                    elapsed_secs = elapsed,
                    "Capture finished"
                );
                Ok(artifact)
            }
            _ => Err(self.finish_failed()),
        }
    }

    /// Ask the host to pause playback mid-capture. The resulting `Paused`
    /// notification finalizes the pass on the next [`Self::drive`].
    pub async fn request_pause<H>(&mut self, host: &mut H) -> MaskframeResult<()>
    where
        H: MediaHost + ?Sized,
    {
        match self.state {
            PipelineState::Capturing { .. } => host.pause().await,
            _ => Err(MaskframeError::invalid_input(format!(
                "cannot pause while {}",
                self.state.name()
            ))),
        }
    }

    fn reset_run(&mut self, job: ActiveJob) {
        self.job = Some(job);
        self.stream = None;
        self.chunks.clear();
        self.assembled = None;
        self.completed = None;
        self.failure = None;
        self.stats = PipelineStats::default();
    }

    fn finish_failed(&mut self) -> MaskframeError {
        self.state = self.state.settled();
        self.job = None;
        self.failure
            .take()
            .unwrap_or_else(|| MaskframeError::capture_aborted("capture failed"))
    }

    async fn apply<H>(&mut self, host: &mut H, event: PipelineEvent)
    where
        H: MediaHost + ?Sized,
    {
        let mut pending = VecDeque::from([event]);
        while let Some(event) = pending.pop_front() {
            let Transition { next, effects } = transition(&self.state, event);
            if next != self.state {
                tracing::debug!(from = self.state.name(), to = next.name(), "Pipeline transition");
            }
            self.state = next;

            for effect in effects {
                match self.execute(host, effect).await {
                    Ok(Some(follow_up)) => pending.push_back(follow_up),
                    Ok(None) => {}
                    Err(err) => {
                        pending.clear();
                        pending.push_back(PipelineEvent::HostFailed(err));
                        break;
                    }
                }
            }
        }
    }

    async fn execute<H>(
        &mut self,
        host: &mut H,
        effect: Effect,
    ) -> MaskframeResult<Option<PipelineEvent>>
    where
        H: MediaHost + ?Sized,
    {
        match effect {
            Effect::ResetPlayback => {
                self.audio_attached = false;
                self.flushed = false;
                host.reset_playback().await?;
            }
            Effect::AttachCaptureStream { width, height, fps } => {
                host.attach_capture_stream(width, height, fps).await?;
                self.stream = Some(CaptureStream::new(width, height, fps));
            }
            Effect::AttachAudio => {
                self.audio_attached = host.attach_audio().await?;
                if !self.audio_attached {
                    tracing::info!("Source has no audio track; output will be silent");
                }
            }
            Effect::StartEncoder(mut settings) => {
                settings.with_audio &= self.audio_attached;
                self.encoder_audio = settings.with_audio;
                self.chunks.clear();
                host.start_encoder(&settings).await?;
                self.stats.passes += 1;
                tracing::debug!(
                    container = %settings.container,
                    width = settings.width,
                    height = settings.height,
                    with_audio = settings.with_audio,
                    "Encoder started"
                );
            }
            Effect::Play => {
                host.play().await?;
                return Ok(Some(PipelineEvent::Primed));
            }
            Effect::RenderFrame { frame, apply_masks } => {
                self.render_and_push(host, frame, apply_masks).await?;
            }
            Effect::AppendChunk(bytes) => {
                self.stats.bytes_written += bytes.len() as u64;
                self.stats.chunks += 1;
                self.chunks.push(bytes);
            }
            Effect::FlushCapture => self.flush_capture(host).await?,
            Effect::StopEncoder => {
                self.stats.encoder_stops += 1;
                host.stop_encoder().await?;
            }
            Effect::AssembleArtifact { container } => self.assemble(container),
            Effect::OpenIntermediate => {
                let artifact = self.assembled.as_ref().ok_or_else(|| {
                    MaskframeError::capture_aborted("no intermediate artifact to transcode")
                })?;
                tracing::info!(
                    from = %artifact.container(),
                    bytes = artifact.len(),
                    "Transcoding intermediate output"
                );
                host.open_intermediate(artifact).await?;
                if let Some(job) = self.job.as_mut() {
                    job.duration_secs = artifact.duration_secs();
                }
                self.assembled = None;
            }
            Effect::PublishArtifact => {
                self.completed = self.assembled.take();
            }
            Effect::Abort => host.abort().await,
            Effect::ReleaseBuffers => {
                self.chunks.clear();
                self.stream = None;
                self.assembled = None;
                self.completed = None;
            }
            Effect::ReportFailure(err) => {
                tracing::error!(error = %err, frames = self.stats.frames_captured, "Capture failed");
                self.failure = Some(err);
            }
        }
        Ok(None)
    }

    async fn render_and_push<H>(
        &mut self,
        host: &mut H,
        decoded: DecodedFrame,
        apply_masks: bool,
    ) -> MaskframeResult<()>
    where
        H: MediaHost + ?Sized,
    {
        let stream = self.stream.as_mut().ok_or_else(|| {
            MaskframeError::capture_aborted("frame arrived before the capture stream was attached")
        })?;
        if decoded.frame.dimensions() != stream.canvas().dimensions() {
            let (w, h) = decoded.frame.dimensions();
            let (cw, ch) = stream.canvas().dimensions();
            return Err(MaskframeError::capture_aborted(format!(
                "decoded frame is {w}x{h} but the capture stream is {cw}x{ch}"
            )));
        }

        self.stats.source_frames += 1;
        match (&self.job, apply_masks) {
            (Some(job), true) => self.renderer.render_into(
                &decoded.frame,
                &job.masks,
                &job.settings,
                stream.canvas_mut(),
            ),
            _ => stream.canvas_mut().copy_from(&decoded.frame),
        }

        let due = stream.frame_rendered(decoded.pts_secs);
        if due == 0 {
            self.stats.frames_dropped += 1;
        }
        for _ in 0..due {
            host.push_frame(stream.canvas()).await?;
        }
        self.stats.frames_captured += due;
        Ok(())
    }

    async fn flush_capture<H>(&mut self, host: &mut H) -> MaskframeResult<()>
    where
        H: MediaHost + ?Sized,
    {
        let duration = self.job.as_ref().map(|j| j.duration_secs).unwrap_or(0.0);
        let Some(stream) = self.stream.as_mut() else {
            return Ok(());
        };
        let due = stream.flush(duration);
        for _ in 0..due {
            host.push_frame(stream.canvas()).await?;
        }
        self.stats.frames_captured += due;
        self.flushed = true;
        if due > 0 {
            tracing::debug!(frames = due, duration_secs = duration, "Held last frame to source end");
        }
        Ok(())
    }

    fn assemble(&mut self, container: ContainerFormat) {
        let chunks = std::mem::take(&mut self.chunks);
        let (frames, fps) = self
            .stream
            .as_ref()
            .map(|s| (s.emitted(), s.fps()))
            .unwrap_or((0, self.options.fps));

        if let (Some(stream), Some(job), true) = (&self.stream, &self.job, self.flushed) {
            let drift = stream.drift_against(job.duration_secs);
            let threshold_ms = stream.frame_interval_ms();
            if drift.exceeds_threshold_ms(threshold_ms) {
                tracing::warn!(
                    drift_ms = drift.drift_ms(),
                    threshold_ms,
                    "Output duration drifts from source by more than one frame"
                );
            } else {
                tracing::debug!(drift_ms = drift.drift_ms(), "Output duration within one frame of source");
            }
        }

        let artifact =
            OutputArtifact::from_chunks(container, chunks, self.encoder_audio, frames, fps);
        tracing::debug!(
            container = %artifact.container(),
            bytes = artifact.len(),
            frames,
            "Assembled encoder output"
        );
        self.stream = None;
        self.assembled = Some(artifact);
    }
}

fn host_event(event: HostEvent) -> PipelineEvent {
    match event {
        HostEvent::Frame(frame) => PipelineEvent::Frame(frame),
        HostEvent::Paused => PipelineEvent::SourcePaused,
        HostEvent::Ended => PipelineEvent::SourceEnded,
        HostEvent::Chunk(bytes) => PipelineEvent::Chunk(bytes),
        HostEvent::EncoderStopped => PipelineEvent::EncoderStopped,
        HostEvent::Failed(err) => PipelineEvent::HostFailed(err),
    }
}
