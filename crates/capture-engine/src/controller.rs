//! Session controller.
//!
//! [`MaskerSession`] owns everything one masking session mutates: the loaded
//! source, the mask set, mask settings, the playback position, the capture
//! pipeline and the output slot. All changes go through its methods.

use maskframe_common::config::AppConfig;
use maskframe_common::error::{MaskframeError, MaskframeResult};
use maskframe_filters::{draw_mask_overlay, FrameBuffer, FrameRenderer};
use maskframe_model::{
    clamp_intensity, DisplayMapping, DragGesture, MaskPlan, MaskSet, MaskSettings, MaskType, Rect,
    Size, SourceVideo, MIN_MASK_SIZE,
};

use crate::artifact::{ArtifactSlot, OutputArtifact};
use crate::host::MediaHost;
use crate::session::{CaptureOptions, CaptureRequest, CaptureSession, PipelineStats};

#[derive(Debug)]
pub struct MaskerSession {
    min_mask_size: f64,
    source: Option<SourceVideo>,
    masks: MaskSet,
    settings: MaskSettings,
    playback_secs: f64,
    overlay_revision: u64,
    preview: FrameRenderer,
    pipeline: CaptureSession,
    output: ArtifactSlot,
}

impl Default for MaskerSession {
    fn default() -> Self {
        Self::new(CaptureOptions::default())
    }
}

impl MaskerSession {
    pub fn new(options: CaptureOptions) -> Self {
        Self {
            min_mask_size: MIN_MASK_SIZE,
            source: None,
            masks: MaskSet::new(),
            settings: MaskSettings::default(),
            playback_secs: 0.0,
            overlay_revision: 0,
            preview: FrameRenderer::new(),
            pipeline: CaptureSession::new(options),
            output: ArtifactSlot::new(),
        }
    }

    /// Build a session from the user's configured defaults.
    pub fn from_config(config: &AppConfig) -> Self {
        let mask_type = config.masking.mask_type.parse().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "Unknown default mask type, using solid");
            MaskType::Solid
        });
        let mut session = Self::new(CaptureOptions::from(&config.capture))
            .with_min_mask_size(config.masking.min_mask_size);
        session.settings = MaskSettings::new(
            mask_type,
            config.masking.intensity,
            config.masking.remove_audio,
        );
        session
    }

    /// Override the drawn-rectangle size threshold.
    pub fn with_min_mask_size(mut self, min_size: f64) -> Self {
        if min_size.is_finite() && min_size >= 0.0 {
            self.min_mask_size = min_size;
        }
        self
    }

    /// Replace the current source.
    ///
    /// Non-video input is refused and leaves the session untouched. On
    /// success the previous output is released, masks are cleared and the
    /// playback position returns to zero.
    pub fn load_source(&mut self, source: SourceVideo) -> MaskframeResult<()> {
        if !source.is_video() {
            tracing::debug!(mime = %source.mime, "Ignoring non-video input");
            return Err(MaskframeError::invalid_input(format!(
                "{} is not a video ({})",
                source.name(),
                source.mime
            )));
        }

        self.output.release();
        self.masks.clear();
        self.playback_secs = 0.0;
        self.overlay_revision += 1;
        tracing::info!(
            source = %source.name(),
            width = source.width,
            height = source.height,
            duration_secs = source.duration_secs,
            has_audio = source.has_audio,
            "Source loaded"
        );
        self.source = Some(source);
        Ok(())
    }

    /// Admit a rectangle in native pixel coordinates.
    ///
    /// Returns the new mask's index, or `None` when the rectangle is at or
    /// below the size threshold or lies outside the frame.
    pub fn on_rectangle_drawn(&mut self, x: f64, y: f64, width: f64, height: f64) -> Option<usize> {
        let frame = self.source.as_ref().map(SourceVideo::frame_size);
        let index = self
            .masks
            .add_drawn(Rect::new(x, y, width, height), self.min_mask_size, frame)?;
        self.overlay_revision += 1;
        Some(index)
    }

    /// Admit a finished pointer drag made in display space.
    pub fn on_drag_finished(&mut self, gesture: DragGesture, mapping: &DisplayMapping) -> Option<usize> {
        let rect = mapping.rect_to_native(&gesture.finish());
        self.on_rectangle_drawn(rect.x, rect.y, rect.width, rect.height)
    }

    /// Take settings from `plan` and admit its rectangles against the loaded
    /// source. Returns the rectangles that were discarded.
    pub fn apply_plan(&mut self, plan: &MaskPlan) -> MaskframeResult<Vec<Rect>> {
        let (width, height) = self
            .source
            .as_ref()
            .map(SourceVideo::frame_size)
            .ok_or_else(|| MaskframeError::invalid_input("load a source before applying a mask plan"))?;
        let outcome = plan.admit(Size::new(width, height), self.min_mask_size);

        self.settings = plan.settings.normalized();
        if !outcome.masks.is_empty() {
            for rect in &outcome.masks {
                self.masks.add(*rect);
            }
            self.overlay_revision += 1;
        }
        tracing::debug!(
            kept = outcome.masks.len(),
            discarded = outcome.discarded.len(),
            "Applied mask plan"
        );
        Ok(outcome.discarded)
    }

    pub fn remove_mask(&mut self, index: usize) -> MaskframeResult<Rect> {
        let removed = self.masks.remove_at(index)?;
        self.overlay_revision += 1;
        Ok(removed)
    }

    pub fn clear_masks(&mut self) {
        self.masks.clear();
        self.overlay_revision += 1;
    }

    /// Move the playback position, clamped to the source duration.
    pub fn seek(&mut self, secs: f64) -> f64 {
        let duration = self
            .source
            .as_ref()
            .map(|s| s.duration_secs)
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(0.0);
        self.playback_secs = if secs.is_finite() {
            secs.clamp(0.0, duration)
        } else {
            0.0
        };
        self.playback_secs
    }

    pub fn set_mask_type(&mut self, mask_type: MaskType) {
        self.settings.mask_type = mask_type;
    }

    /// Set the effect intensity, clamped to `[1, 20]`.
    pub fn set_intensity(&mut self, intensity: u8) -> u8 {
        self.settings.intensity = clamp_intensity(intensity);
        self.settings.intensity
    }

    pub fn set_remove_audio(&mut self, remove_audio: bool) {
        self.settings.remove_audio = remove_audio;
    }

    pub fn source(&self) -> Option<&SourceVideo> {
        self.source.as_ref()
    }

    pub fn min_mask_size(&self) -> f64 {
        self.min_mask_size
    }

    pub fn masks(&self) -> &MaskSet {
        &self.masks
    }

    pub fn settings(&self) -> MaskSettings {
        self.settings
    }

    pub fn playback_secs(&self) -> f64 {
        self.playback_secs
    }

    /// Bumped on every mask change; overlays drawn at an older revision are stale.
    pub fn overlay_revision(&self) -> u64 {
        self.overlay_revision
    }

    pub fn stats(&self) -> &PipelineStats {
        self.pipeline.stats()
    }

    /// Mask a decoded frame for display, optionally outlining every mask.
    pub fn render_preview(&mut self, frame: &FrameBuffer, with_overlay: bool) -> FrameBuffer {
        let mut rendered = self.preview.render(frame, &self.masks, &self.settings);
        if with_overlay {
            draw_mask_overlay(&mut rendered, &self.masks);
        }
        rendered
    }

    /// Run the capture pipeline over the loaded source and publish the result.
    ///
    /// Playback position is reset to zero when the run starts. On failure the
    /// session returns to idle and no new output is exposed.
    pub async fn process<H>(&mut self, host: &mut H) -> MaskframeResult<&OutputArtifact>
    where
        H: MediaHost + ?Sized,
    {
        let source = self
            .source
            .clone()
            .ok_or_else(|| MaskframeError::invalid_input("no source video loaded"))?;
        // Capture always plays from the start.
        self.playback_secs = 0.0;
        let request = CaptureRequest {
            source,
            masks: self.masks.clone(),
            settings: self.settings,
        };

        match self.pipeline.run(host, request).await {
            Ok(artifact) => Ok(self.output.publish(artifact)),
            Err(err) => {
                tracing::warn!(error = %err, "Processing failed; session is ready for a retry");
                Err(err)
            }
        }
    }

    pub fn output(&self) -> Option<&OutputArtifact> {
        self.output.current()
    }

    /// Filename for the current output, matching the container it holds.
    pub fn download_filename(&self) -> Option<String> {
        self.output.current().map(OutputArtifact::filename)
    }

    /// Whether editing and processing controls should accept input.
    pub fn controls_enabled(&self) -> bool {
        self.pipeline.is_idle()
    }
}
