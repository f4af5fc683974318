//! Capture/record pipeline state machine.
//!
//! ```text
//! Idle ──Prime──▶ Priming ──Primed──▶ Capturing ──Ended/Paused──▶ Finalizing
//!                                        ▲                            │
//!                                        │                     EncoderStopped
//!                                     Primed                          │
//!                                        │            ┌───────────────┴──────┐
//!                                   Transcoding ◀─────┘ (non-preferred)      ▼
//!                                                                          Done
//! any active state ──HostFailed──▶ Failed
//! ```
//!
//! [`transition`] is pure: it maps `(state, event)` to the next state and the
//! side effects the driver must perform, in order. It never touches the host.

use maskframe_common::error::MaskframeError;

use crate::container::ContainerFormat;
use crate::host::{DecodedFrame, EncoderSettings};

/// Which pass of a processing run is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Masks are applied to every frame.
    Primary,
    /// Re-encode of the primary output into the preferred container.
    Transcode,
}

impl Pass {
    pub fn applies_masks(self) -> bool {
        matches!(self, Pass::Primary)
    }
}

/// Parameters fixed for the duration of one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassPlan {
    pub container: ContainerFormat,
    pub keep_audio: bool,
    pub width: usize,
    pub height: usize,
    pub fps: u32,
    pub bitrate_bps: u64,
    /// Container for a follow-up transcode pass, if one is wanted.
    pub transcode_target: Option<ContainerFormat>,
}

impl PassPlan {
    pub fn encoder_settings(&self) -> EncoderSettings {
        EncoderSettings {
            container: self.container,
            width: self.width,
            height: self.height,
            fps: self.fps,
            bitrate_bps: self.bitrate_bps,
            with_audio: self.keep_audio,
        }
    }

    /// The plan for re-encoding this pass's output, if a transcode is wanted.
    pub fn transcode_plan(&self) -> Option<PassPlan> {
        self.transcode_target.map(|target| PassPlan {
            container: target,
            transcode_target: None,
            ..*self
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Priming { pass: Pass, plan: PassPlan },
    Capturing { pass: Pass, plan: PassPlan },
    Finalizing { pass: Pass, plan: PassPlan },
    /// Intermediate artifact assembled, second pass priming.
    Transcoding { plan: PassPlan },
    Done,
    Failed,
}

impl PipelineState {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Priming { .. } => "priming",
            PipelineState::Capturing { .. } => "capturing",
            PipelineState::Finalizing { .. } => "finalizing",
            PipelineState::Transcoding { .. } => "transcoding",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, PipelineState::Idle)
    }

    /// Whether a capture is underway.
    pub fn is_active(&self) -> bool {
        !matches!(
            self,
            PipelineState::Idle | PipelineState::Done | PipelineState::Failed
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }

    /// `Done` and `Failed` return to `Idle`; other states are unchanged.
    pub fn settled(self) -> Self {
        if self.is_terminal() {
            PipelineState::Idle
        } else {
            self
        }
    }
}

/// Inputs to the state machine.
#[derive(Debug)]
pub enum PipelineEvent {
    /// Begin a processing run with the given primary plan.
    Prime(PassPlan),
    /// Every priming effect succeeded and playback is running.
    Primed,
    Frame(DecodedFrame),
    SourcePaused,
    SourceEnded,
    Chunk(Vec<u8>),
    EncoderStopped,
    HostFailed(MaskframeError),
}

/// Side effects requested by a transition, to be run in order.
#[derive(Debug)]
pub enum Effect {
    ResetPlayback,
    AttachCaptureStream {
        width: usize,
        height: usize,
        fps: u32,
    },
    AttachAudio,
    StartEncoder(EncoderSettings),
    Play,
    RenderFrame {
        frame: DecodedFrame,
        apply_masks: bool,
    },
    AppendChunk(Vec<u8>),
    /// Emit trailing capture slots up to the source duration.
    FlushCapture,
    StopEncoder,
    AssembleArtifact {
        container: ContainerFormat,
    },
    /// Reopen the assembled artifact as the source of the next pass.
    OpenIntermediate,
    PublishArtifact,
    Abort,
    ReleaseBuffers,
    ReportFailure(MaskframeError),
}

#[derive(Debug)]
pub struct Transition {
    pub next: PipelineState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn to(next: PipelineState, effects: Vec<Effect>) -> Self {
        Self { next, effects }
    }

    fn stay(state: &PipelineState) -> Self {
        Self {
            next: *state,
            effects: Vec::new(),
        }
    }
}

fn priming_effects(plan: &PassPlan) -> Vec<Effect> {
    let mut effects = vec![
        Effect::ResetPlayback,
        Effect::AttachCaptureStream {
            width: plan.width,
            height: plan.height,
            fps: plan.fps,
        },
    ];
    if plan.keep_audio {
        effects.push(Effect::AttachAudio);
    }
    effects.push(Effect::StartEncoder(plan.encoder_settings()));
    effects.push(Effect::Play);
    effects
}

/// Compute the next state and effects for `event` in `state`.
pub fn transition(state: &PipelineState, event: PipelineEvent) -> Transition {
    use PipelineEvent as E;
    use PipelineState as S;

    match (state, event) {
        (S::Idle, E::Prime(plan)) => Transition::to(
            S::Priming {
                pass: Pass::Primary,
                plan,
            },
            priming_effects(&plan),
        ),
        // Only one run at a time.
        (_, E::Prime(_)) => Transition::stay(state),

        (S::Priming { pass, plan }, E::Primed) => Transition::to(
            S::Capturing {
                pass: *pass,
                plan: *plan,
            },
            Vec::new(),
        ),
        (S::Transcoding { plan }, E::Primed) => Transition::to(
            S::Capturing {
                pass: Pass::Transcode,
                plan: *plan,
            },
            Vec::new(),
        ),

        (S::Capturing { pass, .. }, E::Frame(frame)) => Transition::to(
            *state,
            vec![Effect::RenderFrame {
                frame,
                apply_masks: pass.applies_masks(),
            }],
        ),
        (S::Capturing { pass, plan }, E::SourceEnded) => Transition::to(
            S::Finalizing {
                pass: *pass,
                plan: *plan,
            },
            vec![Effect::FlushCapture, Effect::StopEncoder],
        ),
        (S::Capturing { pass, plan }, E::SourcePaused) => Transition::to(
            S::Finalizing {
                pass: *pass,
                plan: *plan,
            },
            vec![Effect::StopEncoder],
        ),
        (S::Capturing { .. }, E::EncoderStopped) => failed(MaskframeError::capture_aborted(
            "encoder stopped before the source finished",
        )),

        // Chunks may arrive any time the encoder is running.
        (
            S::Priming { .. } | S::Capturing { .. } | S::Finalizing { .. } | S::Transcoding { .. },
            E::Chunk(bytes),
        ) => Transition::to(*state, vec![Effect::AppendChunk(bytes)]),

        (S::Finalizing { pass, plan }, E::EncoderStopped) => {
            let assemble = Effect::AssembleArtifact {
                container: plan.container,
            };
            match (pass, plan.transcode_plan()) {
                (Pass::Primary, Some(next)) => {
                    let mut effects = vec![assemble, Effect::OpenIntermediate];
                    effects.extend(priming_effects(&next));
                    Transition::to(S::Transcoding { plan: next }, effects)
                }
                _ => Transition::to(S::Done, vec![assemble, Effect::PublishArtifact]),
            }
        }

        (S::Idle | S::Done | S::Failed, E::HostFailed(_)) => Transition::stay(state),
        (_, E::HostFailed(err)) => failed(err),

        // Late frames, repeated stop signals and stray events are ignored.
        _ => Transition::stay(state),
    }
}

fn failed(err: MaskframeError) -> Transition {
    Transition::to(
        PipelineState::Failed,
        vec![Effect::Abort, Effect::ReleaseBuffers, Effect::ReportFailure(err)],
    )
}
