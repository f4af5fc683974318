//! Maskframe Media
//!
//! ffmpeg and ffprobe integration: source probing, the subprocess-backed
//! [`FfmpegHost`] used by the capture pipeline, encoder discovery and
//! single-frame snapshots for previews.
//!
//! # Process Layout
//!
//! ```text
//! source.mov ──▶ ffmpeg (decode, rawvideo rgba) ──▶ frames ──┐
//!                                                            ▼
//!                                                 CaptureSession (mask)
//!                                                            │
//! source audio ─────────┐                                    ▼
//!                       └──▶ ffmpeg (encode, stdin rgba) ──▶ chunks ──▶ artifact
//! ```

pub mod args;
pub mod host;
pub mod probe;
pub mod snapshot;

pub use args::EncoderSupport;
pub use host::{FfmpegHost, FfmpegOptions};
pub use probe::{command_exists, probe_encoders, probe_source};
pub use snapshot::snapshot_frame;
