//! Output container negotiation.
//!
//! Containers are tried in strict priority order and the first one the host
//! can produce wins. Artifacts are always tagged with the container that was
//! actually encoded.

use std::fmt;

use maskframe_common::error::{MaskframeError, MaskframeResult};
use serde::{Deserialize, Serialize};

/// Base name of downloaded output files.
pub const DOWNLOAD_STEM: &str = "masked-video";

/// Container family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    Mp4,
    Webm,
}

impl ContainerKind {
    pub fn extension(self) -> &'static str {
        match self {
            ContainerKind::Mp4 => "mp4",
            ContainerKind::Webm => "webm",
        }
    }
}

/// A concrete container and codec combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerFormat {
    /// MP4 with H.264 video and AAC audio.
    Mp4H264Aac,
    /// MP4 with the host's default codecs.
    Mp4,
    /// WebM with VP9 video and Opus audio.
    WebmVp9Opus,
    /// WebM with VP8 video and Vorbis audio.
    WebmVp8Vorbis,
}

impl ContainerFormat {
    /// Negotiation order, most compatible first.
    pub const PRIORITY: [ContainerFormat; 4] = [
        ContainerFormat::Mp4H264Aac,
        ContainerFormat::Mp4,
        ContainerFormat::WebmVp9Opus,
        ContainerFormat::WebmVp8Vorbis,
    ];

    /// The container a transcode pass aims for.
    pub const PREFERRED: ContainerFormat = ContainerFormat::Mp4H264Aac;

    pub fn mime_type(self) -> &'static str {
        match self {
            ContainerFormat::Mp4H264Aac => "video/mp4;codecs=h264,aac",
            ContainerFormat::Mp4 => "video/mp4",
            ContainerFormat::WebmVp9Opus => "video/webm;codecs=vp9,opus",
            ContainerFormat::WebmVp8Vorbis => "video/webm;codecs=vp8,vorbis",
        }
    }

    pub fn kind(self) -> ContainerKind {
        match self {
            ContainerFormat::Mp4H264Aac | ContainerFormat::Mp4 => ContainerKind::Mp4,
            ContainerFormat::WebmVp9Opus | ContainerFormat::WebmVp8Vorbis => ContainerKind::Webm,
        }
    }

    pub fn extension(self) -> &'static str {
        self.kind().extension()
    }

    pub fn video_codec(self) -> &'static str {
        match self {
            ContainerFormat::Mp4H264Aac | ContainerFormat::Mp4 => "h264",
            ContainerFormat::WebmVp9Opus => "vp9",
            ContainerFormat::WebmVp8Vorbis => "vp8",
        }
    }

    pub fn audio_codec(self) -> &'static str {
        match self {
            ContainerFormat::Mp4H264Aac | ContainerFormat::Mp4 => "aac",
            ContainerFormat::WebmVp9Opus => "opus",
            ContainerFormat::WebmVp8Vorbis => "vorbis",
        }
    }

    /// Whether artifacts in this container need no transcode pass.
    pub fn is_preferred_kind(self) -> bool {
        self.kind() == Self::PREFERRED.kind()
    }

    /// Look up a format by its exact MIME string.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim();
        Self::PRIORITY
            .into_iter()
            .find(|f| f.mime_type().eq_ignore_ascii_case(mime))
    }

    /// Stable one-byte tag, used by byte-level artifact formats.
    pub fn tag(self) -> u8 {
        match self {
            ContainerFormat::Mp4H264Aac => 1,
            ContainerFormat::Mp4 => 2,
            ContainerFormat::WebmVp9Opus => 3,
            ContainerFormat::WebmVp8Vorbis => 4,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::PRIORITY.into_iter().find(|f| f.tag() == tag)
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// Pick the first container in [`ContainerFormat::PRIORITY`] accepted by
/// `supports`.
pub fn select_container(
    supports: impl Fn(ContainerFormat) -> bool,
) -> MaskframeResult<ContainerFormat> {
    for format in ContainerFormat::PRIORITY {
        if supports(format) {
            tracing::debug!(container = %format, "Selected output container");
            return Ok(format);
        }
        tracing::debug!(container = %format, "Container not supported by host");
    }
    Err(MaskframeError::encoder_unavailable(
        "host supports none of the MP4 or WebM output containers",
    ))
}

/// Default download filename for an artifact in `format`.
pub fn download_filename(format: ContainerFormat) -> String {
    format!("{DOWNLOAD_STEM}.{}", format.extension())
}
