//! Error types shared across maskframe crates.

use std::path::PathBuf;

/// Top-level error type for maskframe operations.
#[derive(Debug, thiserror::Error)]
pub enum MaskframeError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Mask index {index} out of bounds (mask set holds {len})")]
    InvalidIndex { index: usize, len: usize },

    #[error("Nothing to process: no masks defined and audio is kept")]
    NoMasksAndAudioKept,

    #[error("No supported output container: {message}")]
    EncoderUnavailable { message: String },

    #[error("Playback rejected: {message}")]
    PlaybackRejected { message: String },

    #[error("Capture aborted: {message}")]
    CaptureAborted { message: String },

    #[error("A capture session is already active")]
    SessionBusy,

    #[error("Media error: {message}")]
    Media { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using MaskframeError.
pub type MaskframeResult<T> = Result<T, MaskframeError>;

/// Coarse error category, for matching without destructuring payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    InvalidIndex,
    NoMasksAndAudioKept,
    EncoderUnavailable,
    PlaybackRejected,
    CaptureAborted,
    SessionBusy,
    Media,
    Config,
    FileNotFound,
    Io,
    Json,
    Other,
}

impl MaskframeError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    pub fn encoder_unavailable(msg: impl Into<String>) -> Self {
        Self::EncoderUnavailable {
            message: msg.into(),
        }
    }

    pub fn playback_rejected(msg: impl Into<String>) -> Self {
        Self::PlaybackRejected {
            message: msg.into(),
        }
    }

    pub fn capture_aborted(msg: impl Into<String>) -> Self {
        Self::CaptureAborted {
            message: msg.into(),
        }
    }

    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::InvalidIndex { .. } => ErrorKind::InvalidIndex,
            Self::NoMasksAndAudioKept => ErrorKind::NoMasksAndAudioKept,
            Self::EncoderUnavailable { .. } => ErrorKind::EncoderUnavailable,
            Self::PlaybackRejected { .. } => ErrorKind::PlaybackRejected,
            Self::CaptureAborted { .. } => ErrorKind::CaptureAborted,
            Self::SessionBusy => ErrorKind::SessionBusy,
            Self::Media { .. } => ErrorKind::Media,
            Self::Config { .. } => ErrorKind::Config,
            Self::FileNotFound { .. } => ErrorKind::FileNotFound,
            Self::Io(_) => ErrorKind::Io,
            Self::Json(_) => ErrorKind::Json,
            Self::Other(_) => ErrorKind::Other,
        }
    }

    /// Errors raised synchronously while validating a request; these never
    /// start a capture session.
    pub fn is_validation(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidInput | ErrorKind::InvalidIndex | ErrorKind::NoMasksAndAudioKept
        )
    }
}
