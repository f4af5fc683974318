//! Encoded output artifacts and the single-slot holder that exposes them.

use std::fmt;
use std::path::Path;

use maskframe_common::error::MaskframeResult;

use crate::container::{download_filename, ContainerFormat};

/// A finished, fully-encoded output video.
#[derive(Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    container: ContainerFormat,
    data: Vec<u8>,
    has_audio: bool,
    frames: u64,
    fps: u32,
}

impl OutputArtifact {
    /// Concatenate encoder chunks, in arrival order, into one artifact.
    pub fn from_chunks(
        container: ContainerFormat,
        chunks: Vec<Vec<u8>>,
        has_audio: bool,
        frames: u64,
        fps: u32,
    ) -> Self {
        let total = chunks.iter().map(Vec::len).sum();
        let mut data = Vec::with_capacity(total);
        for chunk in chunks {
            data.extend_from_slice(&chunk);
        }
        Self {
            container,
            data,
            has_audio,
            frames,
            fps: fps.max(1),
        }
    }

    /// The container actually produced.
    pub fn container(&self) -> ContainerFormat {
        self.container
    }

    pub fn mime_type(&self) -> &'static str {
        self.container.mime_type()
    }

    pub fn filename(&self) -> String {
        download_filename(self.container)
    }

    pub fn has_audio(&self) -> bool {
        self.has_audio
    }

    /// Video frames written to the encoder.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames as f64 / self.fps as f64
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Write the encoded bytes to `path`, creating parent directories.
    pub fn write_to(&self, path: impl AsRef<Path>) -> MaskframeResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, &self.data)?;
        Ok(())
    }
}

impl fmt::Debug for OutputArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputArtifact")
            .field("container", &self.container)
            .field("bytes", &self.data.len())
            .field("has_audio", &self.has_audio)
            .field("frames", &self.frames)
            .field("fps", &self.fps)
            .finish()
    }
}

/// Holds at most one output artifact. Publishing releases the previous one
/// before the new one becomes visible.
#[derive(Debug, Default)]
pub struct ArtifactSlot {
    current: Option<OutputArtifact>,
    published: u64,
}

impl ArtifactSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&mut self, artifact: OutputArtifact) -> &OutputArtifact {
        self.release();
        self.published += 1;
        tracing::info!(
            container = %artifact.container(),
            bytes = artifact.len(),
            frames = artifact.frames(),
            "Output artifact ready"
        );
        self.current.insert(artifact)
    }

    /// Drop the current artifact, if any.
    pub fn release(&mut self) -> Option<OutputArtifact> {
        let released = self.current.take();
        if let Some(ref old) = released {
            tracing::debug!(bytes = old.len(), "Released previous output artifact");
        }
        released
    }

    pub fn current(&self) -> Option<&OutputArtifact> {
        self.current.as_ref()
    }

    /// Artifacts published over the slot's lifetime.
    pub fn published(&self) -> u64 {
        self.published
    }
}
