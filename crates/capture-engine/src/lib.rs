//! Maskframe Capture Engine
//!
//! Re-encodes a source video with its masks baked into every frame. The
//! source is played through a [`MediaHost`]; each decoded frame is masked
//! onto a fixed-rate capture stream that feeds the host's encoder, and the
//! encoder's chunks are assembled into one [`OutputArtifact`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                 MaskerSession                    │
//! │  source · masks · settings · output slot         │
//! │  ┌────────────────────────────────────────────┐  │
//! │  │             CaptureSession                 │  │
//! │  │   transition(state, event) -> effects      │  │
//! │  │   FrameRenderer ─▶ CaptureStream           │  │
//! │  └───────────────┬────────────────────────────┘  │
//! └──────────────────┼───────────────────────────────┘
//!                    ▼
//!        MediaHost (decode · encode · mux)
//! ```

pub mod artifact;
pub mod container;
pub mod controller;
pub mod host;
pub mod session;
pub mod state;
pub mod stream;
pub mod synthetic;

pub use artifact::*;
pub use container::*;
pub use controller::*;
pub use host::*;
pub use session::*;
pub use state::*;
pub use stream::CaptureStream;
