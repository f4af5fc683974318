//! Maskframe Filters: Region Filter Library and Frame Renderer
//!
//! Pixel transforms applied to rectangular regions of RGBA8 frames:
//! - **Solid:** opaque fill
//! - **Pixelate:** block averaging with intensity-scaled block size
//! - **Blur:** two-pass separable box blur with intensity-scaled radius
//!
//! [`FrameRenderer`] applies a whole mask set to a decoded frame, in mask
//! order. [`overlay`] draws the preview outlines shown while editing.
//!
//! This crate is pure computation. No I/O, no host dependencies.

pub mod blur;
pub mod effect;
pub mod frame;
pub mod overlay;
pub mod pixelate;
pub mod renderer;
pub mod solid;

pub use effect::MaskEffect;
pub use frame::{FrameBuffer, BLACK, CHANNELS};
pub use overlay::draw_mask_overlay;
pub use renderer::FrameRenderer;
