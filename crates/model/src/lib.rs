//! Maskframe Model
//!
//! Defines the core data contracts for a masking session:
//! - **Rect:** an axis-aligned mask rectangle in native frame pixels
//! - **MaskSet:** the ordered collection of masks applied to every frame
//! - **MaskSettings:** effect kind, intensity, and audio handling
//! - **SourceVideo:** metadata of the loaded source
//! - **MaskPlan:** a serialized set of masks and settings
//!
//! All rectangle coordinates are in the source video's native pixel space
//! (origin top-left, x right, y down). Display-space pointer input is
//! remapped through [`DisplayMapping`] before it becomes a [`Rect`].

pub mod display;
pub mod mask_set;
pub mod plan;
pub mod rect;
pub mod settings;
pub mod source;

pub use display::*;
pub use mask_set::*;
pub use plan::*;
pub use rect::*;
pub use settings::*;
pub use source::*;
