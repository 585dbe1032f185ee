//! # metafield
//!
//! A metaball field computed on the GPU and drawn to a window.
//!
//! A grid of fixed point sources plus one source that follows the pointer
//! feed a compute kernel. The kernel writes one color per pixel into a
//! texture that the renderer then samples onto a full-window quad. Compute
//! and render share that texture: compute acquires it, writes, and releases
//! it before the quad is drawn.
//!
//! ## Quick Start
//!
//! ```ignore
//! use metafield::prelude::*;
//!
//! fn main() -> Result<(), AppError> {
//!     let config = FieldConfig::new()
//!         .with_field_size(800, 600)
//!         .with_grid_stride(100)
//!         .with_controls(Controls { charge: 40, lower_limit: 20, limiting: true });
//!     metafield::run(config)
//! }
//! ```
//!
//! ## Controls
//!
//! Three controls shape the field:
//!
//! - **charge** (slider 0..100) scales every source, mapped to `[1, 100]`
//! - **lower limit** (slider 0..100) is the threshold, mapped to `[0.001, 0.5]`
//! - **limiting** switches between a hard threshold and a grayscale ramp
//!
//! They are driven from the keyboard (see [`input`]) and, with the `egui`
//! feature, from an on-screen panel.
//!
//! ## Headless use
//!
//! [`FieldPipeline`] is generic over [`FieldBackend`], so the frame path
//! (acquire, upload, launch, release) runs without a window against any
//! backend. The wgpu backend lives in [`gpu`].
//!
//! ## Logging
//!
//! Everything logs through `tracing`. The binary installs a
//! `tracing-subscriber` filter read from `RUST_LOG`, defaulting to
//! `metafield=info`.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod gpu;
pub mod input;
pub mod kernel;
pub mod mapping;
pub mod params;
pub mod pipeline;
pub mod sources;
pub mod texture;
pub mod time;
mod window;

pub use bytemuck;
pub use config::FieldConfig;
pub use dispatch::{DispatchReport, FieldBackend, FieldDispatcher, KernelArgs};
pub use error::{AppError, ConfigError, DispatchError, GpuError, InteropError, SetupError};
pub use glam::{IVec2, UVec2, Vec2};
pub use kernel::{FieldKernel, KernelAbi};
pub use mapping::Rect;
pub use params::{Controls, FieldParams};
pub use pipeline::{ComputeSetup, FieldPipeline};
pub use sources::{SourcePoint, SourceRegistry};
pub use texture::{AccessState, FieldExtent, SharedField};
pub use window::{run, App, GpuState};

/// Convenient imports for building a viewer.
pub mod prelude {
    pub use crate::config::FieldConfig;
    pub use crate::error::AppError;
    pub use crate::input::ControlAction;
    pub use crate::params::{Controls, FieldParams};
    pub use crate::pipeline::FieldPipeline;
    pub use crate::{IVec2, UVec2, Vec2};
    #[cfg(feature = "egui")]
    pub use egui;
}
