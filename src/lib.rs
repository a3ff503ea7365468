//! # moire
//!
//! An interactive ripple background: a grid of points floating over a damped
//! wave field that runs on the GPU.
//!
//! The field lives in two float textures. Every frame one of them is read
//! while the other is written, then they trade places. Pointer and touch
//! input drop radial bumps into the field, and when nothing is over the
//! surface a slow orbiting drop keeps it moving. A point mesh sized to the
//! viewport samples the field height, lifts each point towards the camera
//! and blends two colors by height.
//!
//! ## Quick Start
//!
//! ```ignore
//! use moire::prelude::*;
//!
//! fn main() {
//!     env_logger::init();
//!     let config = BackgroundConfig::new()
//!         .with_colors(ColorPair::new(Vec3::new(0.1, 0.1, 0.9), Vec3::new(1.0, 0.8, 0.2)))
//!         .with_input_mode(InputMode::Pointer);
//!     if let Err(e) = moire::run(config) {
//!         log::error!("{}", e);
//!     }
//! }
//! ```
//!
//! ## Embedding
//!
//! Hosts with their own event loop drive a [`Background`] directly. It is
//! generic over a [`Stage`]: [`gpu::Session`] renders with wgpu, while
//! [`headless::HeadlessStage`] runs the same simulation on the CPU.
//!
//! ```ignore
//! let mut background = Background::new(BackgroundConfig::default());
//! let mut ticket = background.mount(viewport, |config, viewport| {
//!     Session::new(window.clone(), config, viewport)
//! });
//!
//! // per host event
//! background.handle_event(event, Instant::now());
//!
//! // per display refresh
//! if let Some(t) = ticket.take() {
//!     if let FrameOutcome::Rendered(next) | FrameOutcome::Skipped(next) =
//!         background.frame(t, Instant::now())
//!     {
//!         ticket = Some(next);
//!     }
//! }
//!
//! background.dispose();
//! ```
//!
//! A failed mount never reaches the host: the error is logged and the
//! background stays disabled. Use [`Background::try_mount`] to see it.

pub mod config;
pub mod controller;
pub mod double_buffer;
pub mod driver;
pub mod error;
pub mod field;
pub mod gpu;
pub mod headless;
pub mod input;
pub mod mesh;
pub mod scheduler;
pub mod shader;
pub mod shading;
pub mod time;
mod window;

pub use config::{BackgroundConfig, DropProfile};
pub use controller::{Background, FrameOutcome, FrameView, LifecycleState, Stage, Viewport};
pub use double_buffer::{DoubleBuffer, Slot};
pub use driver::SimulationDriver;
pub use error::{GpuError, RunError, StageError};
pub use field::{CpuFieldBackend, FieldBackend, FieldGrid, InjectionRequest, WaveParams};
pub use glam::{Vec2, Vec3, Vec4};
pub use input::{InputMode, InteractionEvent};
pub use mesh::{GridPoint, PointFieldMesh};
pub use scheduler::{FrameScheduler, FrameTicket};
pub use shading::ColorPair;
pub use window::{run, App};

/// Convenient imports for the common case.
pub mod prelude {
    pub use crate::config::BackgroundConfig;
    pub use crate::controller::{Background, FrameOutcome, Stage, Viewport};
    pub use crate::gpu::Session;
    pub use crate::headless::HeadlessStage;
    pub use crate::input::{InputMode, InteractionEvent};
    pub use crate::shading::ColorPair;
    pub use crate::{run, Vec2, Vec3, Vec4};
}
