//! Error types for the ripple background.
//!
//! None of these ever reach the host through [`Background::mount`]: a failed
//! mount is logged and leaves the layer disabled. They are returned by
//! [`Background::try_mount`] and by the lower-level constructors.
//!
//! [`Background::mount`]: crate::controller::Background::mount
//! [`Background::try_mount`]: crate::controller::Background::try_mount

use std::fmt;

/// Errors that can occur while setting up the GPU.
#[derive(Debug)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    SurfaceCreation(wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    NoAdapter,
    /// Failed to create GPU device.
    DeviceCreation(wgpu::RequestDeviceError),
    /// A shader or pipeline failed validation.
    Pipeline(String),
    /// The field resolution exceeds the device's texture size limit.
    Resolution { requested: u32, max: u32 },
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::SurfaceCreation(e) => write!(f, "Failed to create GPU surface: {}", e),
            GpuError::NoAdapter => write!(f, "No compatible GPU adapter found"),
            GpuError::DeviceCreation(e) => write!(f, "Failed to create GPU device: {}", e),
            GpuError::Pipeline(msg) => write!(f, "Failed to build GPU pipeline: {}", msg),
            GpuError::Resolution { requested, max } => write!(
                f,
                "Field resolution {} exceeds the device limit of {}",
                requested, max
            ),
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::SurfaceCreation(e) => Some(e),
            GpuError::DeviceCreation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<wgpu::CreateSurfaceError> for GpuError {
    fn from(e: wgpu::CreateSurfaceError) -> Self {
        GpuError::SurfaceCreation(e)
    }
}

impl From<wgpu::RequestDeviceError> for GpuError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        GpuError::DeviceCreation(e)
    }
}

/// Errors a running stage reports for a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    /// The GPU ran out of memory. The layer cannot continue.
    OutOfMemory,
    /// The frame could not be presented; the next frame may succeed.
    Surface(String),
}

impl StageError {
    /// Whether the layer must be shut down.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StageError::OutOfMemory)
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageError::OutOfMemory => write!(f, "GPU out of memory"),
            StageError::Surface(msg) => write!(f, "Surface error: {}", msg),
        }
    }
}

impl std::error::Error for StageError {}

/// Errors that can occur when running the demo window.
#[derive(Debug)]
pub enum RunError {
    /// Failed to create or run the event loop.
    EventLoop(winit::error::EventLoopError),
    /// Failed to create window.
    Window(winit::error::OsError),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::EventLoop(e) => write!(f, "Failed to run event loop: {}", e),
            RunError::Window(e) => write!(f, "Failed to create window: {}", e),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::EventLoop(e) => Some(e),
            RunError::Window(e) => Some(e),
        }
    }
}

impl From<winit::error::EventLoopError> for RunError {
    fn from(e: winit::error::EventLoopError) -> Self {
        RunError::EventLoop(e)
    }
}

impl From<winit::error::OsError> for RunError {
    fn from(e: winit::error::OsError) -> Self {
        RunError::Window(e)
    }
}
