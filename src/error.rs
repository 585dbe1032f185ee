//! Error types for metafield.
//!
//! Setup errors are the only ones that can leave the pipeline permanently
//! idle. Interop and dispatch errors are per-frame: they are collected into a
//! [`DispatchReport`](crate::dispatch::DispatchReport) and logged, never
//! propagated across the render loop.

use std::fmt;
use std::path::PathBuf;

/// Errors raised while building the compute side of the pipeline.
#[derive(Debug)]
pub enum SetupError {
    /// No live rendering context existed when setup was attempted.
    Unavailable,
    /// The kernel source could not be read.
    KernelSource {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The kernel does not expose the entry point the host binds to.
    MissingEntryPoint { kernel: String, entry_point: String },
    /// The kernel failed to compile for the selected device.
    ///
    /// `log` holds the compiler messages reported by the device.
    Build { kernel: String, log: String },
    /// The shared field texture or its views could not be created.
    Texture(String),
    /// The configuration cannot describe a field.
    Config(ConfigError),
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupError::Unavailable => {
                write!(f, "Compute setup attempted without a live rendering context")
            }
            SetupError::KernelSource { path, source } => {
                write!(f, "Failed to read kernel source '{}': {}", path.display(), source)
            }
            SetupError::MissingEntryPoint { kernel, entry_point } => write!(
                f,
                "Kernel '{}' does not define entry point '{}'",
                kernel, entry_point
            ),
            SetupError::Build { kernel, log } => {
                write!(f, "Failed to build kernel '{}':\n{}", kernel, log)
            }
            SetupError::Texture(msg) => write!(f, "Failed to create field texture: {}", msg),
            SetupError::Config(e) => write!(f, "Cannot set up field: {}", e),
        }
    }
}

impl std::error::Error for SetupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SetupError::KernelSource { source, .. } => Some(source),
            SetupError::Config(e) => Some(e),
            _ => None,
        }
    }
}

/// Errors raised while handing the shared field texture to compute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteropError {
    /// The texture is already held by compute; it must be released first.
    AlreadyAcquired,
}

impl fmt::Display for InteropError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InteropError::AlreadyAcquired => {
                write!(f, "Shared field texture is already acquired by compute")
            }
        }
    }
}

impl std::error::Error for InteropError {}

/// Errors raised by one step of the per-frame dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The source point buffer could not be allocated.
    Allocate(String),
    /// The source points could not be uploaded.
    Upload(String),
    /// The kernel could not be launched.
    Launch(String),
    /// Releasing the texture back to rendering failed, or the device reported
    /// errors for the work recorded while it was held.
    Release(String),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Allocate(msg) => write!(f, "Source buffer allocation failed: {}", msg),
            DispatchError::Upload(msg) => write!(f, "Source upload failed: {}", msg),
            DispatchError::Launch(msg) => write!(f, "Kernel launch failed: {}", msg),
            DispatchError::Release(msg) => write!(f, "Texture release failed: {}", msg),
        }
    }
}

impl std::error::Error for DispatchError {}

/// Errors that can occur during GPU initialization.
#[derive(Debug)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    SurfaceCreation(wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    NoAdapter,
    /// Failed to create GPU device.
    DeviceCreation(wgpu::RequestDeviceError),
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::SurfaceCreation(e) => write!(f, "Failed to create GPU surface: {}", e),
            GpuError::NoAdapter => write!(f, "No compatible GPU adapter found. Ensure your system has a GPU with Vulkan/Metal/DX12 support."),
            GpuError::DeviceCreation(e) => write!(f, "Failed to create GPU device: {}", e),
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::SurfaceCreation(e) => Some(e),
            GpuError::DeviceCreation(e) => Some(e),
            GpuError::NoAdapter => None,
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

/// Errors from reading or writing a [`FieldConfig`](crate::config::FieldConfig).
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read or write the file.
    Io(std::io::Error),
    /// The file is not valid configuration JSON.
    Json(serde_json::Error),
    /// A value is out of range, e.g. a zero grid stride.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Failed to access config file: {}", e),
            ConfigError::Json(e) => write!(f, "Invalid config: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Json(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<ConfigError> for SetupError {
    fn from(e: ConfigError) -> Self {
        SetupError::Config(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e)
    }
}

/// Errors that can occur when running the viewer.
#[derive(Debug)]
pub enum AppError {
    /// Failed to create event loop.
    EventLoop(winit::error::EventLoopError),
    /// Failed to create window.
    Window(winit::error::OsError),
    /// GPU initialization failed.
    Gpu(GpuError),
    /// Configuration could not be loaded.
    Config(ConfigError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::EventLoop(e) => write!(f, "Failed to create event loop: {}", e),
            AppError::Window(e) => write!(f, "Failed to create window: {}", e),
            AppError::Gpu(e) => write!(f, "GPU error: {}", e),
            AppError::Config(e) => write!(f, "Config error: {}", e),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::EventLoop(e) => Some(e),
            AppError::Window(e) => Some(e),
            AppError::Gpu(e) => Some(e),
            AppError::Config(e) => Some(e),
        }
    }
}

impl From<winit::error::EventLoopError> for AppError {
    fn from(e: winit::error::EventLoopError) -> Self {
        AppError::EventLoop(e)
    }
}

impl From<winit::error::OsError> for AppError {
    fn from(e: winit::error::OsError) -> Self {
        AppError::Window(e)
    }
}

impl From<GpuError> for AppError {
    fn from(e: GpuError) -> Self {
        AppError::Gpu(e)
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Config(e)
    }
}
