//! Error types for the Tutorial3D engine
//!
//! This module defines the error types used throughout the engine,
//! including device creation, swapchain management, frame sequencing
//! and asset loading.

use std::fmt;

/// Result type for Tutorial3D engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Tutorial3D engine errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Backend-specific error (Vulkan, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// The GPU device was lost; nothing recorded on it can complete
    DeviceLost,

    /// Invalid resource (texture, buffer, shader, etc.)
    InvalidResource(String),

    /// Initialization failed (device, context, subsystems)
    InitializationFailed(String),

    /// The swapchain back buffer could not be retrieved
    BackBufferUnavailable(String),

    /// A render-target view, depth texture or depth-stencil view could not be created
    ViewCreationFailed(String),

    /// An asset (shader source, texture, model) could not be loaded
    AssetLoadFailed(String),

    /// A frame operation was called out of order
    InvalidFrameState(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::DeviceLost => write!(f, "GPU device lost"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::BackBufferUnavailable(msg) => write!(f, "Back buffer unavailable: {}", msg),
            Error::ViewCreationFailed(msg) => write!(f, "View creation failed: {}", msg),
            Error::AssetLoadFailed(msg) => write!(f, "Asset load failed: {}", msg),
            Error::InvalidFrameState(msg) => write!(f, "Invalid frame state: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ===== ERROR MACROS =====

/// Log an ERROR (with file:line) and build an `Error::BackendError` from the same message
///
/// # Example
///
/// ```no_run
/// # use tutorial_3d_engine::engine_err;
/// let err = engine_err!("tutorial3d::vulkan", "Failed to create buffer: {}", "oom");
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::tutorial3d::Engine::log_detailed(
            $crate::tutorial3d::log::LogSeverity::Error,
            $source,
            message.clone(),
            file!(),
            line!()
        );
        $crate::tutorial3d::Error::BackendError(message)
    }};
}

/// Log an ERROR and return `Err(Error::BackendError(..))` from the enclosing function
///
/// # Example
///
/// ```no_run
/// # use tutorial_3d_engine::engine_bail;
/// fn check(size: u64) -> tutorial_3d_engine::tutorial3d::Result<()> {
///     if size == 0 {
///         engine_bail!("tutorial3d::Buffer", "Buffer size must be non-zero");
///     }
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
