//! Error types for the Nebula graphics core
//!
//! This module defines the error types used throughout the graphics device,
//! texture and render-target code.

use std::fmt;

/// Result type for graphics operations
pub type Result<T> = std::result::Result<T, Error>;

/// Graphics core errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (WebGL, WebGPU, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (texture, render target, framebuffer, etc.)
    InvalidResource(String),

    /// Initialization failed (device, backend, render target)
    InitializationFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

/// Log an error and early-return it from the current function.
///
/// Expands to a `gfx_error!` log entry followed by
/// `return Err(Error::InvalidResource(..))` carrying the same message.
#[macro_export]
macro_rules! gfx_bail {
    ($source:expr, $($arg:tt)*) => {{
        $crate::gfx_error!($source, $($arg)*);
        return Err($crate::Error::InvalidResource(format!($($arg)*)));
    }};
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
