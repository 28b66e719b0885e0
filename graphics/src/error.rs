//! Graphics error types.

use std::fmt;

/// Errors that can occur in the graphics system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphicsError {
    /// Failed to create a resource.
    ResourceCreationFailed(String),
    /// Out of GPU memory.
    OutOfMemory,
    /// The GPU device was lost.
    DeviceLost,
    /// An invalid parameter was provided.
    InvalidParameter(String),
    /// An operation was called in the wrong viewport or pool state.
    InvalidState(String),
    /// The surface is outdated and needs to be reconfigured.
    SurfaceOutdated,
    /// The surface was lost and needs to be recreated.
    SurfaceLost,
    /// Image acquisition kept failing after swapchain recreation.
    AcquireRetriesExhausted {
        /// Number of acquire attempts made.
        attempts: u32,
    },
    /// Presentation failed with an unrecoverable result.
    PresentFailed(String),
    /// An internal error occurred.
    Internal(String),
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResourceCreationFailed(msg) => write!(f, "resource creation failed: {msg}"),
            Self::OutOfMemory => write!(f, "out of GPU memory"),
            Self::DeviceLost => write!(f, "GPU device lost"),
            Self::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            Self::InvalidState(msg) => write!(f, "invalid state: {msg}"),
            Self::SurfaceOutdated => write!(f, "surface outdated, needs reconfiguration"),
            Self::SurfaceLost => write!(f, "surface lost, needs recreation"),
            Self::AcquireRetriesExhausted { attempts } => {
                write!(f, "failed to acquire a swapchain image after {attempts} attempts")
            }
            Self::PresentFailed(msg) => write!(f, "present failed: {msg}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for GraphicsError {}

impl From<lumen_core::render_thread::RenderThreadError> for GraphicsError {
    fn from(error: lumen_core::render_thread::RenderThreadError) -> Self {
        Self::Internal(format!("render thread: {error}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphicsError::OutOfMemory;
        assert_eq!(err.to_string(), "out of GPU memory");

        let err = GraphicsError::InvalidParameter("zero-sized surface".to_string());
        assert_eq!(err.to_string(), "invalid parameter: zero-sized surface");

        let err = GraphicsError::AcquireRetriesExhausted { attempts: 2 };
        assert_eq!(
            err.to_string(),
            "failed to acquire a swapchain image after 2 attempts"
        );
    }
}
