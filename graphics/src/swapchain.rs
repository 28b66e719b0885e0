//! Presentation modes and viewport configuration.
//!
//! ```ignore
//! use lumen_graphics::{ViewportSettings, TextureFormat};
//!
//! let settings = ViewportSettings::new(1920, 1080)
//!     .with_format(TextureFormat::Bgra8UnormSrgb)
//!     .with_vsync(false)
//!     .with_min_image_count(3);
//! ```

use crate::types::{Extent2d, TextureFormat};

/// Presentation mode for the swapchain.
///
/// Controls how frames are synchronized with the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PresentMode {
    /// No synchronization. May cause tearing but has lowest latency.
    Immediate,
    /// Triple buffering. Low latency without tearing.
    Mailbox,
    /// VSync enabled. No tearing, but may have higher latency.
    #[default]
    Fifo,
    /// VSync with relaxed timing. May tear if a frame is late.
    FifoRelaxed,
}

/// Default number of acquire attempts per `begin_render`.
pub const DEFAULT_MAX_ACQUIRE_ATTEMPTS: u32 = 2;

/// Configuration for a window viewport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewportSettings {
    /// Initial size in pixels.
    pub size: Extent2d,
    /// Swapchain image format.
    pub format: TextureFormat,
    /// Whether presentation waits for vertical blank.
    pub vsync: bool,
    /// Minimum number of swapchain images.
    pub min_image_count: u32,
    /// Acquire attempts per `begin_render` before giving up. Each failed
    /// attempt triggers a swapchain rebuild before the next one.
    pub max_acquire_attempts: u32,
}

impl ViewportSettings {
    /// Create settings for a viewport of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Extent2d::new(width, height),
            format: TextureFormat::Bgra8Unorm,
            vsync: true,
            min_image_count: 3,
            max_acquire_attempts: DEFAULT_MAX_ACQUIRE_ATTEMPTS,
        }
    }

    /// Set the texture format.
    pub fn with_format(mut self, format: TextureFormat) -> Self {
        self.format = format;
        self
    }

    /// Enable or disable vsync.
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    /// Set the minimum swapchain image count.
    pub fn with_min_image_count(mut self, count: u32) -> Self {
        self.min_image_count = count;
        self
    }

    /// Set the acquire attempt bound.
    pub fn with_max_acquire_attempts(mut self, attempts: u32) -> Self {
        self.max_acquire_attempts = attempts;
        self
    }
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}
