//! # Lumen Graphics
//!
//! Frame-resource reuse pools and viewport presentation for the Lumen
//! renderer.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`GpuBackend`] - Trait a graphics API implements; [`backend::dummy`] is an
//!   in-memory implementation for tests
//! - [`GraphicsDevice`] - Creates reference-counted [`Buffer`]s, [`Texture`]s,
//!   [`Fence`]s, queries and [`CommandContext`]s
//! - [`pools`] - Bucketed reuse pools that recycle those resources across frames
//! - [`viewport`] - Swapchain-backed and off-screen render viewports
//!
//! ## Example
//!
//! ```ignore
//! use lumen_graphics::{GraphicsDevice, PoolSettings, RenderPools, RenderViewport};
//!
//! let device = GraphicsDevice::create_default()?;
//! let mut pools = RenderPools::new(device.clone(), PoolSettings::default());
//!
//! viewport.render_frame(|vp| {
//!     let scene = pools.render_surfaces.request_transient_render_surface(format, size)?;
//!     // ... render into `scene` ...
//!     vp.blit_target(&scene, rect, rect, FilterMode::Linear)
//! })?;
//! pools.update_all();
//! ```

pub mod backend;
pub mod device;
pub mod error;
pub mod pools;
pub mod profiling;
pub mod resources;
pub mod swapchain;
pub mod types;
pub mod viewport;

// Re-export main types for convenience
pub use backend::{GpuBackend, GpuHandle};
pub use device::{DeviceCapabilities, GraphicsDevice};
pub use error::GraphicsError;
pub use pools::{
    BufferPool, ContextPool, FencePool, LIVE_THRESHOLD, PipelineStatisticsPool, PoolSettings,
    PoolTicker, RenderPools, RenderSurface, RenderSurfacePool, ResourcePool, SharedPools,
    SurfacePool, TimestampPool, TransientScope,
};
pub use resources::{
    Buffer, CommandContext, Fence, FenceStatus, PipelineStatistics, ResourceId, Texture,
    Timestamp,
};
pub use swapchain::{PresentMode, ViewportSettings};
pub use types::{
    BufferDescriptor, BufferUsage, Color, Extent2d, Extent3d, FilterMode, Rect, TextureDescriptor,
    TextureFormat, TextureType, TextureUsage,
};
pub use viewport::{
    RenderViewport, SurfaceViewport, ViewportState, ViewportStats, WindowViewport,
};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
///
/// This should be called before using any graphics functionality.
pub fn init() {
    profiling::init_profiling();
    log::info!("Lumen Graphics v{} initialized", VERSION);
}
