//! GPU backend abstraction layer.
//!
//! The pools and viewports never talk to a graphics API directly. Every
//! device-side operation goes through the [`GpuBackend`] trait, which deals
//! in opaque [`GpuHandle`]s.
//!
//! # Available Backends
//!
//! - `dummy` (default): in-memory backend with scriptable presentation
//!   results, used by tests and benchmarks
//!
//! # Architecture
//!
//! Each backend implements the [`GpuBackend`] trait, which provides:
//! - Resource creation (buffers, textures, timestamp and statistics queries)
//! - Synchronization primitives (fences, semaphores, idle waits)
//! - Command buffer recording and submission
//! - Swapchain creation, image acquisition and presentation

#[cfg(any(test, feature = "dummy"))]
pub mod dummy;

use std::sync::Arc;

use crate::error::GraphicsError;
use crate::swapchain::PresentMode;
use crate::types::{
    BufferDescriptor, Color, Extent2d, FilterMode, Rect, TextureDescriptor, TextureFormat,
};

/// Opaque handle to a backend object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GpuHandle(u64);

impl GpuHandle {
    /// Wraps a raw backend value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw backend value.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Parameters for building (or rebuilding) a swapchain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapchainRequest {
    /// Platform surface the swapchain presents to.
    pub surface: GpuHandle,
    /// Requested image size.
    pub extent: Extent2d,
    /// Requested image format.
    pub format: TextureFormat,
    /// Presentation mode.
    pub present_mode: PresentMode,
    /// Minimum number of images.
    pub min_image_count: u32,
    /// Previous swapchain, passed as a reuse hint.
    pub old_swapchain: Option<GpuHandle>,
}

/// A freshly created swapchain and its images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapchainImages {
    /// Swapchain handle.
    pub swapchain: GpuHandle,
    /// Images owned by the swapchain, in index order.
    pub images: Vec<GpuHandle>,
    /// Actual image size chosen by the backend.
    pub extent: Extent2d,
    /// Actual image format chosen by the backend.
    pub format: TextureFormat,
}

/// Result of asking the swapchain for the next image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image is available at `index`.
    Acquired {
        /// Swapchain image index.
        index: u32,
        /// The swapchain still works but no longer matches the surface.
        suboptimal: bool,
    },
    /// The swapchain no longer matches the surface.
    OutOfDate,
    /// The platform surface went away.
    SurfaceLost,
}

/// Result of queueing an image for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    /// Presented.
    Success,
    /// Presented, but the swapchain should be rebuilt.
    Suboptimal,
    /// Not presented; the swapchain must be rebuilt.
    OutOfDate,
    /// Not presented; the platform surface went away.
    SurfaceLost,
}

/// A queue submission of one command buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitInfo {
    /// Recorded command buffer.
    pub command_buffer: GpuHandle,
    /// Semaphore to wait on before execution.
    pub wait_semaphore: Option<GpuHandle>,
    /// Semaphore signaled when execution finishes.
    pub signal_semaphore: Option<GpuHandle>,
    /// Fence signaled when execution finishes.
    pub fence: Option<GpuHandle>,
}

/// A queue presentation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresentInfo {
    /// Swapchain to present to.
    pub swapchain: GpuHandle,
    /// Image index returned by the last acquire.
    pub image_index: u32,
    /// Semaphore signaled by the frame's submission.
    pub wait_semaphore: GpuHandle,
}

/// A scaled image copy recorded into a command buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlitInfo {
    /// Source image.
    pub source: GpuHandle,
    /// Region of the source.
    pub source_rect: Rect,
    /// Destination image.
    pub destination: GpuHandle,
    /// Region of the destination.
    pub destination_rect: Rect,
    /// Filter used when the regions differ in size.
    pub filter: FilterMode,
}

/// The device-level interface consumed by pools and viewports.
///
/// Creation functions return new handles; the matching `destroy_*`
/// functions must be called exactly once per handle. Resource wrappers
/// such as [`Buffer`](crate::Buffer) take care of that on drop.
pub trait GpuBackend: Send + Sync + 'static {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    // Resources

    /// Creates a buffer, optionally uploading `initial_data`.
    fn create_buffer(
        &self,
        descriptor: &BufferDescriptor,
        initial_data: Option<&[u8]>,
    ) -> Result<GpuHandle, GraphicsError>;
    fn destroy_buffer(&self, buffer: GpuHandle);
    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<GpuHandle, GraphicsError>;
    fn destroy_texture(&self, texture: GpuHandle);
    /// Creates a single GPU timestamp query.
    fn create_timestamp(&self) -> Result<GpuHandle, GraphicsError>;
    fn destroy_timestamp(&self, timestamp: GpuHandle);
    /// Creates a pipeline-statistics query.
    fn create_pipeline_statistics(&self) -> Result<GpuHandle, GraphicsError>;
    fn destroy_pipeline_statistics(&self, statistics: GpuHandle);

    // Synchronization

    fn create_fence(&self, signaled: bool) -> Result<GpuHandle, GraphicsError>;
    fn destroy_fence(&self, fence: GpuHandle);
    /// Blocks until the fence is signaled. No timeout.
    fn wait_fence(&self, fence: GpuHandle) -> Result<(), GraphicsError>;
    fn reset_fence(&self, fence: GpuHandle) -> Result<(), GraphicsError>;
    fn is_fence_signaled(&self, fence: GpuHandle) -> bool;
    fn create_semaphore(&self) -> Result<GpuHandle, GraphicsError>;
    fn destroy_semaphore(&self, semaphore: GpuHandle);
    /// Blocks until all submitted work has finished.
    fn wait_idle(&self) -> Result<(), GraphicsError>;

    // Commands

    fn allocate_command_buffer(&self) -> Result<GpuHandle, GraphicsError>;
    fn free_command_buffer(&self, command_buffer: GpuHandle);
    /// Resets and begins recording.
    fn begin_commands(&self, command_buffer: GpuHandle) -> Result<(), GraphicsError>;
    fn end_commands(&self, command_buffer: GpuHandle) -> Result<(), GraphicsError>;
    /// Begins a render pass targeting `image_view`.
    fn begin_render_pass(&self, command_buffer: GpuHandle, image_view: GpuHandle);
    fn end_render_pass(&self, command_buffer: GpuHandle);
    fn blit_texture(&self, command_buffer: GpuHandle, blit: &BlitInfo);
    fn clear_image(&self, command_buffer: GpuHandle, image: GpuHandle, color: Color);
    fn submit(&self, submit: &SubmitInfo) -> Result<(), GraphicsError>;

    // Presentation

    /// Resolves the present mode used for a surface with or without vsync.
    fn present_mode_for(&self, surface: GpuHandle, vsync: bool) -> PresentMode;
    fn create_swapchain(&self, request: &SwapchainRequest)
    -> Result<SwapchainImages, GraphicsError>;
    fn destroy_swapchain(&self, swapchain: GpuHandle);
    fn create_image_view(
        &self,
        image: GpuHandle,
        format: TextureFormat,
    ) -> Result<GpuHandle, GraphicsError>;
    fn destroy_image_view(&self, view: GpuHandle);
    /// Acquires the next image, signaling `signal_semaphore` when it is ready.
    ///
    /// Recoverable conditions are reported through [`AcquireOutcome`];
    /// `Err` means a fatal failure.
    fn acquire_next_image(
        &self,
        swapchain: GpuHandle,
        signal_semaphore: GpuHandle,
    ) -> Result<AcquireOutcome, GraphicsError>;
    /// Queues an image for presentation.
    ///
    /// Recoverable conditions are reported through [`PresentOutcome`];
    /// `Err` means a fatal failure.
    fn present(&self, present: &PresentInfo) -> Result<PresentOutcome, GraphicsError>;
}

/// Creates the default backend.
pub fn create_backend() -> Result<Arc<dyn GpuBackend>, GraphicsError> {
    #[cfg(any(test, feature = "dummy"))]
    {
        log::info!("Using dummy GPU backend");
        Ok(Arc::new(dummy::DummyBackend::new()))
    }

    #[cfg(not(any(test, feature = "dummy")))]
    {
        Err(GraphicsError::ResourceCreationFailed(
            "no GPU backend enabled".to_string(),
        ))
    }
}
