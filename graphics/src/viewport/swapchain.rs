//! Swapchain images, per-slot sync objects and command buffers.
//!
//! Everything here is owned by a [`WindowViewport`](super::WindowViewport)
//! and rebuilt wholesale when the swapchain is recreated. Objects destroy
//! their backend handles on drop.

use std::sync::Arc;

use crate::backend::{GpuBackend, GpuHandle, SwapchainRequest};
use crate::error::GraphicsError;
use crate::swapchain::PresentMode;
use crate::types::{Extent2d, TextureFormat};

/// Semaphores and fence guarding one frame slot.
///
/// - `image_available` is signaled by acquire and waited on by submit
/// - `render_finished` is signaled by submit and waited on by present
/// - `fence` is signaled by submit and waited on by the CPU before the slot
///   is reused; it starts signaled so the first wait passes
pub struct SyncObject {
    backend: Arc<dyn GpuBackend>,
    image_available: GpuHandle,
    render_finished: GpuHandle,
    fence: GpuHandle,
}

impl SyncObject {
    pub(crate) fn new(backend: &Arc<dyn GpuBackend>) -> Result<Self, GraphicsError> {
        let image_available = backend.create_semaphore()?;
        let render_finished = match backend.create_semaphore() {
            Ok(semaphore) => semaphore,
            Err(e) => {
                backend.destroy_semaphore(image_available);
                return Err(e);
            }
        };
        let fence = match backend.create_fence(true) {
            Ok(fence) => fence,
            Err(e) => {
                backend.destroy_semaphore(image_available);
                backend.destroy_semaphore(render_finished);
                return Err(e);
            }
        };

        Ok(Self {
            backend: Arc::clone(backend),
            image_available,
            render_finished,
            fence,
        })
    }

    pub fn image_available(&self) -> GpuHandle {
        self.image_available
    }

    pub fn render_finished(&self) -> GpuHandle {
        self.render_finished
    }

    pub fn fence(&self) -> GpuHandle {
        self.fence
    }
}

impl Drop for SyncObject {
    fn drop(&mut self) {
        self.backend.destroy_semaphore(self.image_available);
        self.backend.destroy_semaphore(self.render_finished);
        self.backend.destroy_fence(self.fence);
    }
}

impl std::fmt::Debug for SyncObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncObject")
            .field("image_available", &self.image_available)
            .field("render_finished", &self.render_finished)
            .field("fence", &self.fence)
            .finish()
    }
}

/// A command buffer owned by one frame slot.
pub(crate) struct CommandBuffer {
    backend: Arc<dyn GpuBackend>,
    handle: GpuHandle,
}

impl CommandBuffer {
    pub(crate) fn new(backend: &Arc<dyn GpuBackend>) -> Result<Self, GraphicsError> {
        Ok(Self {
            handle: backend.allocate_command_buffer()?,
            backend: Arc::clone(backend),
        })
    }

    pub(crate) fn handle(&self) -> GpuHandle {
        self.handle
    }
}

impl Drop for CommandBuffer {
    fn drop(&mut self) {
        self.backend.free_command_buffer(self.handle);
    }
}

/// A swapchain image and the view render passes target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainTarget {
    pub image: GpuHandle,
    pub view: GpuHandle,
}

/// The live swapchain and its per-image render targets.
pub struct SwapchainState {
    backend: Arc<dyn GpuBackend>,
    handle: Option<GpuHandle>,
    targets: Vec<SwapchainTarget>,
    extent: Extent2d,
    format: TextureFormat,
    present_mode: PresentMode,
}

impl SwapchainState {
    pub(crate) fn new(backend: Arc<dyn GpuBackend>) -> Self {
        Self {
            backend,
            handle: None,
            targets: Vec::new(),
            extent: Extent2d::default(),
            format: TextureFormat::default(),
            present_mode: PresentMode::default(),
        }
    }

    /// Destroys the per-image views. The swapchain itself stays alive so it
    /// can be passed as a hint to the next build.
    pub(crate) fn destroy_targets(&mut self) {
        for target in self.targets.drain(..) {
            self.backend.destroy_image_view(target.view);
        }
    }

    /// Builds a new swapchain, handing the current one to the backend as a
    /// hint and destroying it afterwards, then creates one view per image.
    pub(crate) fn rebuild(
        &mut self,
        surface: GpuHandle,
        extent: Extent2d,
        format: TextureFormat,
        present_mode: PresentMode,
        min_image_count: u32,
    ) -> Result<(), GraphicsError> {
        self.destroy_targets();

        let old_swapchain = self.handle;
        let created = self.backend.create_swapchain(&SwapchainRequest {
            surface,
            extent,
            format,
            present_mode,
            min_image_count,
            old_swapchain,
        })?;
        if let Some(old) = old_swapchain {
            self.backend.destroy_swapchain(old);
        }

        self.handle = Some(created.swapchain);
        self.extent = created.extent;
        self.format = created.format;
        self.present_mode = present_mode;

        for image in created.images {
            let view = self.backend.create_image_view(image, created.format)?;
            self.targets.push(SwapchainTarget { image, view });
        }
        Ok(())
    }

    pub fn handle(&self) -> Option<GpuHandle> {
        self.handle
    }

    pub fn image_count(&self) -> usize {
        self.targets.len()
    }

    pub fn target(&self, index: u32) -> Option<SwapchainTarget> {
        self.targets.get(index as usize).copied()
    }

    pub fn extent(&self) -> Extent2d {
        self.extent
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn present_mode(&self) -> PresentMode {
        self.present_mode
    }
}

impl Drop for SwapchainState {
    fn drop(&mut self) {
        self.destroy_targets();
        if let Some(handle) = self.handle.take() {
            self.backend.destroy_swapchain(handle);
        }
    }
}

impl std::fmt::Debug for SwapchainState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwapchainState")
            .field("handle", &self.handle)
            .field("images", &self.targets.len())
            .field("extent", &self.extent)
            .field("present_mode", &self.present_mode)
            .finish()
    }
}
