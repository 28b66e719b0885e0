//! Swapchain-backed viewport presenting to a window surface.

use std::sync::Arc;

use super::swapchain::{CommandBuffer, SwapchainState, SwapchainTarget, SyncObject};
use super::{RenderViewport, ViewportState, ViewportStats, check_blit_rects};
use crate::backend::{
    AcquireOutcome, BlitInfo, GpuBackend, GpuHandle, PresentInfo, PresentOutcome, SubmitInfo,
};
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::pools::RenderSurface;
use crate::swapchain::{PresentMode, ViewportSettings};
use crate::types::{Color, Extent2d, FilterMode, Rect};

/// A viewport that renders into swapchain images and presents them.
///
/// Frame protocol, all on the render thread:
///
/// 1. [`begin_render`](RenderViewport::begin_render) rebuilds the swapchain
///    if flagged, waits for the slot fence, resets it, begins recording and
///    acquires an image. An out-of-date or lost surface marks the swapchain
///    for rebuild and the acquire is retried, up to
///    [`ViewportSettings::max_acquire_attempts`] times.
/// 2. Render commands, [`blit_target`](RenderViewport::blit_target),
///    [`clear_color`](RenderViewport::clear_color).
/// 3. [`end_render`](RenderViewport::end_render) ends recording, submits and
///    presents. Out-of-date, suboptimal and lost results mark the swapchain
///    for rebuild at the next `begin_render`.
pub struct WindowViewport {
    device: Arc<GraphicsDevice>,
    surface: GpuHandle,
    settings: ViewportSettings,
    present_mode: PresentMode,
    size: Extent2d,
    swapchain: SwapchainState,
    sync_objects: Vec<SyncObject>,
    command_buffers: Vec<CommandBuffer>,
    slot: usize,
    image_index: Option<u32>,
    render_pass_open: bool,
    state: ViewportState,
    needs_recreate: bool,
    stats: ViewportStats,
}

impl WindowViewport {
    /// Creates a viewport for `surface` and builds its first swapchain.
    pub fn new(
        device: Arc<GraphicsDevice>,
        surface: GpuHandle,
        settings: ViewportSettings,
    ) -> Result<Self, GraphicsError> {
        let backend = Arc::clone(device.backend());
        let present_mode = backend.present_mode_for(surface, settings.vsync);
        let size = settings.size.at_least_one();

        let mut viewport = Self {
            device,
            surface,
            settings,
            present_mode,
            size,
            swapchain: SwapchainState::new(backend),
            sync_objects: Vec::new(),
            command_buffers: Vec::new(),
            slot: 0,
            image_index: None,
            render_pass_open: false,
            state: ViewportState::Idle,
            needs_recreate: true,
            stats: ViewportStats::default(),
        };
        viewport.recreate_swapchain()?;
        Ok(viewport)
    }

    fn backend(&self) -> &Arc<dyn GpuBackend> {
        self.device.backend()
    }

    /// Rebuilds the swapchain and everything sized by it, if flagged.
    ///
    /// Returns `Ok(false)` when no rebuild was needed. The flag is cleared
    /// before any work starts; a failed rebuild sets it again.
    pub fn recreate_swapchain(&mut self) -> Result<bool, GraphicsError> {
        if !self.needs_recreate {
            return Ok(false);
        }
        lumen_core::profile_function!();
        self.needs_recreate = false;

        if let Err(e) = self.rebuild() {
            self.needs_recreate = true;
            log::error!("Swapchain rebuild failed: {e}");
            return Err(e);
        }

        self.stats.swapchain_builds += 1;
        log::info!(
            "Swapchain built: {}x{}, {} images, {:?}",
            self.swapchain.extent().width,
            self.swapchain.extent().height,
            self.swapchain.image_count(),
            self.present_mode
        );
        Ok(true)
    }

    fn rebuild(&mut self) -> Result<(), GraphicsError> {
        self.device.wait_idle()?;

        self.image_index = None;
        self.render_pass_open = false;
        self.swapchain.rebuild(
            self.surface,
            self.size,
            self.settings.format,
            self.present_mode,
            self.settings.min_image_count,
        )?;

        let image_count = self.swapchain.image_count();
        let backend = Arc::clone(self.backend());
        self.sync_objects = (0..image_count)
            .map(|_| SyncObject::new(&backend))
            .collect::<Result<Vec<_>, _>>()?;
        self.command_buffers = (0..image_count)
            .map(|_| CommandBuffer::new(&backend))
            .collect::<Result<Vec<_>, _>>()?;
        self.slot = 0;
        Ok(())
    }

    /// Waits for the slot fence, resets it, begins recording and acquires.
    ///
    /// Returns `Ok(false)` if the acquire hit a recoverable condition.
    fn prepare_slot(&mut self) -> Result<bool, GraphicsError> {
        let backend = Arc::clone(self.backend());
        let (fence, command_buffer) = self.slot_handles()?;

        backend.wait_fence(fence)?;
        backend.reset_fence(fence)?;
        backend.begin_commands(command_buffer)?;
        self.acquire_image_index()
    }

    /// Acquires the next swapchain image into the current slot.
    fn acquire_image_index(&mut self) -> Result<bool, GraphicsError> {
        lumen_core::profile_scope!("acquire_image_index");
        let swapchain = self
            .swapchain
            .handle()
            .ok_or_else(|| GraphicsError::InvalidState("no swapchain".to_string()))?;
        let image_available = self.sync_objects[self.slot].image_available();

        match self.backend().acquire_next_image(swapchain, image_available)? {
            AcquireOutcome::Acquired { index, suboptimal } => {
                if suboptimal {
                    log::debug!("Acquired suboptimal swapchain image {index}, rebuilding next frame");
                    self.needs_recreate = true;
                }
                log::trace!("Acquired swapchain image {index} (slot {})", self.slot);
                self.image_index = Some(index);
                Ok(true)
            }
            AcquireOutcome::OutOfDate => {
                log::debug!("Swapchain out of date during acquire");
                self.needs_recreate = true;
                Ok(false)
            }
            AcquireOutcome::SurfaceLost => {
                log::warn!("Surface lost during acquire, rebuilding swapchain");
                self.needs_recreate = true;
                Ok(false)
            }
        }
    }

    fn slot_handles(&self) -> Result<(GpuHandle, GpuHandle), GraphicsError> {
        match (
            self.sync_objects.get(self.slot),
            self.command_buffers.get(self.slot),
        ) {
            (Some(sync), Some(commands)) => Ok((sync.fence(), commands.handle())),
            _ => Err(GraphicsError::InvalidState(format!(
                "frame slot {} has no sync objects",
                self.slot
            ))),
        }
    }

    fn current_target(&self) -> Result<SwapchainTarget, GraphicsError> {
        self.image_index
            .and_then(|index| self.swapchain.target(index))
            .ok_or_else(|| GraphicsError::InvalidState("no swapchain image acquired".to_string()))
    }

    fn require_state(&self, expected: ViewportState, operation: &str) -> Result<(), GraphicsError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(GraphicsError::InvalidState(format!(
                "{operation} requires {expected:?}, viewport is {:?}",
                self.state
            )))
        }
    }

    /// Begins a render pass on the acquired image.
    pub fn bind_render_target(&mut self) -> Result<(), GraphicsError> {
        self.require_state(ViewportState::Rendering, "bind_render_target")?;
        if !self.render_pass_open {
            let target = self.current_target()?;
            let (_, command_buffer) = self.slot_handles()?;
            self.backend().begin_render_pass(command_buffer, target.view);
            self.render_pass_open = true;
        }
        Ok(())
    }

    /// Runs `record` outside any open render pass, reopening it afterwards.
    fn outside_render_pass(
        &mut self,
        record: impl FnOnce(&dyn GpuBackend, GpuHandle, SwapchainTarget),
    ) -> Result<(), GraphicsError> {
        let target = self.current_target()?;
        let (_, command_buffer) = self.slot_handles()?;
        let backend = Arc::clone(self.backend());

        if self.render_pass_open {
            backend.end_render_pass(command_buffer);
        }
        record(backend.as_ref(), command_buffer, target);
        if self.render_pass_open {
            backend.begin_render_pass(command_buffer, target.view);
        }
        Ok(())
    }

    /// Handles a device orientation change by rebuilding the swapchain.
    pub fn on_orientation_changed(&mut self) {
        log::debug!("Orientation changed, rebuilding swapchain next frame");
        self.needs_recreate = true;
    }

    /// Marks the swapchain for rebuild at the next `begin_render`.
    pub fn request_recreate(&mut self) {
        self.needs_recreate = true;
    }

    pub fn state(&self) -> ViewportState {
        self.state
    }

    pub fn needs_recreate(&self) -> bool {
        self.needs_recreate
    }

    /// Image acquired by the current frame.
    pub fn image_index(&self) -> Option<u32> {
        self.image_index
    }

    pub fn image_count(&self) -> usize {
        self.swapchain.image_count()
    }

    pub fn sync_object_count(&self) -> usize {
        self.sync_objects.len()
    }

    /// Present mode the next swapchain build will use.
    pub fn present_mode(&self) -> PresentMode {
        self.present_mode
    }

    pub fn swapchain(&self) -> &SwapchainState {
        &self.swapchain
    }

    pub fn settings(&self) -> &ViewportSettings {
        &self.settings
    }

    pub fn stats(&self) -> ViewportStats {
        self.stats
    }
}

impl RenderViewport for WindowViewport {
    fn begin_render(&mut self) -> Result<(), GraphicsError> {
        lumen_core::profile_function!();
        self.require_state(ViewportState::Idle, "begin_render")?;

        let attempts = self.settings.max_acquire_attempts.max(1);
        for attempt in 0..attempts {
            if attempt > 0 {
                self.stats.acquire_retries += 1;
                log::debug!("Retrying image acquire (attempt {})", attempt + 1);
            }
            if let Err(e) = self.recreate_swapchain() {
                self.state = ViewportState::Idle;
                return Err(e);
            }

            self.state = ViewportState::Acquiring;
            match self.prepare_slot() {
                Ok(true) => {
                    self.state = ViewportState::Rendering;
                    return Ok(());
                }
                Ok(false) => {}
                Err(e) => {
                    // The slot fence may already be reset; rebuilding replaces it.
                    self.needs_recreate = true;
                    self.state = ViewportState::Idle;
                    return Err(e);
                }
            }
        }

        self.state = ViewportState::Idle;
        Err(GraphicsError::AcquireRetriesExhausted { attempts })
    }

    fn end_render(&mut self) -> Result<(), GraphicsError> {
        lumen_core::profile_function!();
        self.require_state(ViewportState::Rendering, "end_render")?;

        let swapchain = self
            .swapchain
            .handle()
            .ok_or_else(|| GraphicsError::InvalidState("no swapchain".to_string()))?;
        let image_index = self
            .image_index
            .ok_or_else(|| GraphicsError::InvalidState("no swapchain image acquired".to_string()))?;
        let (fence, command_buffer) = self.slot_handles()?;
        let sync = &self.sync_objects[self.slot];
        let (image_available, render_finished) = (sync.image_available(), sync.render_finished());
        let backend = Arc::clone(self.backend());

        if self.render_pass_open {
            backend.end_render_pass(command_buffer);
            self.render_pass_open = false;
        }

        let submitted = backend.end_commands(command_buffer).and_then(|()| {
            backend.submit(&SubmitInfo {
                command_buffer,
                wait_semaphore: Some(image_available),
                signal_semaphore: Some(render_finished),
                fence: Some(fence),
            })
        });
        if let Err(e) = submitted {
            self.needs_recreate = true;
            self.image_index = None;
            self.state = ViewportState::Idle;
            return Err(e);
        }

        self.state = ViewportState::Presenting;
        let result = backend.present(&PresentInfo {
            swapchain,
            image_index,
            wait_semaphore: render_finished,
        });

        self.image_index = None;
        self.slot = (self.slot + 1) % self.sync_objects.len().max(1);
        self.state = ViewportState::Idle;
        lumen_core::frame_mark!();

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Present failed: {e}");
                return Err(GraphicsError::PresentFailed(e.to_string()));
            }
        };

        self.stats.frames_presented += 1;
        match outcome {
            PresentOutcome::Success => {
                log::trace!("Presented swapchain image {image_index}");
            }
            PresentOutcome::Suboptimal => {
                self.stats.suboptimal_presents += 1;
                self.needs_recreate = true;
                log::debug!("Present reported suboptimal swapchain, rebuilding next frame");
            }
            PresentOutcome::OutOfDate => {
                self.needs_recreate = true;
                log::debug!("Swapchain out of date during present, rebuilding next frame");
            }
            PresentOutcome::SurfaceLost => {
                self.needs_recreate = true;
                log::warn!("Surface lost during present, rebuilding next frame");
            }
        }
        crate::profiling::plot_viewport_stats(self.stats);
        Ok(())
    }

    fn on_resize(&mut self, size: Extent2d) {
        let size = size.at_least_one();
        self.size = size;
        if size != self.swapchain.extent() {
            log::debug!("Viewport resized to {}x{}", size.width, size.height);
            self.needs_recreate = true;
        }
    }

    fn vsync(&mut self, enabled: bool) {
        self.settings.vsync = enabled;
        let mode = self.backend().present_mode_for(self.surface, enabled);
        if mode != self.present_mode {
            log::debug!("Present mode {:?} -> {mode:?}", self.present_mode);
            self.present_mode = mode;
            self.needs_recreate = true;
        }
    }

    fn blit_target(
        &mut self,
        source: &RenderSurface,
        source_rect: Rect,
        destination_rect: Rect,
        filter: FilterMode,
    ) -> Result<(), GraphicsError> {
        self.require_state(ViewportState::Rendering, "blit_target")?;
        check_blit_rects(source.size(), source_rect, self.swapchain.extent(), destination_rect)?;

        let source = source.texture().handle();
        self.outside_render_pass(|backend, command_buffer, target| {
            backend.blit_texture(
                command_buffer,
                &BlitInfo {
                    source,
                    source_rect,
                    destination: target.image,
                    destination_rect,
                    filter,
                },
            );
        })
    }

    fn clear_color(&mut self, color: Color) -> Result<(), GraphicsError> {
        self.require_state(ViewportState::Rendering, "clear_color")?;
        self.outside_render_pass(|backend, command_buffer, target| {
            backend.clear_image(command_buffer, target.image, color);
        })
    }

    fn size(&self) -> Extent2d {
        self.size
    }
}

impl Drop for WindowViewport {
    fn drop(&mut self) {
        if let Err(e) = self.device.wait_idle() {
            log::error!("Failed to wait for device idle while dropping viewport: {e}");
        }
    }
}

impl std::fmt::Debug for WindowViewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowViewport")
            .field("state", &self.state)
            .field("size", &self.size)
            .field("swapchain", &self.swapchain)
            .field("needs_recreate", &self.needs_recreate)
            .finish()
    }
}
