//! Off-screen viewport rendering into a [`RenderSurface`].

use std::sync::Arc;

use super::swapchain::CommandBuffer;
use super::{RenderViewport, ViewportState, check_blit_rects};
use crate::backend::{BlitInfo, GpuHandle, SubmitInfo};
use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::pools::RenderSurface;
use crate::resources::Fence;
use crate::types::{Color, Extent2d, FilterMode, Rect};

/// A viewport whose frames land in a texture instead of a window.
///
/// There is no acquire or present step: one command buffer is recorded per
/// frame and submitted with a single fence, which the next `begin_render`
/// waits on. Resizing and vsync do not apply.
pub struct SurfaceViewport {
    device: Arc<GraphicsDevice>,
    target: Arc<RenderSurface>,
    view: GpuHandle,
    fence: Arc<Fence>,
    command_buffer: CommandBuffer,
    state: ViewportState,
    render_pass_open: bool,
    frames_rendered: u64,
}

impl SurfaceViewport {
    pub fn new(
        device: Arc<GraphicsDevice>,
        target: Arc<RenderSurface>,
    ) -> Result<Self, GraphicsError> {
        let fence = device.create_fence(true)?;
        let command_buffer = CommandBuffer::new(device.backend())?;
        let view = device
            .backend()
            .create_image_view(target.texture().handle(), target.format())?;

        Ok(Self {
            device,
            target,
            view,
            fence,
            command_buffer,
            state: ViewportState::Idle,
            render_pass_open: false,
            frames_rendered: 0,
        })
    }

    /// Texture the frames are rendered into.
    pub fn target(&self) -> &Arc<RenderSurface> {
        &self.target
    }

    /// Fence signaled when the last submitted frame completes.
    pub fn fence(&self) -> &Arc<Fence> {
        &self.fence
    }

    pub fn state(&self) -> ViewportState {
        self.state
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Begins a render pass on the target texture.
    pub fn bind_render_target(&mut self) -> Result<(), GraphicsError> {
        self.require_rendering("bind_render_target")?;
        if !self.render_pass_open {
            self.device
                .backend()
                .begin_render_pass(self.command_buffer.handle(), self.view);
            self.render_pass_open = true;
        }
        Ok(())
    }

    fn require_rendering(&self, operation: &str) -> Result<(), GraphicsError> {
        if self.state == ViewportState::Rendering {
            Ok(())
        } else {
            Err(GraphicsError::InvalidState(format!(
                "{operation} requires Rendering, viewport is {:?}",
                self.state
            )))
        }
    }

    fn with_pass_suspended(&self, record: impl FnOnce(GpuHandle)) {
        let backend = self.device.backend();
        let command_buffer = self.command_buffer.handle();
        if self.render_pass_open {
            backend.end_render_pass(command_buffer);
        }
        record(command_buffer);
        if self.render_pass_open {
            backend.begin_render_pass(command_buffer, self.view);
        }
    }
}

impl RenderViewport for SurfaceViewport {
    fn begin_render(&mut self) -> Result<(), GraphicsError> {
        lumen_core::profile_function!();
        if self.state != ViewportState::Idle {
            return Err(GraphicsError::InvalidState(format!(
                "begin_render requires Idle, viewport is {:?}",
                self.state
            )));
        }

        self.fence.wait()?;
        self.fence.reset()?;
        self.device
            .backend()
            .begin_commands(self.command_buffer.handle())?;
        self.state = ViewportState::Rendering;
        Ok(())
    }

    fn end_render(&mut self) -> Result<(), GraphicsError> {
        lumen_core::profile_function!();
        self.require_rendering("end_render")?;

        let backend = Arc::clone(self.device.backend());
        let command_buffer = self.command_buffer.handle();
        if self.render_pass_open {
            backend.end_render_pass(command_buffer);
            self.render_pass_open = false;
        }

        self.state = ViewportState::Idle;
        backend.end_commands(command_buffer)?;
        backend.submit(&SubmitInfo {
            command_buffer,
            wait_semaphore: None,
            signal_semaphore: None,
            fence: Some(self.fence.handle()),
        })?;

        self.frames_rendered += 1;
        log::trace!("Off-screen frame {} submitted", self.frames_rendered);
        Ok(())
    }

    fn on_resize(&mut self, _size: Extent2d) {}

    fn vsync(&mut self, _enabled: bool) {}

    fn blit_target(
        &mut self,
        source: &RenderSurface,
        source_rect: Rect,
        destination_rect: Rect,
        filter: FilterMode,
    ) -> Result<(), GraphicsError> {
        self.require_rendering("blit_target")?;
        check_blit_rects(source.size(), source_rect, self.target.size(), destination_rect)?;

        let blit = BlitInfo {
            source: source.texture().handle(),
            source_rect,
            destination: self.target.texture().handle(),
            destination_rect,
            filter,
        };
        let backend = Arc::clone(self.device.backend());
        self.with_pass_suspended(|command_buffer| backend.blit_texture(command_buffer, &blit));
        Ok(())
    }

    fn clear_color(&mut self, color: Color) -> Result<(), GraphicsError> {
        self.require_rendering("clear_color")?;
        let image = self.target.texture().handle();
        let backend = Arc::clone(self.device.backend());
        self.with_pass_suspended(|command_buffer| backend.clear_image(command_buffer, image, color));
        Ok(())
    }

    fn size(&self) -> Extent2d {
        self.target.size()
    }
}

impl Drop for SurfaceViewport {
    fn drop(&mut self) {
        if let Err(e) = self.fence.wait() {
            log::error!("Failed to wait for off-screen frame while dropping viewport: {e}");
        }
        self.device.backend().destroy_image_view(self.view);
    }
}

impl std::fmt::Debug for SurfaceViewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceViewport")
            .field("target", &self.target.id())
            .field("state", &self.state)
            .field("frames_rendered", &self.frames_rendered)
            .finish()
    }
}
