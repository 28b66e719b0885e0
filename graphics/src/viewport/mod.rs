//! Render viewports: where a frame's pixels end up.
//!
//! A [`WindowViewport`] renders into swapchain images and presents them,
//! absorbing out-of-date and lost surfaces by rebuilding the swapchain. A
//! [`SurfaceViewport`] renders into an off-screen texture and never presents.
//!
//! ```text
//!           begin_render                    end_render
//!   Idle ──► Acquiring ──acquired──► Rendering ──► Presenting ──► Idle
//!              │   ▲
//!   out of date│   │ rebuild swapchain, retry (bounded)
//!              └───┘
//! ```

mod surface;
mod swapchain;
mod window;

pub use surface::SurfaceViewport;
pub use swapchain::{SwapchainState, SwapchainTarget, SyncObject};
pub use window::WindowViewport;

use crate::error::GraphicsError;
use crate::pools::RenderSurface;
use crate::types::{Color, Extent2d, FilterMode, Rect};

/// Frame state of a viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewportState {
    /// Between frames.
    #[default]
    Idle,
    /// Waiting for the slot fence or a swapchain image.
    Acquiring,
    /// Recording commands for the current frame.
    Rendering,
    /// Submitted and handing the image to the presentation engine.
    Presenting,
}

/// Presentation counters since the viewport was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewportStats {
    pub frames_presented: u64,
    /// Number of swapchain builds, the initial one included.
    pub swapchain_builds: u64,
    /// Acquire attempts beyond the first in a `begin_render`.
    pub acquire_retries: u64,
    pub suboptimal_presents: u64,
}

/// A target a renderer draws one frame at a time into.
///
/// Every call happens on the render thread, in the order
/// `begin_render`, any number of recording calls, `end_render`.
pub trait RenderViewport {
    /// Starts a frame. Fails with [`GraphicsError::InvalidState`] if a frame
    /// is already in progress.
    fn begin_render(&mut self) -> Result<(), GraphicsError>;

    /// Finishes the frame: submits and, for windows, presents.
    fn end_render(&mut self) -> Result<(), GraphicsError>;

    /// Notifies the viewport that its drawable size changed.
    fn on_resize(&mut self, size: Extent2d);

    /// Enables or disables vertical sync.
    fn vsync(&mut self, enabled: bool);

    /// Copies a region of `source` into the frame's target.
    fn blit_target(
        &mut self,
        source: &RenderSurface,
        source_rect: Rect,
        destination_rect: Rect,
        filter: FilterMode,
    ) -> Result<(), GraphicsError>;

    /// Clears the frame's target.
    fn clear_color(&mut self, color: Color) -> Result<(), GraphicsError>;

    /// Current drawable size.
    fn size(&self) -> Extent2d;

    /// Runs `record` between `begin_render` and `end_render`.
    ///
    /// If `record` fails the frame is still ended, and the recording error is
    /// returned.
    fn render_frame<F>(&mut self, record: F) -> Result<(), GraphicsError>
    where
        F: FnOnce(&mut Self) -> Result<(), GraphicsError>,
        Self: Sized,
    {
        self.begin_render()?;
        let recorded = record(self);
        let ended = self.end_render();
        recorded.and(ended)
    }
}

fn rect_within(rect: Rect, extent: Extent2d) -> bool {
    rect.x >= 0
        && rect.y >= 0
        && rect.width > 0
        && rect.height > 0
        && rect.x as u64 + rect.width as u64 <= extent.width as u64
        && rect.y as u64 + rect.height as u64 <= extent.height as u64
}

/// Validates blit regions against the source and destination sizes.
pub(crate) fn check_blit_rects(
    source_size: Extent2d,
    source_rect: Rect,
    destination_size: Extent2d,
    destination_rect: Rect,
) -> Result<(), GraphicsError> {
    if !rect_within(source_rect, source_size) {
        return Err(GraphicsError::InvalidParameter(format!(
            "blit source {source_rect:?} outside {}x{} surface",
            source_size.width, source_size.height
        )));
    }
    if !rect_within(destination_rect, destination_size) {
        return Err(GraphicsError::InvalidParameter(format!(
            "blit destination {destination_rect:?} outside {}x{} target",
            destination_size.width, destination_size.height
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blit_rects_must_fit() {
        let size = Extent2d::new(64, 32);
        let full = Rect::from_extent(size);
        assert!(check_blit_rects(size, full, size, full).is_ok());
        assert!(check_blit_rects(size, Rect::new(1, 0, 64, 32), size, full).is_err());
        assert!(check_blit_rects(size, full, size, Rect::new(-1, 0, 8, 8)).is_err());
        assert!(check_blit_rects(size, Rect::new(0, 0, 0, 8), size, full).is_err());
    }

    #[test]
    fn state_defaults_to_idle() {
        assert_eq!(ViewportState::default(), ViewportState::Idle);
        assert_eq!(ViewportStats::default().frames_presented, 0);
    }
}
