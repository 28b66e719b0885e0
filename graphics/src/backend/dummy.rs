//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't perform actual GPU operations but provides
//! a valid implementation for testing the graphics API without
//! requiring GPU hardware. Submitted work completes immediately, so a fence
//! passed to [`GpuBackend::submit`] is signaled before `submit` returns.
//!
//! Tests can script the results of acquire and present calls, inject
//! allocation failures, inspect live object counts and read back the
//! ordered log of frame-protocol calls.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use super::{
    AcquireOutcome, BlitInfo, GpuBackend, GpuHandle, PresentInfo, PresentOutcome, SubmitInfo,
    SwapchainImages, SwapchainRequest,
};
use crate::error::GraphicsError;
use crate::swapchain::PresentMode;
use crate::types::{BufferDescriptor, Color, TextureDescriptor, TextureFormat};

/// Kind of object tracked by the dummy backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Surface,
    Buffer,
    Texture,
    Timestamp,
    PipelineStatistics,
    Fence,
    Semaphore,
    CommandBuffer,
    Swapchain,
    SwapchainImage,
    ImageView,
}

/// A recorded frame-protocol call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    WaitFence(GpuHandle),
    ResetFence(GpuHandle),
    BeginCommands(GpuHandle),
    EndCommands(GpuHandle),
    BeginRenderPass(GpuHandle),
    EndRenderPass,
    Blit(BlitInfo),
    Clear(GpuHandle),
    Submit(SubmitInfo),
    Acquire(GpuHandle),
    Present(PresentInfo),
    WaitIdle,
    CreateSwapchain {
        swapchain: GpuHandle,
        old_swapchain: Option<GpuHandle>,
        image_count: usize,
        present_mode: PresentMode,
    },
    DestroySwapchain(GpuHandle),
}

/// Number of frame-protocol calls kept; older calls are dropped first.
pub const CALL_LOG_CAPACITY: usize = 4096;

#[derive(Default)]
struct DummyState {
    next_handle: u64,
    live: HashMap<GpuHandle, ObjectKind>,
    created: HashMap<ObjectKind, u64>,
    fences: HashMap<GpuHandle, bool>,
    swapchain_images: HashMap<GpuHandle, Vec<GpuHandle>>,
    acquire_cursor: HashMap<GpuHandle, u32>,
    acquire_script: VecDeque<Result<AcquireOutcome, GraphicsError>>,
    present_script: VecDeque<Result<PresentOutcome, GraphicsError>>,
    swapchain_failures: VecDeque<GraphicsError>,
    swapchain_image_count: Option<u32>,
    unsynced_present_mode: PresentMode,
    failing_allocations: u32,
    invalid_destroys: u64,
    calls: VecDeque<BackendCall>,
}

impl DummyState {
    fn allocate(&mut self, kind: ObjectKind) -> GpuHandle {
        self.next_handle += 1;
        let handle = GpuHandle::from_raw(self.next_handle);
        self.live.insert(handle, kind);
        *self.created.entry(kind).or_insert(0) += 1;
        handle
    }

    fn allocate_resource(&mut self, kind: ObjectKind) -> Result<GpuHandle, GraphicsError> {
        if self.failing_allocations > 0 {
            self.failing_allocations -= 1;
            log::trace!("DummyBackend: injected allocation failure for {kind:?}");
            return Err(GraphicsError::OutOfMemory);
        }
        Ok(self.allocate(kind))
    }

    fn log(&mut self, call: BackendCall) {
        if self.calls.len() == CALL_LOG_CAPACITY {
            self.calls.pop_front();
        }
        self.calls.push_back(call);
    }

    fn release(&mut self, handle: GpuHandle, kind: ObjectKind) {
        match self.live.get(&handle) {
            Some(live_kind) if *live_kind == kind => {
                self.live.remove(&handle);
            }
            _ => {
                log::error!("DummyBackend: destroying unknown {kind:?} {handle:?}");
                self.invalid_destroys += 1;
            }
        }
    }
}

/// Dummy GPU backend.
pub struct DummyBackend {
    state: Mutex<DummyState>,
}

impl DummyBackend {
    /// Create a new dummy backend.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DummyState {
                unsynced_present_mode: PresentMode::Immediate,
                ..Default::default()
            }),
        }
    }

    /// Creates a platform surface handle, standing in for a window.
    pub fn create_surface(&self) -> GpuHandle {
        self.state.lock().allocate(ObjectKind::Surface)
    }

    /// Queues a result for an upcoming `acquire_next_image` call.
    ///
    /// When the queue is empty, acquire succeeds with round-robin indices.
    pub fn push_acquire_result(&self, result: Result<AcquireOutcome, GraphicsError>) {
        self.state.lock().acquire_script.push_back(result);
    }

    /// Queues a result for an upcoming `present` call.
    ///
    /// When the queue is empty, present succeeds.
    pub fn push_present_result(&self, result: Result<PresentOutcome, GraphicsError>) {
        self.state.lock().present_script.push_back(result);
    }

    /// Makes the next `create_swapchain` call fail with `error`.
    pub fn fail_next_swapchain(&self, error: GraphicsError) {
        self.state.lock().swapchain_failures.push_back(error);
    }

    /// Overrides the image count of swapchains created from now on.
    pub fn set_swapchain_image_count(&self, count: u32) {
        self.state.lock().swapchain_image_count = Some(count);
    }

    /// Present mode reported for surfaces without vsync.
    pub fn set_unsynced_present_mode(&self, mode: PresentMode) {
        self.state.lock().unsynced_present_mode = mode;
    }

    /// Makes the next `count` buffer, texture or query creations fail
    /// with [`GraphicsError::OutOfMemory`].
    pub fn fail_next_allocations(&self, count: u32) {
        self.state.lock().failing_allocations = count;
    }

    /// Signals a fence from outside, simulating GPU completion.
    pub fn signal_fence(&self, fence: GpuHandle) {
        if let Some(signaled) = self.state.lock().fences.get_mut(&fence) {
            *signaled = true;
        }
    }

    /// Number of live objects of `kind`.
    pub fn live_count(&self, kind: ObjectKind) -> usize {
        self.state.lock().live.values().filter(|k| **k == kind).count()
    }

    /// Returns true if `handle` has not been destroyed.
    pub fn is_live(&self, handle: GpuHandle) -> bool {
        self.state.lock().live.contains_key(&handle)
    }

    /// Total number of objects of `kind` ever created.
    pub fn created_count(&self, kind: ObjectKind) -> u64 {
        self.state.lock().created.get(&kind).copied().unwrap_or(0)
    }

    /// Number of destroy calls on handles that were not live.
    pub fn invalid_destroy_count(&self) -> u64 {
        self.state.lock().invalid_destroys
    }

    /// Returns and clears the recorded frame-protocol calls, oldest first.
    ///
    /// Only the most recent [`CALL_LOG_CAPACITY`] calls are kept.
    pub fn take_calls(&self) -> Vec<BackendCall> {
        self.state.lock().calls.drain(..).collect()
    }

    fn record(&self, call: BackendCall) {
        self.state.lock().log(call);
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DummyBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("DummyBackend")
            .field("live_objects", &state.live.len())
            .finish_non_exhaustive()
    }
}

impl GpuBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    fn create_buffer(
        &self,
        descriptor: &BufferDescriptor,
        initial_data: Option<&[u8]>,
    ) -> Result<GpuHandle, GraphicsError> {
        if let Some(data) = initial_data
            && data.len() as u64 > descriptor.size
        {
            return Err(GraphicsError::InvalidParameter(format!(
                "initial data ({} bytes) exceeds buffer size ({})",
                data.len(),
                descriptor.size
            )));
        }
        log::trace!(
            "DummyBackend: creating buffer {:?} (size: {})",
            descriptor.label,
            descriptor.size
        );
        self.state.lock().allocate_resource(ObjectKind::Buffer)
    }

    fn destroy_buffer(&self, buffer: GpuHandle) {
        self.state.lock().release(buffer, ObjectKind::Buffer);
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<GpuHandle, GraphicsError> {
        log::trace!(
            "DummyBackend: creating texture {:?} ({}x{}x{})",
            descriptor.label,
            descriptor.size.width,
            descriptor.size.height,
            descriptor.size.depth
        );
        self.state.lock().allocate_resource(ObjectKind::Texture)
    }

    fn destroy_texture(&self, texture: GpuHandle) {
        self.state.lock().release(texture, ObjectKind::Texture);
    }

    fn create_timestamp(&self) -> Result<GpuHandle, GraphicsError> {
        self.state.lock().allocate_resource(ObjectKind::Timestamp)
    }

    fn destroy_timestamp(&self, timestamp: GpuHandle) {
        self.state.lock().release(timestamp, ObjectKind::Timestamp);
    }

    fn create_pipeline_statistics(&self) -> Result<GpuHandle, GraphicsError> {
        self.state.lock().allocate_resource(ObjectKind::PipelineStatistics)
    }

    fn destroy_pipeline_statistics(&self, statistics: GpuHandle) {
        self.state
            .lock()
            .release(statistics, ObjectKind::PipelineStatistics);
    }

    fn create_fence(&self, signaled: bool) -> Result<GpuHandle, GraphicsError> {
        let mut state = self.state.lock();
        let fence = state.allocate(ObjectKind::Fence);
        state.fences.insert(fence, signaled);
        Ok(fence)
    }

    fn destroy_fence(&self, fence: GpuHandle) {
        let mut state = self.state.lock();
        state.fences.remove(&fence);
        state.release(fence, ObjectKind::Fence);
    }

    fn wait_fence(&self, fence: GpuHandle) -> Result<(), GraphicsError> {
        self.record(BackendCall::WaitFence(fence));
        loop {
            match self.state.lock().fences.get(&fence) {
                Some(true) => return Ok(()),
                Some(false) => {}
                None => {
                    return Err(GraphicsError::InvalidParameter(format!(
                        "waiting on unknown fence {fence:?}"
                    )));
                }
            }
            std::thread::yield_now();
        }
    }

    fn reset_fence(&self, fence: GpuHandle) -> Result<(), GraphicsError> {
        let mut state = self.state.lock();
        state.log(BackendCall::ResetFence(fence));
        match state.fences.get_mut(&fence) {
            Some(signaled) => {
                *signaled = false;
                Ok(())
            }
            None => Err(GraphicsError::InvalidParameter(format!(
                "resetting unknown fence {fence:?}"
            ))),
        }
    }

    fn is_fence_signaled(&self, fence: GpuHandle) -> bool {
        self.state.lock().fences.get(&fence).copied().unwrap_or(false)
    }

    fn create_semaphore(&self) -> Result<GpuHandle, GraphicsError> {
        Ok(self.state.lock().allocate(ObjectKind::Semaphore))
    }

    fn destroy_semaphore(&self, semaphore: GpuHandle) {
        self.state.lock().release(semaphore, ObjectKind::Semaphore);
    }

    fn wait_idle(&self) -> Result<(), GraphicsError> {
        self.record(BackendCall::WaitIdle);
        Ok(())
    }

    fn allocate_command_buffer(&self) -> Result<GpuHandle, GraphicsError> {
        Ok(self.state.lock().allocate(ObjectKind::CommandBuffer))
    }

    fn free_command_buffer(&self, command_buffer: GpuHandle) {
        self.state.lock().release(command_buffer, ObjectKind::CommandBuffer);
    }

    fn begin_commands(&self, command_buffer: GpuHandle) -> Result<(), GraphicsError> {
        self.record(BackendCall::BeginCommands(command_buffer));
        Ok(())
    }

    fn end_commands(&self, command_buffer: GpuHandle) -> Result<(), GraphicsError> {
        self.record(BackendCall::EndCommands(command_buffer));
        Ok(())
    }

    fn begin_render_pass(&self, _command_buffer: GpuHandle, image_view: GpuHandle) {
        self.record(BackendCall::BeginRenderPass(image_view));
    }

    fn end_render_pass(&self, _command_buffer: GpuHandle) {
        self.record(BackendCall::EndRenderPass);
    }

    fn blit_texture(&self, _command_buffer: GpuHandle, blit: &BlitInfo) {
        self.record(BackendCall::Blit(*blit));
    }

    fn clear_image(&self, _command_buffer: GpuHandle, image: GpuHandle, _color: Color) {
        self.record(BackendCall::Clear(image));
    }

    fn submit(&self, submit: &SubmitInfo) -> Result<(), GraphicsError> {
        let mut state = self.state.lock();
        state.log(BackendCall::Submit(*submit));
        if let Some(fence) = submit.fence {
            match state.fences.get_mut(&fence) {
                Some(signaled) => *signaled = true,
                None => {
                    return Err(GraphicsError::InvalidParameter(format!(
                        "submitting with unknown fence {fence:?}"
                    )));
                }
            }
        }
        Ok(())
    }

    fn present_mode_for(&self, _surface: GpuHandle, vsync: bool) -> PresentMode {
        if vsync {
            PresentMode::Fifo
        } else {
            self.state.lock().unsynced_present_mode
        }
    }

    fn create_swapchain(
        &self,
        request: &SwapchainRequest,
    ) -> Result<SwapchainImages, GraphicsError> {
        let mut state = self.state.lock();
        if let Some(error) = state.swapchain_failures.pop_front() {
            return Err(error);
        }
        if request.extent.is_empty() {
            return Err(GraphicsError::InvalidParameter(
                "swapchain extent must be non-zero".to_string(),
            ));
        }

        let image_count = state
            .swapchain_image_count
            .unwrap_or(request.min_image_count)
            .max(1);
        let swapchain = state.allocate(ObjectKind::Swapchain);
        let images: Vec<GpuHandle> = (0..image_count)
            .map(|_| state.allocate(ObjectKind::SwapchainImage))
            .collect();
        state.swapchain_images.insert(swapchain, images.clone());
        state.log(BackendCall::CreateSwapchain {
            swapchain,
            old_swapchain: request.old_swapchain,
            image_count: images.len(),
            present_mode: request.present_mode,
        });

        log::trace!(
            "DummyBackend: created swapchain {swapchain:?} ({}x{}, {image_count} images)",
            request.extent.width,
            request.extent.height
        );

        Ok(SwapchainImages {
            swapchain,
            images,
            extent: request.extent,
            format: request.format,
        })
    }

    fn destroy_swapchain(&self, swapchain: GpuHandle) {
        let mut state = self.state.lock();
        state.log(BackendCall::DestroySwapchain(swapchain));
        state.acquire_cursor.remove(&swapchain);
        if let Some(images) = state.swapchain_images.remove(&swapchain) {
            for image in images {
                state.release(image, ObjectKind::SwapchainImage);
            }
        }
        state.release(swapchain, ObjectKind::Swapchain);
    }

    fn create_image_view(
        &self,
        image: GpuHandle,
        _format: TextureFormat,
    ) -> Result<GpuHandle, GraphicsError> {
        let mut state = self.state.lock();
        if !state.live.contains_key(&image) {
            return Err(GraphicsError::InvalidParameter(format!(
                "creating view of unknown image {image:?}"
            )));
        }
        Ok(state.allocate(ObjectKind::ImageView))
    }

    fn destroy_image_view(&self, view: GpuHandle) {
        self.state.lock().release(view, ObjectKind::ImageView);
    }

    fn acquire_next_image(
        &self,
        swapchain: GpuHandle,
        _signal_semaphore: GpuHandle,
    ) -> Result<AcquireOutcome, GraphicsError> {
        let mut state = self.state.lock();
        state.log(BackendCall::Acquire(swapchain));
        if let Some(result) = state.acquire_script.pop_front() {
            return result;
        }

        let image_count = match state.swapchain_images.get(&swapchain) {
            Some(images) => images.len() as u32,
            None => {
                return Err(GraphicsError::InvalidParameter(format!(
                    "acquiring from unknown swapchain {swapchain:?}"
                )));
            }
        };
        let cursor = state.acquire_cursor.entry(swapchain).or_insert(0);
        let index = *cursor % image_count;
        *cursor = cursor.wrapping_add(1);
        Ok(AcquireOutcome::Acquired {
            index,
            suboptimal: false,
        })
    }

    fn present(&self, present: &PresentInfo) -> Result<PresentOutcome, GraphicsError> {
        let mut state = self.state.lock();
        state.log(BackendCall::Present(*present));
        state
            .present_script
            .pop_front()
            .unwrap_or(Ok(PresentOutcome::Success))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BufferUsage, Extent2d};

    fn request(surface: GpuHandle) -> SwapchainRequest {
        SwapchainRequest {
            surface,
            extent: Extent2d::new(800, 600),
            format: TextureFormat::Bgra8UnormSrgb,
            present_mode: PresentMode::Fifo,
            min_image_count: 3,
            old_swapchain: None,
        }
    }

    #[test]
    fn submit_signals_fence() {
        let backend = DummyBackend::new();
        let fence = backend.create_fence(false).unwrap();
        let cmd = backend.allocate_command_buffer().unwrap();
        assert!(!backend.is_fence_signaled(fence));

        backend
            .submit(&SubmitInfo {
                command_buffer: cmd,
                wait_semaphore: None,
                signal_semaphore: None,
                fence: Some(fence),
            })
            .unwrap();

        assert!(backend.is_fence_signaled(fence));
        backend.wait_fence(fence).unwrap();
    }

    #[test]
    fn injected_allocation_failures() {
        let backend = DummyBackend::new();
        backend.fail_next_allocations(1);
        let desc = BufferDescriptor::new(64, BufferUsage::UNIFORM);

        assert_eq!(
            backend.create_buffer(&desc, None),
            Err(GraphicsError::OutOfMemory)
        );
        assert!(backend.create_buffer(&desc, None).is_ok());
    }

    #[test]
    fn double_destroy_is_counted() {
        let backend = DummyBackend::new();
        let desc = BufferDescriptor::new(64, BufferUsage::UNIFORM);
        let buffer = backend.create_buffer(&desc, None).unwrap();

        backend.destroy_buffer(buffer);
        assert_eq!(backend.invalid_destroy_count(), 0);
        backend.destroy_buffer(buffer);
        assert_eq!(backend.invalid_destroy_count(), 1);
    }

    #[test]
    fn acquire_cycles_through_images() {
        let backend = DummyBackend::new();
        let surface = backend.create_surface();
        let created = backend.create_swapchain(&request(surface)).unwrap();
        let semaphore = backend.create_semaphore().unwrap();
        assert_eq!(created.images.len(), 3);

        let indices: Vec<u32> = (0..4)
            .map(|_| match backend.acquire_next_image(created.swapchain, semaphore) {
                Ok(AcquireOutcome::Acquired { index, .. }) => index,
                other => panic!("unexpected acquire result {other:?}"),
            })
            .collect();
        assert_eq!(indices, vec![0, 1, 2, 0]);
    }

    #[test]
    fn scripted_results_take_priority() {
        let backend = DummyBackend::new();
        let surface = backend.create_surface();
        let created = backend.create_swapchain(&request(surface)).unwrap();
        let semaphore = backend.create_semaphore().unwrap();
        backend.push_acquire_result(Ok(AcquireOutcome::OutOfDate));
        backend.push_present_result(Ok(PresentOutcome::Suboptimal));

        assert_eq!(
            backend.acquire_next_image(created.swapchain, semaphore),
            Ok(AcquireOutcome::OutOfDate)
        );
        let info = PresentInfo {
            swapchain: created.swapchain,
            image_index: 0,
            wait_semaphore: semaphore,
        };
        assert_eq!(backend.present(&info), Ok(PresentOutcome::Suboptimal));
        assert_eq!(backend.present(&info), Ok(PresentOutcome::Success));
    }

    #[test]
    fn call_log_keeps_only_recent_calls() {
        let backend = DummyBackend::new();
        let cmd = backend.allocate_command_buffer().unwrap();
        for _ in 0..CALL_LOG_CAPACITY + 10 {
            backend.begin_commands(cmd).unwrap();
        }
        backend.end_commands(cmd).unwrap();

        let calls = backend.take_calls();
        assert_eq!(calls.len(), CALL_LOG_CAPACITY);
        assert_eq!(calls.last(), Some(&BackendCall::EndCommands(cmd)));
        assert!(backend.take_calls().is_empty());
    }

    #[test]
    fn destroying_swapchain_releases_images() {
        let backend = DummyBackend::new();
        let surface = backend.create_surface();
        let created = backend.create_swapchain(&request(surface)).unwrap();
        assert_eq!(backend.live_count(ObjectKind::SwapchainImage), 3);

        backend.destroy_swapchain(created.swapchain);
        assert_eq!(backend.live_count(ObjectKind::SwapchainImage), 0);
        assert_eq!(backend.live_count(ObjectKind::Swapchain), 0);
        assert_eq!(backend.invalid_destroy_count(), 0);
    }
}
