//! Integration tests for the frame-resource pools.
//!
//! Every test runs against the dummy backend, which counts live objects so
//! reuse and eviction can be observed without a GPU.

mod common;

use std::sync::Arc;

use rstest::rstest;

use common::TestContext;
use lumen_core::render_thread::RenderThread;
use lumen_core::tickable::TickableRegistry;
use lumen_graphics::backend::dummy::{BackendCall, ObjectKind};
use lumen_graphics::{
    BufferDescriptor, BufferUsage, Extent2d, Extent3d, GraphicsError, LIVE_THRESHOLD,
    PoolSettings, PoolTicker, ResourcePool, TextureFormat, TextureType, TextureUsage,
    TransientScope,
};

// ============================================================================
// Reuse and eviction
// ============================================================================

#[test]
fn render_target_is_reused_then_evicted_after_threshold() {
    let mut ctx = TestContext::new();
    let size = Extent2d::new(512, 512);

    let first = ctx
        .pools
        .render_surfaces
        .request_render_surface(TextureFormat::Rgba8Unorm, size)
        .unwrap();
    let first_id = first.id();
    ctx.pools.render_surfaces.return_render_surface(first);

    let again = ctx
        .pools
        .render_surfaces
        .request_render_surface(TextureFormat::Rgba8Unorm, size)
        .unwrap();
    assert_eq!(again.id(), first_id);
    ctx.pools.render_surfaces.return_render_surface(again);

    ctx.tick(LIVE_THRESHOLD - 1);
    assert_eq!(ctx.pools.render_surfaces.idle_count(), 1);
    assert_eq!(ctx.backend.live_count(ObjectKind::Texture), 1);

    ctx.tick(1);
    assert_eq!(ctx.pools.render_surfaces.idle_count(), 0);
    assert_eq!(ctx.backend.live_count(ObjectKind::Texture), 0);

    let fresh = ctx
        .pools
        .render_surfaces
        .request_render_surface(TextureFormat::Rgba8Unorm, size)
        .unwrap();
    assert_ne!(fresh.id(), first_id);
    assert_eq!(ctx.backend.created_count(ObjectKind::Texture), 2);
}

#[test]
fn device_surface_follows_the_same_lifecycle() {
    let mut ctx = TestContext::new();
    let usage = TextureUsage::RENDER_ATTACHMENT;

    let first = ctx
        .pools
        .surfaces
        .request_surface(TextureFormat::Rgba8Unorm, 512, 512, usage)
        .unwrap();
    let first_id = first.id();
    assert!(ctx.pools.surfaces.return_surface(first));

    let again = ctx
        .pools
        .surfaces
        .request_surface(TextureFormat::Rgba8Unorm, 512, 512, usage)
        .unwrap();
    assert_eq!(again.id(), first_id);
    assert!(ctx.pools.surfaces.return_surface(again));

    ctx.tick(LIVE_THRESHOLD);
    assert_eq!(ctx.pools.surfaces.tracked_count(), 0);

    let fresh = ctx
        .pools
        .surfaces
        .request_surface(TextureFormat::Rgba8Unorm, 512, 512, usage)
        .unwrap();
    assert_ne!(fresh.id(), first_id);
}

#[test]
fn reuse_resets_the_idle_clock() {
    let mut ctx = TestContext::with_settings(PoolSettings::default().with_live_threshold(4));

    let buffer = ctx.pools.buffers.request_buffer(256, BufferUsage::VERTEX).unwrap();
    let id = buffer.id();
    ctx.pools.buffers.return_buffer(buffer);
    ctx.tick(3);

    let buffer = ctx.pools.buffers.request_buffer(256, BufferUsage::VERTEX).unwrap();
    assert_eq!(buffer.id(), id);
    ctx.pools.buffers.return_buffer(buffer);
    ctx.tick(3);

    assert_eq!(ctx.pools.buffers.idle_count(), 1);
    ctx.tick(1);
    assert_eq!(ctx.pools.buffers.idle_count(), 0);
}

#[test]
fn most_recent_return_is_handed_out_first() {
    let mut ctx = TestContext::new();
    let a = ctx.pools.fences.request_fence().unwrap();
    let b = ctx.pools.fences.request_fence().unwrap();
    let b_id = b.id();

    ctx.pools.fences.return_fence(a);
    ctx.pools.fences.return_fence(b);
    assert_eq!(ctx.pools.fences.request_fence().unwrap().id(), b_id);
}

// ============================================================================
// Transient checkouts
// ============================================================================

#[test]
fn transient_surfaces_are_distinct_within_a_frame() {
    let mut ctx = TestContext::new();
    let request = |ctx: &mut TestContext| {
        ctx.pools
            .surfaces
            .request_transient_surface(TextureFormat::Rgba16Float, 256, 256, TextureUsage::empty())
            .unwrap()
    };

    let a = request(&mut ctx);
    let b = request(&mut ctx);
    assert_ne!(a.id(), b.id());
    assert_eq!(ctx.pools.surfaces.idle_count(), 0);

    ctx.tick(1);
    assert_eq!(ctx.pools.surfaces.idle_count(), 2);

    let c = request(&mut ctx);
    let d = request(&mut ctx);
    let mut reused = [c.id(), d.id()];
    let mut original = [a.id(), b.id()];
    reused.sort();
    original.sort();
    assert_eq!(reused, original);
    assert_eq!(ctx.backend.created_count(ObjectKind::Texture), 2);
}

#[test]
fn transient_scope_returns_checkouts_on_drop() {
    let mut ctx = TestContext::new();
    {
        let mut timestamps = TransientScope::new(&mut ctx.pools.timestamps);
        timestamps.request_transient_timestamp().unwrap();
        timestamps.request_transient_timestamp().unwrap();
    }
    assert_eq!(ctx.pools.timestamps.idle_count(), 2);
}

// ============================================================================
// Keys and normalisation
// ============================================================================

#[rstest]
#[case::tiny(1, 16)]
#[case::minimum(16, 16)]
#[case::just_above(17, 32)]
#[case::odd(1000, 1024)]
#[case::power_of_two(4096, 4096)]
fn buffer_sizes_round_up(#[case] requested: u32, #[case] expected: u32) {
    let mut ctx = TestContext::new();
    let buffer = ctx
        .pools
        .buffers
        .request_buffer(requested, BufferUsage::STORAGE)
        .unwrap();
    assert_eq!(buffer.size(), expected as u64);
    assert!(buffer.descriptor().usage.contains(BufferUsage::DYNAMIC | BufferUsage::STORAGE));
}

#[test]
fn rounded_sizes_share_a_bucket() {
    let mut ctx = TestContext::new();
    let buffer = ctx.pools.buffers.request_buffer(100, BufferUsage::UNIFORM).unwrap();
    let id = buffer.id();
    ctx.pools.buffers.return_buffer(buffer);

    let reused = ctx.pools.buffers.request_buffer(128, BufferUsage::UNIFORM).unwrap();
    assert_eq!(reused.id(), id);
}

#[rstest]
#[case::color(TextureFormat::Rgba8Unorm, TextureUsage::RENDER_ATTACHMENT)]
#[case::hdr(TextureFormat::Rgba16Float, TextureUsage::RENDER_ATTACHMENT)]
#[case::depth(TextureFormat::Depth32Float, TextureUsage::DEPTH_STENCIL_ATTACHMENT)]
fn surface_usage_is_widened_by_format(
    #[case] format: TextureFormat,
    #[case] implied: TextureUsage,
) {
    let mut ctx = TestContext::new();
    let texture = ctx
        .pools
        .surfaces
        .request_surface(format, 64, 64, TextureUsage::COPY_SRC)
        .unwrap();
    assert!(texture.usage().contains(implied | TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_SRC));
}

#[rstest]
#[case::zero_width(0, 64)]
#[case::zero_height(64, 0)]
#[case::too_wide(70_000, 64)]
#[case::too_tall(64, 65_536)]
fn invalid_surface_sizes_are_rejected(#[case] width: u32, #[case] height: u32) {
    let mut ctx = TestContext::new();
    let result = ctx.pools.surfaces.request_surface(
        TextureFormat::Rgba8Unorm,
        width,
        height,
        TextureUsage::empty(),
    );
    assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
    assert_eq!(ctx.backend.created_count(ObjectKind::Texture), 0);
}

#[test]
fn zero_sized_render_surface_is_rejected() {
    let mut ctx = TestContext::new();
    let result = ctx
        .pools
        .render_surfaces
        .request_render_surface(TextureFormat::Bgra8Unorm, Extent2d::new(0, 0));
    assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
}

#[test]
fn typed_surfaces_key_on_type_and_depth() {
    let mut ctx = TestContext::new();
    let volume = ctx
        .pools
        .surfaces
        .request_surface_typed(
            TextureType::D3,
            TextureFormat::R8Unorm,
            Extent3d::new_3d(32, 32, 8),
            TextureUsage::empty(),
        )
        .unwrap();
    let volume_id = volume.id();
    ctx.pools.surfaces.return_surface(volume);

    let flat = ctx
        .pools
        .surfaces
        .request_surface(TextureFormat::R8Unorm, 32, 32, TextureUsage::empty())
        .unwrap();
    assert_ne!(flat.id(), volume_id);

    let volume = ctx
        .pools
        .surfaces
        .request_surface_typed(
            TextureType::D3,
            TextureFormat::R8Unorm,
            Extent3d::new_3d(32, 32, 8),
            TextureUsage::empty(),
        )
        .unwrap();
    assert_eq!(volume.id(), volume_id);
}

// ============================================================================
// Returns, failures and release
// ============================================================================

#[test]
fn foreign_buffer_return_is_ignored() {
    let mut ctx = TestContext::new();
    let foreign = ctx
        .device
        .create_buffer(&BufferDescriptor::new(64, BufferUsage::UNIFORM), None)
        .unwrap();
    assert!(!ctx.pools.buffers.return_buffer(foreign));
    assert_eq!(ctx.pools.buffers.idle_count(), 0);
    assert_eq!(ctx.backend.live_count(ObjectKind::Buffer), 0);
}

#[test]
fn allocation_failure_propagates() {
    let mut ctx = TestContext::new();
    ctx.backend.fail_next_allocations(1);

    let result = ctx.pools.buffers.request_buffer(64, BufferUsage::UNIFORM);
    assert!(matches!(result, Err(GraphicsError::OutOfMemory)));
    assert_eq!(ctx.pools.buffers.tracked_count(), 0);

    assert!(ctx.pools.buffers.request_buffer(64, BufferUsage::UNIFORM).is_ok());
}

#[test]
fn reused_fence_is_reset() {
    let mut ctx = TestContext::new();
    let fence = ctx.pools.fences.request_fence().unwrap();
    ctx.backend.signal_fence(fence.handle());
    assert!(fence.is_signaled());
    ctx.pools.fences.return_fence(fence);

    let fence = ctx.pools.fences.request_fence().unwrap();
    assert!(!fence.is_signaled());
}

#[test]
fn release_all_is_idempotent() {
    let mut ctx = TestContext::new();
    let buffer = ctx.pools.buffers.request_buffer(64, BufferUsage::UNIFORM).unwrap();
    ctx.pools.buffers.return_buffer(buffer);
    ctx.pools
        .surfaces
        .request_transient_surface(TextureFormat::Rgba8Unorm, 8, 8, TextureUsage::empty())
        .unwrap();
    ctx.pools
        .render_surfaces
        .request_transient_render_surface(TextureFormat::Rgba8Unorm, Extent2d::new(8, 8))
        .unwrap();
    ctx.pools.fences.request_transient_fence().unwrap();

    ctx.pools.release_all();
    assert_eq!(ctx.pools.idle_count(), 0);
    assert_eq!(ctx.backend.live_count(ObjectKind::Buffer), 0);
    assert_eq!(ctx.backend.live_count(ObjectKind::Texture), 0);
    assert_eq!(ctx.backend.live_count(ObjectKind::Fence), 0);

    ctx.pools.release_all();
    assert_eq!(ctx.pools.idle_count(), 0);
    assert_eq!(ctx.backend.invalid_destroy_count(), 0);
}

#[test]
fn outstanding_handles_survive_release_all() {
    let mut ctx = TestContext::new();
    let held = ctx
        .pools
        .surfaces
        .request_transient_surface(TextureFormat::Rgba8Unorm, 8, 8, TextureUsage::empty())
        .unwrap();

    ctx.pools.release_all();
    assert!(ctx.backend.is_live(held.handle()));
    drop(held);
    assert_eq!(ctx.backend.live_count(ObjectKind::Texture), 0);
}

#[test]
fn zero_live_threshold_evicts_after_one_update() {
    let mut ctx = TestContext::with_settings(PoolSettings::default().with_live_threshold(0));
    let buffer = ctx.pools.buffers.request_buffer(64, BufferUsage::UNIFORM).unwrap();
    ctx.pools.buffers.return_buffer(buffer);

    ctx.tick(1);
    assert_eq!(ctx.pools.buffers.idle_count(), 0);
    assert_eq!(ctx.backend.live_count(ObjectKind::Buffer), 0);
}

#[test]
fn long_churn_keeps_bookkeeping_bounded() {
    let mut ctx = TestContext::with_settings(PoolSettings::default().with_live_threshold(1));
    for _ in 0..1000 {
        ctx.pools
            .buffers
            .request_transient_buffer(256, BufferUsage::VERTEX)
            .unwrap();
        ctx.pools
            .surfaces
            .request_transient_surface(TextureFormat::Rgba8Unorm, 32, 32, TextureUsage::empty())
            .unwrap();
        ctx.tick(2);
    }

    assert_eq!(ctx.backend.live_count(ObjectKind::Buffer), 0);
    assert_eq!(ctx.backend.live_count(ObjectKind::Texture), 0);
    assert_eq!(ctx.device.tracked_resource_count(), 0);
    assert_eq!(ctx.pools.buffers.tracked_count(), 0);
    assert_eq!(ctx.pools.surfaces.tracked_count(), 0);
}

#[test]
fn dropped_checkouts_leave_no_reverse_entries() {
    let mut ctx = TestContext::new();
    for _ in 0..16 {
        drop(ctx.pools.buffers.request_buffer(64, BufferUsage::UNIFORM).unwrap());
        drop(
            ctx.pools
                .surfaces
                .request_surface(TextureFormat::Rgba8Unorm, 16, 16, TextureUsage::empty())
                .unwrap(),
        );
    }
    assert_eq!(ctx.pools.buffers.tracked_count(), 16);

    ctx.tick(1);
    assert_eq!(ctx.pools.buffers.tracked_count(), 0);
    assert_eq!(ctx.pools.surfaces.tracked_count(), 0);
}

// ============================================================================
// Queries and command contexts
// ============================================================================

#[test]
fn pipeline_statistics_share_one_bucket() {
    let mut ctx = TestContext::new();
    let first = ctx.pools.pipeline_statistics.request_statistics().unwrap();
    let second = ctx.pools.pipeline_statistics.request_statistics().unwrap();
    let second_id = second.id();
    ctx.pools.pipeline_statistics.return_statistics(first);
    ctx.pools.pipeline_statistics.return_statistics(second);

    let reused = ctx.pools.pipeline_statistics.request_statistics().unwrap();
    assert_eq!(reused.id(), second_id);
    assert_eq!(ctx.backend.created_count(ObjectKind::PipelineStatistics), 2);
}

#[test]
fn context_round_trip_submits_once() {
    let mut ctx = TestContext::new();
    let context = ctx.pools.contexts.begin_context().unwrap();
    let handle = context.handle();
    ctx.pools.contexts.end_context(context).unwrap();

    let submits: Vec<_> = ctx
        .backend
        .take_calls()
        .into_iter()
        .filter_map(|call| match call {
            BackendCall::Submit(info) => Some(info),
            _ => None,
        })
        .collect();
    assert_eq!(submits.len(), 1);
    assert_eq!(submits[0].command_buffer, handle);
    assert_eq!(ctx.pools.contexts.idle_count(), 1);
}

#[test]
fn release_all_covers_queries_and_contexts() {
    let mut ctx = TestContext::new();
    ctx.pools.pipeline_statistics.request_transient_statistics().unwrap();
    ctx.pools.contexts.request_transient_context().unwrap();
    ctx.pools.timestamps.request_transient_timestamp().unwrap();

    ctx.pools.release_all();
    assert_eq!(ctx.backend.live_count(ObjectKind::PipelineStatistics), 0);
    assert_eq!(ctx.backend.live_count(ObjectKind::CommandBuffer), 0);
    assert_eq!(ctx.backend.live_count(ObjectKind::Timestamp), 0);
}

// ============================================================================
// Tick driver
// ============================================================================

#[test]
fn ticker_evicts_through_render_thread() {
    let ctx = TestContext::with_settings(PoolSettings::default().with_live_threshold(3));
    let backend = Arc::clone(&ctx.backend);
    let shared = ctx.pools.into_shared();
    let render_thread = Arc::new(RenderThread::spawn().unwrap());

    render_thread
        .call_and_wait({
            let shared = Arc::clone(&shared);
            move || {
                let mut pools = shared.lock();
                let buffer = pools.buffers.request_buffer(64, BufferUsage::INDEX).unwrap();
                pools.buffers.return_buffer(buffer);
            }
        })
        .unwrap();

    let mut registry = TickableRegistry::new();
    registry.register(Box::new(PoolTicker::new(
        Arc::clone(&shared),
        Arc::clone(&render_thread),
    )));

    for _ in 0..2 {
        registry.tick(1.0 / 60.0);
    }
    render_thread.wait().unwrap();
    assert_eq!(backend.live_count(ObjectKind::Buffer), 1);

    registry.tick(1.0 / 60.0);
    render_thread.wait().unwrap();
    assert_eq!(backend.live_count(ObjectKind::Buffer), 0);
    assert_eq!(registry.tick_count(), 3);
}
