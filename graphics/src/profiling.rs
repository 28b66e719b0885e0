//! Profiling support via Tracy.
//!
//! Re-exports the CPU profiling macros from [`lumen_core::profiling`] so
//! graphics users need a single import.
//!
//! ```toml
//! [dependencies]
//! lumen-graphics = { version = "0.1", features = ["profiling"] }
//! ```
//!
//! ```ignore
//! use lumen_graphics::profiling::{frame_mark, profile_function, profile_plot};
//!
//! fn tick(pools: &mut RenderPools) {
//!     profile_function!();
//!     pools.update_all();
//!     profile_plot!("pools.idle", pools.idle_count());
//! }
//! ```

pub use lumen_core::profiling::*;

use crate::pools::PoolStats;
use crate::viewport::ViewportStats;

/// Plots hit, miss and eviction counters of one pool.
pub fn plot_pool_stats(name: &'static str, stats: PoolStats) {
    match name {
        "fences" => {
            profile_plot!("fences.hits", stats.hits);
            profile_plot!("fences.misses", stats.misses);
            profile_plot!("fences.evictions", stats.evictions);
        }
        "buffers" => {
            profile_plot!("buffers.hits", stats.hits);
            profile_plot!("buffers.misses", stats.misses);
            profile_plot!("buffers.evictions", stats.evictions);
        }
        "surfaces" => {
            profile_plot!("surfaces.hits", stats.hits);
            profile_plot!("surfaces.misses", stats.misses);
            profile_plot!("surfaces.evictions", stats.evictions);
        }
        "render_surfaces" => {
            profile_plot!("render_surfaces.hits", stats.hits);
            profile_plot!("render_surfaces.misses", stats.misses);
            profile_plot!("render_surfaces.evictions", stats.evictions);
        }
        "timestamps" => {
            profile_plot!("timestamps.hits", stats.hits);
            profile_plot!("timestamps.misses", stats.misses);
            profile_plot!("timestamps.evictions", stats.evictions);
        }
        "pipeline_statistics" => {
            profile_plot!("pipeline_statistics.hits", stats.hits);
            profile_plot!("pipeline_statistics.misses", stats.misses);
            profile_plot!("pipeline_statistics.evictions", stats.evictions);
        }
        "contexts" => {
            profile_plot!("contexts.hits", stats.hits);
            profile_plot!("contexts.misses", stats.misses);
            profile_plot!("contexts.evictions", stats.evictions);
        }
        _ => log::trace!("{name}: {stats:?}"),
    }
}

/// Plots the presentation counters of a window viewport.
pub fn plot_viewport_stats(stats: ViewportStats) {
    profile_plot!("viewport.frames_presented", stats.frames_presented);
    profile_plot!("viewport.swapchain_builds", stats.swapchain_builds);
    profile_plot!("viewport.acquire_retries", stats.acquire_retries);
}
