//! Process-wide pool registry.
//!
//! Engines that cannot thread a [`RenderPools`] through every renderer can
//! install one here at startup. Everything else should pass the pools
//! explicitly.
//!
//! ```ignore
//! let shared = pools::global::install(RenderPools::new(device, PoolSettings::default()))?;
//! // ... frames ...
//! pools::global::shutdown(&render_thread)?;
//! ```

use lumen_core::render_thread::RenderThread;
use parking_lot::Mutex;

use super::{RenderPools, SharedPools};
use crate::error::GraphicsError;

static GLOBAL_POOLS: Mutex<Option<SharedPools>> = parking_lot::const_mutex(None);

/// Installs `pools` as the global registry.
///
/// Fails with [`GraphicsError::InvalidState`] if one is already installed.
pub fn install(pools: RenderPools) -> Result<SharedPools, GraphicsError> {
    let mut global = GLOBAL_POOLS.lock();
    if global.is_some() {
        return Err(GraphicsError::InvalidState(
            "global render pools are already installed".to_string(),
        ));
    }
    let shared = pools.into_shared();
    *global = Some(SharedPools::clone(&shared));
    log::info!("Installed global render pools");
    Ok(shared)
}

/// Returns the installed registry, if any.
pub fn get() -> Option<SharedPools> {
    GLOBAL_POOLS.lock().clone()
}

/// Runs `f` against the installed registry.
pub fn with<T>(f: impl FnOnce(&mut RenderPools) -> T) -> Option<T> {
    let shared = get()?;
    let mut pools = shared.lock();
    Some(f(&mut pools))
}

/// Uninstalls the registry, releases every pooled resource on the render
/// thread and waits for that to finish. Does nothing if nothing is
/// installed.
pub fn shutdown(render_thread: &RenderThread) -> Result<(), GraphicsError> {
    let Some(shared) = GLOBAL_POOLS.lock().take() else {
        return Ok(());
    };

    render_thread.call(move || {
        shared.lock().release_all();
        log::info!("Released global render pools");
    })?;
    render_thread.wait()?;
    Ok(())
}
