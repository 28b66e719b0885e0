//! Per-tick update registry.
//!
//! Systems that need housekeeping once per frame (pool eviction, deferred
//! destruction) implement [`Tickable`] and register with a
//! [`TickableRegistry`], which the frame loop drives via
//! [`TickableRegistry::tick`].

/// An object updated once per tick.
pub trait Tickable: Send {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Called once per tick with the elapsed time in seconds.
    fn tick(&mut self, delta_seconds: f32);
}

/// Identifier returned by [`TickableRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickableId(u64);

/// Ordered collection of tickables, updated in registration order.
#[derive(Default)]
pub struct TickableRegistry {
    entries: Vec<(TickableId, Box<dyn Tickable>)>,
    next_id: u64,
    tick_count: u64,
}

impl TickableRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tickable at the end of the update order.
    pub fn register(&mut self, tickable: Box<dyn Tickable>) -> TickableId {
        let id = TickableId(self.next_id);
        self.next_id += 1;
        log::debug!("Registered tickable '{}'", tickable.name());
        self.entries.push((id, tickable));
        id
    }

    /// Removes a tickable. Returns it if it was registered.
    pub fn unregister(&mut self, id: TickableId) -> Option<Box<dyn Tickable>> {
        let index = self.entries.iter().position(|(entry_id, _)| *entry_id == id)?;
        let (_, tickable) = self.entries.remove(index);
        log::debug!("Unregistered tickable '{}'", tickable.name());
        Some(tickable)
    }

    /// Updates every registered tickable once.
    pub fn tick(&mut self, delta_seconds: f32) {
        crate::profile_function!();
        for (_, tickable) in &mut self.entries {
            tickable.tick(delta_seconds);
        }
        self.tick_count += 1;
    }

    /// Number of registered tickables.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of completed [`tick`](Self::tick) calls.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}
