//! Bucketed reuse storage shared by every pool.
//!
//! ```text
//!   request(key) ──► bucket[key].pop()  ──hit──► handle
//!                         │ miss
//!                         ▼
//!                    create on device
//!
//!   return(handle) ─► bucket[key].push(entry { frames_remaining: threshold })
//!
//!   update():  flush transient ─► every entry -= 1 ─► drain expired prefix
//! ```
//!
//! Buckets hand out their most recently returned entry (LIFO) so the hottest
//! resource is reused, while eviction removes from the front (FIFO).

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use crate::resources::ResourceId;

/// A resource that pools can track.
pub trait PooledResource: Send + Sync + 'static {
    /// Device-unique identifier.
    fn resource_id(&self) -> ResourceId;
}

impl PooledResource for crate::Buffer {
    fn resource_id(&self) -> ResourceId {
        self.id()
    }
}

impl PooledResource for crate::Texture {
    fn resource_id(&self) -> ResourceId {
        self.id()
    }
}

impl PooledResource for crate::Fence {
    fn resource_id(&self) -> ResourceId {
        self.id()
    }
}

impl PooledResource for crate::Timestamp {
    fn resource_id(&self) -> ResourceId {
        self.id()
    }
}

impl PooledResource for crate::PipelineStatistics {
    fn resource_id(&self) -> ResourceId {
        self.id()
    }
}

impl PooledResource for crate::CommandContext {
    fn resource_id(&self) -> ResourceId {
        self.id()
    }
}

struct PooledEntry<R> {
    resource: Arc<R>,
    frames_remaining: u64,
}

/// Counters describing pool behavior since creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Requests served from a bucket.
    pub hits: u64,
    /// Requests that had to create a new resource.
    pub misses: u64,
    /// Entries evicted after staying idle too long.
    pub evictions: u64,
}

/// Idle resources grouped by key, plus this frame's transient checkouts.
pub struct BucketPool<K, R> {
    name: &'static str,
    buckets: HashMap<K, Vec<PooledEntry<R>>>,
    transient: Vec<(K, Arc<R>)>,
    live_threshold: u64,
    stats: PoolStats,
}

impl<K, R> BucketPool<K, R>
where
    K: Copy + Eq + Hash + Debug,
    R: PooledResource,
{
    /// Creates an empty pool whose idle entries live for `live_threshold`
    /// updates. A threshold of zero is treated as one.
    pub fn new(name: &'static str, live_threshold: u64) -> Self {
        Self {
            name,
            buckets: HashMap::new(),
            transient: Vec::new(),
            live_threshold: live_threshold.max(1),
            stats: PoolStats::default(),
        }
    }

    /// Pool name used in logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Takes the most recently returned idle resource under `key`.
    pub fn take(&mut self, key: &K) -> Option<Arc<R>> {
        let entry = self.buckets.get_mut(key).and_then(Vec::pop);
        match entry {
            Some(entry) => {
                self.stats.hits += 1;
                log::trace!(
                    "{}: reusing {} for {key:?}",
                    self.name,
                    entry.resource.resource_id()
                );
                Some(entry.resource)
            }
            None => {
                self.stats.misses += 1;
                log::trace!("{}: no idle resource for {key:?}", self.name);
                None
            }
        }
    }

    /// Makes `resource` available for reuse under `key`.
    pub fn put(&mut self, key: K, resource: Arc<R>) {
        self.buckets.entry(key).or_default().push(PooledEntry {
            resource,
            frames_remaining: self.live_threshold,
        });
    }

    /// Records a checkout that [`flush_transient`](Self::flush_transient)
    /// returns automatically.
    pub fn mark_transient(&mut self, key: K, resource: Arc<R>) {
        self.transient.push((key, resource));
    }

    /// Returns every transient checkout to its bucket.
    pub fn flush_transient(&mut self) {
        for (key, resource) in std::mem::take(&mut self.transient) {
            self.put(key, resource);
        }
    }

    /// Flushes transients, ages every idle entry by one tick and drops the
    /// ones that expire. `on_evict` sees each evicted resource before its
    /// pool reference is released.
    pub fn update(&mut self, mut on_evict: impl FnMut(&R)) {
        self.flush_transient();

        let mut evicted = 0u64;
        for bucket in self.buckets.values_mut() {
            for entry in bucket.iter_mut() {
                entry.frames_remaining = entry.frames_remaining.saturating_sub(1);
            }

            // All entries share one threshold and age in lockstep, so insertion
            // order is expiry order and the expired entries are a prefix.
            let expired = bucket
                .iter()
                .take_while(|entry| entry.frames_remaining == 0)
                .count();
            debug_assert!(
                bucket[expired..].iter().all(|entry| entry.frames_remaining > 0),
                "expired entries must form a prefix of the bucket"
            );

            for entry in bucket.drain(..expired) {
                on_evict(&entry.resource);
            }
            evicted += expired as u64;
        }
        self.buckets.retain(|_, bucket| !bucket.is_empty());

        if evicted > 0 {
            self.stats.evictions += evicted;
            log::debug!("{}: evicted {evicted} idle resources", self.name);
        }
    }

    /// Drops every idle entry and transient checkout held by the pool.
    pub fn release_all(&mut self, mut on_release: impl FnMut(&R)) {
        self.flush_transient();
        let released: usize = self.buckets.values().map(Vec::len).sum();
        for (_, bucket) in self.buckets.drain() {
            for entry in bucket {
                on_release(&entry.resource);
            }
        }
        if released > 0 {
            log::debug!("{}: released {released} idle resources", self.name);
        }
    }

    /// Number of idle entries across all buckets.
    pub fn idle_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Number of non-empty buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of idle entries under `key`.
    pub fn idle_count_for(&self, key: &K) -> usize {
        self.buckets.get(key).map_or(0, Vec::len)
    }

    /// Number of transient checkouts waiting for the next flush.
    pub fn transient_count(&self) -> usize {
        self.transient.len()
    }

    /// Idle lifetime in updates.
    pub fn live_threshold(&self) -> u64 {
        self.live_threshold
    }

    /// Hit, miss and eviction counters.
    pub fn stats(&self) -> PoolStats {
        self.stats
    }
}
