//! Bucket keys and the reverse index.
//!
//! Pooled resources are grouped by a key derived from their creation
//! parameters. Two requests with equal keys can be served by the same
//! resource.
//!
//! Surface keys pack four 16-bit fields into a `u64`:
//!
//! ```text
//!  63        48 47        32 31        16 15         0
//! +------------+------------+------------+------------+
//! |   usage    |   format   |   height   |   width    |
//! +------------+------------+------------+------------+
//! ```
//!
//! Buffer keys put the (rounded) size in the high half and the usage flags
//! in the low half.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Weak};

use static_assertions::const_assert;

use super::bucket::PooledResource;
use crate::error::GraphicsError;
use crate::resources::ResourceId;
use crate::types::{BufferUsage, Extent3d, TextureFormat, TextureType, TextureUsage};

/// Largest width or height representable in a surface key.
pub const MAX_KEYED_DIMENSION: u32 = u16::MAX as u32;

const_assert!(TextureUsage::all().bits() <= u16::MAX as u32);
const_assert!(TextureFormat::COUNT <= u16::MAX as usize + 1);
const_assert!(BufferUsage::all().bits() as u64 <= u32::MAX as u64);

/// Packed bucket key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketKey(u64);

impl BucketKey {
    /// Key of a 2D surface.
    ///
    /// Fails if either dimension does not fit in 16 bits.
    pub fn surface(
        format: TextureFormat,
        width: u32,
        height: u32,
        usage: TextureUsage,
    ) -> Result<Self, GraphicsError> {
        if width > MAX_KEYED_DIMENSION || height > MAX_KEYED_DIMENSION {
            return Err(GraphicsError::InvalidParameter(format!(
                "surface {width}x{height} exceeds the poolable maximum of {MAX_KEYED_DIMENSION}"
            )));
        }

        Ok(Self(
            width as u64
                | (height as u64) << 16
                | (format.index() as u64) << 32
                | (usage.bits() as u64) << 48,
        ))
    }

    /// Inverse of [`surface`](Self::surface).
    pub fn unpack_surface(self) -> Option<(TextureFormat, u32, u32, TextureUsage)> {
        let width = (self.0 & 0xFFFF) as u32;
        let height = ((self.0 >> 16) & 0xFFFF) as u32;
        let format = TextureFormat::from_index(((self.0 >> 32) & 0xFFFF) as u16)?;
        let usage = TextureUsage::from_bits((self.0 >> 48) as u32)?;
        Some((format, width, height, usage))
    }

    /// Key of a buffer.
    pub fn buffer(size: u32, usage: BufferUsage) -> Self {
        Self((size as u64) << 32 | usage.bits() as u64)
    }

    /// Inverse of [`buffer`](Self::buffer).
    pub fn unpack_buffer(self) -> Option<(u32, BufferUsage)> {
        let usage = BufferUsage::from_bits(self.0 as u32)?;
        Some(((self.0 >> 32) as u32, usage))
    }

    /// Raw packed value.
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Key of a device surface of any dimensionality.
///
/// The packed part covers format, width, height and usage; depth (or layer
/// count) and type ride alongside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceKey {
    pub packed: BucketKey,
    pub texture_type: TextureType,
    pub depth: u32,
}

impl SurfaceKey {
    /// Builds the key for a surface request.
    pub fn new(
        texture_type: TextureType,
        format: TextureFormat,
        size: Extent3d,
        usage: TextureUsage,
    ) -> Result<Self, GraphicsError> {
        Ok(Self {
            packed: BucketKey::surface(format, size.width, size.height, usage)?,
            texture_type,
            depth: size.depth,
        })
    }
}

/// Maps resources created by a pool back to the key they were created under.
///
/// Lets `return_*` take just the handle. Entries are added when the pool
/// creates a resource and dropped when the pool evicts or releases it, or
/// by [`prune_dropped`](Self::prune_dropped) once every handle to a
/// checked-out resource is gone.
pub struct ReverseIndex<K, R> {
    entries: HashMap<ResourceId, (K, Weak<R>)>,
}

impl<K: Copy + Eq + Hash, R: PooledResource> ReverseIndex<K, R> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, resource: &Arc<R>, key: K) {
        self.entries
            .insert(resource.resource_id(), (key, Arc::downgrade(resource)));
    }

    pub fn get(&self, id: ResourceId) -> Option<K> {
        self.entries.get(&id).map(|(key, _)| *key)
    }

    pub fn remove(&mut self, id: ResourceId) -> Option<K> {
        self.entries.remove(&id).map(|(key, _)| key)
    }

    /// Drops entries whose resource no longer exists. Returns how many.
    pub fn prune_dropped(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, (_, resource)| resource.strong_count() > 0);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Copy + Eq + Hash, R: PooledResource> Default for ReverseIndex<K, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, R> std::fmt::Debug for ReverseIndex<K, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReverseIndex")
            .field("entries", &self.entries.len())
            .finish()
    }
}
