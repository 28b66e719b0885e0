//! Common types and descriptors for graphics resources.
//!
//! This module contains format enums, usage flags, and descriptor structs
//! used throughout the graphics system.

mod buffer;
mod common;
mod texture;

pub use buffer::{BufferDescriptor, BufferUsage};
pub use common::{Color, Extent2d, Extent3d, FilterMode, Rect};
pub use texture::{TextureDescriptor, TextureFormat, TextureType, TextureUsage};
