//! # Lumen Core
//!
//! Threading, tick and profiling utilities shared by the Lumen renderer.

pub mod profiling;
pub mod render_thread;
pub mod tickable;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
