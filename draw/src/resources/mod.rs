//! Draw resources.
//!
//! This module contains the resource types the draw pipeline reads from and
//! writes to:
//! - [`BufferObject`] - Reference-counted byte store with map state
//! - [`Uploader`] - Stream sub-allocator for per-draw data
//!
//! Resources are reference-counted with [`Arc`] and can be shared across threads.
//!
//! [`Arc`]: std::sync::Arc

mod buffer;
mod upload;

pub use buffer::{BufferId, BufferObject, MappedRange};
pub use upload::{Upload, Uploader};

pub(crate) use upload::align_up;
