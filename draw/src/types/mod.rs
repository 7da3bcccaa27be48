//! Common types and descriptors for the draw pipeline.
//!
//! This module contains attribute slots, vertex formats, primitive
//! descriptors, index sources and buffer descriptors used throughout the
//! draw system.

mod attrib;
mod buffer;
mod format;
mod index;
mod prim;

pub use attrib::{AttribMask, AttribSlot, MAX_ATTRIBS};
pub use buffer::{BufferDescriptor, BufferUsage};
pub use format::{ScalarType, VertexFormat};
pub use index::{IndexBounds, IndexData, IndexSize, IndexSource, Instancing};
pub use prim::{Prim, PrimMode};
