//! Draw backend abstraction layer.
//!
//! This module provides the capability interface the draw pipeline submits
//! normalized draws to.
//!
//! # Available Backends
//!
//! - `software`: CPU primitive assembly, records assembled primitives
//! - `command`: Records a hardware-style command stream
//!
//! # Architecture
//!
//! Each backend implements the [`DrawBackend`] trait, which provides:
//! - Capabilities (base vertex support, binding and split limits)
//! - Buffer mapping for CPU reads
//! - Stream uploads for per-draw data
//! - Submission of bounded, zero-based draws

mod command;
mod software;

pub use command::{BoundVertexBuffer, Command, CommandBackend};
pub use software::{assemble, AssembledPrimitive, DrawRecord, SoftwareBackend, Topology, Vertex};

use crate::config::SplitLimits;
use crate::error::DrawResult;
use crate::resources::{BufferObject, Upload};
use crate::types::{IndexBounds, IndexSource, Instancing, Prim};
use crate::vertex::VertexState;

/// Backend capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendCaps {
    /// Indexed draws honor [`Prim::base_vertex`].
    pub supports_base_vertex: bool,
    /// Maximum vertex buffer bindings per draw.
    pub max_vertex_buffers: u32,
    /// Largest draw the backend accepts without splitting.
    pub limits: SplitLimits,
}

impl Default for BackendCaps {
    fn default() -> Self {
        Self {
            supports_base_vertex: false,
            max_vertex_buffers: 32,
            limits: SplitLimits::unbounded(),
        }
    }
}

/// A normalized draw handed to a backend.
///
/// Indices (or vertex ids) reference vertices `0..=bounds.max` of the
/// bindings. Nothing in here may be retained after [`DrawBackend::draw`]
/// returns; user memory must be copied.
#[derive(Debug)]
pub struct BackendDraw<'a> {
    pub vertex_state: &'a VertexState<'a>,
    pub prims: &'a [Prim],
    pub index: Option<&'a IndexSource<'a>>,
    pub bounds: IndexBounds,
    pub instances: Instancing,
}

/// Trait implemented by draw backends.
///
/// Backends are shared across threads and take `&self`; recording state
/// lives behind locks.
pub trait DrawBackend: Send + Sync + 'static {
    /// Get the backend name.
    fn name(&self) -> &'static str;

    /// Get the backend capabilities.
    fn caps(&self) -> BackendCaps;

    /// Map a buffer range for CPU reads.
    fn map_buffer_range(&self, buffer: &BufferObject, offset: usize, len: usize) -> DrawResult<()> {
        log::trace!("{}: mapping {:?} ({offset}+{len})", self.name(), buffer.label());
        buffer.map_range(offset, len)
    }

    /// Unmap a buffer mapped through [`map_buffer_range`](Self::map_buffer_range).
    fn unmap_buffer(&self, buffer: &BufferObject) {
        log::trace!("{}: unmapping {:?}", self.name(), buffer.label());
        buffer.unmap();
    }

    /// Copy bytes into backend-visible stream memory.
    fn upload(&self, bytes: &[u8], alignment: usize) -> DrawResult<Upload>;

    /// Submit a normalized draw.
    fn draw(&self, draw: &BackendDraw<'_>) -> DrawResult<()>;
}
