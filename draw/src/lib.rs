//! # RedLilium Draw
//!
//! Vertex array and draw-state translation for RedLilium.
//!
//! ## Overview
//!
//! This crate turns application draws into bounded, zero-based draws a
//! backend can execute:
//! - [`VertexArrays`] - Per-draw attribute table over buffers, client memory
//!   and constant values
//! - [`resolve_vertex_state`] - Coalesce attributes onto vertex buffer bindings
//! - [`convert`] - Float view of attributes of any format
//! - [`rebase`] - Make draws start at vertex zero
//! - [`split`] - Cut oversized draws into bounded sub-draws
//! - [`DrawContext`] - Drive a draw through all of the above
//! - Software and command-recording backends (for testing)
//!
//! ## Example
//!
//! ```ignore
//! use redlilium_draw::{DrawCall, DrawConfig, DrawContext, SoftwareBackend};
//!
//! let context = DrawContext::new(SoftwareBackend::new(), DrawConfig::default())?;
//! let arrays = VertexArrays::new()
//!     .with(AttribSlot::Position, VertexArray::client(VertexFormat::FLOAT3, bytes, 12));
//! let prims = [Prim::new(PrimMode::Triangles, 0, 36)];
//! context.draw(&DrawCall::new(arrays, &prims))?;
//! ```

pub mod arena;
pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod index;
pub mod mapping;
pub mod rebase;
pub mod resources;
pub mod split;
pub mod types;
pub mod vertex;

// Re-export main types for convenience
pub use arena::ScratchArena;
pub use backend::{
    AssembledPrimitive, BackendCaps, BackendDraw, Command, CommandBackend, DrawBackend,
    DrawRecord, SoftwareBackend, Topology, Vertex,
};
pub use config::{DrawConfig, SplitLimits};
pub use context::{DrawCall, DrawContext, DrawDispatch};
pub use error::{DrawError, DrawResult};
pub use rebase::RebaseStrategy;
pub use resources::{BufferObject, Upload, Uploader};
pub use split::{SplitKind, CACHE_SIZE, MAX_PRIM};
pub use types::{
    AttribMask, AttribSlot, BufferDescriptor, BufferUsage, IndexBounds, IndexSize, IndexSource,
    Instancing, Prim, PrimMode, ScalarType, VertexFormat,
};
pub use vertex::{
    convert, resolve_vertex_state, CurrentValue, VertexArray, VertexArrays, VertexElement,
    VertexState,
};

/// Draw library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the draw subsystem.
///
/// This only logs the version; the pipeline has no global state.
pub fn init() {
    log::info!("RedLilium Draw v{} initialized", VERSION);
}
