//! Vertex supply: attribute arrays, format conversion, current values and
//! binding resolution.
//!
//! - [`VertexArrays`] - Per-draw attribute table
//! - [`convert`] - Float view of any attribute
//! - [`upload_current_values`] - One upload for every constant attribute
//! - [`resolve_vertex_state`] - Coalesce attributes onto bindings

mod arrays;
mod convert;
mod current;
mod resolve;

pub use arrays::{ArraySource, CurrentValue, VertexArray, VertexArrays};
pub use convert::{convert, decode_component, fetch, AttribData, FloatArray};
pub use current::{pack_current_values, upload_current_values, CurrentBlock, PackedValues};
pub use resolve::{
    resolve_vertex_state, BindingSource, VertexBufferBinding, VertexElement, VertexState,
};

pub(crate) use convert::check_range;
