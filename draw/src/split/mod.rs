//! Draw splitting.
//!
//! Draws that reference more vertices or indices than the backend accepts
//! are decomposed into bounded sub-draws, in order:
//!
//! - [`SplitKind::Copy`] repacks referenced vertices into fresh chunks,
//!   used when an indexed draw's vertex span is too large
//! - [`SplitKind::InPlace`] cuts primitive runs by start and count,
//!   used when the vertex span of a non-indexed draw or the index count of
//!   an indexed draw is too large

mod cache;
mod copy;
mod inplace;

pub use cache::{VertexCache, CACHE_SIZE};

use crate::arena::ScratchArena;
use crate::config::SplitLimits;
use crate::context::{DrawCall, DrawDispatch};
use crate::error::DrawResult;
use crate::types::IndexBounds;

/// Maximum output primitives per sub-draw.
pub const MAX_PRIM: usize = 32;

/// How a draw is split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SplitKind {
    Copy,
    InPlace,
}

/// Parameters shared by both splitters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitParams {
    /// Effective limits.
    pub limits: SplitLimits,
    /// Use the vertex cache while copying.
    pub vertex_cache: bool,
}

/// Decide whether a zero-based draw must be split.
///
/// Indexed draws are measured by the span of indices their runs read, the
/// amount a submission hands to the backend.
pub fn split_kind(call: &DrawCall<'_>, bounds: IndexBounds, limits: &SplitLimits) -> Option<SplitKind> {
    let vertex_limit = limits.vertex_capacity(call.arrays.vertex_size());
    let indexed = call.index.is_some();

    if u64::from(bounds.max) + 1 > u64::from(vertex_limit) {
        Some(if indexed {
            SplitKind::Copy
        } else {
            SplitKind::InPlace
        })
    } else if indexed
        && call
            .element_range()
            .is_some_and(|(lo, hi)| hi - lo > u64::from(limits.max_indices))
    {
        Some(SplitKind::InPlace)
    } else {
        None
    }
}

/// Split `call` and dispatch every piece in order.
pub fn split_draw(
    dispatcher: &dyn DrawDispatch,
    kind: SplitKind,
    call: &DrawCall<'_>,
    bounds: IndexBounds,
    params: &SplitParams,
    arena: &mut ScratchArena,
) -> DrawResult<()> {
    log::debug!(
        "splitting draw of {} elements over vertices 0..={} ({kind:?})",
        call.element_count(),
        bounds.max
    );
    match kind {
        SplitKind::Copy => copy::split_copy(dispatcher, call, bounds, params, arena),
        SplitKind::InPlace => inplace::split_inplace(dispatcher, call, bounds, params, arena),
    }
}
