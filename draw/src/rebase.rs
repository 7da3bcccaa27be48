//! Index rebasing.
//!
//! A draw whose smallest referenced vertex is not zero is turned into an
//! equivalent zero-based draw. Every varying array moves forward by
//! `min * stride`, and the indices (or starts) move back by `min`, using one
//! of three strategies:
//!
//! - [`RebaseStrategy::BaseVertex`]: subtract `min` from each run's base
//!   vertex, indices untouched
//! - [`RebaseStrategy::IndexRewrite`]: write a new 32-bit index array
//! - [`RebaseStrategy::PointerShift`]: non-indexed draws only, subtract
//!   `min` from each run's start

use std::borrow::Cow;

use crate::arena::ScratchArena;
use crate::context::{DrawCall, DrawDispatch};
use crate::error::{DrawError, DrawResult};
use crate::index::{acquire_index, index_bytes, offset_index, widen};
use crate::mapping::MappedBuffers;
use crate::types::{IndexBounds, IndexSize, IndexSource, Prim};

/// How a draw is made zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RebaseStrategy {
    /// Adjust each run's base vertex.
    BaseVertex,
    /// Rewrite the indices.
    IndexRewrite,
    /// Adjust each run's start (non-indexed draws).
    PointerShift,
}

/// Pick a strategy from capability flags.
///
/// Base-vertex adjustment is only used when both the configuration opts in
/// and the backend honors base vertex.
pub fn choose_strategy(indexed: bool, base_vertex_rebase: bool, supports_base_vertex: bool) -> RebaseStrategy {
    if !indexed {
        RebaseStrategy::PointerShift
    } else if base_vertex_rebase && supports_base_vertex {
        RebaseStrategy::BaseVertex
    } else {
        RebaseStrategy::IndexRewrite
    }
}

/// Rebased indices for one group of runs sharing a start. The runs are
/// moved to start at zero.
struct RewrittenGroup {
    prims: Vec<Prim>,
    indices: Vec<u32>,
}

/// Rebase `call` so its vertices start at zero and dispatch the result.
pub fn rebase(
    dispatcher: &dyn DrawDispatch,
    call: &DrawCall<'_>,
    bounds: IndexBounds,
    strategy: RebaseStrategy,
    arena: &mut ScratchArena,
) -> DrawResult<()> {
    let min = bounds.min;
    let rebased_bounds = IndexBounds::new(0, bounds.max - min);
    let arrays = call.arrays.shifted(min);

    log::debug!(
        "rebasing {} prims by {min} with {strategy:?} (bounds {}..={})",
        call.prims.len(),
        bounds.min,
        bounds.max
    );

    match strategy {
        RebaseStrategy::PointerShift => {
            assert!(call.index.is_none(), "pointer shift rebase requires a non-indexed draw");
            let prims: Vec<Prim> = call
                .prims
                .iter()
                .map(|prim| {
                    assert!(prim.count == 0 || prim.start >= min, "run starts below the draw's minimum vertex");
                    Prim {
                        start: prim.start.saturating_sub(min),
                        ..*prim
                    }
                })
                .collect();
            let rebased = DrawCall {
                arrays,
                prims: &prims,
                index: None,
                bounds: Some(rebased_bounds),
                instances: call.instances,
            };
            dispatcher.dispatch(&rebased, arena)
        }
        RebaseStrategy::BaseVertex => {
            let prims: Vec<Prim> = call
                .prims
                .iter()
                .map(|prim| Prim {
                    base_vertex: prim.base_vertex - min as i32,
                    ..*prim
                })
                .collect();
            let rebased = DrawCall {
                arrays,
                prims: &prims,
                index: call.index.clone(),
                bounds: Some(rebased_bounds),
                instances: call.instances,
            };
            dispatcher.dispatch(&rebased, arena)
        }
        RebaseStrategy::IndexRewrite => {
            let Some(index) = call.index.as_ref() else {
                unreachable!("index rewrite rebase requires an indexed draw");
            };
            // All groups are rewritten before any is dispatched, so an
            // allocation failure submits nothing.
            let groups = rewrite_indices(dispatcher, call.prims, index, min, arena)?;
            for group in &groups {
                let rebased = DrawCall {
                    arrays: arrays.clone(),
                    prims: &group.prims,
                    index: Some(IndexSource::client(
                        IndexSize::U32,
                        group.indices.len() as u32,
                        bytemuck::cast_slice(&group.indices),
                    )),
                    bounds: Some(rebased_bounds),
                    instances: call.instances,
                };
                dispatcher.dispatch(&rebased, arena)?;
            }
            Ok(())
        }
    }
}

/// Partition runs into consecutive groups with equal start and base vertex,
/// and write `index + base_vertex - min` for each group's range.
fn rewrite_indices(
    dispatcher: &dyn DrawDispatch,
    prims: &[Prim],
    index: &IndexSource<'_>,
    min: u32,
    arena: &mut ScratchArena,
) -> DrawResult<Vec<RewrittenGroup>> {
    let mut maps = MappedBuffers::new(dispatcher.backend());
    acquire_index(index, &mut maps)?;
    let bytes = index_bytes(index, &maps)?;
    let source: Cow<'_, [u32]> = widen(index.size, bytes, index.count as usize, arena)?;

    let mut groups = Vec::new();
    let mut rest = prims;
    while let Some(head) = rest.first() {
        let len = rest
            .iter()
            .position(|prim| prim.start != head.start || prim.base_vertex != head.base_vertex)
            .unwrap_or(rest.len());
        let (group, tail) = rest.split_at(len);
        rest = tail;

        let start = head.start as usize;
        let span = group.iter().map(|p| p.count as usize).max().unwrap_or(0);
        let mut indices = arena.try_vec::<u32>(span, "rebased indices")?;
        indices.resize(span, 0);

        for prim in group {
            let end = start + prim.count as usize;
            let run = source.get(start..end).ok_or(DrawError::OutOfBounds {
                what: "primitive index range",
                needed: end,
                available: source.len(),
            })?;
            for (dst, &src) in indices.iter_mut().zip(run) {
                *dst = offset_index(src, prim.base_vertex).wrapping_sub(min);
            }
        }

        groups.push(RewrittenGroup {
            prims: group
                .iter()
                .map(|prim| Prim {
                    start: 0,
                    base_vertex: 0,
                    ..*prim
                })
                .collect(),
            indices,
        });
    }
    Ok(groups)
}
