//! In-place splitter.
//!
//! Cuts primitive runs into sub-draws that reuse the caller's vertex arrays
//! and index data unchanged, adjusting only starts and counts. Consecutive
//! runs are batched while their combined range stays within the limit.
//! Runs that cannot be resumed by overlap (loops, fans and polygons) and do
//! not fit whole are handed to the copying splitter.

use crate::arena::ScratchArena;
use crate::context::{DrawCall, DrawDispatch};
use crate::error::{DrawError, DrawResult};
use crate::types::{IndexBounds, IndexSource, Prim};

use super::copy::{chunk_room, split_copy};
use super::{SplitParams, MAX_PRIM};

/// Split a zero-based draw by start and count.
pub(super) fn split_inplace(
    dispatcher: &dyn DrawDispatch,
    call: &DrawCall<'_>,
    bounds: IndexBounds,
    params: &SplitParams,
    arena: &mut ScratchArena,
) -> DrawResult<()> {
    let indexed = call.index.is_some();
    let limit = if indexed {
        params.limits.max_indices
    } else {
        params.limits.vertex_capacity(call.arrays.vertex_size())
    } as usize;

    let mut splitter = Splitter {
        dispatcher,
        call,
        bounds,
        params,
        limit,
        indexed,
        prims: Vec::with_capacity(MAX_PRIM),
        lo: 0,
        hi: 0,
        total: 0,
        flushes: 0,
        arena,
    };
    for prim in call.prims {
        splitter.split_prim(prim)?;
    }
    splitter.flush()?;

    log::debug!("in-place split produced {} sub-draws", splitter.flushes);
    Ok(())
}

struct Splitter<'c> {
    dispatcher: &'c dyn DrawDispatch,
    call: &'c DrawCall<'c>,
    bounds: IndexBounds,
    params: &'c SplitParams,
    /// Largest index range (indexed) or vertex range per sub-draw.
    limit: usize,
    indexed: bool,
    prims: Vec<Prim>,
    /// Range of the batch, `lo..hi`.
    lo: usize,
    hi: usize,
    total: usize,
    flushes: usize,
    arena: &'c mut ScratchArena,
}

impl Splitter<'_> {
    /// Elements that can be added at `start` without breaking the limit.
    fn available(&self, start: usize) -> usize {
        if self.prims.is_empty() {
            return self.limit;
        }
        let lo = self.lo.min(start);
        if self.hi - lo > self.limit {
            return 0;
        }
        let mut room = (lo + self.limit).saturating_sub(start);
        if self.indexed {
            room = room.min(self.limit.saturating_sub(self.total));
        }
        room
    }

    fn push(&mut self, prim: Prim) -> DrawResult<()> {
        let start = prim.start as usize;
        let end = start + prim.count as usize;
        if self.prims.is_empty() {
            self.lo = start;
            self.hi = end;
        } else {
            self.lo = self.lo.min(start);
            self.hi = self.hi.max(end);
        }
        self.total += prim.count as usize;
        self.prims.push(prim);
        if self.prims.len() >= MAX_PRIM {
            self.flush()?;
        }
        Ok(())
    }

    fn split_prim(&mut self, prim: &Prim) -> DrawResult<()> {
        let count = prim.mode.trim_count(prim.count) as usize;
        if count == 0 {
            return Ok(());
        }
        let (first, incr) = prim.mode.first_incr();
        let (first, incr) = (first as usize, incr as usize);
        let period = prim.mode.winding_period().map(|p| p as usize);
        let splittable = prim.mode.split_rule().is_some();

        let mut j = 0;
        loop {
            let start = prim.start as usize + j;
            let remaining = count - j;
            let available = self.available(start);

            if remaining <= available {
                return self.push(Prim {
                    start: start as u32,
                    count: remaining as u32,
                    begin: prim.begin && j == 0,
                    ..*prim
                });
            }

            if !splittable {
                if !self.prims.is_empty() {
                    self.flush()?;
                    continue;
                }
                return self.copy_whole(prim, count);
            }

            if available < chunk_room(prim.mode) {
                if self.prims.is_empty() {
                    return Err(DrawError::InvalidLimits(format!(
                        "{:?} needs {} elements per sub-draw but the limit is {}",
                        prim.mode,
                        chunk_room(prim.mode),
                        self.limit
                    )));
                }
                self.flush()?;
                continue;
            }

            let mut n = available - (available - first) % incr;
            if let Some(period) = period {
                n -= (n - (first - incr)) % period;
            }
            self.push(Prim {
                start: start as u32,
                count: n as u32,
                begin: prim.begin && j == 0,
                end: false,
                ..*prim
            })?;
            self.flush()?;
            j += n - (first - incr);
        }
    }

    /// Hand a run that cannot be cut by start and count to the copying
    /// splitter.
    fn copy_whole(&mut self, prim: &Prim, count: usize) -> DrawResult<()> {
        log::trace!("{:?} run of {count} elements routed to the copying splitter", prim.mode);
        if self.indexed {
            let single = Prim {
                count: count as u32,
                ..*prim
            };
            let sub = DrawCall {
                arrays: self.call.arrays.clone(),
                prims: std::slice::from_ref(&single),
                index: self.call.index.clone(),
                bounds: Some(self.bounds),
                instances: self.call.instances,
            };
            return split_copy(self.dispatcher, &sub, self.bounds, self.params, self.arena);
        }

        let mut indices = self.arena.try_vec::<u32>(count, "generated indices")?;
        indices.extend(prim.start..prim.start + count as u32);
        let single = Prim {
            start: 0,
            count: count as u32,
            base_vertex: 0,
            ..*prim
        };
        let bounds = IndexBounds::new(prim.start, prim.start + count as u32 - 1);
        let sub = DrawCall {
            arrays: self.call.arrays.clone(),
            prims: std::slice::from_ref(&single),
            index: Some(IndexSource::from_u32(&indices)),
            bounds: Some(bounds),
            instances: self.call.instances,
        };
        split_copy(self.dispatcher, &sub, bounds, self.params, self.arena)
    }

    /// Dispatch the batch as one sub-draw.
    fn flush(&mut self) -> DrawResult<()> {
        if self.prims.is_empty() {
            return Ok(());
        }
        let (lo, hi) = (self.lo as u32, self.hi as u32);
        log::trace!(
            "in-place sub-draw {}: {} prims over {lo}..{hi}",
            self.flushes,
            self.prims.len()
        );

        if let Some(index) = &self.call.index {
            let prims: Vec<Prim> = self
                .prims
                .iter()
                .map(|prim| Prim {
                    start: prim.start - lo,
                    ..*prim
                })
                .collect();
            let sub = DrawCall {
                arrays: self.call.arrays.clone(),
                prims: &prims,
                index: Some(index.slice(lo, hi - lo)),
                bounds: None,
                instances: self.call.instances,
            };
            self.dispatcher.dispatch(&sub, self.arena)?;
        } else {
            let sub = DrawCall {
                arrays: self.call.arrays.clone(),
                prims: &self.prims,
                index: None,
                bounds: Some(IndexBounds::new(lo, hi - 1)),
                instances: self.call.instances,
            };
            self.dispatcher.dispatch(&sub, self.arena)?;
        }

        self.flushes += 1;
        self.prims.clear();
        self.total = 0;
        Ok(())
    }
}
