//! Copying splitter.
//!
//! Walks every primitive run element by element, copying each referenced
//! vertex into a bounded chunk and emitting chunk-local indices. A chunk is
//! dispatched when it fills up, and primitives cut at a chunk boundary are
//! resumed in the next chunk by re-emitting the vertices they still need:
//! the overlap of a strip, the pivot and previous vertex of a fan.

use crate::arena::ScratchArena;
use crate::context::{DrawCall, DrawDispatch};
use crate::error::{DrawError, DrawResult};
use crate::index::{acquire_index, index_bytes, widen};
use crate::mapping::MappedBuffers;
use crate::types::{AttribSlot, IndexBounds, IndexSource, Instancing, Prim, PrimMode, VertexFormat};
use crate::vertex::{check_range, ArraySource, VertexArray, VertexArrays};

use super::{SplitParams, VertexCache, MAX_PRIM};

/// Hard cap on indices per chunk.
const MAX_CHUNK_INDICES: usize = 65536;

/// A per-vertex source array being repacked.
struct Varying<'m> {
    slot: AttribSlot,
    format: VertexFormat,
    stride: usize,
    bytes: &'m [u8],
    /// Offset of the attribute within a packed output vertex.
    dst_offset: usize,
}

/// Output primitive being filled.
struct OpenPrim {
    mode: PrimMode,
    start: usize,
    begin: bool,
    draw_id: u32,
}

/// Room a fresh pass over a run of `mode` needs before it can emit anything.
pub(super) fn chunk_room(mode: PrimMode) -> usize {
    let (first, _) = mode.first_incr();
    let first = first as usize;
    match mode.winding_period() {
        Some(period) => first.div_ceil(period as usize) * period as usize,
        None => first,
    }
}

/// Split an indexed draw by copying vertices into bounded chunks.
pub(super) fn split_copy(
    dispatcher: &dyn DrawDispatch,
    call: &DrawCall<'_>,
    bounds: IndexBounds,
    params: &SplitParams,
    arena: &mut ScratchArena,
) -> DrawResult<()> {
    let Some(index) = call.index.as_ref() else {
        unreachable!("copy split requires an indexed draw");
    };

    let mut maps = MappedBuffers::new(dispatcher.backend());
    acquire_index(index, &mut maps)?;
    for (_, array) in call.arrays.iter().filter(|(_, array)| array.is_varying()) {
        if let ArraySource::Buffer { buffer, .. } = &array.source {
            maps.acquire(buffer)?;
        }
    }

    let vertex_len = bounds.max as usize + 1;
    let mut varyings = Vec::new();
    let mut vertex_size = 0;
    for (slot, array) in call.arrays.iter().filter(|(_, array)| array.is_varying()) {
        let bytes = array.bytes(&maps)?;
        let stride = array.stride as usize;
        check_range(&array.format, stride, vertex_len, bytes.len())?;
        varyings.push(Varying {
            slot,
            format: array.format,
            stride,
            bytes,
            dst_offset: vertex_size,
        });
        vertex_size += array.format.element_size();
    }

    let src = widen(index.size, index_bytes(index, &maps)?, index.count as usize, arena)?;

    let total = call.element_count() as usize;
    let index_cap = MAX_CHUNK_INDICES
        .min(total.saturating_mul(2).saturating_add(3))
        .min(params.limits.max_indices as usize);
    let vertex_cap = (params.limits.vertex_capacity(vertex_size) as usize).min(index_cap);

    for prim in call.prims {
        let count = prim.mode.trim_count(prim.count) as usize;
        if count == 0 {
            continue;
        }
        let needed = chunk_room(prim.mode);
        if needed > vertex_cap {
            return Err(DrawError::InvalidLimits(format!(
                "{:?} needs {needed} vertices per chunk but a chunk holds {vertex_cap}",
                prim.mode
            )));
        }
        let end = prim.start as usize + count;
        if end > src.len() {
            return Err(DrawError::OutOfBounds {
                what: "primitive index range",
                needed: end,
                available: src.len(),
            });
        }
    }

    // Every buffer is allocated before the first chunk is dispatched.
    let mut vertices = arena.try_vec::<u8>(vertex_cap * vertex_size, "split vertex buffer")?;
    vertices.resize(vertex_cap * vertex_size, 0);
    let indices = arena.try_vec::<u32>(index_cap, "split index buffer")?;

    let mut copier = Copier {
        dispatcher,
        base: &call.arrays,
        instances: call.instances,
        varyings: &varyings,
        vertex_size,
        vertex_cap,
        index_cap,
        vertices,
        vertex_count: 0,
        indices,
        prims: Vec::with_capacity(MAX_PRIM),
        cache: VertexCache::new(params.vertex_cache),
        open: None,
        headroom: 1,
        period: None,
        chunks: 0,
        arena,
    };

    for prim in call.prims {
        let count = prim.mode.trim_count(prim.count) as usize;
        if count == 0 {
            continue;
        }
        let start = prim.start as usize;
        let elts = &src[start..start + count];
        match prim.mode {
            PrimMode::TriangleFan | PrimMode::Polygon => copier.copy_fan(prim, elts)?,
            PrimMode::LineLoop => copier.copy_run(prim, elts, prim.end)?,
            _ => copier.copy_run(prim, elts, false)?,
        }
    }
    copier.flush()?;

    log::debug!(
        "copy split produced {} chunks ({} cache hits, {} misses)",
        copier.chunks,
        copier.cache.hits(),
        copier.cache.misses()
    );
    Ok(())
}

struct Copier<'c> {
    dispatcher: &'c dyn DrawDispatch,
    base: &'c VertexArrays<'c>,
    instances: Instancing,
    varyings: &'c [Varying<'c>],
    vertex_size: usize,
    vertex_cap: usize,
    index_cap: usize,
    vertices: Vec<u8>,
    vertex_count: usize,
    indices: Vec<u32>,
    prims: Vec<Prim>,
    cache: VertexCache,
    open: Option<OpenPrim>,
    /// Room below which the chunk asks to be flushed.
    headroom: usize,
    /// Strip winding period of the open primitive.
    period: Option<usize>,
    chunks: usize,
    arena: &'c mut ScratchArena,
}

impl Copier<'_> {
    fn vertex_room(&self) -> usize {
        self.vertex_cap - self.vertex_count
    }

    fn index_room(&self) -> usize {
        self.index_cap - self.indices.len()
    }

    fn low_on_room(&self) -> bool {
        self.vertex_room() < self.headroom || self.index_room() < self.headroom
    }

    /// Open an output primitive, flushing first if a pass would not fit.
    fn begin(&mut self, mode: PrimMode, out_mode: PrimMode, begin: bool, draw_id: u32) -> DrawResult<()> {
        let needed = chunk_room(mode);
        if self.vertex_room() < needed || self.index_room() < needed {
            self.flush()?;
        }

        let (first, incr) = mode.first_incr();
        let (first, incr) = (first as usize, incr as usize);
        let cap = self.vertex_cap.min(self.index_cap);
        self.period = mode.winding_period().map(|p| p as usize);
        self.headroom = incr
            .max(4)
            .min(cap.saturating_sub(first))
            .max(incr)
            .max(self.period.unwrap_or(0));

        self.open = Some(OpenPrim {
            mode: out_mode,
            start: self.indices.len(),
            begin,
            draw_id,
        });
        Ok(())
    }

    /// Whether the open primitive should stop at the current element.
    ///
    /// Strips only stop after a whole winding period so the next chunk
    /// resumes with the same winding.
    fn should_flush(&self) -> bool {
        if let (Some(period), Some(open)) = (self.period, &self.open) {
            if (self.indices.len() - open.start) % period != 0 {
                return false;
            }
        }
        self.low_on_room()
    }

    /// Emit one source element; returns the flush signal.
    fn elt(&mut self, src: u32, base_vertex: i32) -> DrawResult<bool> {
        let key = src.wrapping_add_signed(base_vertex);
        let dst = match self.cache.lookup(key) {
            Some(dst) => dst,
            None => {
                let dst = self.vertex_count;
                self.copy_vertex(key, dst)?;
                self.vertex_count += 1;
                self.cache.insert(key, dst as u32);
                dst as u32
            }
        };
        debug_assert!(self.indices.len() < self.index_cap, "chunk index overflow");
        self.indices.push(dst);
        Ok(self.should_flush())
    }

    fn copy_vertex(&mut self, vertex: u32, dst: usize) -> DrawResult<()> {
        debug_assert!(dst < self.vertex_cap, "chunk vertex overflow");
        let base = dst * self.vertex_size;
        for varying in self.varyings {
            let size = varying.format.element_size();
            let at = vertex as usize * varying.stride;
            let src = varying.bytes.get(at..at + size).ok_or(DrawError::OutOfBounds {
                what: "vertex array",
                needed: at + size,
                available: varying.bytes.len(),
            })?;
            let out = base + varying.dst_offset;
            self.vertices[out..out + size].copy_from_slice(src);
        }
        Ok(())
    }

    /// Close the open primitive.
    fn end(&mut self, end: bool, force_flush: bool) -> DrawResult<()> {
        let Some(open) = self.open.take() else {
            unreachable!("end without a matching begin");
        };
        let count = self.indices.len() - open.start;
        if count > 0 {
            self.prims.push(Prim {
                mode: open.mode,
                start: open.start as u32,
                count: count as u32,
                begin: open.begin,
                end,
                base_vertex: 0,
                draw_id: open.draw_id,
            });
        }
        if force_flush || self.prims.len() >= MAX_PRIM || self.low_on_room() {
            self.flush()?;
        }
        Ok(())
    }

    /// Copy a run following its `first, incr` rule. With `closing` set the
    /// run is a line loop: it becomes a strip that repeats its first vertex.
    fn copy_run(&mut self, prim: &Prim, elts: &[u32], closing: bool) -> DrawResult<()> {
        let (first, incr) = prim.mode.first_incr();
        let (first, incr) = (first as usize, incr as usize);
        let out_mode = match prim.mode {
            PrimMode::LineLoop => PrimMode::LineStrip,
            mode => mode,
        };
        let count = elts.len() + usize::from(closing);
        let elt_at = |k: usize| elts.get(k).copied().unwrap_or(elts[0]);

        let mut j = 0;
        let mut first_pass = true;
        loop {
            self.begin(prim.mode, out_mode, prim.begin && first_pass, prim.draw_id)?;
            for k in j..j + first {
                self.elt(elt_at(k), prim.base_vertex)?;
            }
            j += first;

            let mut flush = self.should_flush();
            while j < count && !flush {
                for k in j..j + incr {
                    flush = self.elt(elt_at(k), prim.base_vertex)?;
                }
                j += incr;
            }

            if j >= count {
                return self.end(prim.end, false);
            }
            self.end(false, true)?;
            j -= first - incr;
            first_pass = false;
        }
    }

    /// Copy a fan or polygon. Each continuation pass starts with the pivot
    /// and the last vertex of the previous pass.
    fn copy_fan(&mut self, prim: &Prim, elts: &[u32]) -> DrawResult<()> {
        let count = elts.len();
        let base_vertex = prim.base_vertex;

        let mut j = 3;
        let mut first_pass = true;
        loop {
            self.begin(prim.mode, prim.mode, prim.begin && first_pass, prim.draw_id)?;
            if first_pass {
                for &e in &elts[..3] {
                    self.elt(e, base_vertex)?;
                }
            } else {
                self.elt(elts[0], base_vertex)?;
                self.elt(elts[j - 1], base_vertex)?;
                self.elt(elts[j], base_vertex)?;
                j += 1;
            }

            let mut flush = self.should_flush();
            while j < count && !flush {
                flush = self.elt(elts[j], base_vertex)?;
                j += 1;
            }

            if j >= count {
                return self.end(prim.end, false);
            }
            self.end(false, true)?;
            first_pass = false;
        }
    }

    /// Dispatch the chunk and start an empty one.
    fn flush(&mut self) -> DrawResult<()> {
        debug_assert!(self.open.is_none(), "flushing with an open primitive");
        if !self.indices.is_empty() {
            let vertex_bytes = &self.vertices[..self.vertex_count * self.vertex_size];
            let chunk = DrawCall {
                arrays: chunk_arrays(self.base, self.varyings, vertex_bytes, self.vertex_size),
                prims: &self.prims,
                index: Some(IndexSource::from_u32(&self.indices)),
                bounds: Some(IndexBounds::new(0, self.vertex_count as u32 - 1)),
                instances: self.instances,
            };
            log::trace!(
                "split chunk {}: {} vertices, {} indices, {} prims",
                self.chunks,
                self.vertex_count,
                self.indices.len(),
                self.prims.len()
            );
            self.dispatcher.dispatch(&chunk, self.arena)?;
            self.chunks += 1;
        }
        self.vertex_count = 0;
        self.indices.clear();
        self.prims.clear();
        self.cache.clear();
        Ok(())
    }
}

/// Arrays of a chunk: varying arrays read the packed vertices, everything
/// else is passed through.
fn chunk_arrays<'v>(
    base: &VertexArrays<'v>,
    varyings: &[Varying<'_>],
    vertices: &'v [u8],
    vertex_size: usize,
) -> VertexArrays<'v> {
    let mut arrays = base.clone();
    for varying in varyings {
        arrays.set(
            varying.slot,
            VertexArray {
                format: varying.format,
                stride: vertex_size as u32,
                source: ArraySource::Client {
                    data: vertices,
                    offset: varying.dst_offset,
                },
                instance_divisor: 0,
            },
        );
    }
    arrays
}
