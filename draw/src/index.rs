//! Index reading and bounds computation.

use std::borrow::Cow;

use crate::arena::ScratchArena;
use crate::error::{DrawError, DrawResult};
use crate::mapping::MappedBuffers;
use crate::types::{IndexBounds, IndexData, IndexSize, IndexSource, Prim};

/// Bytes of an index source, starting at its first index.
///
/// Buffer-backed sources must have been acquired in `maps`.
pub(crate) fn index_bytes<'m>(
    index: &'m IndexSource<'_>,
    maps: &'m MappedBuffers<'_>,
) -> DrawResult<&'m [u8]> {
    let (data, offset) = match &index.data {
        IndexData::Buffer { buffer, offset } => (maps.bytes(buffer)?, *offset),
        IndexData::Client(bytes) => (*bytes, 0),
    };
    let end = offset + index.byte_len();
    data.get(offset..end).ok_or(DrawError::OutOfBounds {
        what: "index data",
        needed: end,
        available: data.len(),
    })
}

/// Acquire the buffer behind an index source, if any.
pub(crate) fn acquire_index(index: &IndexSource<'_>, maps: &mut MappedBuffers<'_>) -> DrawResult<()> {
    if let IndexData::Buffer { buffer, .. } = &index.data {
        maps.acquire(buffer)?;
    }
    Ok(())
}

/// Widen `count` indices of any width to 32 bits.
///
/// Aligned 32-bit data is borrowed; everything else is copied into a vector
/// charged to `arena`.
pub fn widen<'s>(
    size: IndexSize,
    bytes: &'s [u8],
    count: usize,
    arena: &mut ScratchArena,
) -> DrawResult<Cow<'s, [u32]>> {
    let needed = count * size.bytes();
    let bytes = bytes.get(..needed).ok_or(DrawError::OutOfBounds {
        what: "index data",
        needed,
        available: bytes.len(),
    })?;

    if size == IndexSize::U32 {
        if let Ok(indices) = bytemuck::try_cast_slice::<u8, u32>(bytes) {
            return Ok(Cow::Borrowed(indices));
        }
    }

    let mut out = arena.try_vec::<u32>(count, "widened indices")?;
    match size {
        IndexSize::U8 => out.extend(bytes.iter().map(|&i| u32::from(i))),
        IndexSize::U16 => out.extend(
            bytes
                .chunks_exact(2)
                .map(|c| u32::from(bytemuck::pod_read_unaligned::<u16>(c))),
        ),
        IndexSize::U32 => out.extend(
            bytes
                .chunks_exact(4)
                .map(bytemuck::pod_read_unaligned::<u32>),
        ),
    }
    Ok(Cow::Owned(out))
}

/// Apply a base vertex to an index, clamping at zero.
pub(crate) fn offset_index(index: u32, base_vertex: i32) -> u32 {
    let v = i64::from(index) + i64::from(base_vertex);
    v.clamp(0, i64::from(u32::MAX)) as u32
}

/// Compute the inclusive range of vertices referenced by `prims`.
///
/// Non-indexed draws use the primitives' start and count. Indexed draws
/// scan every primitive's index range once, including its base vertex.
/// Returns `None` when no primitive references a vertex.
pub fn compute_bounds(
    prims: &[Prim],
    index: Option<&IndexSource<'_>>,
    maps: &mut MappedBuffers<'_>,
    arena: &mut ScratchArena,
) -> DrawResult<Option<IndexBounds>> {
    let mut range: Option<(u32, u32)> = None;
    let mut extend = |lo: u32, hi: u32| {
        range = Some(match range {
            Some((min, max)) => (min.min(lo), max.max(hi)),
            None => (lo, hi),
        });
    };

    let Some(index) = index else {
        for prim in prims.iter().filter(|p| p.count > 0) {
            let end = prim.start.checked_add(prim.count).ok_or(DrawError::OutOfBounds {
                what: "primitive vertex range",
                needed: prim.start as usize + prim.count as usize,
                available: u32::MAX as usize,
            })?;
            extend(prim.start, end - 1);
        }
        return Ok(range.map(|(min, max)| IndexBounds::new(min, max)));
    };

    acquire_index(index, maps)?;
    let bytes = index_bytes(index, maps)?;
    let indices = widen(index.size, bytes, index.count as usize, arena)?;

    for prim in prims.iter().filter(|p| p.count > 0) {
        let first = prim.start as usize;
        let last = first + prim.count as usize;
        let run = indices.get(first..last).ok_or(DrawError::OutOfBounds {
            what: "primitive index range",
            needed: last,
            available: indices.len(),
        })?;
        let lo = run.iter().copied().min().unwrap_or(0);
        let hi = run.iter().copied().max().unwrap_or(0);
        extend(
            offset_index(lo, prim.base_vertex),
            offset_index(hi, prim.base_vertex),
        );
    }
    Ok(range.map(|(min, max)| IndexBounds::new(min, max)))
}
