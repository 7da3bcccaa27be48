//! Software backend for testing and reference output.
//!
//! This backend fetches and converts every attribute on the CPU and
//! assembles the submitted primitive runs into independent points, lines,
//! triangles and patches. Two submissions that rasterize the same geometry
//! produce the same assembled primitives, however the draw was rebased or
//! split on the way.

use parking_lot::Mutex;

use crate::arena::ScratchArena;
use crate::config::SplitLimits;
use crate::error::{DrawError, DrawResult};
use crate::index::{acquire_index, index_bytes, offset_index, widen};
use crate::mapping::MappedBuffers;
use crate::resources::{Upload, Uploader};
use crate::types::{AttribSlot, Prim, PrimMode};
use crate::vertex::{convert, BindingSource, FloatArray};

use super::{BackendCaps, BackendDraw, DrawBackend};

/// Kind of an assembled primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topology {
    Point,
    Line,
    Triangle,
    Patch,
}

/// Attribute values of one fetched vertex, in slot order.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex(pub Vec<(AttribSlot, [f32; 4])>);

impl Vertex {
    /// Value of one attribute.
    pub fn attrib(&self, slot: AttribSlot) -> Option<[f32; 4]> {
        self.0.iter().find(|(s, _)| *s == slot).map(|(_, value)| *value)
    }

    /// Value of the position attribute.
    pub fn position(&self) -> Option<[f32; 4]> {
        self.attrib(AttribSlot::Position)
    }
}

/// One independent primitive produced by assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledPrimitive {
    pub topology: Topology,
    pub vertices: Vec<Vertex>,
    /// Instance number within the draw, starting at zero.
    pub instance: u32,
    pub draw_id: u32,
}

/// Summary of one submitted draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawRecord {
    /// Vertices addressable by the draw (`bounds.max + 1`).
    pub vertex_count: u32,
    /// Indices read by the draw, or 0 when non-indexed.
    pub index_count: u32,
    pub indexed: bool,
    pub bindings: usize,
    pub prims: Vec<Prim>,
}

/// Split a run of `count` vertices into primitives, as positions within
/// the run.
///
/// Strip triangles alternate winding; a line loop closes only when `end`
/// is set.
pub fn assemble(mode: PrimMode, count: usize, end: bool) -> Vec<(Topology, Vec<usize>)> {
    let n = mode.trim_count(count as u32) as usize;
    let mut out = Vec::new();
    let mut tri = |a: usize, b: usize, c: usize| out.push((Topology::Triangle, vec![a, b, c]));

    match mode {
        PrimMode::Triangles => (0..n).step_by(3).for_each(|i| tri(i, i + 1, i + 2)),
        PrimMode::TriangleStrip => (0..n.saturating_sub(2)).for_each(|i| {
            if i % 2 == 0 {
                tri(i, i + 1, i + 2)
            } else {
                tri(i + 1, i, i + 2)
            }
        }),
        PrimMode::TriangleFan | PrimMode::Polygon => {
            (1..n.saturating_sub(1)).for_each(|i| tri(0, i, i + 1))
        }
        PrimMode::Quads => (0..n).step_by(4).for_each(|i| {
            tri(i, i + 1, i + 2);
            tri(i, i + 2, i + 3);
        }),
        PrimMode::QuadStrip => (0..n.saturating_sub(2) / 2).for_each(|q| {
            let i = 2 * q;
            tri(i, i + 1, i + 3);
            tri(i, i + 3, i + 2);
        }),
        PrimMode::TrianglesAdjacency => (0..n).step_by(6).for_each(|i| tri(i, i + 2, i + 4)),
        PrimMode::TriangleStripAdjacency => (0..n.saturating_sub(4) / 2).for_each(|t| {
            let i = 2 * t;
            if t % 2 == 0 {
                tri(i, i + 2, i + 4)
            } else {
                tri(i + 2, i, i + 4)
            }
        }),
        _ => {}
    }

    let line = |a: usize, b: usize| (Topology::Line, vec![a, b]);
    match mode {
        PrimMode::Points => out.extend((0..n).map(|i| (Topology::Point, vec![i]))),
        PrimMode::Lines => out.extend((0..n).step_by(2).map(|i| line(i, i + 1))),
        PrimMode::LineStrip => out.extend((0..n.saturating_sub(1)).map(|i| line(i, i + 1))),
        PrimMode::LineLoop => {
            out.extend((0..n.saturating_sub(1)).map(|i| line(i, i + 1)));
            if end && n >= 2 {
                out.push(line(n - 1, 0));
            }
        }
        PrimMode::LinesAdjacency => out.extend((0..n).step_by(4).map(|i| line(i + 1, i + 2))),
        PrimMode::LineStripAdjacency => {
            out.extend((1..n.saturating_sub(2)).map(|i| line(i, i + 1)))
        }
        PrimMode::Patches { vertices } => {
            let v = vertices.max(1) as usize;
            out.extend((0..n).step_by(v).map(|i| (Topology::Patch, (i..i + v).collect())));
        }
        _ => {}
    }
    out
}

/// One attribute ready for fetching.
struct ElementView<'s> {
    slot: AttribSlot,
    stride: u32,
    divisor: u32,
    data: FloatArray<'s>,
}

/// CPU reference backend.
///
/// Records every submitted draw and the primitives it assembles. Limits
/// are enforced: a draw larger than [`BackendCaps::limits`] is rejected.
#[derive(Debug)]
pub struct SoftwareBackend {
    uploader: Mutex<Uploader>,
    primitives: Mutex<Vec<AssembledPrimitive>>,
    draws: Mutex<Vec<DrawRecord>>,
    caps: BackendCaps,
}

impl Default for SoftwareBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareBackend {
    /// Create a software backend without limits.
    pub fn new() -> Self {
        Self {
            uploader: Mutex::new(Uploader::new(Uploader::DEFAULT_CAPACITY, "software")),
            primitives: Mutex::new(Vec::new()),
            draws: Mutex::new(Vec::new()),
            caps: BackendCaps::default(),
        }
    }

    /// Set the largest draw the backend accepts.
    pub fn with_limits(mut self, limits: SplitLimits) -> Self {
        self.caps.limits = limits;
        self
    }

    /// Number of draws submitted so far.
    pub fn draw_count(&self) -> usize {
        self.draws.lock().len()
    }

    /// Take the primitives assembled so far.
    pub fn take_primitives(&self) -> Vec<AssembledPrimitive> {
        std::mem::take(&mut *self.primitives.lock())
    }

    /// Take the records of the draws submitted so far.
    pub fn take_draws(&self) -> Vec<DrawRecord> {
        std::mem::take(&mut *self.draws.lock())
    }

    /// Times the stream buffer was replaced.
    pub fn orphan_count(&self) -> u64 {
        self.uploader.lock().orphan_count()
    }

    fn check_limits(&self, draw: &BackendDraw<'_>, vertex_size: usize) -> DrawResult<()> {
        let limits = &self.caps.limits;
        let vertex_count = u64::from(draw.bounds.max) + 1;
        if vertex_count > u64::from(limits.vertex_capacity(vertex_size)) {
            return Err(DrawError::Backend(format!(
                "draw addresses {vertex_count} vertices of {vertex_size} bytes, limits are {limits:?}"
            )));
        }
        if let Some(index) = draw.index {
            if index.count > limits.max_indices {
                return Err(DrawError::Backend(format!(
                    "draw reads {} indices, limit is {}",
                    index.count, limits.max_indices
                )));
            }
        }
        Ok(())
    }
}

impl DrawBackend for SoftwareBackend {
    fn name(&self) -> &'static str {
        "SoftwareBackend"
    }

    fn caps(&self) -> BackendCaps {
        self.caps
    }

    fn upload(&self, bytes: &[u8], alignment: usize) -> DrawResult<Upload> {
        log::trace!("SoftwareBackend: uploading {} bytes", bytes.len());
        self.uploader.lock().upload(bytes, alignment)
    }

    fn draw(&self, draw: &BackendDraw<'_>) -> DrawResult<()> {
        let state = draw.vertex_state;
        let vertex_size = state
            .elements
            .iter()
            .filter(|e| {
                let binding = &state.bindings[e.binding as usize];
                binding.stride != 0 && binding.divisor == 0
            })
            .map(|e| e.format.element_size())
            .sum();
        self.check_limits(draw, vertex_size)?;

        let mut maps = MappedBuffers::new(self);
        for binding in &state.bindings {
            if let BindingSource::Buffer(buffer) = &binding.source {
                maps.acquire(buffer)?;
            }
        }
        if let Some(index) = draw.index {
            acquire_index(index, &mut maps)?;
        }

        let mut arena = ScratchArena::new();
        let vertex_count = draw.bounds.max as usize + 1;
        let instances = draw.instances;

        let mut views = Vec::with_capacity(state.elements.len());
        for element in &state.elements {
            let binding = &state.bindings[element.binding as usize];
            let source = match &binding.source {
                BindingSource::Buffer(buffer) => maps.bytes(buffer)?,
                BindingSource::User(data) => *data,
            };
            let start = binding.offset + element.relative_offset as usize;
            let bytes = source.get(start..).ok_or(DrawError::OutOfBounds {
                what: "vertex binding",
                needed: start,
                available: source.len(),
            })?;
            let count = if binding.stride == 0 {
                1
            } else if binding.divisor > 0 {
                (instances.base + instances.count.div_ceil(binding.divisor)) as usize
            } else {
                vertex_count
            };
            views.push(ElementView {
                slot: element.slot,
                stride: binding.stride,
                divisor: binding.divisor,
                data: convert(&element.format, binding.stride as usize, bytes, count, &mut arena)?,
            });
        }

        let indices = match draw.index {
            Some(index) => Some(widen(
                index.size,
                index_bytes(index, &maps)?,
                index.count as usize,
                &mut arena,
            )?),
            None => None,
        };

        let fetch = |id: u32, instance: u32| -> DrawResult<Vertex> {
            let mut values = Vec::with_capacity(views.len());
            for view in &views {
                let element = if view.stride == 0 {
                    0
                } else if view.divisor > 0 {
                    (instances.base + instance / view.divisor) as usize
                } else {
                    id as usize
                };
                values.push((view.slot, view.data.get(&arena, element)?));
            }
            Ok(Vertex(values))
        };

        let mut assembled = Vec::new();
        for instance in 0..instances.count {
            for prim in draw.prims {
                let ids: Vec<u32> = match &indices {
                    Some(indices) => {
                        let first = prim.start as usize;
                        let last = first + prim.count as usize;
                        let run = indices.get(first..last).ok_or(DrawError::OutOfBounds {
                            what: "primitive index range",
                            needed: last,
                            available: indices.len(),
                        })?;
                        run.iter().map(|&i| offset_index(i, prim.base_vertex)).collect()
                    }
                    None => (prim.start..prim.start + prim.count).collect(),
                };
                for (topology, positions) in assemble(prim.mode, ids.len(), prim.end) {
                    let vertices = positions
                        .iter()
                        .map(|&p| fetch(ids[p], instance))
                        .collect::<DrawResult<Vec<_>>>()?;
                    assembled.push(AssembledPrimitive {
                        topology,
                        vertices,
                        instance,
                        draw_id: prim.draw_id,
                    });
                }
            }
        }

        log::trace!(
            "SoftwareBackend: drew {} prims into {} primitives",
            draw.prims.len(),
            assembled.len()
        );
        self.primitives.lock().extend(assembled);
        self.draws.lock().push(DrawRecord {
            vertex_count: draw.bounds.max + 1,
            index_count: draw.index.map_or(0, |index| index.count),
            indexed: draw.index.is_some(),
            bindings: state.bindings.len(),
            prims: draw.prims.to_vec(),
        });
        Ok(())
    }
}

static_assertions::assert_impl_all!(SoftwareBackend: Send, Sync);

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use rstest::rstest;

    fn tris(list: &[[usize; 3]]) -> Vec<(Topology, Vec<usize>)> {
        list.iter().map(|t| (Topology::Triangle, t.to_vec())).collect()
    }

    #[rstest]
    #[case::triangles(PrimMode::Triangles, 7, tris(&[[0, 1, 2], [3, 4, 5]]))]
    #[case::strip(PrimMode::TriangleStrip, 5, tris(&[[0, 1, 2], [2, 1, 3], [2, 3, 4]]))]
    #[case::fan(PrimMode::TriangleFan, 5, tris(&[[0, 1, 2], [0, 2, 3], [0, 3, 4]]))]
    #[case::quads(PrimMode::Quads, 4, tris(&[[0, 1, 2], [0, 2, 3]]))]
    #[case::quad_strip(PrimMode::QuadStrip, 6, tris(&[[0, 1, 3], [0, 3, 2], [2, 3, 5], [2, 5, 4]]))]
    #[case::strip_adjacency(PrimMode::TriangleStripAdjacency, 8, tris(&[[0, 2, 4], [4, 2, 6]]))]
    fn test_assemble_triangles(
        #[case] mode: PrimMode,
        #[case] count: usize,
        #[case] expected: Vec<(Topology, Vec<usize>)>,
    ) {
        assert_eq!(assemble(mode, count, true), expected);
    }

    #[test]
    fn test_line_loop_closes_only_at_end() {
        assert_eq!(assemble(PrimMode::LineLoop, 3, true).len(), 3);
        assert_eq!(assemble(PrimMode::LineLoop, 3, false).len(), 2);
        assert_eq!(assemble(PrimMode::LineLoop, 3, true)[2], (Topology::Line, vec![2, 0]));
    }

    #[test]
    fn test_line_strip_adjacency() {
        let lines = assemble(PrimMode::LineStripAdjacency, 5, true);
        assert_eq!(
            lines,
            vec![(Topology::Line, vec![1, 2]), (Topology::Line, vec![2, 3])]
        );
    }

    #[test]
    fn test_stream_buffer_orphaned_when_full() {
        let backend = SoftwareBackend::new();
        let block = vec![7u8; Uploader::DEFAULT_CAPACITY / 2 + 16];

        let first = backend.upload(&block, 16).unwrap();
        assert_eq!(backend.orphan_count(), 0);
        let second = backend.upload(&block, 16).unwrap();
        assert_eq!(backend.orphan_count(), 1);
        assert_eq!(second.offset, 0);
        assert!(!Arc::ptr_eq(&first.buffer, &second.buffer));
        assert_eq!(first.buffer.contents()[0], 7);
    }

    #[test]
    fn test_patches() {
        let patches = assemble(PrimMode::Patches { vertices: 3 }, 7, true);
        assert_eq!(patches.len(), 2);
        assert_eq!(patches[1], (Topology::Patch, vec![3, 4, 5]));
    }
}
