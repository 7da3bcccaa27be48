//! Integration tests for the draw pipeline.
//!
//! These tests drive complete draws through [`DrawContext`] and inspect what
//! the backends received. The software backend's assembled primitives are
//! the ground truth: a rebased or split draw must assemble exactly the same
//! primitives as the same draw submitted whole.
//!
//! # Test Categories
//!
//! - **Split Tests**: Loop, fan and strip continuation across chunks
//! - **Rebase Tests**: Pointer shift, index rewrite and base vertex
//! - **Capacity Tests**: Every submission fits the backend limits
//! - **Resource Tests**: Buffer mapping, current values, scratch exhaustion

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rstest::rstest;

use common::{
    colored_arrays, colors, position_arrays, positions, reference, source_ids, Backend,
    TestContext, ALL_MODES,
};
use redlilium_draw::{
    AttribSlot, BackendCaps, BackendDraw, BufferObject, Command, CommandBackend, CurrentValue,
    DrawBackend, DrawCall, DrawConfig, DrawContext, DrawError, DrawResult, IndexBounds, IndexSize,
    IndexSource, Instancing, Prim, PrimMode, SoftwareBackend, SplitLimits, Upload, VertexArray,
    VertexArrays, VertexFormat, MAX_PRIM,
};

fn software(limits: SplitLimits) -> DrawContext<SoftwareBackend> {
    common::init_logging();
    DrawContext::new(SoftwareBackend::new().with_limits(limits), DrawConfig::default()).unwrap()
}

fn max_verts(n: u32) -> SplitLimits {
    SplitLimits::new(n, u32::MAX, usize::MAX)
}

// ============================================================================
// Split Tests
// ============================================================================

/// A line loop cut into three-vertex chunks becomes line strips, and the
/// last chunk closes the loop back to the first vertex.
#[test]
fn test_line_loop_split_closes_loop() {
    let positions = positions(16);
    let indices = [10u32, 11, 12, 13, 14];
    let prims = [Prim::new(PrimMode::LineLoop, 0, 5)];
    let context = software(max_verts(3));

    let call = DrawCall::new(position_arrays(&positions), &prims)
        .with_index(IndexSource::from_u32(&indices));
    context.draw(&call).unwrap();

    let draws = context.backend().take_draws();
    assert!(draws.len() >= 2);
    assert!(draws.iter().all(|d| d.vertex_count <= 3));
    assert_eq!(
        draws[0].prims,
        vec![Prim::new(PrimMode::LineStrip, 0, 3).with_flags(true, false)]
    );
    let last = draws.last().unwrap().prims.last().unwrap();
    assert_eq!(last.mode, PrimMode::LineStrip);
    assert!(!last.begin);
    assert!(last.end);

    let lines = source_ids(&context.backend().take_primitives());
    assert_eq!(
        lines,
        vec![vec![10, 11], vec![11, 12], vec![12, 13], vec![13, 14], vec![14, 10]]
    );
}

/// Every continuation chunk of a fan starts with the pivot and the last
/// vertex of the previous chunk.
#[test]
fn test_fan_split_repeats_pivot() {
    let positions = positions(7);
    let indices: Vec<u32> = (0..7).collect();
    let prims = [Prim::new(PrimMode::TriangleFan, 0, 7)];
    let context = software(max_verts(4));

    let call = DrawCall::new(position_arrays(&positions), &prims)
        .with_index(IndexSource::from_u32(&indices));
    context.draw(&call).unwrap();

    let draws = context.backend().take_draws();
    assert_eq!(draws.len(), 3);
    assert!(draws.iter().all(|d| d.vertex_count <= 4));
    assert!(draws[0].prims[0].begin && !draws[0].prims[0].end);
    assert!(!draws[2].prims[0].begin && draws[2].prims[0].end);

    let triangles = source_ids(&context.backend().take_primitives());
    assert_eq!(
        triangles,
        vec![
            vec![0, 1, 2],
            vec![0, 2, 3],
            vec![0, 3, 4],
            vec![0, 4, 5],
            vec![0, 5, 6],
        ]
    );
}

/// Split output matches the unsplit draw for every topology, for indexed and
/// non-indexed draws, under vertex, index and buffer-size limits, with and
/// without the vertex cache.
#[rstest]
#[case::points(ALL_MODES[0])]
#[case::lines(ALL_MODES[1])]
#[case::line_loop(ALL_MODES[2])]
#[case::line_strip(ALL_MODES[3])]
#[case::triangles(ALL_MODES[4])]
#[case::triangle_strip(ALL_MODES[5])]
#[case::triangle_fan(ALL_MODES[6])]
#[case::quads(ALL_MODES[7])]
#[case::quad_strip(ALL_MODES[8])]
#[case::polygon(ALL_MODES[9])]
#[case::lines_adjacency(ALL_MODES[10])]
#[case::line_strip_adjacency(ALL_MODES[11])]
#[case::triangles_adjacency(ALL_MODES[12])]
#[case::triangle_strip_adjacency(ALL_MODES[13])]
#[case::patches(ALL_MODES[14])]
fn test_split_matches_unsplit(#[case] mode: PrimMode) {
    let n = 41;
    let positions = positions(n);
    let colors = colors(n);
    let indices: Vec<u16> = (0..n).map(|i| ((i * 7 + i / 4) % n) as u16).collect();
    let prims = [
        Prim::new(mode, 0, 20),
        Prim::new(mode, 20, 21).with_draw_id(1),
    ];
    let limits = [
        SplitLimits::new(8, 32, usize::MAX),
        SplitLimits::new(64, 12, usize::MAX),
        SplitLimits::new(u32::MAX, u32::MAX, 8 * 12),
    ];

    for indexed in [false, true] {
        let mut call = DrawCall::new(colored_arrays(&positions, &colors), &prims);
        if indexed {
            call = call.with_index(IndexSource::from_u16(&indices));
        }
        let expected = reference(&call);
        assert!(!expected.is_empty());

        for limits in limits {
            for cache in [true, false] {
                let context = DrawContext::new(
                    SoftwareBackend::new().with_limits(limits),
                    DrawConfig::default().with_vertex_cache(cache),
                )
                .unwrap();
                context.draw(&call).unwrap();
                assert_eq!(
                    context.backend().take_primitives(),
                    expected,
                    "{mode:?} indexed={indexed} limits={limits:?} cache={cache}"
                );
            }
        }
    }
}

/// Per-instance arrays pass through splitting untouched.
#[test]
fn test_instanced_split_matches_unsplit() {
    let positions = positions(30);
    let offsets = [100.0f32, 200.0, 300.0];
    let arrays = position_arrays(&positions).with(
        AttribSlot::Generic(0),
        VertexArray::client(VertexFormat::FLOAT, bytemuck::cast_slice(&offsets), 4).with_divisor(1),
    );
    let indices: Vec<u32> = (0..30).rev().collect();
    let prims = [Prim::new(PrimMode::TriangleStrip, 0, 30)];

    for indexed in [false, true] {
        let mut call = DrawCall::new(arrays.clone(), &prims).with_instances(Instancing::new(3, 0));
        if indexed {
            call = call.with_index(IndexSource::from_u32(&indices));
        }
        // Each sub-draw loops over every instance, so compare per instance.
        let mut expected = reference(&call);
        expected.sort_by_key(|p| p.instance);
        assert_eq!(expected.len(), 3 * 28);

        let context = software(max_verts(8));
        context.draw(&call).unwrap();
        let mut primitives = context.backend().take_primitives();
        primitives.sort_by_key(|p| p.instance);
        assert_eq!(primitives, expected);

        let last = primitives.last().unwrap();
        assert_eq!(last.instance, 2);
        assert_eq!(last.vertices[0].attrib(AttribSlot::Generic(0)).unwrap()[0], 300.0);
    }
}

/// A strip needs four vertices per chunk to keep its winding.
#[rstest]
#[case::software(Backend::Software)]
#[case::command(Backend::Command)]
fn test_limits_too_small(#[case] backend: Backend) {
    let positions = positions(10);
    let indices: Vec<u32> = (0..10).collect();
    let prims = [Prim::new(PrimMode::TriangleStrip, 0, 10)];
    let context = TestContext::new(backend, max_verts(3), DrawConfig::default());

    let plain = DrawCall::new(position_arrays(&positions), &prims);
    assert!(matches!(context.draw(&plain), Err(DrawError::InvalidLimits(_))));

    let indexed = plain.clone().with_index(IndexSource::from_u32(&indices));
    assert!(matches!(context.draw(&indexed), Err(DrawError::InvalidLimits(_))));
    assert!(context.submissions().is_empty());
}

// ============================================================================
// Rebase Tests
// ============================================================================

/// A non-indexed draw starting at vertex 100 is shifted to start at zero.
#[test]
fn test_pointer_shift_rebase() {
    let data: Vec<f32> = (0..110 * 3).map(|i| i as f32).collect();
    let buffer = BufferObject::from_pod("positions", &data);
    let arrays = VertexArrays::new().with(
        AttribSlot::Position,
        VertexArray::buffer(VertexFormat::FLOAT3, buffer.clone(), 0, 12),
    );
    let prims = [Prim::new(PrimMode::Points, 100, 10)];
    let context = DrawContext::new(CommandBackend::new(), DrawConfig::default()).unwrap();

    context.draw(&DrawCall::new(arrays, &prims)).unwrap();

    let commands = context.backend().take_commands();
    assert_eq!(commands.len(), 3);
    match &commands[0] {
        Command::BindVertexBuffers(bound) => {
            assert!(Arc::ptr_eq(&bound[0].buffer, &buffer));
            assert_eq!(bound[0].offset, 100 * 12);
        }
        other => panic!("expected vertex buffers, got {other:?}"),
    }
    assert!(matches!(
        commands[2],
        Command::Draw {
            start: 0,
            count: 10,
            min_index: 0,
            max_index: 9,
            indexed: false,
            ..
        }
    ));
}

/// Index rewriting keeps runs with different base vertices apart.
#[test]
fn test_index_rewrite_rebase() {
    let positions = positions(100);
    let indices: Vec<u16> = [50, 51, 52, 60, 55, 53].to_vec();
    let prims = [
        Prim::new(PrimMode::Triangles, 0, 6),
        Prim::new(PrimMode::Triangles, 0, 6).with_base_vertex(10),
    ];
    let context = software(SplitLimits::unbounded());

    let call = DrawCall::new(position_arrays(&positions), &prims)
        .with_index(IndexSource::from_u16(&indices));
    context.draw(&call).unwrap();

    let draws = context.backend().take_draws();
    assert_eq!(draws.len(), 2);
    assert!(draws.iter().all(|d| d.prims.iter().all(|p| p.base_vertex == 0)));
    assert_eq!(draws[0].vertex_count, 71 - 50);

    let triangles = source_ids(&context.backend().take_primitives());
    assert_eq!(
        triangles,
        vec![
            vec![50, 51, 52],
            vec![60, 55, 53],
            vec![60, 61, 62],
            vec![70, 65, 63],
        ]
    );
}

/// Runs with different starts are rebased as separate sub-draws, in order.
#[test]
fn test_index_rewrite_partitions_by_start() {
    let positions = positions(64);
    let indices: Vec<u16> = vec![50, 51, 52, 60, 55, 53];
    let prims = [
        Prim::new(PrimMode::Triangles, 0, 3),
        Prim::new(PrimMode::Triangles, 3, 3),
    ];
    let context = software(SplitLimits::unbounded());

    let call = DrawCall::new(position_arrays(&positions), &prims)
        .with_index(IndexSource::from_u16(&indices));
    context.draw(&call).unwrap();

    let draws = context.backend().take_draws();
    assert_eq!(draws.len(), 2);
    for draw in &draws {
        assert_eq!(draw.index_count, 3);
        assert_eq!(draw.vertex_count, 60 - 50 + 1);
        assert_eq!(draw.prims, vec![Prim::new(PrimMode::Triangles, 0, 3)]);
    }

    let triangles = source_ids(&context.backend().take_primitives());
    assert_eq!(triangles, vec![vec![50, 51, 52], vec![60, 55, 53]]);
}

/// With base-vertex rebase enabled the indices are left alone and the run's
/// base vertex absorbs the minimum.
#[rstest]
#[case::base_vertex(true)]
#[case::index_rewrite(false)]
fn test_base_vertex_rebase(#[case] base_vertex_rebase: bool) {
    let data: Vec<f32> = (0..64 * 2).map(|i| i as f32).collect();
    let vertices = BufferObject::from_pod("positions", &data);
    let index_buffer = BufferObject::from_pod("indices", &[40u32, 41, 42, 42, 41, 43]);
    let arrays = VertexArrays::new().with(
        AttribSlot::Position,
        VertexArray::buffer(VertexFormat::FLOAT2, vertices, 0, 8),
    );
    let prims = [Prim::new(PrimMode::Triangles, 0, 6)];
    let config = DrawConfig::default().with_base_vertex_rebase(base_vertex_rebase);
    let context = DrawContext::new(CommandBackend::new(), config).unwrap();

    let call = DrawCall::new(arrays, &prims)
        .with_index(IndexSource::buffer(IndexSize::U32, 6, index_buffer.clone(), 0));
    context.draw(&call).unwrap();

    let commands = context.backend().take_commands();
    match &commands[0] {
        Command::BindVertexBuffers(bound) => assert_eq!(bound[0].offset, 40 * 8),
        other => panic!("expected vertex buffers, got {other:?}"),
    }
    match &commands[2] {
        Command::BindIndexBuffer { buffer, .. } => {
            assert_eq!(Arc::ptr_eq(buffer, &index_buffer), base_vertex_rebase)
        }
        other => panic!("expected index buffer, got {other:?}"),
    }
    match commands[3] {
        Command::Draw {
            base_vertex,
            max_index,
            ..
        } => {
            assert_eq!(base_vertex, if base_vertex_rebase { -40 } else { 0 });
            assert_eq!(max_index, 3);
        }
        ref other => panic!("expected draw, got {other:?}"),
    }
    assert!(!index_buffer.is_mapped());
}

// ============================================================================
// Capacity Tests
// ============================================================================

/// Split draws never exceed the backend's vertex or index capacity.
#[rstest]
#[case::software(Backend::Software)]
#[case::command(Backend::Command)]
fn test_submissions_respect_limits(#[case] backend: Backend) {
    let positions = positions(200);
    let indices: Vec<u32> = (0..300).map(|i| (i * 37) % 200).collect();
    let limits = SplitLimits::new(24, 48, usize::MAX);
    let context = TestContext::new(backend, limits, DrawConfig::default());

    for indexed in [true, false] {
        let count = if indexed { 300 } else { 198 };
        let prims = [Prim::new(PrimMode::Triangles, 0, count)];
        let mut call = DrawCall::new(position_arrays(&positions), &prims);
        if indexed {
            call = call.with_index(IndexSource::from_u32(&indices));
        }
        context.draw(&call).unwrap();

        let submissions = context.submissions();
        assert!(submissions.len() > 1);
        let mut elements = 0;
        for submission in &submissions {
            assert_eq!(submission.indexed, indexed);
            assert!(submission.vertex_count <= 24, "{submission:?}");
            assert!(!indexed || submission.element_end <= 48, "{submission:?}");
            assert!(submission.prims.len() <= MAX_PRIM);
            elements += submission.prims.iter().map(|p| p.count).sum::<u32>();
        }
        assert_eq!(elements, count);
    }
}

/// A short run deep inside a large index source is submitted with only the
/// indices it reads, whether or not it needs a rebase.
#[rstest]
#[case::zero_based(0)]
#[case::rebased(10)]
fn test_deep_index_range_fits(#[case] first_vertex: u32) {
    let positions = positions(32);
    let mut indices = vec![0u32; 100];
    for (i, index) in indices[90..96].iter_mut().enumerate() {
        *index = first_vertex + i as u32;
    }
    let prims = [Prim::new(PrimMode::Triangles, 90, 6)];
    let context = software(SplitLimits::new(1000, 50, usize::MAX));

    let call = DrawCall::new(position_arrays(&positions), &prims)
        .with_index(IndexSource::from_u32(&indices));
    context.draw(&call).unwrap();

    let draws = context.backend().take_draws();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].index_count, 6);
    assert_eq!(draws[0].prims[0].start, 0);

    let v = first_vertex;
    let triangles = source_ids(&context.backend().take_primitives());
    assert_eq!(
        triangles,
        vec![vec![v, v + 1, v + 2], vec![v + 3, v + 4, v + 5]]
    );
}

/// Runs far apart in the index source are split by the span they cover,
/// not by their combined length.
#[test]
fn test_sparse_runs_split_by_index_span() {
    let positions = positions(16);
    let mut indices = vec![0u32; 96];
    for i in 0..6 {
        indices[i] = i as u32;
        indices[90 + i] = 6 + i as u32;
    }
    let prims = [
        Prim::new(PrimMode::Triangles, 0, 6),
        Prim::new(PrimMode::Triangles, 90, 6),
    ];
    let context = software(SplitLimits::new(1000, 50, usize::MAX));

    let call = DrawCall::new(position_arrays(&positions), &prims)
        .with_index(IndexSource::from_u32(&indices));
    context.draw(&call).unwrap();

    let draws = context.backend().take_draws();
    assert_eq!(draws.len(), 2);
    assert!(draws.iter().all(|d| d.index_count == 6));

    let triangles = source_ids(&context.backend().take_primitives());
    assert_eq!(
        triangles,
        vec![
            vec![0, 1, 2],
            vec![3, 4, 5],
            vec![6, 7, 8],
            vec![9, 10, 11],
        ]
    );
}

/// Too many distinct arrays for the binding limit abandon the draw.
#[rstest]
#[case::software(Backend::Software)]
#[case::command(Backend::Command)]
fn test_too_many_vertex_buffers(#[case] backend: Backend) {
    let positions = positions(3);
    let colors = colors(3);
    let prims = [Prim::new(PrimMode::Triangles, 0, 3)];
    let config = DrawConfig::default().with_max_vertex_buffers(1);
    let context = TestContext::new(backend, SplitLimits::unbounded(), config);

    let err = context
        .draw(&DrawCall::new(colored_arrays(&positions, &colors), &prims))
        .unwrap_err();
    assert_eq!(err, DrawError::TooManyVertexBuffers { needed: 2, max: 1 });
}

// ============================================================================
// Resource Tests
// ============================================================================

/// Attributes sharing a buffer map it once, and the pipeline unmaps what it
/// mapped.
#[test]
fn test_split_maps_each_buffer_once() {
    let data: Vec<f32> = (0..64)
        .flat_map(|i| [i as f32, 0.0, 1.0, 0.5, 0.25, 1.0])
        .collect();
    let vertices = BufferObject::from_pod("interleaved", &data);
    let indices: Vec<u32> = (0..63).rev().collect();
    let index_buffer = BufferObject::from_pod("indices", &indices);
    let arrays = VertexArrays::new()
        .with(
            AttribSlot::Position,
            VertexArray::buffer(VertexFormat::FLOAT2, vertices.clone(), 0, 24),
        )
        .with(
            AttribSlot::Color0,
            VertexArray::buffer(VertexFormat::FLOAT4, vertices.clone(), 8, 24),
        );
    let prims = [Prim::new(PrimMode::Triangles, 0, 63)];
    let context = software(max_verts(8));

    let call = DrawCall::new(arrays, &prims)
        .with_index(IndexSource::buffer(IndexSize::U32, 63, index_buffer.clone(), 0));
    context.draw(&call).unwrap();

    assert!(context.backend().draw_count() > 1);
    assert_eq!(vertices.map_count(), 1);
    assert!(!vertices.is_mapped());
    assert!(!index_buffer.is_mapped());
}

/// Software backend whose buffer mapping always fails.
#[derive(Debug, Default)]
struct UnmappableBackend(SoftwareBackend);

impl DrawBackend for UnmappableBackend {
    fn name(&self) -> &'static str {
        "UnmappableBackend"
    }

    fn caps(&self) -> BackendCaps {
        self.0.caps()
    }

    fn map_buffer_range(&self, buffer: &BufferObject, _offset: usize, _len: usize) -> DrawResult<()> {
        Err(DrawError::MapFailed {
            buffer: buffer.label().unwrap_or_default().to_string(),
            reason: "device lost".to_string(),
        })
    }

    fn upload(&self, bytes: &[u8], alignment: usize) -> DrawResult<Upload> {
        self.0.upload(bytes, alignment)
    }

    fn draw(&self, draw: &BackendDraw<'_>) -> DrawResult<()> {
        self.0.draw(draw)
    }
}

/// Software backend that rejects its `fail_at`-th draw.
#[derive(Debug)]
struct FailingBackend {
    inner: SoftwareBackend,
    fail_at: usize,
    draws: AtomicUsize,
}

impl DrawBackend for FailingBackend {
    fn name(&self) -> &'static str {
        "FailingBackend"
    }

    fn caps(&self) -> BackendCaps {
        self.inner.caps()
    }

    fn upload(&self, bytes: &[u8], alignment: usize) -> DrawResult<Upload> {
        self.inner.upload(bytes, alignment)
    }

    fn draw(&self, draw: &BackendDraw<'_>) -> DrawResult<()> {
        let n = self.draws.fetch_add(1, Ordering::Relaxed) + 1;
        if n == self.fail_at {
            return Err(DrawError::Backend(format!("draw {n} rejected")));
        }
        self.inner.draw(draw)
    }
}

/// A failed map abandons the draw without submitting anything or leaving a
/// buffer mapped, both in the bounds scan and in the copying splitter.
#[rstest]
#[case::bounds_scan(None)]
#[case::copy_split(Some(IndexBounds::new(0, 7)))]
fn test_map_failure_abandons_draw(#[case] bounds: Option<IndexBounds>) {
    common::init_logging();
    let data = positions(8);
    let vertices = BufferObject::from_pod("positions", &data);
    let index_buffer = BufferObject::from_pod("indices", &[0u32, 1, 2, 5, 6, 7]);
    let arrays = VertexArrays::new().with(
        AttribSlot::Position,
        VertexArray::buffer(VertexFormat::FLOAT2, vertices.clone(), 0, 8),
    );
    let prims = [Prim::new(PrimMode::Triangles, 0, 6)];
    let backend = UnmappableBackend(SoftwareBackend::new().with_limits(max_verts(4)));
    let context = DrawContext::new(backend, DrawConfig::default()).unwrap();

    let mut call = DrawCall::new(arrays, &prims)
        .with_index(IndexSource::buffer(IndexSize::U32, 6, index_buffer.clone(), 0));
    if let Some(bounds) = bounds {
        call = call.with_bounds(bounds);
    }
    let err = context.draw(&call).unwrap_err();

    assert!(matches!(err, DrawError::MapFailed { ref buffer, .. } if buffer == "indices"));
    assert_eq!(context.backend().0.draw_count(), 0);
    assert!(!vertices.is_mapped());
    assert!(!index_buffer.is_mapped());
    assert_eq!(index_buffer.map_count(), 0);
}

/// A backend failure mid-split keeps the chunks already submitted and
/// abandons the rest.
#[test]
fn test_backend_failure_keeps_earlier_chunks() {
    common::init_logging();
    let positions = positions(7);
    let indices: Vec<u32> = (0..7).collect();
    let prims = [Prim::new(PrimMode::TriangleFan, 0, 7)];
    let backend = FailingBackend {
        inner: SoftwareBackend::new().with_limits(max_verts(4)),
        fail_at: 2,
        draws: AtomicUsize::new(0),
    };
    let context = DrawContext::new(backend, DrawConfig::default()).unwrap();

    let call = DrawCall::new(position_arrays(&positions), &prims)
        .with_index(IndexSource::from_u32(&indices));
    let err = context.draw(&call).unwrap_err();

    assert_eq!(err, DrawError::Backend("draw 2 rejected".to_string()));
    let inner = &context.backend().inner;
    assert_eq!(inner.draw_count(), 1);
    let triangles = source_ids(&inner.take_primitives());
    assert_eq!(triangles, vec![vec![0, 1, 2], vec![0, 2, 3]]);
}

/// A buffer the caller mapped stays mapped.
#[test]
fn test_caller_mapping_is_preserved() {
    let data: Vec<f32> = positions(32);
    let vertices = BufferObject::from_pod("positions", &data);
    let arrays = VertexArrays::new().with(
        AttribSlot::Position,
        VertexArray::buffer(VertexFormat::FLOAT2, vertices.clone(), 0, 8),
    );
    let indices: Vec<u32> = (0..30).collect();
    let prims = [Prim::new(PrimMode::Triangles, 0, 30)];
    let context = software(max_verts(8));

    vertices.map_range(0, vertices.size()).unwrap();
    let call = DrawCall::new(arrays, &prims).with_index(IndexSource::from_u32(&indices));
    context.draw(&call).unwrap();

    assert!(vertices.is_mapped());
    assert_eq!(vertices.map_count(), 1);
    assert!(vertices.unmap());
}

/// All constant attributes of a draw share one stride-0 binding.
#[test]
fn test_current_values_share_one_binding() {
    let positions = positions(30);
    let arrays = position_arrays(&positions)
        .with(
            AttribSlot::Color0,
            VertexArray::current(VertexFormat::FLOAT4, CurrentValue::from_f32s(&[0.2, 0.4, 0.6, 1.0])),
        )
        .with(
            AttribSlot::Normal,
            VertexArray::current(VertexFormat::FLOAT3, CurrentValue::from_f32s(&[0.0, 0.0, 1.0])),
        );
    let prims = [Prim::new(PrimMode::Triangles, 0, 30)];
    let call = DrawCall::new(arrays, &prims);

    let context = DrawContext::new(
        CommandBackend::new().with_limits(max_verts(9)),
        DrawConfig::default(),
    )
    .unwrap();
    context.draw(&call).unwrap();

    let commands = context.backend().take_commands();
    let mut constant_binding = None;
    let mut draws = 0;
    for command in &commands {
        match command {
            Command::BindVertexBuffers(bound) => {
                let constant: Vec<usize> = bound
                    .iter()
                    .enumerate()
                    .filter(|(_, b)| b.stride == 0)
                    .map(|(i, _)| i)
                    .collect();
                assert_eq!(constant.len(), 1);
                constant_binding = Some(constant[0] as u32);
                draws += 1;
            }
            Command::SetVertexElements(elements) => {
                for slot in [AttribSlot::Color0, AttribSlot::Normal] {
                    let element = elements.iter().find(|e| e.slot == slot).unwrap();
                    assert_eq!(Some(element.binding), constant_binding);
                }
            }
            _ => {}
        }
    }
    assert!(draws > 1);

    let expected = reference(&call);
    assert!(expected
        .iter()
        .flat_map(|p| &p.vertices)
        .all(|v| v.attrib(AttribSlot::Color0) == Some([0.2, 0.4, 0.6, 1.0])));
}

/// Running out of scratch memory abandons the draw before anything is
/// submitted.
#[rstest]
#[case::software(Backend::Software)]
#[case::command(Backend::Command)]
fn test_scratch_exhaustion_abandons_draw(#[case] backend: Backend) {
    let positions = positions(100);
    let narrow: Vec<u16> = (0..100).collect();
    let wide: Vec<u32> = (0..100).collect();
    let prims = [Prim::new(PrimMode::Triangles, 0, 99)];
    let config = DrawConfig::default().with_scratch_budget(Some(32));
    let context = TestContext::new(backend, max_verts(8), config);

    // Widening 16-bit indices for the bounds scan.
    let call = DrawCall::new(position_arrays(&positions), &prims)
        .with_index(IndexSource::from_u16(&narrow));
    assert!(matches!(context.draw(&call), Err(DrawError::OutOfMemory(_))));

    // Chunk buffers of the copying splitter.
    let call = DrawCall::new(position_arrays(&positions), &prims)
        .with_index(IndexSource::from_u32(&wide));
    assert!(matches!(context.draw(&call), Err(DrawError::OutOfMemory(_))));

    assert!(context.submissions().is_empty());
}
