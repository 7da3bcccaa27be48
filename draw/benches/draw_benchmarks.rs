use criterion::{black_box, criterion_group, criterion_main, Criterion};

use redlilium_draw::{
    convert, AttribSlot, CommandBackend, DrawCall, DrawConfig, DrawContext, IndexSource, Prim,
    PrimMode, ScratchArena, SplitLimits, VertexArray, VertexArrays, VertexFormat,
};

fn positions(n: usize) -> Vec<f32> {
    (0..n).flat_map(|i| [i as f32, 0.0, 1.0]).collect()
}

fn position_arrays(data: &[f32]) -> VertexArrays<'_> {
    VertexArrays::new().with(
        AttribSlot::Position,
        VertexArray::client(VertexFormat::FLOAT3, bytemuck::cast_slice(data), 12),
    )
}

// ---------------------------------------------------------------------------
// Splitting
// ---------------------------------------------------------------------------

fn bench_split_copy(c: &mut Criterion) {
    let data = positions(4096);
    let indices: Vec<u32> = (0..12288).map(|i| (i * 97) % 4096).collect();
    let prims = [Prim::new(PrimMode::Triangles, 0, 12288)];
    let backend = CommandBackend::new().with_limits(SplitLimits::new(256, 1024, usize::MAX));
    let context = DrawContext::new(backend, DrawConfig::default()).unwrap();

    c.bench_function("split_copy_12k_indices", |b| {
        b.iter(|| {
            let call = DrawCall::new(position_arrays(&data), &prims)
                .with_index(IndexSource::from_u32(&indices));
            context.draw(black_box(&call)).unwrap();
            black_box(context.backend().take_commands());
        });
    });
}

fn bench_split_inplace(c: &mut Criterion) {
    let data = positions(8192);
    let prims = [Prim::new(PrimMode::TriangleStrip, 0, 8192)];
    let backend = CommandBackend::new().with_limits(SplitLimits::new(512, u32::MAX, usize::MAX));
    let context = DrawContext::new(backend, DrawConfig::default()).unwrap();

    c.bench_function("split_inplace_8k_strip", |b| {
        b.iter(|| {
            let call = DrawCall::new(position_arrays(&data), &prims);
            context.draw(black_box(&call)).unwrap();
            black_box(context.backend().take_commands());
        });
    });
}

// ---------------------------------------------------------------------------
// Rebase
// ---------------------------------------------------------------------------

fn bench_rebase_index_rewrite(c: &mut Criterion) {
    let data = positions(8192);
    let indices: Vec<u16> = (0..6144).map(|i| 4096 + (i % 4096) as u16).collect();
    let prims = [Prim::new(PrimMode::Triangles, 0, 6144)];
    let context = DrawContext::new(CommandBackend::new(), DrawConfig::default()).unwrap();

    c.bench_function("rebase_index_rewrite_6k", |b| {
        b.iter(|| {
            let call = DrawCall::new(position_arrays(&data), &prims)
                .with_index(IndexSource::from_u16(&indices));
            context.draw(black_box(&call)).unwrap();
            black_box(context.backend().take_commands());
        });
    });
}

// ---------------------------------------------------------------------------
// Format conversion
// ---------------------------------------------------------------------------

fn bench_convert(c: &mut Criterion) {
    let colors: Vec<u8> = (0..4096 * 4).map(|i| (i % 256) as u8).collect();
    let halves: Vec<u16> = (0..4096 * 2)
        .map(|i| half::f16::from_f32(i as f32 * 0.25).to_bits())
        .collect();
    let half2 = VertexFormat::new(redlilium_draw::ScalarType::F16, 2);

    c.bench_function("convert_unorm8x4_4k", |b| {
        b.iter(|| {
            let mut arena = ScratchArena::new();
            let view = convert(&VertexFormat::UNORM8X4, 4, &colors, 4096, &mut arena).unwrap();
            black_box(view.get(&arena, 4095).unwrap());
        });
    });

    c.bench_function("convert_half2_4k", |b| {
        b.iter(|| {
            let mut arena = ScratchArena::new();
            let bytes: &[u8] = bytemuck::cast_slice(&halves);
            let view = convert(&half2, 4, bytes, 4096, &mut arena).unwrap();
            black_box(view.get(&arena, 4095).unwrap());
        });
    });
}

criterion_group!(
    benches,
    bench_split_copy,
    bench_split_inplace,
    bench_rebase_index_rewrite,
    bench_convert
);
criterion_main!(benches);
