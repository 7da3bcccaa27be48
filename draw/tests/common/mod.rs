//! Common utilities for draw integration tests.
//!
//! This module provides vertex data generators and a context wrapper that
//! runs the same draw against either backend.

use redlilium_draw::{
    AssembledPrimitive, AttribSlot, Command, CommandBackend, DrawCall, DrawConfig, DrawContext,
    DrawResult, Prim, PrimMode, SoftwareBackend, SplitLimits, VertexArray, VertexArrays,
    VertexFormat,
};

/// Install a test logger once.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Backend Enumeration
// ============================================================================

/// Available backends for testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// CPU primitive assembly.
    Software,
    /// Hardware-style command recording.
    Command,
}

/// One draw as the backend received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Vertices addressable by the draw.
    pub vertex_count: u32,
    pub indexed: bool,
    /// One past the last index (or vertex) any run reads.
    pub element_end: u32,
    pub prims: Vec<Prim>,
}

/// A draw context over either backend.
pub enum TestContext {
    Software(DrawContext<SoftwareBackend>),
    Command(DrawContext<CommandBackend>),
}

impl TestContext {
    /// Create a context whose backend accepts at most `limits`.
    pub fn new(backend: Backend, limits: SplitLimits, config: DrawConfig) -> Self {
        init_logging();
        match backend {
            Backend::Software => Self::Software(
                DrawContext::new(SoftwareBackend::new().with_limits(limits), config)
                    .expect("valid config"),
            ),
            Backend::Command => Self::Command(
                DrawContext::new(CommandBackend::new().with_limits(limits), config)
                    .expect("valid config"),
            ),
        }
    }

    pub fn draw(&self, call: &DrawCall<'_>) -> DrawResult<()> {
        match self {
            Self::Software(context) => context.draw(call),
            Self::Command(context) => context.draw(call),
        }
    }

    /// Take every draw submitted so far.
    pub fn submissions(&self) -> Vec<Submission> {
        match self {
            Self::Software(context) => context
                .backend()
                .take_draws()
                .into_iter()
                .map(|record| Submission {
                    vertex_count: record.vertex_count,
                    indexed: record.indexed,
                    element_end: element_end(&record.prims),
                    prims: record.prims,
                })
                .collect(),
            Self::Command(context) => submissions_from_commands(context.backend().take_commands()),
        }
    }
}

fn element_end(prims: &[Prim]) -> u32 {
    prims.iter().map(|p| p.start + p.count).max().unwrap_or(0)
}

/// Group a command stream into draws. Every draw starts by binding its
/// vertex buffers.
fn submissions_from_commands(commands: Vec<Command>) -> Vec<Submission> {
    let mut out: Vec<Submission> = Vec::new();
    for command in commands {
        match command {
            Command::BindVertexBuffers(_) => out.push(Submission {
                vertex_count: 0,
                indexed: false,
                element_end: 0,
                prims: Vec::new(),
            }),
            Command::Draw {
                mode,
                start,
                count,
                base_vertex,
                max_index,
                indexed,
                draw_id,
                ..
            } => {
                let current = out.last_mut().expect("draw before vertex buffers");
                current.vertex_count = max_index + 1;
                current.indexed = indexed;
                current.prims.push(
                    Prim::new(mode, start, count)
                        .with_base_vertex(base_vertex)
                        .with_draw_id(draw_id),
                );
                current.element_end = element_end(&current.prims);
            }
            _ => {}
        }
    }
    out
}

// ============================================================================
// Vertex Data
// ============================================================================

/// Every topology the pipeline accepts.
#[allow(dead_code)]
pub const ALL_MODES: [PrimMode; 15] = [
    PrimMode::Points,
    PrimMode::Lines,
    PrimMode::LineLoop,
    PrimMode::LineStrip,
    PrimMode::Triangles,
    PrimMode::TriangleStrip,
    PrimMode::TriangleFan,
    PrimMode::Quads,
    PrimMode::QuadStrip,
    PrimMode::Polygon,
    PrimMode::LinesAdjacency,
    PrimMode::LineStripAdjacency,
    PrimMode::TrianglesAdjacency,
    PrimMode::TriangleStripAdjacency,
    PrimMode::Patches { vertices: 3 },
];

/// Positions `(i, i / 2)` as FLOAT2, so a fetched position identifies its
/// source vertex.
pub fn positions(n: usize) -> Vec<f32> {
    (0..n).flat_map(|i| [i as f32, i as f32 * 0.5]).collect()
}

/// Colors as UNORM8x4.
pub fn colors(n: usize) -> Vec<u8> {
    (0..n)
        .flat_map(|i| [(i * 5 % 256) as u8, (255 - i % 256) as u8, 0, 255])
        .collect()
}

/// Position-only arrays.
pub fn position_arrays(positions: &[f32]) -> VertexArrays<'_> {
    VertexArrays::new().with(
        AttribSlot::Position,
        VertexArray::client(VertexFormat::FLOAT2, bytemuck::cast_slice(positions), 8),
    )
}

/// Position and color arrays (12 bytes per vertex).
#[allow(dead_code)]
pub fn colored_arrays<'a>(positions: &'a [f32], colors: &'a [u8]) -> VertexArrays<'a> {
    position_arrays(positions).with(
        AttribSlot::Color0,
        VertexArray::client(VertexFormat::UNORM8X4, colors, 4),
    )
}

/// Source vertex of every vertex of every primitive, read back from the
/// position x coordinate.
pub fn source_ids(primitives: &[AssembledPrimitive]) -> Vec<Vec<u32>> {
    primitives
        .iter()
        .map(|prim| {
            prim.vertices
                .iter()
                .map(|v| v.position().expect("position attribute")[0] as u32)
                .collect()
        })
        .collect()
}

/// Draw `call` without limits and return what the software backend
/// assembled.
#[allow(dead_code)]
pub fn reference(call: &DrawCall<'_>) -> Vec<AssembledPrimitive> {
    let context = DrawContext::new(SoftwareBackend::new(), DrawConfig::default()).expect("valid config");
    context.draw(call).expect("reference draw");
    context.backend().take_primitives()
}
