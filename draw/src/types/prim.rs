//! Primitive descriptors.

/// Primitive topology of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimMode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
    Quads,
    QuadStrip,
    Polygon,
    LinesAdjacency,
    LineStripAdjacency,
    TrianglesAdjacency,
    TriangleStripAdjacency,
    /// Tessellation patches with a fixed number of control points.
    Patches { vertices: u32 },
}

impl PrimMode {
    /// Vertices of the first primitive and vertices added by each further one.
    pub fn first_incr(&self) -> (u32, u32) {
        match self {
            Self::Points => (1, 1),
            Self::Lines => (2, 2),
            Self::LineStrip | Self::LineLoop => (2, 1),
            Self::Triangles => (3, 3),
            Self::TriangleStrip | Self::TriangleFan | Self::Polygon => (3, 1),
            Self::Quads => (4, 4),
            Self::QuadStrip => (4, 2),
            Self::LinesAdjacency => (4, 4),
            Self::LineStripAdjacency => (4, 1),
            Self::TrianglesAdjacency => (6, 6),
            Self::TriangleStripAdjacency => (6, 2),
            Self::Patches { vertices } => {
                let n = (*vertices).max(1);
                (n, n)
            }
        }
    }

    /// The `(first, incr)` rule for runs that can be cut by adjusting
    /// start and count alone.
    ///
    /// Loops, fans and polygons return `None`: every piece of them needs
    /// a vertex that is not contiguous with the piece.
    pub fn split_rule(&self) -> Option<(u32, u32)> {
        match self {
            Self::LineLoop | Self::TriangleFan | Self::Polygon => None,
            _ => Some(self.first_incr()),
        }
    }

    /// Drop incomplete trailing primitives from a vertex count.
    pub fn trim_count(&self, count: u32) -> u32 {
        let (first, incr) = self.first_incr();
        if count < first {
            0
        } else {
            count - (count - first) % incr
        }
    }

    /// Output-index period over which strip winding repeats, if the
    /// topology alternates winding.
    pub(crate) fn winding_period(&self) -> Option<u32> {
        match self {
            Self::TriangleStrip => Some(2),
            Self::TriangleStripAdjacency => Some(4),
            _ => None,
        }
    }
}

/// One contiguous primitive run of a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Prim {
    /// Topology of the run.
    pub mode: PrimMode,
    /// First element in the index stream, or first vertex when non-indexed.
    pub start: u32,
    /// Number of elements.
    pub count: u32,
    /// The run starts a logical primitive.
    pub begin: bool,
    /// The run closes a logical primitive.
    pub end: bool,
    /// Added to every index before fetching (indexed draws only).
    pub base_vertex: i32,
    /// Multi-draw identifier.
    pub draw_id: u32,
}

impl Prim {
    /// Create a complete run (begin and end set).
    pub fn new(mode: PrimMode, start: u32, count: u32) -> Self {
        Self {
            mode,
            start,
            count,
            begin: true,
            end: true,
            base_vertex: 0,
            draw_id: 0,
        }
    }

    /// Set the base vertex.
    pub fn with_base_vertex(mut self, base_vertex: i32) -> Self {
        self.base_vertex = base_vertex;
        self
    }

    /// Set the draw id.
    pub fn with_draw_id(mut self, draw_id: u32) -> Self {
        self.draw_id = draw_id;
        self
    }

    /// Set the begin and end flags.
    pub fn with_flags(mut self, begin: bool, end: bool) -> Self {
        self.begin = begin;
        self.end = end;
        self
    }
}
