//! Draw pipeline configuration.

use crate::error::{DrawError, DrawResult};

/// Per-chunk capacities a backend can accept in one draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SplitLimits {
    /// Maximum distinct vertices per draw.
    pub max_verts: u32,
    /// Maximum indices per draw.
    pub max_indices: u32,
    /// Maximum bytes of packed vertex data per draw.
    pub max_vb_size: usize,
}

impl Default for SplitLimits {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl SplitLimits {
    /// Create limits from explicit capacities.
    pub fn new(max_verts: u32, max_indices: u32, max_vb_size: usize) -> Self {
        Self {
            max_verts,
            max_indices,
            max_vb_size,
        }
    }

    /// Limits that never trigger a split.
    pub fn unbounded() -> Self {
        Self {
            max_verts: u32::MAX,
            max_indices: u32::MAX,
            max_vb_size: usize::MAX,
        }
    }

    /// Component-wise minimum of two limit sets.
    pub fn min(&self, other: &Self) -> Self {
        Self {
            max_verts: self.max_verts.min(other.max_verts),
            max_indices: self.max_indices.min(other.max_indices),
            max_vb_size: self.max_vb_size.min(other.max_vb_size),
        }
    }

    /// Vertex capacity for vertices of `vertex_size` bytes.
    pub fn vertex_capacity(&self, vertex_size: usize) -> u32 {
        if vertex_size == 0 {
            return self.max_verts;
        }
        let by_size = self.max_vb_size / vertex_size;
        u32::try_from(by_size).map_or(self.max_verts, |n| n.min(self.max_verts))
    }
}

/// Configuration of a [`DrawContext`](crate::DrawContext).
///
/// # Example
///
/// ```ignore
/// let config = DrawConfig::default()
///     .with_limits(SplitLimits::new(4096, 65536, 1 << 20))
///     .with_scratch_budget(Some(16 << 20));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawConfig {
    /// Split capacities (further clamped by the backend).
    pub limits: SplitLimits,
    /// Rebase by adjusting base vertex when the backend supports it.
    ///
    /// Off by default: the index rewrite and pointer shift strategies are the
    /// validated ones.
    pub base_vertex_rebase: bool,
    /// Use the split-copy vertex cache.
    pub vertex_cache: bool,
    /// Maximum vertex buffer bindings per draw (further clamped by the backend).
    pub max_vertex_buffers: u32,
    /// Maximum attribute offset within one binding.
    pub max_relative_offset: u32,
    /// Bytes of scratch memory one draw may allocate.
    pub scratch_budget: Option<usize>,
}

impl Default for DrawConfig {
    fn default() -> Self {
        Self {
            limits: SplitLimits::default(),
            base_vertex_rebase: false,
            vertex_cache: true,
            max_vertex_buffers: 32,
            max_relative_offset: 2047,
            scratch_budget: None,
        }
    }
}

impl DrawConfig {
    /// Set the split limits.
    pub fn with_limits(mut self, limits: SplitLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Enable or disable base-vertex rebasing.
    pub fn with_base_vertex_rebase(mut self, enabled: bool) -> Self {
        self.base_vertex_rebase = enabled;
        self
    }

    /// Enable or disable the split-copy vertex cache.
    pub fn with_vertex_cache(mut self, enabled: bool) -> Self {
        self.vertex_cache = enabled;
        self
    }

    /// Set the vertex buffer binding limit.
    pub fn with_max_vertex_buffers(mut self, max: u32) -> Self {
        self.max_vertex_buffers = max;
        self
    }

    /// Set the maximum relative attribute offset.
    pub fn with_max_relative_offset(mut self, max: u32) -> Self {
        self.max_relative_offset = max;
        self
    }

    /// Set the scratch memory budget.
    pub fn with_scratch_budget(mut self, budget: Option<usize>) -> Self {
        self.scratch_budget = budget;
        self
    }

    /// Check that the configuration can make progress.
    pub fn validate(&self) -> DrawResult<()> {
        if self.limits.max_verts == 0 || self.limits.max_indices == 0 || self.limits.max_vb_size == 0 {
            return Err(DrawError::InvalidLimits(format!(
                "split limits must be non-zero, got {:?}",
                self.limits
            )));
        }
        if self.max_vertex_buffers == 0 {
            return Err(DrawError::InvalidLimits(
                "at least one vertex buffer binding is required".to_string(),
            ));
        }
        Ok(())
    }
}
