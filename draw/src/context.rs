//! Draw dispatch.
//!
//! [`DrawContext`] is the entry point for application draws and the
//! [`DrawDispatch`] target of the rebase and split passes. Every draw, and
//! every sub-draw those passes produce, goes through the same checks:
//!
//! 1. compute index bounds if the caller did not supply them
//! 2. rebase when the minimum index is not zero
//! 3. split when the draw exceeds the effective limits
//! 4. resolve bindings, upload current values and submit to the backend

use crate::arena::ScratchArena;
use crate::backend::{BackendDraw, DrawBackend};
use crate::config::{DrawConfig, SplitLimits};
use crate::error::{DrawError, DrawResult};
use crate::index::compute_bounds;
use crate::mapping::MappedBuffers;
use crate::rebase::{choose_strategy, rebase};
use crate::split::{split_draw, split_kind, SplitParams};
use crate::types::{IndexBounds, IndexSource, Instancing, Prim};
use crate::vertex::{resolve_vertex_state, upload_current_values, VertexArrays};

/// One draw: vertex supply, primitive runs and optional indices.
#[derive(Debug, Clone)]
pub struct DrawCall<'a> {
    pub arrays: VertexArrays<'a>,
    pub prims: &'a [Prim],
    pub index: Option<IndexSource<'a>>,
    /// Known index bounds; computed by a scan when `None`.
    pub bounds: Option<IndexBounds>,
    pub instances: Instancing,
}

impl<'a> DrawCall<'a> {
    /// Create a non-indexed, single-instance draw.
    pub fn new(arrays: VertexArrays<'a>, prims: &'a [Prim]) -> Self {
        Self {
            arrays,
            prims,
            index: None,
            bounds: None,
            instances: Instancing::default(),
        }
    }

    /// Set the index source.
    pub fn with_index(mut self, index: IndexSource<'a>) -> Self {
        self.index = Some(index);
        self
    }

    /// Supply precomputed index bounds.
    pub fn with_bounds(mut self, bounds: IndexBounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Set the instance parameters.
    pub fn with_instances(mut self, instances: Instancing) -> Self {
        self.instances = instances;
        self
    }

    /// Total number of indices (or vertices) over all runs.
    pub fn element_count(&self) -> u64 {
        self.prims.iter().map(|p| u64::from(p.count)).sum()
    }

    /// Range of indices (or vertices) the runs read, `lo..hi`, or `None`
    /// when every run is empty.
    pub fn element_range(&self) -> Option<(u64, u64)> {
        self.prims
            .iter()
            .filter(|p| p.count > 0)
            .map(|p| (u64::from(p.start), u64::from(p.start) + u64::from(p.count)))
            .reduce(|(lo, hi), (start, end)| (lo.min(start), hi.max(end)))
    }
}

/// Receiver of normalized sub-draws.
///
/// Implementations must be re-entrant: the rebase and split passes call
/// back into `dispatch` while their own pass is still running. Nothing
/// borrowed from `call` may be retained after `dispatch` returns.
pub trait DrawDispatch {
    /// Backend used for buffer mapping.
    fn backend(&self) -> &dyn DrawBackend;

    /// Draw `call`, allocating scratch memory from `arena`.
    fn dispatch(&self, call: &DrawCall<'_>, arena: &mut ScratchArena) -> DrawResult<()>;
}

/// Draw pipeline bound to one backend.
pub struct DrawContext<B: DrawBackend> {
    backend: B,
    config: DrawConfig,
}

impl<B: DrawBackend> DrawContext<B> {
    /// Create a context, validating the configuration.
    pub fn new(backend: B, config: DrawConfig) -> DrawResult<Self> {
        config.validate()?;
        log::debug!(
            "DrawContext: created on {} with limits {:?}",
            backend.name(),
            config.limits.min(&backend.caps().limits)
        );
        Ok(Self { backend, config })
    }

    /// Get the backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Get the configuration.
    pub fn config(&self) -> &DrawConfig {
        &self.config
    }

    /// Split limits after clamping to the backend's capabilities.
    pub fn limits(&self) -> SplitLimits {
        self.config.limits.min(&self.backend.caps().limits)
    }

    fn max_vertex_buffers(&self) -> u32 {
        self.config
            .max_vertex_buffers
            .min(self.backend.caps().max_vertex_buffers)
    }

    /// Draw `call`.
    ///
    /// On error the draw is abandoned; sub-draws already submitted by a
    /// split are not rolled back.
    pub fn draw(&self, call: &DrawCall<'_>) -> DrawResult<()> {
        let mut arena = ScratchArena::with_budget(self.config.scratch_budget);
        let result = self.dispatch(call, &mut arena);
        if let Err(err) = &result {
            log::warn!("DrawContext: draw abandoned: {err}");
        }
        log::trace!("DrawContext: draw used {} scratch bytes", arena.used());
        arena.release();
        result
    }

    /// Submit `call`, first narrowing its index source to the range the
    /// runs read.
    fn submit(&self, call: &DrawCall<'_>, bounds: IndexBounds) -> DrawResult<()> {
        let (Some(index), Some((lo, hi))) = (&call.index, call.element_range()) else {
            return self.submit_exact(call, bounds);
        };
        if lo == 0 && hi == u64::from(index.count) {
            return self.submit_exact(call, bounds);
        }
        let hi = u32::try_from(hi).map_err(|_| DrawError::OutOfBounds {
            what: "primitive index range",
            needed: hi as usize,
            available: index.count as usize,
        })?;
        let lo = lo as u32;
        let prims: Vec<Prim> = call
            .prims
            .iter()
            .map(|prim| Prim {
                start: prim.start.saturating_sub(lo),
                ..*prim
            })
            .collect();
        let narrowed = DrawCall {
            arrays: call.arrays.clone(),
            prims: &prims,
            index: Some(index.slice(lo, hi - lo)),
            bounds: call.bounds,
            instances: call.instances,
        };
        self.submit_exact(&narrowed, bounds)
    }

    fn submit_exact(&self, call: &DrawCall<'_>, bounds: IndexBounds) -> DrawResult<()> {
        let current = upload_current_values(&self.backend, &call.arrays)?;
        let vertex_state = resolve_vertex_state(
            &call.arrays,
            current.as_ref(),
            self.max_vertex_buffers(),
            self.config.max_relative_offset,
        )?;
        log::trace!(
            "DrawContext: submitting {} prims, vertices 0..={} to {}",
            call.prims.len(),
            bounds.max,
            self.backend.name()
        );
        self.backend.draw(&BackendDraw {
            vertex_state: &vertex_state,
            prims: call.prims,
            index: call.index.as_ref(),
            bounds,
            instances: call.instances,
        })
    }
}

impl<B: DrawBackend> DrawDispatch for DrawContext<B> {
    fn backend(&self) -> &dyn DrawBackend {
        &self.backend
    }

    fn dispatch(&self, call: &DrawCall<'_>, arena: &mut ScratchArena) -> DrawResult<()> {
        if call.prims.is_empty() || call.instances.count == 0 {
            return Ok(());
        }

        let bounds = match call.bounds {
            Some(bounds) => bounds,
            None => {
                let mut maps = MappedBuffers::new(&self.backend);
                match compute_bounds(call.prims, call.index.as_ref(), &mut maps, arena)? {
                    Some(bounds) => bounds,
                    None => return Ok(()),
                }
            }
        };

        if bounds.min != 0 {
            let strategy = choose_strategy(
                call.index.is_some(),
                self.config.base_vertex_rebase,
                self.backend.caps().supports_base_vertex,
            );
            return rebase(self, call, bounds, strategy, arena);
        }

        let limits = self.limits();
        if let Some(kind) = split_kind(call, bounds, &limits) {
            let params = SplitParams {
                limits,
                vertex_cache: self.config.vertex_cache,
            };
            return split_draw(self, kind, call, bounds, &params, arena);
        }

        self.submit(call, bounds)
    }
}
