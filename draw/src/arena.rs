//! Per-draw scratch memory.
//!
//! Every top-level draw owns one [`ScratchArena`]. Converted attribute
//! arrays live in the arena until the draw finishes and are released in
//! bulk; other scratch vectors (rebased indices, split chunks) are handed
//! to the caller but are still charged against the same budget.

use crate::error::{DrawError, DrawResult};

/// Handle to a float block allocated in a [`ScratchArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloatHandle(usize);

/// Scratch allocator scoped to one draw call.
#[derive(Debug, Default)]
pub struct ScratchArena {
    budget: Option<usize>,
    used: usize,
    blocks: Vec<Vec<f32>>,
}

impl ScratchArena {
    /// Create an arena with no budget.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an arena that refuses allocations beyond `budget` bytes.
    pub fn with_budget(budget: Option<usize>) -> Self {
        Self {
            budget,
            ..Self::default()
        }
    }

    /// Bytes charged so far.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Number of live float blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    fn charge(&mut self, bytes: usize, what: &'static str) -> DrawResult<()> {
        let total = self
            .used
            .checked_add(bytes)
            .ok_or(DrawError::OutOfMemory(what))?;
        if self.budget.is_some_and(|budget| total > budget) {
            log::warn!("ScratchArena: budget exhausted allocating {what} ({total} bytes)");
            return Err(DrawError::OutOfMemory(what));
        }
        self.used = total;
        Ok(())
    }

    /// Allocate an empty vector with room for `len` elements.
    pub fn try_vec<T>(&mut self, len: usize, what: &'static str) -> DrawResult<Vec<T>> {
        let bytes = len
            .checked_mul(std::mem::size_of::<T>())
            .ok_or(DrawError::OutOfMemory(what))?;
        self.charge(bytes, what)?;
        let mut vec = Vec::new();
        vec.try_reserve_exact(len)
            .map_err(|_| DrawError::OutOfMemory(what))?;
        Ok(vec)
    }

    /// Allocate a zeroed float block owned by the arena.
    pub fn alloc_floats(&mut self, len: usize, what: &'static str) -> DrawResult<FloatHandle> {
        let mut block = self.try_vec::<f32>(len, what)?;
        block.resize(len, 0.0);
        self.blocks.push(block);
        Ok(FloatHandle(self.blocks.len() - 1))
    }

    /// Read a float block.
    pub fn floats(&self, handle: FloatHandle) -> &[f32] {
        &self.blocks[handle.0]
    }

    /// Write a float block.
    pub fn floats_mut(&mut self, handle: FloatHandle) -> &mut [f32] {
        &mut self.blocks[handle.0]
    }

    /// Free every block and reset the budget accounting.
    pub fn release(&mut self) {
        self.blocks.clear();
        self.used = 0;
    }
}
