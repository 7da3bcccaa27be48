//! Scoped buffer mapping.
//!
//! Source buffers are mapped before the pipeline reads them and unmapped on
//! every exit path. [`MappedBuffers`] maps each buffer at most once, leaves
//! buffers alone that were already mapped when it saw them, and on drop
//! unmaps exactly the buffers it mapped itself.

use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::DrawBackend;
use crate::error::{DrawError, DrawResult};
use crate::resources::{BufferId, BufferObject};

/// Buffers mapped for one pass over a draw.
pub struct MappedBuffers<'b> {
    backend: &'b dyn DrawBackend,
    owned: Vec<Arc<BufferObject>>,
    contents: HashMap<BufferId, Arc<Vec<u8>>>,
}

impl<'b> MappedBuffers<'b> {
    /// Create an empty mapping scope.
    pub fn new(backend: &'b dyn DrawBackend) -> Self {
        Self {
            backend,
            owned: Vec::new(),
            contents: HashMap::new(),
        }
    }

    /// Make a buffer readable for the lifetime of this scope.
    pub fn acquire(&mut self, buffer: &Arc<BufferObject>) -> DrawResult<()> {
        if self.contents.contains_key(&buffer.id()) {
            return Ok(());
        }
        if !buffer.is_mapped() {
            self.backend.map_buffer_range(buffer, 0, buffer.size())?;
            self.owned.push(Arc::clone(buffer));
        }
        self.contents.insert(buffer.id(), buffer.contents());
        Ok(())
    }

    /// Bytes of an acquired buffer.
    pub fn bytes(&self, buffer: &BufferObject) -> DrawResult<&[u8]> {
        self.contents
            .get(&buffer.id())
            .map(|data| data.as_slice())
            .ok_or_else(|| DrawError::MapFailed {
                buffer: buffer.label().unwrap_or("unnamed").to_string(),
                reason: "buffer was not acquired before reading".to_string(),
            })
    }

    /// Number of buffers this scope mapped itself.
    pub fn owned_count(&self) -> usize {
        self.owned.len()
    }
}

impl Drop for MappedBuffers<'_> {
    fn drop(&mut self) {
        for buffer in self.owned.drain(..).rev() {
            self.backend.unmap_buffer(&buffer);
        }
    }
}
