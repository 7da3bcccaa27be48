//! Stream uploader for per-draw data.
//!
//! The uploader sub-allocates consecutive regions of one stream buffer.
//! When a request does not fit, the buffer is orphaned: a fresh buffer
//! replaces it and writing continues at offset zero. Draws that already
//! reference the old buffer keep it alive through their `Arc`.
//!
//! # Example
//!
//! ```ignore
//! let mut uploader = Uploader::new(64 * 1024, "current_values");
//! let upload = uploader.upload(bytemuck::bytes_of(&color), 16)?;
//! // Bind upload.buffer at upload.offset with stride 0
//! ```

use std::sync::Arc;

use crate::error::DrawResult;
use crate::resources::BufferObject;
use crate::types::{BufferDescriptor, BufferUsage};

/// A region written by the uploader.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Buffer holding the data.
    pub buffer: Arc<BufferObject>,
    /// Byte offset of the data within the buffer.
    pub offset: usize,
}

/// Linear sub-allocator over an orphanable stream buffer.
///
/// `Uploader` is NOT thread-safe; backends wrap it in a mutex.
pub struct Uploader {
    buffer: Arc<BufferObject>,
    capacity: usize,
    write_offset: usize,
    orphan_count: u64,
    label: String,
}

impl Uploader {
    /// Default stream buffer size (64 KB).
    pub const DEFAULT_CAPACITY: usize = 64 * 1024;

    /// Create an uploader with the given stream buffer size.
    pub fn new(capacity: usize, label: &str) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: Self::create_buffer(capacity, label),
            capacity,
            write_offset: 0,
            orphan_count: 0,
            label: label.to_string(),
        }
    }

    fn create_buffer(size: usize, label: &str) -> Arc<BufferObject> {
        let descriptor = BufferDescriptor::new(size, BufferUsage::STREAM | BufferUsage::VERTEX)
            .with_label(format!("{label}_stream"));
        BufferObject::new(descriptor)
    }

    /// Get the current stream buffer.
    pub fn buffer(&self) -> &Arc<BufferObject> {
        &self.buffer
    }

    /// Get the current write offset.
    pub fn write_offset(&self) -> usize {
        self.write_offset
    }

    /// Get the number of times the stream buffer was replaced.
    pub fn orphan_count(&self) -> u64 {
        self.orphan_count
    }

    /// Get the space left in the current stream buffer.
    pub fn remaining(&self) -> usize {
        self.capacity - self.write_offset
    }

    /// Copy `bytes` into the stream at an offset aligned to `alignment`.
    pub fn upload(&mut self, bytes: &[u8], alignment: usize) -> DrawResult<Upload> {
        debug_assert!(alignment.is_power_of_two(), "alignment must be power of 2");

        let mut offset = align_up(self.write_offset, alignment);
        if offset + bytes.len() > self.capacity {
            self.orphan(bytes.len());
            offset = 0;
        }

        self.buffer.write(offset, bytes)?;
        self.write_offset = offset + bytes.len();

        Ok(Upload {
            buffer: Arc::clone(&self.buffer),
            offset,
        })
    }

    fn orphan(&mut self, needed: usize) {
        self.capacity = self.capacity.max(needed);
        log::trace!(
            "Uploader: orphaning {} stream buffer ({} bytes)",
            self.label,
            self.capacity
        );
        self.buffer = Self::create_buffer(self.capacity, &self.label);
        self.write_offset = 0;
        self.orphan_count += 1;
    }
}

impl std::fmt::Debug for Uploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Uploader")
            .field("capacity", &self.capacity)
            .field("write_offset", &self.write_offset)
            .field("orphan_count", &self.orphan_count)
            .field("buffer", &self.buffer.label())
            .finish()
    }
}

/// Align a value up to the given alignment.
#[inline]
pub(crate) fn align_up(value: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}
