//! Buffer object resource.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::error::{DrawError, DrawResult};
use crate::types::{BufferDescriptor, BufferUsage};

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identity of a buffer object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u64);

/// Byte range of an active mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedRange {
    pub offset: usize,
    pub len: usize,
}

/// A reference-counted byte store that vertex arrays and index sources read from.
///
/// Contents are shared copy-on-write: [`contents`](Self::contents) hands out a
/// snapshot, and [`write`](Self::write) only clones the bytes if a snapshot
/// is still alive.
pub struct BufferObject {
    id: BufferId,
    descriptor: BufferDescriptor,
    data: RwLock<Arc<Vec<u8>>>,
    mapping: Mutex<Option<MappedRange>>,
    map_count: AtomicU32,
}

impl BufferObject {
    /// Create a zero-filled buffer.
    pub fn new(descriptor: BufferDescriptor) -> Arc<Self> {
        let data = vec![0; descriptor.size];
        Self::create(descriptor, data)
    }

    /// Create a buffer holding `data`.
    pub fn with_contents(label: impl Into<String>, usage: BufferUsage, data: Vec<u8>) -> Arc<Self> {
        let descriptor = BufferDescriptor::new(data.len(), usage).with_label(label);
        Self::create(descriptor, data)
    }

    /// Create a readable vertex/index buffer from plain-old-data values.
    pub fn from_pod<T: bytemuck::Pod>(label: impl Into<String>, values: &[T]) -> Arc<Self> {
        Self::with_contents(
            label,
            BufferUsage::VERTEX | BufferUsage::INDEX | BufferUsage::MAP_READ,
            bytemuck::cast_slice(values).to_vec(),
        )
    }

    fn create(descriptor: BufferDescriptor, data: Vec<u8>) -> Arc<Self> {
        let id = BufferId(NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed));
        log::trace!(
            "BufferObject: creating buffer {:?} (size: {})",
            descriptor.label,
            descriptor.size
        );
        Arc::new(Self {
            id,
            descriptor,
            data: RwLock::new(Arc::new(data)),
            mapping: Mutex::new(None),
            map_count: AtomicU32::new(0),
        })
    }

    /// Get the buffer identity.
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Get the buffer descriptor.
    pub fn descriptor(&self) -> &BufferDescriptor {
        &self.descriptor
    }

    /// Get the buffer size in bytes.
    pub fn size(&self) -> usize {
        self.descriptor.size
    }

    /// Get the buffer label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }

    fn display_name(&self) -> String {
        match self.label() {
            Some(label) => label.to_string(),
            None => format!("#{}", self.id.0),
        }
    }

    /// Whether the buffer is currently mapped.
    pub fn is_mapped(&self) -> bool {
        self.mapping.lock().is_some()
    }

    /// The currently mapped range, if any.
    pub fn mapped_range(&self) -> Option<MappedRange> {
        *self.mapping.lock()
    }

    /// Number of times the buffer has been mapped.
    pub fn map_count(&self) -> u32 {
        self.map_count.load(Ordering::Relaxed)
    }

    /// Map a byte range for reading.
    pub fn map_range(&self, offset: usize, len: usize) -> DrawResult<()> {
        let mut mapping = self.mapping.lock();
        if mapping.is_some() {
            return Err(DrawError::MapFailed {
                buffer: self.display_name(),
                reason: "buffer is already mapped".to_string(),
            });
        }
        if offset.checked_add(len).map_or(true, |end| end > self.size()) {
            return Err(DrawError::MapFailed {
                buffer: self.display_name(),
                reason: format!("range {offset}+{len} exceeds size {}", self.size()),
            });
        }
        *mapping = Some(MappedRange { offset, len });
        self.map_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Unmap the buffer. Returns false if it was not mapped.
    pub fn unmap(&self) -> bool {
        self.mapping.lock().take().is_some()
    }

    /// Write bytes at an offset.
    pub fn write(&self, offset: usize, bytes: &[u8]) -> DrawResult<()> {
        if self.is_mapped() {
            return Err(DrawError::BufferMapped(self.display_name()));
        }
        let end = offset + bytes.len();
        if end > self.size() {
            return Err(DrawError::OutOfBounds {
                what: "buffer write",
                needed: end,
                available: self.size(),
            });
        }
        let mut data = self.data.write();
        Arc::make_mut(&mut *data)[offset..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Snapshot of the buffer contents.
    pub fn contents(&self) -> Arc<Vec<u8>> {
        Arc::clone(&*self.data.read())
    }
}

impl std::fmt::Debug for BufferObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferObject")
            .field("id", &self.id)
            .field("size", &self.descriptor.size)
            .field("usage", &self.descriptor.usage)
            .field("label", &self.descriptor.label)
            .field("mapped", &self.mapped_range())
            .finish()
    }
}

static_assertions::assert_impl_all!(BufferObject: Send, Sync);
