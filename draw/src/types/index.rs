//! Index sources and bounds.

use std::sync::Arc;

use crate::resources::BufferObject;

/// Width of one index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexSize {
    U8,
    U16,
    U32,
}

impl IndexSize {
    /// Size of one index in bytes.
    pub fn bytes(&self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }
}

/// Where index data lives.
#[derive(Debug, Clone)]
pub enum IndexData<'a> {
    /// Indices stored in a buffer object at a byte offset.
    Buffer {
        buffer: Arc<BufferObject>,
        offset: usize,
    },
    /// Indices in application memory.
    Client(&'a [u8]),
}

/// Indices of a draw.
#[derive(Debug, Clone)]
pub struct IndexSource<'a> {
    /// Width of one index.
    pub size: IndexSize,
    /// Number of indices.
    pub count: u32,
    /// Index storage.
    pub data: IndexData<'a>,
}

impl<'a> IndexSource<'a> {
    /// Indices stored in a buffer object.
    pub fn buffer(size: IndexSize, count: u32, buffer: Arc<BufferObject>, offset: usize) -> Self {
        Self {
            size,
            count,
            data: IndexData::Buffer { buffer, offset },
        }
    }

    /// Indices in application memory.
    pub fn client(size: IndexSize, count: u32, bytes: &'a [u8]) -> Self {
        Self {
            size,
            count,
            data: IndexData::Client(bytes),
        }
    }

    /// 8-bit indices in application memory.
    pub fn from_u8(indices: &'a [u8]) -> Self {
        Self::client(IndexSize::U8, indices.len() as u32, indices)
    }

    /// 16-bit indices in application memory.
    pub fn from_u16(indices: &'a [u16]) -> Self {
        Self::client(IndexSize::U16, indices.len() as u32, bytemuck::cast_slice(indices))
    }

    /// 32-bit indices in application memory.
    pub fn from_u32(indices: &'a [u32]) -> Self {
        Self::client(IndexSize::U32, indices.len() as u32, bytemuck::cast_slice(indices))
    }

    /// Size of the index data in bytes.
    pub fn byte_len(&self) -> usize {
        self.count as usize * self.size.bytes()
    }

    /// A sub-range of `count` indices starting at index `first`.
    pub fn slice(&self, first: u32, count: u32) -> Self {
        let skip = first as usize * self.size.bytes();
        let data = match &self.data {
            IndexData::Buffer { buffer, offset } => IndexData::Buffer {
                buffer: Arc::clone(buffer),
                offset: offset + skip,
            },
            IndexData::Client(bytes) => IndexData::Client(bytes.get(skip..).unwrap_or_default()),
        };
        Self {
            size: self.size,
            count,
            data,
        }
    }
}

/// Inclusive range of vertex indices referenced by a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexBounds {
    pub min: u32,
    pub max: u32,
}

impl IndexBounds {
    /// Create bounds; `min` must not exceed `max`.
    pub fn new(min: u32, max: u32) -> Self {
        debug_assert!(min <= max, "index bounds {min}..={max} are inverted");
        Self { min, max }
    }

    /// Number of vertices in the range.
    pub fn span(&self) -> u64 {
        u64::from(self.max - self.min) + 1
    }
}

/// Instance parameters of a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instancing {
    pub count: u32,
    pub base: u32,
}

impl Default for Instancing {
    fn default() -> Self {
        Self { count: 1, base: 0 }
    }
}

impl Instancing {
    pub fn new(count: u32, base: u32) -> Self {
        Self { count, base }
    }
}
