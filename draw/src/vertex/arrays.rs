//! Per-draw vertex array description.
//!
//! A [`VertexArrays`] table is built fresh for every draw from whatever the
//! caller has bound. Each enabled slot holds one [`VertexArray`] whose data
//! comes from a buffer object, from application memory, or from a constant
//! "current" value broadcast to every vertex.

use std::sync::Arc;

use crate::error::{DrawError, DrawResult};
use crate::mapping::MappedBuffers;
use crate::resources::BufferObject;
use crate::types::{AttribMask, AttribSlot, VertexFormat, MAX_ATTRIBS};

/// Constant attribute value of up to 32 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CurrentValue {
    bytes: [u8; 32],
    len: u8,
}

impl CurrentValue {
    /// Largest value in bytes (four doubles).
    pub const MAX_SIZE: usize = 32;

    /// Create a value from raw bytes.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is longer than [`Self::MAX_SIZE`].
    pub fn from_bytes(bytes: &[u8]) -> Self {
        assert!(
            bytes.len() <= Self::MAX_SIZE,
            "current value of {} bytes exceeds {} bytes",
            bytes.len(),
            Self::MAX_SIZE
        );
        let mut value = Self {
            bytes: [0; 32],
            len: bytes.len() as u8,
        };
        value.bytes[..bytes.len()].copy_from_slice(bytes);
        value
    }

    /// Create a value from floats.
    pub fn from_f32s(values: &[f32]) -> Self {
        Self::from_bytes(bytemuck::cast_slice(values))
    }

    /// The value bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }
}

impl std::fmt::Debug for CurrentValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("CurrentValue").field(&self.bytes()).finish()
    }
}

/// Where an attribute's data comes from.
#[derive(Debug, Clone)]
pub enum ArraySource<'a> {
    /// Buffer object at a byte offset.
    Buffer {
        buffer: Arc<BufferObject>,
        offset: usize,
    },
    /// Application memory at a byte offset.
    Client { data: &'a [u8], offset: usize },
    /// Constant value shared by every vertex.
    Current(CurrentValue),
}

/// One enabled attribute of a draw.
#[derive(Debug, Clone)]
pub struct VertexArray<'a> {
    /// Element layout.
    pub format: VertexFormat,
    /// Bytes between consecutive elements; 0 repeats the first element.
    pub stride: u32,
    /// Data source.
    pub source: ArraySource<'a>,
    /// Instances per element, or 0 for per-vertex data.
    pub instance_divisor: u32,
}

impl<'a> VertexArray<'a> {
    /// Attribute stored in a buffer object.
    pub fn buffer(format: VertexFormat, buffer: Arc<BufferObject>, offset: usize, stride: u32) -> Self {
        Self {
            format,
            stride,
            source: ArraySource::Buffer { buffer, offset },
            instance_divisor: 0,
        }
    }

    /// Attribute stored in application memory.
    pub fn client(format: VertexFormat, data: &'a [u8], stride: u32) -> Self {
        Self {
            format,
            stride,
            source: ArraySource::Client { data, offset: 0 },
            instance_divisor: 0,
        }
    }

    /// Attribute with a constant value.
    pub fn current(format: VertexFormat, value: CurrentValue) -> Self {
        Self {
            format,
            stride: 0,
            source: ArraySource::Current(value),
            instance_divisor: 0,
        }
    }

    /// Advance per instance instead of per vertex.
    pub fn with_divisor(mut self, divisor: u32) -> Self {
        self.instance_divisor = divisor;
        self
    }

    /// Whether the attribute is a constant current value.
    pub fn is_current(&self) -> bool {
        matches!(self.source, ArraySource::Current(_))
    }

    /// Whether every vertex reads its own element.
    pub fn is_varying(&self) -> bool {
        !self.is_current() && self.stride != 0 && self.instance_divisor == 0
    }

    /// Move the array forward by `elements` vertices.
    ///
    /// Only varying arrays move; constant and per-instance arrays do not
    /// depend on the vertex index.
    pub(crate) fn shifted(&self, elements: u32) -> Self {
        let mut array = self.clone();
        if !array.is_varying() {
            return array;
        }
        let delta = elements as usize * self.stride as usize;
        match &mut array.source {
            ArraySource::Buffer { offset, .. } | ArraySource::Client { offset, .. } => {
                *offset += delta;
            }
            ArraySource::Current(_) => {}
        }
        array
    }

    /// Bytes of the array starting at its first element.
    pub(crate) fn bytes<'m>(&'m self, maps: &'m MappedBuffers<'_>) -> DrawResult<&'m [u8]> {
        let (data, offset) = match &self.source {
            ArraySource::Buffer { buffer, offset } => (maps.bytes(buffer)?, *offset),
            ArraySource::Client { data, offset } => (*data, *offset),
            ArraySource::Current(value) => return Ok(value.bytes()),
        };
        data.get(offset..).ok_or(DrawError::OutOfBounds {
            what: "vertex array offset",
            needed: offset,
            available: data.len(),
        })
    }
}

/// Attribute table of one draw, indexed by [`AttribSlot`].
#[derive(Debug, Clone)]
pub struct VertexArrays<'a> {
    slots: [Option<VertexArray<'a>>; MAX_ATTRIBS],
}

impl Default for VertexArrays<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> VertexArrays<'a> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }

    /// Enable a slot (builder style).
    pub fn with(mut self, slot: AttribSlot, array: VertexArray<'a>) -> Self {
        self.set(slot, array);
        self
    }

    /// Enable a slot.
    pub fn set(&mut self, slot: AttribSlot, array: VertexArray<'a>) {
        self.slots[slot.index()] = Some(array);
    }

    /// Disable a slot.
    pub fn clear(&mut self, slot: AttribSlot) {
        self.slots[slot.index()] = None;
    }

    /// Get the array bound to a slot.
    pub fn get(&self, slot: AttribSlot) -> Option<&VertexArray<'a>> {
        self.slots[slot.index()].as_ref()
    }

    /// Set of enabled slots.
    pub fn enabled(&self) -> AttribMask {
        self.iter()
            .fold(AttribMask::empty(), |mask, (slot, _)| mask | slot.mask())
    }

    /// Iterate enabled slots in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (AttribSlot, &VertexArray<'a>)> {
        self.slots.iter().enumerate().filter_map(|(index, array)| {
            let array = array.as_ref()?;
            Some((AttribSlot::from_index(index)?, array))
        })
    }

    /// Bytes one vertex occupies across all varying arrays.
    pub fn vertex_size(&self) -> usize {
        self.iter()
            .filter(|(_, array)| array.is_varying())
            .map(|(_, array)| array.format.element_size())
            .sum()
    }

    /// Copy of the table with every varying array moved forward by `elements`.
    pub(crate) fn shifted(&self, elements: u32) -> Self {
        Self {
            slots: std::array::from_fn(|index| {
                self.slots[index].as_ref().map(|array| array.shifted(elements))
            }),
        }
    }
}
