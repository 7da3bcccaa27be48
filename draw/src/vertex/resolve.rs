//! Attribute to binding resolution.
//!
//! Attributes that read the same storage with the same stride and step rate
//! share one vertex buffer binding, so the backend sees as few bindings as
//! possible. Each attribute then becomes a vertex element pointing at its
//! binding plus a relative offset.

use std::sync::Arc;

use crate::error::{DrawError, DrawResult};
use crate::resources::{BufferId, BufferObject};
use crate::types::{AttribSlot, VertexFormat};
use crate::vertex::{ArraySource, CurrentBlock, VertexArrays};

/// Storage behind a binding.
#[derive(Debug, Clone)]
pub enum BindingSource<'a> {
    /// A buffer object; the binding holds a reference for the draw.
    Buffer(Arc<BufferObject>),
    /// Application memory the backend must copy before returning.
    User(&'a [u8]),
}

/// One vertex buffer binding.
#[derive(Debug, Clone)]
pub struct VertexBufferBinding<'a> {
    pub source: BindingSource<'a>,
    /// Byte offset of the binding's base within the source.
    pub offset: usize,
    pub stride: u32,
    /// Instances per element, or 0 for per-vertex data.
    pub divisor: u32,
}

/// One vertex element as presented to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexElement {
    pub slot: AttribSlot,
    pub format: VertexFormat,
    /// Index into [`VertexState::bindings`].
    pub binding: u32,
    /// Byte offset of the attribute within a binding element.
    pub relative_offset: u32,
    /// The attribute consumes two consecutive backend slots.
    pub dual_slot: bool,
    pub instance_divisor: u32,
}

/// Bindings and elements of one draw.
#[derive(Debug, Clone, Default)]
pub struct VertexState<'a> {
    pub bindings: Vec<VertexBufferBinding<'a>>,
    pub elements: Vec<VertexElement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKey {
    Buffer(BufferId),
    User { ptr: usize, len: usize },
}

struct Group<'a> {
    key: SourceKey,
    source: BindingSource<'a>,
    stride: u32,
    divisor: u32,
    min_offset: usize,
    max_offset: usize,
    members: Vec<(AttribSlot, VertexFormat, usize)>,
}

impl Group<'_> {
    fn accepts(&self, key: SourceKey, stride: u32, divisor: u32, offset: usize, max_relative: usize) -> bool {
        if self.key != key || self.stride != stride || self.divisor != divisor {
            return false;
        }
        let lo = self.min_offset.min(offset);
        let hi = self.max_offset.max(offset);
        hi - lo <= max_relative
    }
}

/// Build the bindings and elements for `arrays`.
///
/// Constant attributes read from `current`, which must hold every constant
/// slot of `arrays`.
pub fn resolve_vertex_state<'a>(
    arrays: &VertexArrays<'a>,
    current: Option<&CurrentBlock>,
    max_vertex_buffers: u32,
    max_relative_offset: u32,
) -> DrawResult<VertexState<'a>> {
    let max_relative = max_relative_offset as usize;
    let mut groups: Vec<Group<'a>> = Vec::new();
    let mut constants = Vec::new();

    for (slot, array) in arrays.iter() {
        let (key, source, offset) = match &array.source {
            ArraySource::Buffer { buffer, offset } => (
                SourceKey::Buffer(buffer.id()),
                BindingSource::Buffer(Arc::clone(buffer)),
                *offset,
            ),
            ArraySource::Client { data, offset } => (
                SourceKey::User {
                    ptr: data.as_ptr() as usize,
                    len: data.len(),
                },
                BindingSource::User(*data),
                *offset,
            ),
            ArraySource::Current(_) => {
                constants.push((slot, array.format));
                continue;
            }
        };

        let member = (slot, array.format, offset);
        match groups
            .iter_mut()
            .find(|g| g.accepts(key, array.stride, array.instance_divisor, offset, max_relative))
        {
            Some(group) => {
                group.min_offset = group.min_offset.min(offset);
                group.max_offset = group.max_offset.max(offset);
                group.members.push(member);
            }
            None => groups.push(Group {
                key,
                source,
                stride: array.stride,
                divisor: array.instance_divisor,
                min_offset: offset,
                max_offset: offset,
                members: vec![member],
            }),
        }
    }

    let mut state = VertexState::default();
    for group in groups {
        let binding = state.bindings.len() as u32;
        for (slot, format, offset) in group.members {
            state.elements.push(VertexElement {
                slot,
                format,
                binding,
                relative_offset: (offset - group.min_offset) as u32,
                dual_slot: format.is_dual_slot(),
                instance_divisor: group.divisor,
            });
        }
        state.bindings.push(VertexBufferBinding {
            source: group.source,
            offset: group.min_offset,
            stride: group.stride,
            divisor: group.divisor,
        });
    }

    if !constants.is_empty() {
        let Some(block) = current else {
            unreachable!("constant attributes need an uploaded current-value block");
        };
        let binding = state.bindings.len() as u32;
        for (slot, format) in constants {
            let Some(relative_offset) = block.offset_of(slot) else {
                unreachable!("current-value block has no value for {slot:?}");
            };
            state.elements.push(VertexElement {
                slot,
                format,
                binding,
                relative_offset,
                dual_slot: format.is_dual_slot(),
                instance_divisor: 0,
            });
        }
        state.bindings.push(VertexBufferBinding {
            source: BindingSource::Buffer(Arc::clone(&block.upload.buffer)),
            offset: block.upload.offset,
            stride: 0,
            divisor: 0,
        });
    }

    if state.bindings.len() > max_vertex_buffers as usize {
        return Err(DrawError::TooManyVertexBuffers {
            needed: state.bindings.len(),
            max: max_vertex_buffers,
        });
    }

    state.elements.sort_by_key(|element| element.slot);
    log::trace!(
        "resolved {} elements onto {} bindings",
        state.elements.len(),
        state.bindings.len()
    );
    Ok(state)
}
