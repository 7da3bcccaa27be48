//! Current-value block packing and upload.
//!
//! Attributes without a per-vertex array read a constant value. All such
//! values of a draw are packed into one block, uploaded with a single call
//! and bound at stride 0.

use crate::backend::DrawBackend;
use crate::error::DrawResult;
use crate::resources::{align_up, Upload};
use crate::types::AttribSlot;
use crate::vertex::{ArraySource, VertexArrays};

/// Uploaded constant values of one draw.
#[derive(Debug, Clone)]
pub struct CurrentBlock {
    /// Location of the block.
    pub upload: Upload,
    /// Byte offset of each constant attribute within the block.
    pub offsets: Vec<(AttribSlot, u32)>,
}

impl CurrentBlock {
    /// Offset of a slot's value within the block.
    pub fn offset_of(&self, slot: AttribSlot) -> Option<u32> {
        self.offsets
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, offset)| *offset)
    }
}

/// Packed constant values before upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedValues {
    pub bytes: Vec<u8>,
    pub offsets: Vec<(AttribSlot, u32)>,
    /// Largest per-value alignment.
    pub alignment: usize,
}

/// Pack the constant attributes of `arrays`.
///
/// Each value starts at a multiple of its size rounded up to a power of
/// two. Values shorter than their format are zero-padded.
pub fn pack_current_values(arrays: &VertexArrays<'_>) -> Option<PackedValues> {
    let mut bytes = Vec::new();
    let mut offsets = Vec::new();
    let mut alignment = 1;

    for (slot, array) in arrays.iter() {
        let ArraySource::Current(value) = &array.source else {
            continue;
        };
        let size = array.format.element_size();
        let align = size.next_power_of_two();
        let offset = align_up(bytes.len(), align);

        bytes.resize(offset + size, 0);
        let src = value.bytes();
        let n = src.len().min(size);
        bytes[offset..offset + n].copy_from_slice(&src[..n]);

        offsets.push((slot, offset as u32));
        alignment = alignment.max(align);
    }

    if offsets.is_empty() {
        return None;
    }
    Some(PackedValues {
        bytes,
        offsets,
        alignment,
    })
}

/// Pack and upload the constant attributes of `arrays` in one upload.
pub fn upload_current_values(
    backend: &dyn DrawBackend,
    arrays: &VertexArrays<'_>,
) -> DrawResult<Option<CurrentBlock>> {
    let Some(packed) = pack_current_values(arrays) else {
        return Ok(None);
    };
    let upload = backend.upload(&packed.bytes, packed.alignment.max(4))?;
    log::trace!(
        "uploaded {} current values ({} bytes) at offset {}",
        packed.offsets.len(),
        packed.bytes.len(),
        upload.offset
    );
    Ok(Some(CurrentBlock {
        upload,
        offsets: packed.offsets,
    }))
}
