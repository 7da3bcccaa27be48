//! Attribute format conversion.
//!
//! Non-float attributes are expanded to `f32` components in the draw's
//! scratch arena. Float attributes are read in place.

use crate::arena::{FloatHandle, ScratchArena};
use crate::error::{DrawError, DrawResult};
use crate::types::{ScalarType, VertexFormat};

/// Default value of missing components.
const DEFAULT_COMPONENTS: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Attribute data in float form.
#[derive(Debug, Clone, Copy)]
pub enum AttribData<'s> {
    /// Source already holds `f32` components.
    Native { bytes: &'s [u8], stride: usize },
    /// Converted copy in the scratch arena, tightly packed.
    Converted(FloatHandle),
}

/// A float view of one attribute.
#[derive(Debug, Clone, Copy)]
pub struct FloatArray<'s> {
    pub data: AttribData<'s>,
    pub components: usize,
    pub count: usize,
}

impl<'s> FloatArray<'s> {
    /// Whether the source was used without a copy.
    pub fn is_native(&self) -> bool {
        matches!(self.data, AttribData::Native { .. })
    }

    /// Read element `index` as four components.
    pub fn get(&self, arena: &ScratchArena, index: usize) -> DrawResult<[f32; 4]> {
        if index >= self.count {
            return Err(DrawError::OutOfBounds {
                what: "attribute element",
                needed: index + 1,
                available: self.count,
            });
        }
        let mut out = DEFAULT_COMPONENTS;
        match self.data {
            AttribData::Native { bytes, stride } => {
                let base = index * stride;
                for (c, value) in out.iter_mut().take(self.components).enumerate() {
                    let at = base + c * 4;
                    *value = bytemuck::pod_read_unaligned(&bytes[at..at + 4]);
                }
            }
            AttribData::Converted(handle) => {
                let base = index * self.components;
                let floats = &arena.floats(handle)[base..base + self.components];
                out[..self.components].copy_from_slice(floats);
            }
        }
        Ok(out)
    }
}

/// Check that `count` elements of `format` at `stride` fit in `bytes`.
pub(crate) fn check_range(
    format: &VertexFormat,
    stride: usize,
    count: usize,
    available: usize,
) -> DrawResult<()> {
    if count == 0 {
        return Ok(());
    }
    let needed = (count - 1) * stride + format.element_size();
    if needed > available {
        return Err(DrawError::OutOfBounds {
            what: "vertex array",
            needed,
            available,
        });
    }
    Ok(())
}

/// Produce a float view of `count` elements of an attribute.
///
/// `bytes` starts at the first element. Float sources are returned without
/// copying; every other type is converted into the arena.
pub fn convert<'s>(
    format: &VertexFormat,
    stride: usize,
    bytes: &'s [u8],
    count: usize,
    arena: &mut ScratchArena,
) -> DrawResult<FloatArray<'s>> {
    check_range(format, stride, count, bytes.len())?;
    let components = format.components as usize;

    if format.is_native() {
        return Ok(FloatArray {
            data: AttribData::Native { bytes, stride },
            components,
            count,
        });
    }

    let handle = arena.alloc_floats(count * components, "converted attribute")?;
    let out = arena.floats_mut(handle);
    for i in 0..count {
        let element = &bytes[i * stride..i * stride + format.element_size()];
        let decoded = fetch(format, element);
        out[i * components..(i + 1) * components].copy_from_slice(&decoded[..components]);
    }

    Ok(FloatArray {
        data: AttribData::Converted(handle),
        components,
        count,
    })
}

/// Decode one element into four components, filling missing ones with
/// `(0, 0, 0, 1)`.
pub fn fetch(format: &VertexFormat, element: &[u8]) -> [f32; 4] {
    let mut out = DEFAULT_COMPONENTS;
    if format.bgra {
        assert!(
            format.scalar == ScalarType::U8 && format.components == 4,
            "BGRA layout requires four unsigned bytes"
        );
        for (dst, src) in [2, 1, 0, 3].into_iter().enumerate() {
            out[dst] = f32::from(element[src]) / 255.0;
        }
        return out;
    }

    let size = format.scalar.size();
    for (c, value) in out.iter_mut().take(format.components as usize).enumerate() {
        *value = decode_component(format.scalar, format.normalized, &element[c * size..(c + 1) * size]);
    }
    out
}

/// Decode one component.
pub fn decode_component(scalar: ScalarType, normalized: bool, bytes: &[u8]) -> f32 {
    match scalar {
        ScalarType::I8 => {
            let x = bytemuck::pod_read_unaligned::<i8>(&bytes[..1]);
            if normalized {
                (2.0 * f32::from(x) + 1.0) / 255.0
            } else {
                f32::from(x)
            }
        }
        ScalarType::U8 => {
            let x = bytes[0];
            if normalized {
                f32::from(x) / 255.0
            } else {
                f32::from(x)
            }
        }
        ScalarType::I16 => {
            let x = bytemuck::pod_read_unaligned::<i16>(&bytes[..2]);
            if normalized {
                (2.0 * f32::from(x) + 1.0) / 65535.0
            } else {
                f32::from(x)
            }
        }
        ScalarType::U16 => {
            let x = bytemuck::pod_read_unaligned::<u16>(&bytes[..2]);
            if normalized {
                f32::from(x) / 65535.0
            } else {
                f32::from(x)
            }
        }
        ScalarType::I32 => {
            let x = f64::from(bytemuck::pod_read_unaligned::<i32>(&bytes[..4]));
            if normalized {
                ((2.0 * x + 1.0) / 4_294_967_295.0) as f32
            } else {
                x as f32
            }
        }
        ScalarType::U32 => {
            let x = f64::from(bytemuck::pod_read_unaligned::<u32>(&bytes[..4]));
            if normalized {
                (x / 4_294_967_295.0) as f32
            } else {
                x as f32
            }
        }
        ScalarType::F16 => {
            half::f16::from_bits(bytemuck::pod_read_unaligned::<u16>(&bytes[..2])).to_f32()
        }
        ScalarType::F32 => bytemuck::pod_read_unaligned::<f32>(&bytes[..4]),
        ScalarType::F64 => bytemuck::pod_read_unaligned::<f64>(&bytes[..8]) as f32,
        ScalarType::Fixed => {
            let x = f64::from(bytemuck::pod_read_unaligned::<i32>(&bytes[..4]));
            if normalized {
                ((2.0 * x + 1.0) / 65535.0) as f32
            } else {
                (x / 65536.0) as f32
            }
        }
    }
}
