//! Vertex attribute slots.
//!
//! The draw pipeline addresses attributes through a fixed table of 32 slots:
//! the legacy fixed-function attributes first, then eight texture coordinate
//! sets, then sixteen generic attributes.

use bitflags::bitflags;

/// Number of attribute slots.
pub const MAX_ATTRIBS: usize = 32;

const TEXCOORD_BASE: usize = 8;
const GENERIC_BASE: usize = 16;

/// One logical vertex attribute slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttribSlot {
    /// Vertex position.
    Position,
    /// Vertex normal.
    Normal,
    /// Primary color.
    Color0,
    /// Secondary color.
    Color1,
    /// Fog coordinate.
    Fog,
    /// Color index.
    ColorIndex,
    /// Edge flag.
    EdgeFlag,
    /// Point size.
    PointSize,
    /// Texture coordinate set (0-7).
    TexCoord(u8),
    /// Generic attribute (0-15).
    Generic(u8),
}

impl AttribSlot {
    /// Get the table index of this slot (0-31).
    pub fn index(&self) -> usize {
        match self {
            Self::Position => 0,
            Self::Normal => 1,
            Self::Color0 => 2,
            Self::Color1 => 3,
            Self::Fog => 4,
            Self::ColorIndex => 5,
            Self::EdgeFlag => 6,
            Self::PointSize => 7,
            Self::TexCoord(n) => {
                assert!(*n < 8, "texture coordinate set {n} out of range");
                TEXCOORD_BASE + *n as usize
            }
            Self::Generic(n) => {
                assert!(*n < 16, "generic attribute {n} out of range");
                GENERIC_BASE + *n as usize
            }
        }
    }

    /// Get the slot stored at a table index.
    pub fn from_index(index: usize) -> Option<Self> {
        let slot = match index {
            0 => Self::Position,
            1 => Self::Normal,
            2 => Self::Color0,
            3 => Self::Color1,
            4 => Self::Fog,
            5 => Self::ColorIndex,
            6 => Self::EdgeFlag,
            7 => Self::PointSize,
            8..=15 => Self::TexCoord((index - TEXCOORD_BASE) as u8),
            16..=31 => Self::Generic((index - GENERIC_BASE) as u8),
            _ => return None,
        };
        Some(slot)
    }

    /// Get the mask containing only this slot.
    pub fn mask(&self) -> AttribMask {
        AttribMask::from_bits_retain(1 << self.index())
    }
}

bitflags! {
    /// Set of attribute slots.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AttribMask: u32 {
        const POSITION = 1 << 0;
        const NORMAL = 1 << 1;
        const COLOR0 = 1 << 2;
        const COLOR1 = 1 << 3;
        const FOG = 1 << 4;
        const COLOR_INDEX = 1 << 5;
        const EDGE_FLAG = 1 << 6;
        const POINT_SIZE = 1 << 7;
        /// All texture coordinate sets.
        const TEXCOORDS = 0xff << 8;
        /// All generic attributes.
        const GENERICS = 0xffff << 16;
    }
}

impl Default for AttribMask {
    fn default() -> Self {
        Self::empty()
    }
}

impl AttribMask {
    /// Iterate the slots in this set in ascending table order.
    pub fn slots(&self) -> impl Iterator<Item = AttribSlot> {
        let mut bits = self.bits();
        std::iter::from_fn(move || {
            if bits == 0 {
                return None;
            }
            let index = bits.trailing_zeros() as usize;
            bits &= bits - 1;
            AttribSlot::from_index(index)
        })
    }
}
