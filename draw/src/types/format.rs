//! Vertex attribute formats.

/// Scalar type of one attribute component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    /// IEEE 754 half precision float.
    F16,
    F32,
    F64,
    /// Signed 16.16 fixed point.
    Fixed,
}

impl ScalarType {
    /// Size of one component in bytes.
    pub fn size(&self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 | Self::F16 => 2,
            Self::I32 | Self::U32 | Self::F32 | Self::Fixed => 4,
            Self::F64 => 8,
        }
    }
}

/// Layout of one vertex attribute element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexFormat {
    /// Component scalar type.
    pub scalar: ScalarType,
    /// Component count (1-4).
    pub components: u8,
    /// Integer components map to [0, 1] or [-1, 1].
    pub normalized: bool,
    /// Components are stored in BGRA order.
    pub bgra: bool,
}

impl VertexFormat {
    pub const FLOAT: Self = Self::new(ScalarType::F32, 1);
    pub const FLOAT2: Self = Self::new(ScalarType::F32, 2);
    pub const FLOAT3: Self = Self::new(ScalarType::F32, 3);
    pub const FLOAT4: Self = Self::new(ScalarType::F32, 4);
    /// Four normalized unsigned bytes.
    pub const UNORM8X4: Self = Self::new(ScalarType::U8, 4).normalized();
    /// Four normalized unsigned bytes in BGRA order.
    pub const BGRA8: Self = Self {
        scalar: ScalarType::U8,
        components: 4,
        normalized: true,
        bgra: true,
    };

    /// Create a non-normalized format.
    ///
    /// # Panics
    ///
    /// Panics if `components` is not in 1..=4.
    pub const fn new(scalar: ScalarType, components: u8) -> Self {
        assert!(components >= 1 && components <= 4, "component count must be 1-4");
        Self {
            scalar,
            components,
            normalized: false,
            bgra: false,
        }
    }

    /// Mark the format as normalized.
    pub const fn normalized(mut self) -> Self {
        self.normalized = true;
        self
    }

    /// Size of one element in bytes.
    pub fn element_size(&self) -> usize {
        self.scalar.size() * self.components as usize
    }

    /// Whether the format already is the engine's native float layout.
    pub fn is_native(&self) -> bool {
        self.scalar == ScalarType::F32 && !self.bgra
    }

    /// Whether the attribute occupies two consecutive backend slots.
    pub fn is_dual_slot(&self) -> bool {
        self.scalar == ScalarType::F64 && self.components >= 3
    }
}
