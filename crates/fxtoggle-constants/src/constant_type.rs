use std::fmt;

use fxtoggle_api::{Format, UniformTypeInfo};

/// Types a uniform may have to be fed from constant-buffer bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstantType {
    Float,
    Float2,
    Float3,
    Float3x3,
    Float4x3,
    Float4x4,
    Int,
    Uint,
}

impl ConstantType {
    /// Number of 32-bit elements read from the snapshot.
    pub const fn element_count(self) -> usize {
        match self {
            Self::Float | Self::Int | Self::Uint => 1,
            Self::Float2 => 2,
            Self::Float3 => 3,
            Self::Float3x3 => 9,
            Self::Float4x3 => 12,
            Self::Float4x4 => 16,
        }
    }

    pub const fn byte_size(self) -> usize {
        self.element_count() * 4
    }

    pub const fn is_float(self) -> bool {
        !matches!(self, Self::Int | Self::Uint)
    }

    /// Classify a runtime uniform. Arrays and shapes with no matching type are rejected.
    pub fn classify(info: UniformTypeInfo) -> Option<Self> {
        if info.array_length > 0 {
            return None;
        }
        match info.format {
            Format::R32Float => match (info.rows, info.columns) {
                (4, 4) => Some(Self::Float4x4),
                (3, 4) => Some(Self::Float4x3),
                (3, 3) => Some(Self::Float3x3),
                (3, 1) => Some(Self::Float3),
                (2, 1) => Some(Self::Float2),
                (1, 1) => Some(Self::Float),
                _ => None,
            },
            Format::R32Sint if info.rows <= 1 && info.columns <= 1 => Some(Self::Int),
            Format::R32Uint if info.rows <= 1 && info.columns <= 1 => Some(Self::Uint),
            _ => None,
        }
    }
}

impl fmt::Display for ConstantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Float => "float",
            Self::Float2 => "float2",
            Self::Float3 => "float3",
            Self::Float3x3 => "float3x3",
            Self::Float4x3 => "float4x3",
            Self::Float4x4 => "float4x4",
            Self::Int => "int",
            Self::Uint => "uint",
        };
        f.write_str(name)
    }
}
