use std::fmt;

/// Texel / element formats the toggler needs to reason about.
///
/// This is intentionally a subset of what a host API exposes: color formats that can carry an
/// effect, the scalar formats used to classify uniform variables, and the depth formats that must
/// be rejected as effect targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Format {
    #[default]
    Unknown,

    R8Unorm,
    R16Float,
    R32Typeless,
    R32Float,
    R32Sint,
    R32Uint,

    B5G6R5Unorm,
    B5G5R5A1Unorm,
    B5G5R5X1Unorm,

    R8G8B8A8Typeless,
    R8G8B8A8Unorm,
    R8G8B8A8UnormSrgb,
    R8G8B8X8Unorm,
    R8G8B8X8UnormSrgb,
    B8G8R8A8Typeless,
    B8G8R8A8Unorm,
    B8G8R8A8UnormSrgb,
    B8G8R8X8Typeless,
    B8G8R8X8Unorm,
    B8G8R8X8UnormSrgb,

    R10G10B10A2Typeless,
    R10G10B10A2Unorm,
    R10G10B10A2XrBias,
    B10G10R10A2Typeless,
    B10G10R10A2Unorm,
    R11G11B10Float,

    R16G16B16A16Typeless,
    R16G16B16A16Float,
    R16G16B16A16Unorm,
    R32G32B32Typeless,
    R32G32B32Float,
    R32G32B32A32Typeless,
    R32G32B32A32Float,

    R24G8Typeless,
    D16Unorm,
    D24UnormS8Uint,
    D32Float,
    D32FloatS8Uint,
}

impl Format {
    /// Whether an effect may be rendered into a target of this format.
    pub const fn is_color_buffer(self) -> bool {
        matches!(
            self,
            Self::B5G6R5Unorm
                | Self::B5G5R5A1Unorm
                | Self::B5G5R5X1Unorm
                | Self::R8G8B8A8Typeless
                | Self::R8G8B8A8Unorm
                | Self::R8G8B8A8UnormSrgb
                | Self::R8G8B8X8Unorm
                | Self::R8G8B8X8UnormSrgb
                | Self::B8G8R8A8Typeless
                | Self::B8G8R8A8Unorm
                | Self::B8G8R8A8UnormSrgb
                | Self::B8G8R8X8Typeless
                | Self::B8G8R8X8Unorm
                | Self::B8G8R8X8UnormSrgb
                | Self::R10G10B10A2Typeless
                | Self::R10G10B10A2Unorm
                | Self::R10G10B10A2XrBias
                | Self::B10G10R10A2Typeless
                | Self::B10G10R10A2Unorm
                | Self::R11G11B10Float
                | Self::R16G16B16A16Typeless
                | Self::R16G16B16A16Float
                | Self::R16G16B16A16Unorm
                | Self::R32G32B32Typeless
                | Self::R32G32B32Float
                | Self::R32G32B32A32Typeless
                | Self::R32G32B32A32Float
        )
    }

    /// Typeless family of this format, used when allocating textures that need both linear and
    /// sRGB views.
    pub const fn typeless(self) -> Self {
        match self {
            Self::R8G8B8A8Typeless
            | Self::R8G8B8A8Unorm
            | Self::R8G8B8A8UnormSrgb
            | Self::R8G8B8X8Unorm
            | Self::R8G8B8X8UnormSrgb => Self::R8G8B8A8Typeless,
            Self::B8G8R8A8Typeless | Self::B8G8R8A8Unorm | Self::B8G8R8A8UnormSrgb => {
                Self::B8G8R8A8Typeless
            }
            Self::B8G8R8X8Typeless | Self::B8G8R8X8Unorm | Self::B8G8R8X8UnormSrgb => {
                Self::B8G8R8X8Typeless
            }
            Self::R10G10B10A2Typeless | Self::R10G10B10A2Unorm | Self::R10G10B10A2XrBias => {
                Self::R10G10B10A2Typeless
            }
            Self::B10G10R10A2Typeless | Self::B10G10R10A2Unorm => Self::B10G10R10A2Typeless,
            Self::R16G16B16A16Typeless | Self::R16G16B16A16Float | Self::R16G16B16A16Unorm => {
                Self::R16G16B16A16Typeless
            }
            Self::R32G32B32Typeless | Self::R32G32B32Float => Self::R32G32B32Typeless,
            Self::R32G32B32A32Typeless | Self::R32G32B32A32Float => Self::R32G32B32A32Typeless,
            Self::R32Typeless | Self::R32Float | Self::R32Sint | Self::R32Uint | Self::D32Float => {
                Self::R32Typeless
            }
            Self::R24G8Typeless | Self::D24UnormS8Uint => Self::R24G8Typeless,
            other => other,
        }
    }

    /// Default typed format for a (possibly typeless) format, optionally picking the sRGB
    /// variant where one exists.
    pub const fn default_typed(self, srgb: bool) -> Self {
        match self {
            Self::R8G8B8A8Typeless | Self::R8G8B8A8Unorm | Self::R8G8B8A8UnormSrgb => {
                if srgb {
                    Self::R8G8B8A8UnormSrgb
                } else {
                    Self::R8G8B8A8Unorm
                }
            }
            Self::R8G8B8X8Unorm | Self::R8G8B8X8UnormSrgb => {
                if srgb {
                    Self::R8G8B8X8UnormSrgb
                } else {
                    Self::R8G8B8X8Unorm
                }
            }
            Self::B8G8R8A8Typeless | Self::B8G8R8A8Unorm | Self::B8G8R8A8UnormSrgb => {
                if srgb {
                    Self::B8G8R8A8UnormSrgb
                } else {
                    Self::B8G8R8A8Unorm
                }
            }
            Self::B8G8R8X8Typeless | Self::B8G8R8X8Unorm | Self::B8G8R8X8UnormSrgb => {
                if srgb {
                    Self::B8G8R8X8UnormSrgb
                } else {
                    Self::B8G8R8X8Unorm
                }
            }
            Self::R10G10B10A2Typeless => Self::R10G10B10A2Unorm,
            Self::B10G10R10A2Typeless => Self::B10G10R10A2Unorm,
            Self::R16G16B16A16Typeless => Self::R16G16B16A16Float,
            Self::R32G32B32Typeless => Self::R32G32B32Float,
            Self::R32G32B32A32Typeless => Self::R32G32B32A32Float,
            Self::R32Typeless => Self::R32Float,
            Self::R24G8Typeless => Self::D24UnormS8Uint,
            other => other,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
