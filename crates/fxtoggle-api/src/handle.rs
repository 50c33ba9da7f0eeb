use std::fmt;

/// Hash identifying a shader as reported by the group matcher.
pub type ShaderHash = u32;

macro_rules! host_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub u64);

        impl $name {
            /// The host's "no object" value.
            pub const NULL: Self = Self(0);

            pub const fn is_null(self) -> bool {
                self.0 == 0
            }

            /// Returns `None` for the null handle.
            pub const fn non_null(self) -> Option<Self> {
                if self.0 == 0 {
                    None
                } else {
                    Some(self)
                }
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "(0x{:X})"), self.0)
            }
        }
    };
}

host_handle!(
    /// GPU resource (buffer or texture) owned by the host device.
    Resource
);
host_handle!(
    /// Render-target or shader-resource view of a [`Resource`].
    ResourceView
);
host_handle!(
    /// Uniform variable exposed by the effect runtime.
    UniformVariable
);
host_handle!(
    /// Effect technique exposed by the effect runtime.
    Technique
);
