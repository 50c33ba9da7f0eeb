use fxtoggle_api::env::env_var_truthy;

use crate::mapping::{ConstantCopyMethod, NestedMapping, SingularMapping};

/// How intercepted copies are attributed to mapped buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CopyMethod {
    /// Only the most recent mapping is tracked.
    #[default]
    Singular,
    /// Every live mapping is tracked; copies are routed by destination address.
    Nested,
}

impl CopyMethod {
    pub fn build(self) -> Box<dyn ConstantCopyMethod> {
        match self {
            CopyMethod::Singular => Box::<SingularMapping>::default(),
            CopyMethod::Nested => Box::<NestedMapping>::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackerConfig {
    pub copy_method: CopyMethod,
}

impl TrackerConfig {
    /// `FXTOGGLE_NESTED_MAPPING` selects [`CopyMethod::Nested`].
    pub fn from_env() -> Self {
        let copy_method = if env_var_truthy("FXTOGGLE_NESTED_MAPPING") {
            CopyMethod::Nested
        } else {
            CopyMethod::Singular
        };
        Self { copy_method }
    }
}
