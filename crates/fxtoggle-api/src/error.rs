use thiserror::Error;

use crate::{Format, Resource, ViewUsage};

/// Failures reported by the host when the toggler asks it to create GPU objects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("failed to create {width}x{height} {format} texture")]
    TextureCreation {
        width: u32,
        height: u32,
        format: Format,
    },
    #[error("failed to create {usage:?} view ({format}) for {resource:?}")]
    ViewCreation {
        resource: Resource,
        usage: ViewUsage,
        format: Format,
    },
    #[error("resource {0:?} is unknown to the device")]
    UnknownResource(Resource),
}
