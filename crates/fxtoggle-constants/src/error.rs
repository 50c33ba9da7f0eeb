use fxtoggle_api::{GroupId, Resource};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstantError {
    #[error("resource {0:?} is unknown to the device")]
    UnknownResource(Resource),
    #[error("resource {0:?} is not a buffer")]
    NotABuffer(Resource),
    #[error("no shadow buffer exists for {0:?}")]
    MissingShadowBuffer(Resource),
    #[error("group {0} has no constant scratchpad")]
    UnknownGroup(GroupId),
    #[error("constant read of {len} bytes at offset {offset} exceeds the {size}-byte snapshot")]
    OutOfBounds { offset: usize, len: usize, size: usize },
}
