//! Host-facing vocabulary shared by the `fxtoggle` crates.
//!
//! The effect toggler sits between an application's GPU command stream and an effect runtime.
//! Neither side is owned by this workspace, so everything the core needs from them is expressed
//! here as plain data plus a handful of traits:
//!
//! - opaque handles ([`Resource`], [`ResourceView`], [`UniformVariable`], [`Technique`])
//! - resource descriptors and formats ([`ResourceDesc`], [`Format`])
//! - the read-only group model supplied by the matcher ([`ToggleGroup`], [`GroupMatcher`])
//! - host traits ([`Device`], [`CommandList`], [`EffectRuntime`], [`ViewCache`])
//! - a thread-local lock hierarchy check ([`lock_order`])

mod error;
mod format;
mod group;
mod handle;
mod host;
mod resource;
mod stage;

pub mod env;
pub mod lock_order;

/// In-memory mock host used by tests.
///
/// Only available when compiling this crate's own tests, or when the `test-utils` feature is
/// enabled.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use crate::error::HostError;
pub use crate::format::Format;
pub use crate::group::{
    ConstantOffset, DescriptorCycle, GroupId, GroupMatcher, SwapchainMatchMode,
    TextureBindingConfig, ToggleGroup,
};
pub use crate::handle::{Resource, ResourceView, ShaderHash, Technique, UniformVariable};
pub use crate::host::{CommandList, Device, EffectRuntime, UniformTypeInfo, ViewCache};
pub use crate::resource::{
    BufferRange, MapAccess, MemoryHeap, ResourceDesc, ResourceKind, ResourceUsage,
    TextureExtent, ViewUsage,
};
pub use crate::stage::{CallSite, ShaderStage};
