//! Deferred action scheduling for the effect toggler.
//!
//! The [`Scheduler`] is driven by host callbacks. On every draw or dispatch it asks the group
//! matcher which groups block the active shaders and marks their actions (render an effect, swap a
//! texture binding, snapshot constants, capture a preview) as pending in the command list's
//! [`QueueMask`]. Later call-sites in the same command list resolve a concrete view for each
//! pending action and execute it once the call-site it targets is reached. Device-wide "updated
//! this frame" sets make the first command list to get there win.

mod binding;
mod bound;
mod config;
mod device;
mod error;
mod queue;
mod resolve;
mod scheduler;
mod state;

pub use crate::binding::{BindingResources, BindingTable, BindingUpdate, TextureBinding};
pub use crate::bound::{BoundState, StageDescriptors};
pub use crate::config::SchedulerConfig;
pub use crate::device::{DeviceState, EffectData, HuntPreview};
pub use crate::error::BindingError;
pub use crate::queue::{ActionKind, QueueMask};
pub use crate::resolve::{check_aspect_ratio, matches_swapchain};
pub use crate::scheduler::Scheduler;
pub use crate::state::{CommandListState, QueuedAction, StageState};
