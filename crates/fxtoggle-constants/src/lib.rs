//! CPU-side mirroring of GPU constant buffers.
//!
//! Applications write constant data by mapping an upload-heap buffer and `memcpy`-ing into the
//! returned pointer. The host forwards the map/unmap calls and every intercepted copy here; the
//! [`ShadowBufferStore`] keeps a byte-exact CPU copy of each such buffer, and the
//! [`ConstantTracker`] snapshots those bytes into per-group scratchpads when the scheduler decides a
//! group's draw has been reached, then pushes typed values into the effect runtime's uniforms.

mod config;
mod constant_type;
mod error;
mod mapping;
mod registry;
mod scratchpad;
mod shadow;
mod tracker;

pub use crate::config::{CopyMethod, TrackerConfig};
pub use crate::constant_type::ConstantType;
pub use crate::error::ConstantError;
pub use crate::mapping::{BufferMapping, ConstantCopyMethod, NestedMapping, SingularMapping};
pub use crate::registry::UniformRegistry;
pub use crate::scratchpad::Scratchpad;
pub use crate::shadow::ShadowBufferStore;
pub use crate::tracker::ConstantTracker;
