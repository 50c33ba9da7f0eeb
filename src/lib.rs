//! Deferred per-shader effect toggling for a GPU command stream.
//!
//! This crate only re-exports the workspace members so hosts can depend on a single package:
//!
//! - [`api`]: handles, host traits and the toggle group model
//! - [`constants`]: constant buffer shadowing and per-group snapshots
//! - [`render`]: the command-list scheduler, texture bindings and preview capture

pub use fxtoggle_api as api;
pub use fxtoggle_constants as constants;
pub use fxtoggle_render as render;
