use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use fxtoggle_api::lock_order::{self, LockClass, Ordered};
use fxtoggle_api::{
    CallSite, Device, EffectRuntime, GroupId, Resource, ResourceView, Technique, TextureExtent,
};
use tracing::warn;

use crate::{BindingResources, BindingTable};

/// An enabled technique as tracked by the toggler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectData {
    pub technique: Technique,
    /// Already rendered this frame, by any command list.
    pub rendered: bool,
    pub enabled_in_screenshot: bool,
    /// Milliseconds before the runtime disables the technique again; `-1` for never.
    pub timeout: i32,
}

impl EffectData {
    pub fn new(technique: Technique) -> Self {
        Self {
            technique,
            rendered: false,
            enabled_in_screenshot: true,
            timeout: -1,
        }
    }

    /// Read the technique's annotations from the runtime.
    pub fn load(runtime: &dyn EffectRuntime, technique: Technique) -> Self {
        Self {
            enabled_in_screenshot: runtime
                .technique_annotation_bool(technique, "enabled_in_screenshot")
                .unwrap_or(true),
            timeout: runtime
                .technique_annotation_int(technique, "timeout")
                .unwrap_or(-1),
            ..Self::new(technique)
        }
    }
}

/// Capture state of the group currently being inspected.
#[derive(Debug, Default)]
pub struct HuntPreview {
    /// Render target resolved for the preview; captured at `target_site`.
    pub target: Option<ResourceView>,
    pub target_site: CallSite,
    /// A preview was captured this frame.
    pub matched: bool,
    pub extent: Option<TextureExtent>,
    /// Texture the preview is copied into, with the extent it was allocated for.
    pub resources: Option<(BindingResources, TextureExtent)>,
}

impl HuntPreview {
    /// Forget this frame's target; the preview texture survives.
    pub fn reset(&mut self) {
        self.target = None;
        self.target_site = CallSite::Draw;
        self.matched = false;
        self.extent = None;
    }

    /// Preview texture matching `extent`, reallocated when the source size or format changed.
    pub fn ensure_texture(&mut self, device: &dyn Device, extent: TextureExtent) -> Option<Resource> {
        if let Some((res, allocated)) = self.resources {
            if allocated == extent {
                return Some(res.resource);
            }
            self.release(device);
        }

        match BindingResources::create(device, extent.format, extent.width, extent.height) {
            Ok(res) => {
                self.resources = Some((res, extent));
                Some(res.resource)
            }
            Err(err) => {
                warn!(%err, "preview texture unavailable");
                None
            }
        }
    }

    pub fn release(&mut self, device: &dyn Device) {
        if let Some((res, _)) = self.resources.take() {
            res.destroy(device);
        }
    }
}

/// Device-wide toggler state shared by every command list.
///
/// The technique map and the binding table sit behind separate locks that are never held together;
/// see [`fxtoggle_api::lock_order`].
#[derive(Default)]
pub struct DeviceState {
    runtime: RwLock<Option<Arc<dyn EffectRuntime>>>,
    techniques: RwLock<HashMap<String, EffectData>>,
    bindings: RwLock<BindingTable>,
    constants_updated: Mutex<HashSet<GroupId>>,
    srv_updated: Mutex<HashSet<GroupId>>,
    preview: Mutex<HuntPreview>,
    rendered_effects: AtomicBool,
}

impl fmt::Debug for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceState")
            .field("has_runtime", &self.runtime().is_some())
            .field("rendered_effects", &self.rendered_effects())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl DeviceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runtime(&self) -> Option<Arc<dyn EffectRuntime>> {
        self.runtime
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_runtime(&self, runtime: Option<Arc<dyn EffectRuntime>>) {
        *self.runtime.write().unwrap_or_else(PoisonError::into_inner) = runtime;
    }

    pub fn read_techniques(&self) -> Ordered<RwLockReadGuard<'_, HashMap<String, EffectData>>> {
        let token = lock_order::enter(LockClass::Techniques);
        Ordered::new(token, self.techniques.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn write_techniques(&self) -> Ordered<RwLockWriteGuard<'_, HashMap<String, EffectData>>> {
        let token = lock_order::enter(LockClass::Techniques);
        Ordered::new(token, self.techniques.write().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn read_bindings(&self) -> Ordered<RwLockReadGuard<'_, BindingTable>> {
        let token = lock_order::enter(LockClass::Bindings);
        Ordered::new(token, self.bindings.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn write_bindings(&self) -> Ordered<RwLockWriteGuard<'_, BindingTable>> {
        let token = lock_order::enter(LockClass::Bindings);
        Ordered::new(token, self.bindings.write().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn constants_updated(&self) -> MutexGuard<'_, HashSet<GroupId>> {
        lock(&self.constants_updated)
    }

    pub fn srv_updated(&self) -> MutexGuard<'_, HashSet<GroupId>> {
        lock(&self.srv_updated)
    }

    pub fn preview(&self) -> MutexGuard<'_, HuntPreview> {
        lock(&self.preview)
    }

    pub fn rendered_effects(&self) -> bool {
        self.rendered_effects.load(Ordering::Acquire)
    }

    pub fn set_rendered_effects(&self) {
        self.rendered_effects.store(true, Ordering::Release);
    }

    /// Start a new frame: forget what was updated or rendered during the last one.
    pub fn end_frame(&self) {
        self.constants_updated().clear();
        self.srv_updated().clear();
        self.write_bindings().clear_updated();
        for effect in self.write_techniques().values_mut() {
            effect.rendered = false;
        }
        self.preview().reset();
        self.rendered_effects.store(false, Ordering::Release);
    }
}
