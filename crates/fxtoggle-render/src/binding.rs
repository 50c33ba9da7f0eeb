use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use fxtoggle_api::{
    CommandList, Device, EffectRuntime, Format, MemoryHeap, Resource, ResourceDesc, ResourceUsage,
    ResourceView, TextureExtent, ToggleGroup, ViewUsage,
};
use tracing::{debug, error, trace, warn};

use crate::BindingError;

/// Format used for binding textures before the first match tells us the real one.
pub(crate) const DEFAULT_BINDING_FORMAT: Format = Format::R8G8B8A8Unorm;

const CLEAR_COLOR: [f32; 4] = [0.0; 4];

/// A texture owned by the toggler with shader-resource and render-target views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingResources {
    pub resource: Resource,
    pub srv: ResourceView,
    pub rtv: ResourceView,
}

impl BindingResources {
    /// Allocate a `width`x`height` texture in the typeless family of `format`, with views in the
    /// default typed format.
    ///
    /// Waits for the GPU first so a replaced texture is never destroyed while in use. Partially
    /// created objects are destroyed on failure.
    pub fn create(
        device: &dyn Device,
        format: Format,
        width: u32,
        height: u32,
    ) -> Result<Self, BindingError> {
        device.wait_idle();

        let desc = ResourceDesc::texture_2d(
            width,
            height,
            format.typeless(),
            MemoryHeap::GpuOnly,
            ResourceUsage::COPY_DEST | ResourceUsage::SHADER_RESOURCE | ResourceUsage::RENDER_TARGET,
        );
        let resource = device.create_resource(&desc).map_err(|err| {
            error!(%err, "failed to create binding texture");
            err
        })?;

        let view_format = format.default_typed(false);
        let srv = match device.create_resource_view(resource, ViewUsage::ShaderResource, view_format) {
            Ok(srv) => srv,
            Err(err) => {
                error!(%err, "failed to create binding shader resource view");
                device.destroy_resource(resource);
                return Err(err.into());
            }
        };
        let rtv = match device.create_resource_view(resource, ViewUsage::RenderTarget, view_format) {
            Ok(rtv) => rtv,
            Err(err) => {
                error!(%err, "failed to create binding render target view");
                device.destroy_resource_view(srv);
                device.destroy_resource(resource);
                return Err(err.into());
            }
        };

        Ok(Self { resource, srv, rtv })
    }

    /// Allocate at the runtime's swap-chain size.
    pub fn create_for_swapchain(
        runtime: &dyn EffectRuntime,
        format: Format,
    ) -> Result<Self, BindingError> {
        let (width, height) = runtime.screenshot_size();
        Self::create(runtime.device(), format, width, height)
    }

    pub fn destroy(self, device: &dyn Device) {
        device.wait_idle();
        if !self.rtv.is_null() {
            device.destroy_resource_view(self.rtv);
        }
        if !self.srv.is_null() {
            device.destroy_resource_view(self.srv);
        }
        if !self.resource.is_null() {
            device.destroy_resource(self.resource);
        }
    }
}

/// Outcome of [`BindingTable::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingUpdate {
    Unchanged,
    Recreated,
    Failed,
}

/// Current backing of a named texture binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureBinding {
    pub resource: Resource,
    pub format: Format,
    pub srv: ResourceView,
    pub rtv: ResourceView,
    pub width: u32,
    pub height: u32,
    /// Reset the binding at the end of a frame in which it was not updated.
    pub reset_on_miss: bool,
    /// The binding owns a texture and receives copies of the matched resource.
    pub copy: bool,
    /// Already reset since the last update.
    pub reset: bool,
}

impl TextureBinding {
    fn empty(reset_on_miss: bool, copy: bool) -> Self {
        Self {
            resource: Resource::NULL,
            format: Format::Unknown,
            srv: ResourceView::NULL,
            rtv: ResourceView::NULL,
            width: 0,
            height: 0,
            reset_on_miss,
            copy,
            reset: false,
        }
    }

    fn owned(res: BindingResources, extent: TextureExtent, reset_on_miss: bool) -> Self {
        Self {
            resource: res.resource,
            format: extent.format,
            srv: res.srv,
            rtv: res.rtv,
            width: extent.width,
            height: extent.height,
            reset_on_miss,
            copy: true,
            reset: false,
        }
    }

    pub fn extent(&self) -> TextureExtent {
        TextureExtent {
            width: self.width,
            height: self.height,
            format: self.format,
        }
    }

    fn owned_resources(&self) -> BindingResources {
        BindingResources {
            resource: self.resource,
            srv: self.srv,
            rtv: self.rtv,
        }
    }

    fn clear_backing(&mut self) {
        self.resource = Resource::NULL;
        self.srv = ResourceView::NULL;
        self.rtv = ResourceView::NULL;
        self.format = Format::Unknown;
        self.width = 0;
        self.height = 0;
    }
}

/// Named texture bindings published to the effect runtime, plus the per-frame "updated" set.
#[derive(Debug, Default)]
pub struct BindingTable {
    entries: HashMap<String, TextureBinding>,
    updated: HashSet<String>,
    /// Fallback texture bound when a non-copy binding misses a frame.
    empty: Option<BindingResources>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&TextureBinding> {
        self.entries.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut TextureBinding> {
        self.entries.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_updated(&self, name: &str) -> bool {
        self.updated.contains(name)
    }

    pub fn mark_updated(&mut self, name: &str) {
        self.updated.insert(name.to_owned());
    }

    pub fn clear_updated(&mut self) {
        self.updated.clear();
    }

    pub fn empty_texture(&self) -> Option<BindingResources> {
        self.empty
    }

    /// Create the binding entries for every group that provides one.
    ///
    /// Copy bindings get a swap-chain sized RGBA8 texture right away; non-copy bindings start out
    /// unbound.
    pub fn init(&mut self, runtime: &dyn EffectRuntime, groups: &[Arc<ToggleGroup>]) {
        if self.empty.is_none() {
            match BindingResources::create_for_swapchain(runtime, DEFAULT_BINDING_FORMAT) {
                Ok(res) => self.empty = Some(res),
                Err(err) => warn!(%err, "empty binding texture unavailable"),
            }
        }

        for group in groups {
            let (Some(name), Some(config)) = (group.binding_name(), group.texture_binding.as_ref()) else {
                continue;
            };

            if config.copy {
                match BindingResources::create_for_swapchain(runtime, DEFAULT_BINDING_FORMAT) {
                    Ok(res) => {
                        let (width, height) = runtime.screenshot_size();
                        let extent = TextureExtent {
                            width,
                            height,
                            format: DEFAULT_BINDING_FORMAT,
                        };
                        if let Some(old) = self
                            .entries
                            .insert(name.to_owned(), TextureBinding::owned(res, extent, config.clear_on_miss))
                        {
                            Self::release(runtime.device(), &old);
                        }
                        runtime.update_texture_bindings(name, res.srv, res.srv);
                    }
                    Err(err) => warn!(binding = name, %err, "copy binding left uninitialised"),
                }
            } else {
                if let Some(old) = self
                    .entries
                    .insert(name.to_owned(), TextureBinding::empty(config.clear_on_miss, false))
                {
                    Self::release(runtime.device(), &old);
                }
                runtime.update_texture_bindings(name, ResourceView::NULL, ResourceView::NULL);
            }
            debug!(binding = name, copy = config.copy, "texture binding initialised");
        }
    }

    /// Destroy every owned texture and unbind every name.
    pub fn dispose(&mut self, runtime: &dyn EffectRuntime) {
        if let Some(empty) = self.empty.take() {
            empty.destroy(runtime.device());
        }

        let names: Vec<String> = self.entries.keys().cloned().collect();
        for name in &names {
            self.destroy(runtime, name);
        }
        self.entries.clear();
        self.updated.clear();
    }

    /// Release what backs `name` and unbind it; the entry itself stays.
    pub fn destroy(&mut self, runtime: &dyn EffectRuntime, name: &str) {
        let Some(entry) = self.entries.get_mut(name) else {
            return;
        };
        Self::release(runtime.device(), entry);
        runtime.update_texture_bindings(name, ResourceView::NULL, ResourceView::NULL);
        entry.clear_backing();
    }

    /// Remove `name` entirely, releasing what backs it.
    pub fn remove(&mut self, runtime: Option<&dyn EffectRuntime>, name: &str) -> bool {
        if let Some(runtime) = runtime {
            self.destroy(runtime, name);
        }
        self.updated.remove(name);
        self.entries.remove(name).is_some()
    }

    fn release(device: &dyn Device, entry: &TextureBinding) {
        if entry.copy {
            entry.owned_resources().destroy(device);
        }
    }

    /// Make the copy binding `name` match `extent`, recreating its texture if needed.
    pub fn update(
        &mut self,
        runtime: &dyn EffectRuntime,
        name: &str,
        extent: TextureExtent,
    ) -> BindingUpdate {
        let Some(current) = self.entries.get(name).copied() else {
            return BindingUpdate::Failed;
        };
        if current.extent() == extent {
            return BindingUpdate::Unchanged;
        }

        self.destroy(runtime, name);
        let created = BindingResources::create(runtime.device(), extent.format, extent.width, extent.height);
        let Some(entry) = self.entries.get_mut(name) else {
            return BindingUpdate::Failed;
        };
        match created {
            Ok(res) => {
                *entry = TextureBinding {
                    reset: entry.reset,
                    ..TextureBinding::owned(res, extent, entry.reset_on_miss)
                };
                runtime.update_texture_bindings(name, res.srv, res.srv);
                debug!(binding = name, width = extent.width, height = extent.height, format = %extent.format, "binding texture recreated");
                BindingUpdate::Recreated
            }
            Err(err) => {
                warn!(binding = name, %err, "binding texture recreation failed");
                BindingUpdate::Failed
            }
        }
    }

    /// Point the non-copy binding `name` at an application resource.
    ///
    /// Returns whether the runtime binding changed.
    pub fn swap(
        &mut self,
        runtime: &dyn EffectRuntime,
        name: &str,
        resource: Resource,
        extent: TextureExtent,
        views: (ResourceView, ResourceView),
    ) -> bool {
        let Some(entry) = self.entries.get_mut(name) else {
            return false;
        };
        entry.reset = false;
        if entry.resource == resource {
            return false;
        }

        runtime.update_texture_bindings(name, views.0, views.1);
        entry.resource = resource;
        entry.format = extent.format;
        entry.srv = views.0;
        entry.rtv = ResourceView::NULL;
        entry.width = extent.width;
        entry.height = extent.height;
        debug!(binding = name, ?resource, "binding swapped");
        true
    }

    /// Reset bindings that requested it and were not updated this frame.
    ///
    /// Non-copy bindings fall back to the empty texture; copy bindings keep their texture but get
    /// it cleared. Each binding is reset once until it is updated again.
    pub fn clear_unmatched(&mut self, runtime: &dyn EffectRuntime, cmd: &mut dyn CommandList) -> usize {
        let empty_srv = self.empty.map_or(ResourceView::NULL, |e| e.srv);
        let mut cleared = 0;

        for (name, entry) in &mut self.entries {
            if self.updated.contains(name) || !entry.reset_on_miss || entry.reset {
                continue;
            }

            if entry.copy {
                if !entry.rtv.is_null() {
                    cmd.clear_render_target_view(entry.rtv, CLEAR_COLOR);
                }
            } else {
                runtime.update_texture_bindings(name, empty_srv, empty_srv);
                entry.clear_backing();
            }
            entry.reset = true;
            cleared += 1;
            trace!(binding = %name, "unmatched binding reset");
        }
        cleared
    }
}
