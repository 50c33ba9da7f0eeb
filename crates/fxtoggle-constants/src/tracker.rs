use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};

use fxtoggle_api::lock_order::{self, LockClass, Ordered};
use fxtoggle_api::{
    BufferRange, Device, EffectRuntime, GroupId, MapAccess, Resource, ResourceDesc, ToggleGroup,
};
use tracing::{debug, trace};

use crate::mapping::{BufferMapping, ConstantCopyMethod};
use crate::{ConstantError, ConstantType, Scratchpad, ShadowBufferStore, TrackerConfig, UniformRegistry};

/// Device-wide constant buffer mirror plus the per-group snapshots taken from it.
///
/// Host callbacks (`on_*`) keep the shadow buffers current. The scheduler calls
/// [`ConstantTracker::update_group`] once it has found the constant buffer bound for a group's
/// draw.
#[derive(Debug)]
pub struct ConstantTracker {
    config: TrackerConfig,
    shadow: ShadowBufferStore,
    copy_method: Box<dyn ConstantCopyMethod>,
    scratchpads: Mutex<HashMap<GroupId, Scratchpad>>,
    uniforms: RwLock<UniformRegistry>,
}

impl Default for ConstantTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

impl ConstantTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            shadow: ShadowBufferStore::new(),
            copy_method: config.copy_method.build(),
            scratchpads: Mutex::new(HashMap::new()),
            uniforms: RwLock::new(UniformRegistry::new()),
        }
    }

    pub fn config(&self) -> TrackerConfig {
        self.config
    }

    pub fn shadow(&self) -> &ShadowBufferStore {
        &self.shadow
    }

    pub fn on_init_resource(
        &self,
        resource: Resource,
        desc: &ResourceDesc,
        initial_data: Option<&[u8]>,
    ) {
        if !desc.is_host_constant_buffer() {
            return;
        }
        let Some(size) = desc.buffer_size().and_then(|s| usize::try_from(s).ok()) else {
            return;
        };
        self.shadow.create(resource, size, initial_data);
        trace!(?resource, size, "shadow buffer created");
    }

    pub fn on_destroy_resource(&self, resource: Resource) {
        self.copy_method.on_unmap(resource);
        if self.shadow.remove(resource) {
            trace!(?resource, "shadow buffer destroyed");
        }
    }

    /// `data` is the host address the map call returned.
    pub fn on_map_buffer_region(
        &self,
        device: &dyn Device,
        resource: Resource,
        offset: u64,
        size: u64,
        access: MapAccess,
        data: usize,
    ) {
        if !access.is_write_only() || data == 0 {
            return;
        }
        let Some(desc) = device.resource_desc(resource) else {
            return;
        };
        if !desc.is_host_constant_buffer() {
            return;
        }
        let Some(buffer_size) = desc.buffer_size() else {
            return;
        };

        self.copy_method.on_map(BufferMapping {
            resource,
            base: data,
            offset,
            size,
            buffer_size,
        });
    }

    pub fn on_unmap_buffer_region(&self, resource: Resource) {
        self.copy_method.on_unmap(resource);
    }

    /// Mirror a host copy of `src` to address `dest`. Returns the bytes written to a shadow.
    pub fn on_memcpy(&self, dest: usize, src: &[u8]) -> usize {
        let Some((resource, offset)) = self.copy_method.find(dest) else {
            return 0;
        };
        self.shadow.write(resource, offset, src).unwrap_or(0)
    }

    pub fn reload_uniforms(&self, runtime: &dyn EffectRuntime) {
        let mut uniforms = self.uniforms.write().unwrap_or_else(PoisonError::into_inner);
        uniforms.reload(runtime);
        debug!(count = uniforms.len(), "constant-fed uniforms reloaded");
    }

    pub fn uniform_type(&self, name: &str) -> Option<ConstantType> {
        self.uniforms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(|(ty, _)| ty)
    }

    /// Point `group`'s scratchpad at `range` and refresh it from the shadow buffer.
    pub fn set_buffer_range(
        &self,
        group: GroupId,
        range: BufferRange,
        device: &dyn Device,
    ) -> Result<(), ConstantError> {
        if range.buffer.is_null() {
            return Err(ConstantError::UnknownResource(range.buffer));
        }
        let mut pads = self.lock_scratchpads();
        pads.entry(group).or_default().set_source(range);
        Self::refresh(&self.shadow, &mut pads, group, device)
    }

    /// Refresh `group`'s scratchpad from the shadow of its last source buffer.
    pub fn copy_to_scratchpad(&self, group: GroupId, device: &dyn Device) -> Result<(), ConstantError> {
        let mut pads = self.lock_scratchpads();
        Self::refresh(&self.shadow, &mut pads, group, device)
    }

    fn refresh(
        shadow: &ShadowBufferStore,
        pads: &mut HashMap<GroupId, Scratchpad>,
        group: GroupId,
        device: &dyn Device,
    ) -> Result<(), ConstantError> {
        let pad = pads.get_mut(&group).ok_or(ConstantError::UnknownGroup(group))?;
        let buffer = pad
            .source()
            .map(|range| range.buffer)
            .ok_or(ConstantError::UnknownGroup(group))?;

        let desc = device
            .resource_desc(buffer)
            .ok_or(ConstantError::UnknownResource(buffer))?;
        desc.buffer_size().ok_or(ConstantError::NotABuffer(buffer))?;

        shadow
            .with_bytes(buffer, |bytes| pad.refresh(bytes))
            .ok_or(ConstantError::MissingShadowBuffer(buffer))
    }

    /// Push every constant `group` maps into the runtime uniforms registered for it.
    ///
    /// Constants whose read would run past the snapshot are skipped individually. Returns the
    /// number of constants applied.
    pub fn apply_constant_values(&self, runtime: &dyn EffectRuntime, group: &ToggleGroup) -> usize {
        let pads = self.lock_scratchpads();
        let Some(pad) = pads.get(&group.id) else {
            return 0;
        };
        let uniforms = self.uniforms.read().unwrap_or_else(PoisonError::into_inner);

        let mut applied = 0;
        for (name, location) in &group.constant_offsets {
            let Some((ty, variables)) = uniforms.get(name) else {
                continue;
            };
            let count = ty.element_count();

            let result = match ty {
                ConstantType::Int => pad
                    .read::<i32>(location.use_previous, location.offset, count)
                    .map(|values| {
                        for &var in variables {
                            runtime.set_uniform_int(var, &values);
                        }
                    }),
                ConstantType::Uint => pad
                    .read::<u32>(location.use_previous, location.offset, count)
                    .map(|values| {
                        for &var in variables {
                            runtime.set_uniform_uint(var, &values);
                        }
                    }),
                _ => pad
                    .read::<f32>(location.use_previous, location.offset, count)
                    .map(|values| {
                        for &var in variables {
                            runtime.set_uniform_float(var, &values);
                        }
                    }),
            };

            match result {
                Ok(()) => applied += 1,
                Err(err) => trace!(group = %group.id, %name, %err, "constant skipped"),
            }
        }
        applied
    }

    /// Snapshot `range` for `group` and apply its constants.
    pub fn update_group(
        &self,
        runtime: &dyn EffectRuntime,
        group: &ToggleGroup,
        range: BufferRange,
    ) -> Result<usize, ConstantError> {
        self.set_buffer_range(group.id, range, runtime.device())?;
        let applied = self.apply_constant_values(runtime, group);
        debug!(group = %group.id, buffer = ?range.buffer, applied, "constants updated");
        Ok(applied)
    }

    pub fn remove_group(&self, group: GroupId) -> bool {
        self.lock_scratchpads().remove(&group).is_some()
    }

    pub fn with_scratchpad<R>(&self, group: GroupId, f: impl FnOnce(&Scratchpad) -> R) -> Option<R> {
        self.lock_scratchpads().get(&group).map(f)
    }

    fn lock_scratchpads(&self) -> Ordered<MutexGuard<'_, HashMap<GroupId, Scratchpad>>> {
        Ordered::new(
            lock_order::enter(LockClass::Shadow),
            self.scratchpads
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }
}
