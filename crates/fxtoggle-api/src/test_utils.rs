use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    BufferRange, CommandList, Device, EffectRuntime, Format, GroupMatcher, HostError, MemoryHeap,
    Resource, ResourceDesc, ResourceUsage, ResourceView, ShaderHash, ShaderStage, Technique,
    ToggleGroup, UniformTypeInfo, UniformVariable, ViewCache, ViewUsage,
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockView {
    pub resource: Resource,
    pub usage: ViewUsage,
    pub format: Format,
}

#[derive(Debug)]
struct DeviceInner {
    next_handle: u64,
    resources: HashMap<Resource, ResourceDesc>,
    views: HashMap<ResourceView, MockView>,
    destroyed_resources: Vec<Resource>,
    destroyed_views: Vec<ResourceView>,
    fail_creation: bool,
    wait_idle_calls: usize,
}

/// Device that hands out sequential handles and remembers every object it created.
#[derive(Debug)]
pub struct MockDevice {
    inner: Mutex<DeviceInner>,
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(DeviceInner {
                next_handle: 0x1000,
                resources: HashMap::new(),
                views: HashMap::new(),
                destroyed_resources: Vec::new(),
                destroyed_views: Vec::new(),
                fail_creation: false,
                wait_idle_calls: 0,
            }),
        }
    }

    /// Register an application-owned resource.
    pub fn add_resource(&self, desc: ResourceDesc) -> Resource {
        let mut inner = lock(&self.inner);
        let res = Resource(inner.next_handle);
        inner.next_handle += 1;
        inner.resources.insert(res, desc);
        res
    }

    pub fn add_texture(&self, width: u32, height: u32, format: Format) -> Resource {
        self.add_resource(ResourceDesc::texture_2d(
            width,
            height,
            format,
            MemoryHeap::GpuOnly,
            ResourceUsage::RENDER_TARGET | ResourceUsage::SHADER_RESOURCE,
        ))
    }

    pub fn add_constant_buffer(&self, size: u64) -> Resource {
        self.add_resource(ResourceDesc::buffer(
            size,
            MemoryHeap::CpuToGpu,
            ResourceUsage::CONSTANT_BUFFER,
        ))
    }

    /// Register an application-owned view of `resource`.
    pub fn add_view(&self, resource: Resource, usage: ViewUsage, format: Format) -> ResourceView {
        let mut inner = lock(&self.inner);
        let view = ResourceView(inner.next_handle);
        inner.next_handle += 1;
        inner.views.insert(
            view,
            MockView {
                resource,
                usage,
                format,
            },
        );
        view
    }

    /// Make every subsequent create call fail.
    pub fn set_fail_creation(&self, fail: bool) {
        lock(&self.inner).fail_creation = fail;
    }

    pub fn is_live(&self, resource: Resource) -> bool {
        lock(&self.inner).resources.contains_key(&resource)
    }

    pub fn view(&self, view: ResourceView) -> Option<MockView> {
        lock(&self.inner).views.get(&view).copied()
    }

    pub fn live_resource_count(&self) -> usize {
        lock(&self.inner).resources.len()
    }

    pub fn live_view_count(&self) -> usize {
        lock(&self.inner).views.len()
    }

    pub fn destroyed_resources(&self) -> Vec<Resource> {
        lock(&self.inner).destroyed_resources.clone()
    }

    pub fn destroyed_views(&self) -> Vec<ResourceView> {
        lock(&self.inner).destroyed_views.clone()
    }

    pub fn wait_idle_calls(&self) -> usize {
        lock(&self.inner).wait_idle_calls
    }
}

impl Device for MockDevice {
    fn resource_desc(&self, resource: Resource) -> Option<ResourceDesc> {
        lock(&self.inner).resources.get(&resource).copied()
    }

    fn resource_from_view(&self, view: ResourceView) -> Option<Resource> {
        lock(&self.inner).views.get(&view).map(|v| v.resource)
    }

    fn create_resource(&self, desc: &ResourceDesc) -> Result<Resource, HostError> {
        let mut inner = lock(&self.inner);
        if inner.fail_creation {
            let extent = desc.texture_extent().unwrap_or_default();
            return Err(HostError::TextureCreation {
                width: extent.width,
                height: extent.height,
                format: extent.format,
            });
        }
        let res = Resource(inner.next_handle);
        inner.next_handle += 1;
        inner.resources.insert(res, *desc);
        Ok(res)
    }

    fn create_resource_view(
        &self,
        resource: Resource,
        usage: ViewUsage,
        format: Format,
    ) -> Result<ResourceView, HostError> {
        let mut inner = lock(&self.inner);
        if inner.fail_creation {
            return Err(HostError::ViewCreation {
                resource,
                usage,
                format,
            });
        }
        if !inner.resources.contains_key(&resource) {
            return Err(HostError::UnknownResource(resource));
        }
        let view = ResourceView(inner.next_handle);
        inner.next_handle += 1;
        inner.views.insert(
            view,
            MockView {
                resource,
                usage,
                format,
            },
        );
        Ok(view)
    }

    fn destroy_resource(&self, resource: Resource) {
        let mut inner = lock(&self.inner);
        inner.resources.remove(&resource);
        inner.destroyed_resources.push(resource);
    }

    fn destroy_resource_view(&self, view: ResourceView) {
        let mut inner = lock(&self.inner);
        inner.views.remove(&view);
        inner.destroyed_views.push(view);
    }

    fn wait_idle(&self) {
        lock(&self.inner).wait_idle_calls += 1;
    }
}

/// A value written through one of the `set_uniform_*` calls.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Float(Vec<f32>),
    Int(Vec<i32>),
    Uint(Vec<u32>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderCall {
    pub technique: Technique,
    pub rtv: ResourceView,
    pub rtv_srgb: ResourceView,
}

#[derive(Debug, Clone)]
struct MockUniform {
    handle: UniformVariable,
    source: Option<String>,
    ty: UniformTypeInfo,
}

#[derive(Debug, Clone)]
struct MockTechnique {
    handle: Technique,
    name: String,
    bools: HashMap<String, bool>,
    ints: HashMap<String, i32>,
}

#[derive(Debug)]
struct RuntimeInner {
    next_handle: u64,
    uniforms: Vec<MockUniform>,
    techniques: Vec<MockTechnique>,
    renders: Vec<RenderCall>,
    uniform_values: Vec<(UniformVariable, UniformValue)>,
    texture_bindings: HashMap<String, (ResourceView, ResourceView)>,
    binding_updates: Vec<(String, ResourceView, ResourceView)>,
    screenshot_size: (u32, u32),
    back_buffer: Resource,
}

/// Effect runtime that records everything it is asked to do.
///
/// Rendering a technique rebinds the render targets to the technique's target on the given command
/// list, which is what a real runtime leaves behind.
#[derive(Debug)]
pub struct MockRuntime {
    device: Arc<MockDevice>,
    inner: Mutex<RuntimeInner>,
}

impl MockRuntime {
    /// Runtime whose swap chain is `width`x`height` BGRA8.
    pub fn new(device: Arc<MockDevice>, width: u32, height: u32) -> Self {
        let back_buffer = device.add_texture(width, height, Format::B8G8R8A8Unorm);
        Self {
            device,
            inner: Mutex::new(RuntimeInner {
                next_handle: 1,
                uniforms: Vec::new(),
                techniques: Vec::new(),
                renders: Vec::new(),
                uniform_values: Vec::new(),
                texture_bindings: HashMap::new(),
                binding_updates: Vec::new(),
                screenshot_size: (width, height),
                back_buffer,
            }),
        }
    }

    pub fn mock_device(&self) -> &Arc<MockDevice> {
        &self.device
    }

    pub fn add_uniform(&self, source: Option<&str>, ty: UniformTypeInfo) -> UniformVariable {
        let mut inner = lock(&self.inner);
        let handle = UniformVariable(inner.next_handle);
        inner.next_handle += 1;
        inner.uniforms.push(MockUniform {
            handle,
            source: source.map(str::to_owned),
            ty,
        });
        handle
    }

    pub fn add_technique(&self, name: &str) -> Technique {
        let mut inner = lock(&self.inner);
        let handle = Technique(inner.next_handle);
        inner.next_handle += 1;
        inner.techniques.push(MockTechnique {
            handle,
            name: name.to_owned(),
            bools: HashMap::new(),
            ints: HashMap::new(),
        });
        handle
    }

    pub fn set_technique_bool(&self, technique: Technique, name: &str, value: bool) {
        let mut inner = lock(&self.inner);
        if let Some(t) = inner.techniques.iter_mut().find(|t| t.handle == technique) {
            t.bools.insert(name.to_owned(), value);
        }
    }

    pub fn set_technique_int(&self, technique: Technique, name: &str, value: i32) {
        let mut inner = lock(&self.inner);
        if let Some(t) = inner.techniques.iter_mut().find(|t| t.handle == technique) {
            t.ints.insert(name.to_owned(), value);
        }
    }

    pub fn set_screenshot_size(&self, width: u32, height: u32) {
        lock(&self.inner).screenshot_size = (width, height);
    }

    pub fn renders(&self) -> Vec<RenderCall> {
        lock(&self.inner).renders.clone()
    }

    pub fn uniform_values(&self) -> Vec<(UniformVariable, UniformValue)> {
        lock(&self.inner).uniform_values.clone()
    }

    /// Latest value written to `variable`.
    pub fn last_uniform_value(&self, variable: UniformVariable) -> Option<UniformValue> {
        lock(&self.inner)
            .uniform_values
            .iter()
            .rev()
            .find(|(v, _)| *v == variable)
            .map(|(_, value)| value.clone())
    }

    /// Views currently published under `name`.
    pub fn texture_binding(&self, name: &str) -> Option<(ResourceView, ResourceView)> {
        lock(&self.inner).texture_bindings.get(name).copied()
    }

    pub fn binding_updates(&self) -> Vec<(String, ResourceView, ResourceView)> {
        lock(&self.inner).binding_updates.clone()
    }
}

impl EffectRuntime for MockRuntime {
    fn device(&self) -> &dyn Device {
        &*self.device
    }

    fn uniform_variables(&self) -> Vec<UniformVariable> {
        lock(&self.inner).uniforms.iter().map(|u| u.handle).collect()
    }

    fn uniform_annotation_string(&self, variable: UniformVariable, name: &str) -> Option<String> {
        if name != "source" {
            return None;
        }
        lock(&self.inner)
            .uniforms
            .iter()
            .find(|u| u.handle == variable)
            .and_then(|u| u.source.clone())
    }

    fn uniform_type(&self, variable: UniformVariable) -> UniformTypeInfo {
        lock(&self.inner)
            .uniforms
            .iter()
            .find(|u| u.handle == variable)
            .map(|u| u.ty)
            .unwrap_or_default()
    }

    fn set_uniform_float(&self, variable: UniformVariable, values: &[f32]) {
        lock(&self.inner)
            .uniform_values
            .push((variable, UniformValue::Float(values.to_vec())));
    }

    fn set_uniform_int(&self, variable: UniformVariable, values: &[i32]) {
        lock(&self.inner)
            .uniform_values
            .push((variable, UniformValue::Int(values.to_vec())));
    }

    fn set_uniform_uint(&self, variable: UniformVariable, values: &[u32]) {
        lock(&self.inner)
            .uniform_values
            .push((variable, UniformValue::Uint(values.to_vec())));
    }

    fn techniques(&self) -> Vec<Technique> {
        lock(&self.inner).techniques.iter().map(|t| t.handle).collect()
    }

    fn technique_name(&self, technique: Technique) -> String {
        lock(&self.inner)
            .techniques
            .iter()
            .find(|t| t.handle == technique)
            .map(|t| t.name.clone())
            .unwrap_or_default()
    }

    fn technique_annotation_bool(&self, technique: Technique, name: &str) -> Option<bool> {
        lock(&self.inner)
            .techniques
            .iter()
            .find(|t| t.handle == technique)
            .and_then(|t| t.bools.get(name).copied())
    }

    fn technique_annotation_int(&self, technique: Technique, name: &str) -> Option<i32> {
        lock(&self.inner)
            .techniques
            .iter()
            .find(|t| t.handle == technique)
            .and_then(|t| t.ints.get(name).copied())
    }

    fn render_technique(
        &self,
        technique: Technique,
        cmd: &mut dyn CommandList,
        rtv: ResourceView,
        rtv_srgb: ResourceView,
    ) {
        lock(&self.inner).renders.push(RenderCall {
            technique,
            rtv,
            rtv_srgb,
        });
        cmd.bind_render_targets(&[Some(rtv)]);
    }

    fn screenshot_size(&self) -> (u32, u32) {
        lock(&self.inner).screenshot_size
    }

    fn current_back_buffer(&self) -> Resource {
        lock(&self.inner).back_buffer
    }

    fn update_texture_bindings(&self, name: &str, srv: ResourceView, srv_srgb: ResourceView) {
        let mut inner = lock(&self.inner);
        inner
            .texture_bindings
            .insert(name.to_owned(), (srv, srv_srgb));
        inner
            .binding_updates
            .push((name.to_owned(), srv, srv_srgb));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CopyResource {
        source: Resource,
        dest: Resource,
    },
    ClearRenderTarget {
        view: ResourceView,
        color: [f32; 4],
    },
    BindRenderTargets(Vec<Option<ResourceView>>),
    PushShaderResourceViews {
        stage: ShaderStage,
        slot: u32,
        views: Vec<Option<ResourceView>>,
    },
    PushConstantBuffers {
        stage: ShaderStage,
        slot: u32,
        ranges: Vec<Option<BufferRange>>,
    },
}

/// Command list that records every call in order.
#[derive(Debug, Default)]
pub struct RecordingCommandList {
    pub commands: Vec<Command>,
}

impl RecordingCommandList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn copies(&self) -> Vec<(Resource, Resource)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::CopyResource { source, dest } => Some((*source, *dest)),
                _ => None,
            })
            .collect()
    }

    pub fn clears(&self) -> Vec<ResourceView> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::ClearRenderTarget { view, .. } => Some(*view),
                _ => None,
            })
            .collect()
    }
}

impl CommandList for RecordingCommandList {
    fn copy_resource(&mut self, source: Resource, dest: Resource) {
        self.commands.push(Command::CopyResource { source, dest });
    }

    fn clear_render_target_view(&mut self, view: ResourceView, color: [f32; 4]) {
        self.commands
            .push(Command::ClearRenderTarget { view, color });
    }

    fn bind_render_targets(&mut self, views: &[Option<ResourceView>]) {
        self.commands
            .push(Command::BindRenderTargets(views.to_vec()));
    }

    fn push_shader_resource_views(
        &mut self,
        stage: ShaderStage,
        slot: u32,
        views: &[Option<ResourceView>],
    ) {
        self.commands.push(Command::PushShaderResourceViews {
            stage,
            slot,
            views: views.to_vec(),
        });
    }

    fn push_constant_buffers(
        &mut self,
        stage: ShaderStage,
        slot: u32,
        ranges: &[Option<BufferRange>],
    ) {
        self.commands.push(Command::PushConstantBuffers {
            stage,
            slot,
            ranges: ranges.to_vec(),
        });
    }
}

type ViewPair = (ResourceView, ResourceView);

#[derive(Debug, Default)]
pub struct MockViewCache {
    render_targets: Mutex<HashMap<Resource, ViewPair>>,
    shader_resources: Mutex<HashMap<Resource, ViewPair>>,
}

impl MockViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_render_target_views(&self, resource: Resource, views: ViewPair) {
        lock(&self.render_targets).insert(resource, views);
    }

    pub fn insert_shader_resource_views(&self, resource: Resource, views: ViewPair) {
        lock(&self.shader_resources).insert(resource, views);
    }
}

impl ViewCache for MockViewCache {
    fn render_target_views(&self, resource: Resource) -> Option<ViewPair> {
        lock(&self.render_targets).get(&resource).copied()
    }

    fn shader_resource_views(&self, resource: Resource) -> Option<ViewPair> {
        lock(&self.shader_resources).get(&resource).copied()
    }
}

/// Matcher backed by a fixed `(stage, shader) -> groups` table.
#[derive(Debug, Default)]
pub struct StaticGroupMatcher {
    table: Mutex<HashMap<(ShaderStage, ShaderHash), Vec<Arc<ToggleGroup>>>>,
}

impl StaticGroupMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, stage: ShaderStage, shader: ShaderHash, group: Arc<ToggleGroup>) {
        lock(&self.table)
            .entry((stage, shader))
            .or_default()
            .push(group);
    }
}

impl GroupMatcher for StaticGroupMatcher {
    fn blocking_groups(&self, stage: ShaderStage, shader: ShaderHash) -> Vec<Arc<ToggleGroup>> {
        lock(&self.table)
            .get(&(stage, shader))
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_creation_reports_requested_extent() {
        let device = MockDevice::new();
        device.set_fail_creation(true);
        let desc = ResourceDesc::texture_2d(
            8,
            4,
            Format::R8G8B8A8Typeless,
            MemoryHeap::GpuOnly,
            ResourceUsage::SHADER_RESOURCE,
        );
        assert_eq!(
            device.create_resource(&desc),
            Err(HostError::TextureCreation {
                width: 8,
                height: 4,
                format: Format::R8G8B8A8Typeless,
            })
        );
    }

    #[test]
    fn views_resolve_to_their_resource() {
        let device = MockDevice::new();
        let tex = device.add_texture(4, 4, Format::R8G8B8A8Unorm);
        let view = device
            .create_resource_view(tex, ViewUsage::RenderTarget, Format::R8G8B8A8Unorm)
            .unwrap();
        assert_eq!(device.resource_from_view(view), Some(tex));
        device.destroy_resource_view(view);
        assert_eq!(device.resource_from_view(view), None);
    }
}
