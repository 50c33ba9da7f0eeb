//! Traits implemented by the host application / effect runtime bridge.
//!
//! The core never talks to a graphics API directly. Every GPU object it creates, every view it
//! inspects and every effect it renders goes through these traits, which keeps the scheduling
//! logic testable against the in-memory host in [`crate::test_utils`].

use crate::{
    BufferRange, Format, HostError, Resource, ResourceDesc, ResourceView, ShaderStage, Technique,
    UniformVariable, ViewUsage,
};

/// Device-level object management.
pub trait Device: Send + Sync {
    fn resource_desc(&self, resource: Resource) -> Option<ResourceDesc>;
    fn resource_from_view(&self, view: ResourceView) -> Option<Resource>;

    fn create_resource(&self, desc: &ResourceDesc) -> Result<Resource, HostError>;
    fn create_resource_view(
        &self,
        resource: Resource,
        usage: ViewUsage,
        format: Format,
    ) -> Result<ResourceView, HostError>;
    fn destroy_resource(&self, resource: Resource);
    fn destroy_resource_view(&self, view: ResourceView);

    /// Block until the GPU finished all submitted work. Called before destroying objects that
    /// in-flight work may still reference.
    fn wait_idle(&self);
}

/// Recording interface of a single command list.
pub trait CommandList {
    fn copy_resource(&mut self, source: Resource, dest: Resource);
    fn clear_render_target_view(&mut self, view: ResourceView, color: [f32; 4]);

    fn bind_render_targets(&mut self, views: &[Option<ResourceView>]);
    fn push_shader_resource_views(
        &mut self,
        stage: ShaderStage,
        slot: u32,
        views: &[Option<ResourceView>],
    );
    fn push_constant_buffers(&mut self, stage: ShaderStage, slot: u32, ranges: &[Option<BufferRange>]);
}

/// Declared type of a runtime uniform variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct UniformTypeInfo {
    pub format: Format,
    pub rows: u32,
    pub columns: u32,
    pub array_length: u32,
}

/// The effect runtime that owns techniques and their uniforms.
pub trait EffectRuntime: Send + Sync {
    fn device(&self) -> &dyn Device;

    fn uniform_variables(&self) -> Vec<UniformVariable>;
    fn uniform_annotation_string(&self, variable: UniformVariable, name: &str) -> Option<String>;
    fn uniform_type(&self, variable: UniformVariable) -> UniformTypeInfo;
    fn set_uniform_float(&self, variable: UniformVariable, values: &[f32]);
    fn set_uniform_int(&self, variable: UniformVariable, values: &[i32]);
    fn set_uniform_uint(&self, variable: UniformVariable, values: &[u32]);

    fn techniques(&self) -> Vec<Technique>;
    fn technique_name(&self, technique: Technique) -> String;
    fn technique_annotation_bool(&self, technique: Technique, name: &str) -> Option<bool>;
    fn technique_annotation_int(&self, technique: Technique, name: &str) -> Option<i32>;
    fn render_technique(
        &self,
        technique: Technique,
        cmd: &mut dyn CommandList,
        rtv: ResourceView,
        rtv_srgb: ResourceView,
    );

    /// Current swap-chain (screenshot) dimensions.
    fn screenshot_size(&self) -> (u32, u32);
    fn current_back_buffer(&self) -> Resource;
    /// Point the effects' texture binding `name` at the given views (null unbinds).
    fn update_texture_bindings(&self, name: &str, srv: ResourceView, srv_srgb: ResourceView);
}

/// Per-resource view pairs (linear, sRGB) maintained by the host bridge.
pub trait ViewCache: Send + Sync {
    fn render_target_views(&self, resource: Resource) -> Option<(ResourceView, ResourceView)>;
    fn shader_resource_views(&self, resource: Resource) -> Option<(ResourceView, ResourceView)>;
}
