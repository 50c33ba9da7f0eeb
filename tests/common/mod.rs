#![allow(dead_code)]

use std::sync::Arc;

use fxtoggle::api::test_utils::{MockDevice, MockRuntime, MockViewCache, StaticGroupMatcher};
use fxtoggle::api::{
    EffectRuntime, Format, GroupId, Resource, ResourceView, ShaderHash, ShaderStage, Technique,
    ToggleGroup, ViewUsage,
};
use fxtoggle::constants::{ConstantTracker, TrackerConfig};
use fxtoggle::render::{CommandListState, Scheduler, SchedulerConfig};
use tracing_subscriber::EnvFilter;

pub const SWAPCHAIN: (u32, u32) = (1920, 1080);

/// Install a test-writer subscriber once; `RUST_LOG` picks the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One device with an attached mock runtime.
pub struct Host {
    pub device: Arc<MockDevice>,
    pub runtime: Arc<MockRuntime>,
    pub views: Arc<MockViewCache>,
    pub matcher: Arc<StaticGroupMatcher>,
    pub constants: Arc<ConstantTracker>,
    pub scheduler: Scheduler,
}

impl Host {
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        Self::build(config, TrackerConfig::default())
    }

    pub fn with_tracker(tracker: TrackerConfig) -> Self {
        Self::build(SchedulerConfig::default(), tracker)
    }

    fn build(config: SchedulerConfig, tracker: TrackerConfig) -> Self {
        init_tracing();
        let device = Arc::new(MockDevice::new());
        let runtime = Arc::new(MockRuntime::new(device.clone(), SWAPCHAIN.0, SWAPCHAIN.1));
        let views = Arc::new(MockViewCache::new());
        let matcher = Arc::new(StaticGroupMatcher::new());
        let constants = Arc::new(ConstantTracker::new(tracker));
        let scheduler = Scheduler::new(config, constants.clone(), views.clone(), matcher.clone());

        // The runtime renders leftovers onto the back buffer.
        let back_buffer = runtime.current_back_buffer();
        let rtv = device.add_view(back_buffer, ViewUsage::RenderTarget, Format::B8G8R8A8Unorm);
        let srgb = device.add_view(back_buffer, ViewUsage::RenderTarget, Format::B8G8R8A8UnormSrgb);
        views.insert_render_target_views(back_buffer, (rtv, srgb));

        Self {
            device,
            runtime,
            views,
            matcher,
            constants,
            scheduler,
        }
    }

    pub fn attach(&self, groups: &[Arc<ToggleGroup>]) {
        self.scheduler.attach_runtime(self.runtime.clone(), groups);
    }

    pub fn enable(&self, name: &str) -> Technique {
        let technique = self.runtime.add_technique(name);
        self.scheduler.set_technique_enabled(technique, true);
        technique
    }

    /// Texture with linear/sRGB render-target and shader-resource view pairs registered.
    pub fn texture(&self, width: u32, height: u32, format: Format) -> Texture {
        let resource = self.device.add_texture(width, height, format);
        let rtv = self
            .device
            .add_view(resource, ViewUsage::RenderTarget, format.default_typed(false));
        let rtv_srgb = self
            .device
            .add_view(resource, ViewUsage::RenderTarget, format.default_typed(true));
        let srv = self
            .device
            .add_view(resource, ViewUsage::ShaderResource, format.default_typed(false));
        let srv_srgb = self
            .device
            .add_view(resource, ViewUsage::ShaderResource, format.default_typed(true));
        self.views.insert_render_target_views(resource, (rtv, rtv_srgb));
        self.views.insert_shader_resource_views(resource, (srv, srv_srgb));
        Texture {
            resource,
            rtv,
            rtv_srgb,
            srv,
            srv_srgb,
        }
    }

    pub fn swapchain_target(&self) -> Texture {
        self.texture(SWAPCHAIN.0, SWAPCHAIN.1, Format::R8G8B8A8Unorm)
    }

    pub fn bind_shader(
        &self,
        state: &mut CommandListState,
        cmd: &mut fxtoggle::api::test_utils::RecordingCommandList,
        stage: ShaderStage,
        shader: ShaderHash,
    ) {
        self.scheduler.on_bind_pipeline(state, cmd, stage, Some(shader));
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Texture {
    pub resource: Resource,
    pub rtv: ResourceView,
    pub rtv_srgb: ResourceView,
    pub srv: ResourceView,
    pub srv_srgb: ResourceView,
}

pub fn group(id: u32, techniques: &[&str]) -> ToggleGroup {
    let mut group = ToggleGroup::new(GroupId(id), format!("group {id}"));
    group.preferred_techniques = techniques.iter().map(|t| t.to_string()).collect();
    group
}
