use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use fxtoggle_api::{
    BufferRange, CallSite, CommandList, EffectRuntime, GroupId, GroupMatcher, Resource,
    ResourceView, ShaderHash, ShaderStage, Technique, ToggleGroup, ViewCache,
};
use fxtoggle_constants::ConstantTracker;
use tracing::{debug, trace};

use crate::resolve::{binding_target, effect_target, preview_target};
use crate::{
    ActionKind, BindingUpdate, CommandListState, DeviceState, EffectData, QueuedAction,
    SchedulerConfig,
};

const CLEAR_COLOR: [f32; 4] = [0.0; 4];

/// Entry point for every host callback that drives effect scheduling.
///
/// One scheduler exists per device. Command-list state lives with the host (one
/// [`CommandListState`] per command list) and is passed into each callback; everything shared
/// between command lists lives in the scheduler's [`DeviceState`].
///
/// Without an attached effect runtime, every callback that would schedule or execute something is a
/// no-op. Bound-state tracking keeps running so state is correct once a runtime attaches.
pub struct Scheduler {
    config: SchedulerConfig,
    device: DeviceState,
    constants: Arc<ConstantTracker>,
    views: Arc<dyn ViewCache>,
    matcher: Arc<dyn GroupMatcher>,
    hunting: Mutex<Option<GroupId>>,
    render_target_tab: AtomicBool,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .field("device", &self.device)
            .field("hunting", &self.hunting())
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    pub fn new(
        config: SchedulerConfig,
        constants: Arc<ConstantTracker>,
        views: Arc<dyn ViewCache>,
        matcher: Arc<dyn GroupMatcher>,
    ) -> Self {
        Self {
            config,
            device: DeviceState::new(),
            constants,
            views,
            matcher,
            hunting: Mutex::new(None),
            render_target_tab: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    pub fn device_state(&self) -> &DeviceState {
        &self.device
    }

    pub fn constants(&self) -> &Arc<ConstantTracker> {
        &self.constants
    }

    /// Select the group under interactive inspection and whether its render target is being
    /// previewed. Any preview captured for the previous selection is forgotten.
    pub fn set_hunting(&self, group: Option<GroupId>, render_target_tab: bool) {
        *self.hunting.lock().unwrap_or_else(PoisonError::into_inner) = group;
        self.render_target_tab.store(render_target_tab, Ordering::Release);
        self.device.preview().reset();
    }

    pub fn hunting(&self) -> Option<GroupId> {
        *self.hunting.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The hunted group, if its render target is being previewed.
    fn previewed_group(&self) -> Option<GroupId> {
        self.hunting()
            .filter(|_| self.render_target_tab.load(Ordering::Acquire))
    }

    /// Attach an effect runtime: load its uniforms and create the texture bindings of `groups`.
    pub fn attach_runtime(&self, runtime: Arc<dyn EffectRuntime>, groups: &[Arc<ToggleGroup>]) {
        self.constants.reload_uniforms(&*runtime);
        self.device.write_bindings().init(&*runtime, groups);
        self.device.set_runtime(Some(runtime));
        debug!(groups = groups.len(), "effect runtime attached");
    }

    /// Release everything created for the current runtime and detach it.
    pub fn detach_runtime(&self) {
        let Some(runtime) = self.device.runtime() else {
            return;
        };
        self.device.write_bindings().dispose(&*runtime);
        self.device.preview().release(runtime.device());
        self.device.write_techniques().clear();
        self.device.set_runtime(None);
        debug!("effect runtime detached");
    }

    /// Track a technique the user enabled or disabled in the runtime.
    pub fn set_technique_enabled(&self, technique: Technique, enabled: bool) {
        let Some(runtime) = self.device.runtime() else {
            return;
        };
        let name = runtime.technique_name(technique);
        let mut techniques = self.device.write_techniques();
        if enabled {
            techniques
                .entry(name)
                .or_insert_with(|| EffectData::load(&*runtime, technique));
        } else {
            techniques.remove(&name);
        }
    }

    /// Forget everything the device holds for `group`.
    pub fn remove_group(&self, group: &ToggleGroup) {
        if let Some(name) = group.binding_name() {
            let runtime = self.device.runtime();
            self.device.write_bindings().remove(runtime.as_deref(), name);
        }
        self.device.constants_updated().remove(&group.id);
        self.device.srv_updated().remove(&group.id);
        self.constants.remove_group(group.id);
        debug!(group = %group.id, "group removed");
    }

    pub fn on_reset_command_list(&self, state: &mut CommandListState) {
        state.reset();
    }

    pub fn on_bind_render_targets(&self, state: &mut CommandListState, views: &[Option<ResourceView>]) {
        state.bound.bind_render_targets(views);
    }

    pub fn on_push_shader_resource_views(
        &self,
        state: &mut CommandListState,
        stage: ShaderStage,
        slot: u32,
        first: u32,
        views: &[Option<ResourceView>],
    ) {
        state
            .bound
            .stage_mut(stage)
            .push_shader_resource_views(slot, first, views);
    }

    pub fn on_push_constant_buffers(
        &self,
        state: &mut CommandListState,
        stage: ShaderStage,
        slot: u32,
        first: u32,
        ranges: &[Option<BufferRange>],
    ) {
        state
            .bound
            .stage_mut(stage)
            .push_constant_buffers(slot, first, ranges);
    }

    /// A pipeline was bound for `stage`.
    ///
    /// Actions waiting for the next pipeline bind run first. If the stage's shader changed, what
    /// was queued for the old shader can no longer happen and is purged.
    pub fn on_bind_pipeline(
        &self,
        state: &mut CommandListState,
        cmd: &mut dyn CommandList,
        stage: ShaderStage,
        shader: Option<ShaderHash>,
    ) {
        if let Some(runtime) = self.device.runtime() {
            if state.mask.any_at(CallSite::BindPipeline) {
                for each in ShaderStage::ALL {
                    self.process(&*runtime, state, cmd, each, CallSite::BindPipeline);
                }
            }
        }

        if state.stage(stage).active_shader != shader {
            state.purge_stage(stage);
            trace!(?stage, ?shader, "pipeline changed, stage purged");
        }

        let blocking = shader
            .map(|hash| self.matcher.blocking_groups(stage, hash))
            .unwrap_or_default();
        let stage_state = state.stage_mut(stage);
        stage_state.active_shader = shader;
        stage_state.blocking_groups = blocking;
    }

    pub fn on_draw(&self, state: &mut CommandListState, cmd: &mut dyn CommandList) {
        let Some(runtime) = self.device.runtime() else {
            return;
        };

        for stage in ShaderStage::ALL {
            self.reschedule(state, stage);
            self.schedule(state, stage);
        }
        for stage in ShaderStage::ALL {
            self.process(&*runtime, state, cmd, stage, CallSite::Draw);
        }
    }

    pub fn on_dispatch(&self, state: &mut CommandListState, cmd: &mut dyn CommandList) {
        self.on_draw(state, cmd);
    }

    /// Frame boundary: render what was left over, reset unmatched bindings and start a new frame.
    pub fn on_present(&self, cmd: &mut dyn CommandList) {
        let Some(runtime) = self.device.runtime() else {
            return;
        };

        self.render_remaining_effects(&*runtime, cmd);
        self.clear_unmatched(&*runtime, cmd);
        self.device.end_frame();
    }

    /// Queue actions for every active group blocking `stage`.
    fn schedule(&self, state: &mut CommandListState, stage: ShaderStage) {
        let (stage_state, mask, _) = state.parts_mut(stage);
        if stage_state.blocking_groups.is_empty() {
            return;
        }
        let groups: Vec<Arc<ToggleGroup>> = stage_state
            .blocking_groups
            .iter()
            .filter(|g| g.active)
            .cloned()
            .collect();
        let previewed = self.previewed_group();

        {
            let bindings = self.device.read_bindings();
            for group in &groups {
                if group.extract_constants
                    && !self.device.constants_updated().contains(&group.id)
                    && !stage_state.constants.contains_key(&group.id)
                {
                    stage_state.constants.insert(group.id, group.clone());
                    mask.arm(ActionKind::Constants, stage, CallSite::Draw);
                }

                if previewed == Some(group.id) {
                    let mut preview = self.device.preview();
                    if !preview.matched {
                        preview.target_site = group.invocation_location;
                        stage_state.preview_group = Some(group.clone());
                        mask.arm_with_draw(ActionKind::Preview, stage, group.invocation_location);
                    }
                }

                let (Some(name), Some(config)) = (group.binding_name(), group.texture_binding.as_ref()) else {
                    continue;
                };
                if !bindings.contains(name)
                    || bindings.is_updated(name)
                    || stage_state.bindings.contains_key(name)
                    || (config.extract_resource_views && self.device.srv_updated().contains(&group.id))
                {
                    continue;
                }
                let site = if !config.copy || config.extract_resource_views {
                    CallSite::Draw
                } else {
                    config.invocation_location
                };
                stage_state
                    .bindings
                    .insert(name.to_owned(), QueuedAction::new(group.clone(), site));
                mask.arm_with_draw(ActionKind::Binding, stage, site);
            }
        }

        let techniques = self.device.read_techniques();
        for group in &groups {
            for (name, effect) in techniques.iter() {
                if effect.rendered
                    || !group.allows_technique(name)
                    || stage_state.techniques.contains_key(name)
                {
                    continue;
                }
                stage_state.techniques.insert(
                    name.clone(),
                    QueuedAction::new(group.clone(), group.invocation_location),
                );
                mask.arm_with_draw(ActionKind::Effect, stage, group.invocation_location);
            }
        }
    }

    /// Re-arm unresolved actions whose group asked to retry after a failed match.
    fn reschedule(&self, state: &mut CommandListState, stage: ShaderStage) {
        let (stage_state, mask, _) = state.parts_mut(stage);
        let previewed = self.previewed_group();
        let preview_waiting = {
            let preview = self.device.preview();
            !preview.matched && preview.target.is_none()
        };

        let mut preview_group = None;
        for (kind, actions) in [
            (ActionKind::Effect, &stage_state.techniques),
            (ActionKind::Binding, &stage_state.bindings),
        ] {
            let retrying = actions
                .values()
                .filter(|a| a.view.is_none() && a.group.requeue_after_rt_matching_failure);
            for action in retrying {
                mask.arm_with_draw(kind, stage, action.call_site);
                if preview_waiting && previewed == Some(action.group.id) {
                    preview_group = Some(action.group.clone());
                }
            }
        }

        if let Some(group) = preview_group {
            self.device.preview().target_site = group.invocation_location;
            mask.arm_with_draw(ActionKind::Preview, stage, group.invocation_location);
            stage_state.preview_group = Some(group);
        }
    }

    /// Execute whatever `stage` has pending at `site`.
    fn process(
        &self,
        runtime: &dyn EffectRuntime,
        state: &mut CommandListState,
        cmd: &mut dyn CommandList,
        stage: ShaderStage,
        site: CallSite,
    ) {
        if site == CallSite::Draw {
            self.process_constants(runtime, state, stage);
        }
        self.process_bindings(runtime, state, cmd, stage, site);
        self.process_effects(runtime, state, cmd, stage, site);
        self.process_preview(runtime, state, cmd, stage, site);
    }

    fn process_constants(&self, runtime: &dyn EffectRuntime, state: &mut CommandListState, stage: ShaderStage) {
        let (stage_state, mask, bound) = state.parts_mut(stage);
        if !mask.take(ActionKind::Constants, stage, CallSite::Draw) {
            return;
        }

        for (id, group) in stage_state.constants.drain() {
            if self.device.constants_updated().contains(&id) {
                continue;
            }
            let Some(range) = bound
                .stage(stage)
                .constant_buffer(group.slot_index, group.descriptor_index)
            else {
                trace!(group = %id, ?stage, "no constant buffer bound");
                continue;
            };

            match self.constants.update_group(runtime, &group, range) {
                Ok(_) => {
                    self.device.constants_updated().insert(id);
                }
                Err(err) => debug!(group = %id, %err, "constant snapshot failed"),
            }
        }
    }

    fn process_bindings(
        &self,
        runtime: &dyn EffectRuntime,
        state: &mut CommandListState,
        cmd: &mut dyn CommandList,
        stage: ShaderStage,
        site: CallSite,
    ) {
        let (stage_state, mask, bound) = state.parts_mut(stage);
        if !mask.take(ActionKind::Binding, stage, site) || stage_state.bindings.is_empty() {
            return;
        }
        if site == CallSite::Draw {
            resolve_pending(&mut stage_state.bindings, ActionKind::Binding, |group| {
                binding_target(runtime, bound, stage, group)
            });
        }

        let ready = ready_at(&stage_state.bindings, site);
        if ready.is_empty() {
            return;
        }

        let device = runtime.device();
        let mut extracted = Vec::new();
        {
            let mut table = self.device.write_bindings();
            for (name, view) in ready {
                if table.is_updated(&name) {
                    stage_state.bindings.remove(&name);
                    continue;
                }
                let Some(resource) = device.resource_from_view(view).and_then(Resource::non_null) else {
                    continue;
                };
                let Some(entry) = table.get(&name).copied() else {
                    stage_state.bindings.remove(&name);
                    continue;
                };
                let extent = device
                    .resource_desc(resource)
                    .and_then(|desc| desc.texture_extent())
                    .unwrap_or_default();

                if entry.copy {
                    if table.update(runtime, &name, extent) != BindingUpdate::Failed {
                        if let Some(target) = table.get_mut(&name).filter(|b| !b.resource.is_null()) {
                            cmd.copy_resource(resource, target.resource);
                            target.reset = false;
                        }
                    }
                } else {
                    let Some(views) = self.views.shader_resource_views(resource) else {
                        continue;
                    };
                    table.swap(runtime, &name, resource, extent, views);
                }

                table.mark_updated(&name);
                if let Some(action) = stage_state.bindings.remove(&name) {
                    let extracts = action
                        .group
                        .texture_binding
                        .as_ref()
                        .is_some_and(|b| b.extract_resource_views);
                    if extracts {
                        extracted.push(action.group.id);
                    }
                }
                debug!(binding = %name, ?resource, copy = entry.copy, "texture binding updated");
            }
        }

        if !extracted.is_empty() {
            self.device.srv_updated().extend(extracted);
        }
    }

    fn process_effects(
        &self,
        runtime: &dyn EffectRuntime,
        state: &mut CommandListState,
        cmd: &mut dyn CommandList,
        stage: ShaderStage,
        site: CallSite,
    ) {
        let (stage_state, mask, bound) = state.parts_mut(stage);
        if !mask.take(ActionKind::Effect, stage, site) || stage_state.techniques.is_empty() {
            return;
        }
        if site == CallSite::Draw {
            resolve_pending(&mut stage_state.techniques, ActionKind::Effect, |group| {
                effect_target(runtime, bound, group)
            });
        }

        let ready = ready_at(&stage_state.techniques, site);
        if ready.is_empty() {
            return;
        }
        for (name, _) in &ready {
            stage_state.techniques.remove(name);
        }

        let device = runtime.device();
        let targets: Vec<(String, (ResourceView, ResourceView))> = ready
            .into_iter()
            .filter_map(|(name, view)| {
                let resource = device.resource_from_view(view)?.non_null()?;
                Some((name, self.views.render_target_views(resource)?))
            })
            .collect();

        let mut claimed: Vec<(String, Technique, (ResourceView, ResourceView))> = {
            let mut techniques = self.device.write_techniques();
            targets
                .into_iter()
                .filter_map(|(name, pair)| {
                    let effect = techniques.get_mut(&name)?;
                    if effect.rendered {
                        return None;
                    }
                    effect.rendered = true;
                    Some((name, effect.technique, pair))
                })
                .collect()
        };
        if claimed.is_empty() {
            return;
        }
        sort_by_runtime_order(runtime, &mut claimed, |(_, technique, _)| *technique);

        self.device.set_rendered_effects();
        for (name, technique, (rtv, rtv_srgb)) in claimed {
            runtime.render_technique(technique, cmd, rtv, rtv_srgb);
            debug!(technique = %name, ?stage, %site, ?rtv, "effect rendered");
        }
        if self.config.reapply_state_after_render {
            bound.reapply(cmd);
        }
    }

    fn process_preview(
        &self,
        runtime: &dyn EffectRuntime,
        state: &mut CommandListState,
        cmd: &mut dyn CommandList,
        stage: ShaderStage,
        site: CallSite,
    ) {
        let (stage_state, mask, bound) = state.parts_mut(stage);
        if !mask.take(ActionKind::Preview, stage, site) {
            return;
        }
        let Some(group) = stage_state.preview_group.clone() else {
            return;
        };
        if self.hunting() != Some(group.id) {
            return;
        }

        let device = runtime.device();
        let mut preview = self.device.preview();
        if site == CallSite::Draw && preview.target.is_none() {
            let Some(view) = preview_target(runtime, bound, &group) else {
                return;
            };
            preview.target = Some(view);
            preview.extent = device
                .resource_from_view(view)
                .and_then(|res| device.resource_desc(res))
                .and_then(|desc| desc.texture_extent());
        }

        let (Some(target), Some(extent)) = (preview.target, preview.extent) else {
            return;
        };
        if site != preview.target_site || preview.matched {
            return;
        }
        let Some(source) = device.resource_from_view(target).and_then(Resource::non_null) else {
            return;
        };

        if let Some(dest) = preview.ensure_texture(device, extent) {
            cmd.copy_resource(source, dest);
        }
        preview.matched = true;
        debug!(group = %group.id, ?source, "preview captured");
    }

    /// Render every enabled technique nothing rendered yet onto the back buffer.
    ///
    /// Only runs in frames where some effect was rendered mid-frame.
    fn render_remaining_effects(&self, runtime: &dyn EffectRuntime, cmd: &mut dyn CommandList) -> bool {
        let back_buffer = runtime.current_back_buffer();
        let Some((rtv, rtv_srgb)) = self.views.render_target_views(back_buffer) else {
            return false;
        };
        if !self.device.rendered_effects() {
            return false;
        }

        let mut remaining: Vec<(String, Technique)> = {
            let mut techniques = self.device.write_techniques();
            techniques
                .iter_mut()
                .filter(|(_, effect)| !effect.rendered)
                .map(|(name, effect)| {
                    effect.rendered = true;
                    (name.clone(), effect.technique)
                })
                .collect()
        };

        sort_by_runtime_order(runtime, &mut remaining, |(_, technique)| *technique);
        for (name, technique) in &remaining {
            runtime.render_technique(*technique, cmd, rtv, rtv_srgb);
            debug!(technique = %name, "remaining effect rendered on back buffer");
        }
        !remaining.is_empty()
    }

    fn clear_unmatched(&self, runtime: &dyn EffectRuntime, cmd: &mut dyn CommandList) {
        self.device.write_bindings().clear_unmatched(runtime, cmd);

        if self.hunting().is_some() {
            let preview = self.device.preview();
            if let (false, Some((res, _))) = (preview.matched, preview.resources) {
                cmd.clear_render_target_view(res.rtv, CLEAR_COLOR);
            }
        }
    }
}

/// Capture a view for every unresolved action; drop those that fail unless their group retries.
fn resolve_pending(
    actions: &mut HashMap<String, QueuedAction>,
    kind: ActionKind,
    mut resolve: impl FnMut(&ToggleGroup) -> Option<ResourceView>,
) {
    actions.retain(|name, action| {
        if action.view.is_some() {
            return true;
        }
        match resolve(&action.group) {
            Some(view) => {
                action.view = Some(view);
                true
            }
            None if action.group.requeue_after_rt_matching_failure => {
                trace!(%kind, %name, "unresolved, will retry");
                true
            }
            None => {
                trace!(%kind, %name, "unresolved, dropped");
                false
            }
        }
    });
}

/// Effects stack in the order the runtime lists its techniques.
fn sort_by_runtime_order<T>(
    runtime: &dyn EffectRuntime,
    items: &mut [T],
    technique: impl Fn(&T) -> Technique,
) {
    if items.len() < 2 {
        return;
    }
    let order: HashMap<Technique, usize> = runtime
        .techniques()
        .into_iter()
        .enumerate()
        .map(|(i, t)| (t, i))
        .collect();
    items.sort_by_key(|item| order.get(&technique(item)).copied().unwrap_or(usize::MAX));
}

fn ready_at(actions: &HashMap<String, QueuedAction>, site: CallSite) -> Vec<(String, ResourceView)> {
    actions
        .iter()
        .filter(|(_, action)| action.call_site == site)
        .filter_map(|(name, action)| action.view.map(|view| (name.clone(), view)))
        .collect()
}
