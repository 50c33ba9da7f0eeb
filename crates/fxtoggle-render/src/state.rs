use std::collections::HashMap;
use std::sync::Arc;

use fxtoggle_api::{CallSite, GroupId, ResourceView, ShaderHash, ShaderStage, ToggleGroup};

use crate::{ActionKind, BoundState, QueueMask};

/// A technique render or binding swap waiting for its call-site.
#[derive(Debug, Clone)]
pub struct QueuedAction {
    pub group: Arc<ToggleGroup>,
    /// Call-site the action executes at once resolved.
    pub call_site: CallSite,
    /// Resolved target; `None` until a draw found one.
    pub view: Option<ResourceView>,
}

impl QueuedAction {
    pub fn new(group: Arc<ToggleGroup>, call_site: CallSite) -> Self {
        Self {
            group,
            call_site,
            view: None,
        }
    }

    pub fn is_ready_at(&self, site: CallSite) -> bool {
        self.view.is_some() && self.call_site == site
    }
}

#[derive(Debug, Default, Clone)]
pub struct StageState {
    pub active_shader: Option<ShaderHash>,
    /// Technique name -> pending render.
    pub techniques: HashMap<String, QueuedAction>,
    /// Binding name -> pending swap.
    pub bindings: HashMap<String, QueuedAction>,
    /// Groups waiting for a constant snapshot.
    pub constants: HashMap<GroupId, Arc<ToggleGroup>>,
    pub blocking_groups: Vec<Arc<ToggleGroup>>,
    /// Group under inspection whose preview is pending on this stage.
    pub preview_group: Option<Arc<ToggleGroup>>,
}

impl StageState {
    pub fn actions(&self, kind: ActionKind) -> Option<&HashMap<String, QueuedAction>> {
        match kind {
            ActionKind::Effect => Some(&self.techniques),
            ActionKind::Binding => Some(&self.bindings),
            ActionKind::Constants | ActionKind::Preview => None,
        }
    }

    pub fn actions_mut(&mut self, kind: ActionKind) -> Option<&mut HashMap<String, QueuedAction>> {
        match kind {
            ActionKind::Effect => Some(&mut self.techniques),
            ActionKind::Binding => Some(&mut self.bindings),
            ActionKind::Constants | ActionKind::Preview => None,
        }
    }

    /// Drop everything queued for the previous shader.
    pub fn purge(&mut self) {
        self.techniques.clear();
        self.bindings.clear();
        self.constants.clear();
        self.preview_group = None;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_idle(&self) -> bool {
        self.techniques.is_empty()
            && self.bindings.is_empty()
            && self.constants.is_empty()
            && self.preview_group.is_none()
    }
}

/// Everything the scheduler tracks for a single command list.
///
/// The host owns one of these per command list and hands it to every [`crate::Scheduler`]
/// callback for that list.
#[derive(Debug, Default, Clone)]
pub struct CommandListState {
    pub mask: QueueMask,
    stages: [StageState; ShaderStage::COUNT],
    pub bound: BoundState,
}

impl CommandListState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self, stage: ShaderStage) -> &StageState {
        &self.stages[stage.index()]
    }

    pub fn stage_mut(&mut self, stage: ShaderStage) -> &mut StageState {
        &mut self.stages[stage.index()]
    }

    /// Borrow `stage`'s entries together with the mask and the bound state.
    pub fn parts_mut(&mut self, stage: ShaderStage) -> (&mut StageState, &mut QueueMask, &mut BoundState) {
        (&mut self.stages[stage.index()], &mut self.mask, &mut self.bound)
    }

    /// Called when the host resets the command list.
    pub fn reset(&mut self) {
        self.mask.clear();
        for stage in &mut self.stages {
            stage.reset();
        }
        self.bound.reset();
    }

    /// Purge `stage` after its shader changed and clear every bit that belonged to it.
    pub fn purge_stage(&mut self, stage: ShaderStage) {
        self.stage_mut(stage).purge();
        self.mask.clear_stage(stage);
    }
}
