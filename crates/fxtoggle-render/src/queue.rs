use std::fmt;

use fxtoggle_api::{CallSite, ShaderStage};

/// Category of a pending action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Effect,
    Binding,
    Constants,
    Preview,
}

impl ActionKind {
    pub const COUNT: usize = 4;
    pub const ALL: [Self; Self::COUNT] = [Self::Effect, Self::Binding, Self::Constants, Self::Preview];

    pub const fn index(self) -> usize {
        match self {
            Self::Effect => 0,
            Self::Binding => 1,
            Self::Constants => 2,
            Self::Preview => 3,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Effect => write!(f, "effect"),
            ActionKind::Binding => write!(f, "binding"),
            ActionKind::Constants => write!(f, "constants"),
            ActionKind::Preview => write!(f, "preview"),
        }
    }
}

/// Pending (action × stage × call-site) combinations of one command list.
///
/// An armed entry is cleared exactly once: by [`QueueMask::take`] at the call-site it targets, or
/// by a pipeline-change purge. Arming an already armed entry is idempotent.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueueMask {
    pending: [[[bool; CallSite::COUNT]; ShaderStage::COUNT]; ActionKind::COUNT],
}

impl QueueMask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, kind: ActionKind, stage: ShaderStage, site: CallSite) {
        self.pending[kind.index()][stage.index()][site.index()] = true;
    }

    /// Arm `site` plus the draw site, which is where views are resolved.
    pub fn arm_with_draw(&mut self, kind: ActionKind, stage: ShaderStage, site: CallSite) {
        self.arm(kind, stage, site);
        self.arm(kind, stage, CallSite::Draw);
    }

    /// Clear the entry, returning whether it was armed.
    pub fn take(&mut self, kind: ActionKind, stage: ShaderStage, site: CallSite) -> bool {
        std::mem::take(&mut self.pending[kind.index()][stage.index()][site.index()])
    }

    pub fn is_armed(&self, kind: ActionKind, stage: ShaderStage, site: CallSite) -> bool {
        self.pending[kind.index()][stage.index()][site.index()]
    }

    /// Whether anything at all is pending at `site`.
    pub fn any_at(&self, site: CallSite) -> bool {
        self.pending
            .iter()
            .flatten()
            .any(|sites| sites[site.index()])
    }

    /// Clear every site of `kind` on `stage`.
    pub fn clear_kind(&mut self, kind: ActionKind, stage: ShaderStage) {
        self.pending[kind.index()][stage.index()] = [false; CallSite::COUNT];
    }

    /// Clear every action on `stage`.
    pub fn clear_stage(&mut self, stage: ShaderStage) {
        for kind in ActionKind::ALL {
            self.clear_kind(kind, stage);
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Number of armed entries.
    pub fn len(&self) -> usize {
        self.pending
            .iter()
            .flatten()
            .flatten()
            .filter(|&&armed| armed)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
