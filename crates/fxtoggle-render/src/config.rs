use fxtoggle_api::env::env_var_truthy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Re-issue the command list's render targets and push descriptors after an effect was
    /// rendered into it, since the runtime leaves its own state bound.
    ///
    /// Whether every backend needs this is unverified; it stays on unless turned off.
    pub reapply_state_after_render: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            reapply_state_after_render: true,
        }
    }
}

impl SchedulerConfig {
    /// `FXTOGGLE_SKIP_STATE_REAPPLY` turns off [`SchedulerConfig::reapply_state_after_render`].
    pub fn from_env() -> Self {
        Self {
            reapply_state_after_render: !env_var_truthy("FXTOGGLE_SKIP_STATE_REAPPLY"),
        }
    }
}
