use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;

use crate::{CallSite, ShaderHash, ShaderStage};

/// Stable identity of a toggle group.
///
/// All per-group registries (scratchpads, "updated this frame" sets, preview state) are keyed by
/// this id, never by the address of the group object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub u32);

impl fmt::Debug for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupId({})", self.0)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How strictly a candidate render target must match the swap chain.
///
/// Variants are ordered from strictest to loosest; `None` disables the check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum SwapchainMatchMode {
    /// Width and height must equal the swap chain's.
    Resolution,
    /// Aspect ratio within tolerance and size within roughly 0.5x..1.85x.
    AspectRatio,
    /// Like `AspectRatio`, but also accepts near-integer multiples of the swap chain size.
    ExtendedAspectRatio,
    #[default]
    None,
}

/// One-shot request to step the extracted shader-resource descriptor index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum DescriptorCycle {
    #[default]
    None,
    Up,
    Down,
}

impl DescriptorCycle {
    const fn to_u8(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Up => 1,
            Self::Down => 2,
        }
    }

    const fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Up,
            2 => Self::Down,
            _ => Self::None,
        }
    }
}

/// Byte offset of a named constant inside a group's scratchpad.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConstantOffset {
    pub offset: usize,
    /// Read from the previous snapshot instead of the current one.
    pub use_previous: bool,
}

/// Texture binding a group publishes to the effect runtime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureBindingConfig {
    pub name: String,
    pub invocation_location: CallSite,
    /// Copy the matched resource into a binding-owned texture instead of binding it directly.
    pub copy: bool,
    /// Take the view from the bound shader-resource descriptors instead of the render targets.
    pub extract_resource_views: bool,
    pub render_target_index: usize,
    pub srv_slot_index: u32,
    pub match_swapchain: SwapchainMatchMode,
    /// Reset the binding at the end of a frame in which it was not updated.
    pub clear_on_miss: bool,
}

impl TextureBindingConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            invocation_location: CallSite::Draw,
            copy: false,
            extract_resource_views: false,
            render_target_index: 0,
            srv_slot_index: 0,
            match_swapchain: SwapchainMatchMode::None,
            clear_on_miss: false,
        }
    }
}

/// Read model of a configured toggle group, as handed out by the [`GroupMatcher`].
///
/// Configuration fields are plain data; the only mutable state is the shader-resource descriptor
/// cursor used while a user steps through bound descriptors, which is kept in atomics so groups can
/// be shared across recording threads behind an `Arc`.
#[derive(Debug)]
pub struct ToggleGroup {
    pub id: GroupId,
    pub name: String,
    pub active: bool,
    pub invocation_location: CallSite,

    pub extract_constants: bool,
    /// Descriptor table slot / index holding the constant buffer to snapshot.
    pub slot_index: u32,
    pub descriptor_index: u32,
    pub constant_offsets: HashMap<String, ConstantOffset>,

    pub allow_all_techniques: bool,
    pub has_technique_exceptions: bool,
    pub preferred_techniques: HashSet<String>,
    pub render_target_index: usize,
    pub match_swapchain: SwapchainMatchMode,
    pub requeue_after_rt_matching_failure: bool,

    pub texture_binding: Option<TextureBindingConfig>,

    binding_srv_descriptor_index: AtomicU32,
    srv_cycle: AtomicU8,
}

impl ToggleGroup {
    pub fn new(id: GroupId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            active: true,
            invocation_location: CallSite::Draw,
            extract_constants: false,
            slot_index: 0,
            descriptor_index: 0,
            constant_offsets: HashMap::new(),
            allow_all_techniques: false,
            has_technique_exceptions: false,
            preferred_techniques: HashSet::new(),
            render_target_index: 0,
            match_swapchain: SwapchainMatchMode::None,
            requeue_after_rt_matching_failure: false,
            texture_binding: None,
            binding_srv_descriptor_index: AtomicU32::new(0),
            srv_cycle: AtomicU8::new(DescriptorCycle::None.to_u8()),
        }
    }

    pub fn binding_name(&self) -> Option<&str> {
        self.texture_binding
            .as_ref()
            .map(|b| b.name.as_str())
            .filter(|name| !name.is_empty())
    }

    /// Whether techniques in `name` may be rendered for this group.
    pub fn allows_technique(&self, name: &str) -> bool {
        if self.allow_all_techniques {
            !(self.has_technique_exceptions && self.preferred_techniques.contains(name))
        } else {
            self.preferred_techniques.contains(name)
        }
    }

    pub fn binding_srv_descriptor_index(&self) -> u32 {
        self.binding_srv_descriptor_index.load(Ordering::Relaxed)
    }

    pub fn set_binding_srv_descriptor_index(&self, index: u32) {
        self.binding_srv_descriptor_index
            .store(index, Ordering::Relaxed);
    }

    /// Queue a descriptor step; consumed by the next shader-resource resolution.
    pub fn request_srv_cycle(&self, cycle: DescriptorCycle) {
        self.srv_cycle.store(cycle.to_u8(), Ordering::Relaxed);
    }

    pub fn consume_srv_cycle(&self) -> DescriptorCycle {
        DescriptorCycle::from_u8(
            self.srv_cycle
                .swap(DescriptorCycle::None.to_u8(), Ordering::Relaxed),
        )
    }
}

/// Supplies the groups currently blocking a shader.
pub trait GroupMatcher: Send + Sync {
    /// Ordered list of groups matching `shader` on `stage`. Inactive groups may be included; the
    /// scheduler skips them.
    fn blocking_groups(&self, stage: ShaderStage, shader: ShaderHash) -> Vec<Arc<ToggleGroup>>;
}
