//! Picking the concrete view a queued action should act on.

use fxtoggle_api::{
    DescriptorCycle, EffectRuntime, ResourceView, ShaderStage, SwapchainMatchMode, TextureExtent,
    ToggleGroup,
};
use tracing::trace;

use crate::BoundState;

const ASPECT_TOLERANCE: f32 = 0.1;
const MIN_SCALE: f32 = 0.5;
const MAX_SCALE: f32 = 1.85;
const MULTIPLE_TOLERANCE: f32 = 0.02;

/// Whether a `width_to_check`x`height_to_check` target looks like a `width`x`height` swap chain.
///
/// A zero dimension always passes. Otherwise the aspect ratios must agree within 0.1 and the target
/// must be between roughly half and 1.85 times the swap-chain size, or, in
/// [`SwapchainMatchMode::ExtendedAspectRatio`], an almost exact multiple of it.
pub fn check_aspect_ratio(
    width_to_check: f32,
    height_to_check: f32,
    width: u32,
    height: u32,
    mode: SwapchainMatchMode,
) -> bool {
    if width_to_check == 0.0 || height_to_check == 0.0 {
        return true;
    }

    let w = width as f32;
    let h = height as f32;
    let w_ratio = w / width_to_check;
    let h_ratio = h / height_to_check;
    let aspect_delta = (w / h) - (width_to_check / height_to_check);

    let in_scale = |ratio: f32| (MIN_SCALE..=MAX_SCALE).contains(&ratio);
    let near_multiple = |ratio: f32| ratio.fract() <= MULTIPLE_TOLERANCE;

    aspect_delta.abs() <= ASPECT_TOLERANCE
        && ((in_scale(w_ratio) && in_scale(h_ratio))
            || (mode == SwapchainMatchMode::ExtendedAspectRatio
                && near_multiple(w_ratio)
                && near_multiple(h_ratio)))
}

/// Apply `mode` to a target of `extent` against a swap chain of `swapchain` (width, height).
pub fn matches_swapchain(
    mode: SwapchainMatchMode,
    extent: TextureExtent,
    swapchain: (u32, u32),
) -> bool {
    let (width, height) = swapchain;
    match mode {
        SwapchainMatchMode::None => true,
        SwapchainMatchMode::Resolution => extent.width == width && extent.height == height,
        SwapchainMatchMode::AspectRatio | SwapchainMatchMode::ExtendedAspectRatio => {
            check_aspect_ratio(extent.width as f32, extent.height as f32, width, height, mode)
        }
    }
}

/// Validate a bound render-target view; `None` if it has no resource or fails the checks.
fn accept_render_target(
    runtime: &dyn EffectRuntime,
    view: ResourceView,
    mode: SwapchainMatchMode,
    require_color: bool,
) -> Option<ResourceView> {
    let device = runtime.device();
    // Render targets without a resource are legal; writes to them are discarded.
    let resource = device.resource_from_view(view)?.non_null()?;
    let extent = device
        .resource_desc(resource)
        .and_then(|desc| desc.texture_extent())
        .unwrap_or_default();

    if require_color && !extent.format.is_color_buffer() {
        trace!(?view, format = %extent.format, "render target is not a color buffer");
        return None;
    }
    if !matches_swapchain(mode, extent, runtime.screenshot_size()) {
        trace!(?view, width = extent.width, height = extent.height, ?mode, "render target does not match swap chain");
        return None;
    }
    Some(view)
}

/// Render target an effect for `group` would draw into.
pub(crate) fn effect_target(
    runtime: &dyn EffectRuntime,
    bound: &BoundState,
    group: &ToggleGroup,
) -> Option<ResourceView> {
    let view = bound.render_target(group.render_target_index)?;
    accept_render_target(runtime, view, group.match_swapchain, true)
}

/// Render target the inspected group's preview is captured from. Unlike effects, any format goes.
pub(crate) fn preview_target(
    runtime: &dyn EffectRuntime,
    bound: &BoundState,
    group: &ToggleGroup,
) -> Option<ResourceView> {
    let view = bound.render_target(group.render_target_index)?;
    accept_render_target(runtime, view, group.match_swapchain, false)
}

/// View the texture binding of `group` should pick up on `stage`.
pub(crate) fn binding_target(
    runtime: &dyn EffectRuntime,
    bound: &BoundState,
    stage: ShaderStage,
    group: &ToggleGroup,
) -> Option<ResourceView> {
    let config = group.texture_binding.as_ref()?;
    if config.extract_resource_views {
        return extracted_shader_resource(bound, stage, group);
    }

    let view = bound.render_target(config.render_target_index)?;
    accept_render_target(runtime, view, config.match_swapchain, false)
}

/// Shader-resource view at the group's binding slot, honouring a pending descriptor step.
///
/// A step scans past null descriptors in its direction; when it lands on a view the group's stored
/// descriptor index moves there.
fn extracted_shader_resource(
    bound: &BoundState,
    stage: ShaderStage,
    group: &ToggleGroup,
) -> Option<ResourceView> {
    let slot = group.texture_binding.as_ref()?.srv_slot_index;
    let table = bound.stage(stage).shader_resource_table(slot)?;
    let last = table.len() - 1;
    let current = (group.binding_srv_descriptor_index() as usize).min(last);
    let at = |i: usize| table[i].and_then(ResourceView::non_null);

    let found = match group.consume_srv_cycle() {
        DescriptorCycle::None => return at(current),
        DescriptorCycle::Up => ((current + 1).min(last)..=last).find_map(|i| at(i).map(|v| (i, v))),
        DescriptorCycle::Down => (0..=current.saturating_sub(1))
            .rev()
            .find_map(|i| at(i).map(|v| (i, v))),
    };

    let (index, view) = found?;
    group.set_binding_srv_descriptor_index(index as u32);
    trace!(group = %group.id, index, "binding descriptor stepped");
    Some(view)
}
