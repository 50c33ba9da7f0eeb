mod common;

use std::sync::Arc;

use common::{group, Host};
use fxtoggle::api::test_utils::RecordingCommandList;
use fxtoggle::api::{CallSite, Format, Resource, ShaderStage, TextureBindingConfig, ToggleGroup};
use fxtoggle::render::CommandListState;
use pretty_assertions::assert_eq;

const SHADER: u32 = 0x00C0_FFEE;
const NEXT_SHADER: u32 = 0x00DE_CADE;

fn binding_group(config: TextureBindingConfig) -> Arc<ToggleGroup> {
    let mut g = group(3, &[]);
    g.texture_binding = Some(config);
    Arc::new(g)
}

#[test]
fn non_copy_binding_follows_first_draw_of_the_frame() {
    let host = Host::new();
    let g = binding_group(TextureBindingConfig::new("SceneTex"));
    host.matcher.insert(ShaderStage::Pixel, SHADER, g.clone());
    host.attach(&[g]);

    let first = host.swapchain_target();
    let second = host.swapchain_target();
    let mut state = CommandListState::new();
    let mut cmd = RecordingCommandList::new();
    host.bind_shader(&mut state, &mut cmd, ShaderStage::Pixel, SHADER);

    host.scheduler.on_bind_render_targets(&mut state, &[Some(first.rtv)]);
    host.scheduler.on_draw(&mut state, &mut cmd);
    host.scheduler.on_bind_render_targets(&mut state, &[Some(second.rtv)]);
    host.scheduler.on_draw(&mut state, &mut cmd);

    assert_eq!(
        host.runtime.texture_binding("SceneTex"),
        Some((first.srv, first.srv_srgb))
    );
    let bindings = host.scheduler.device_state().read_bindings();
    assert!(bindings.is_updated("SceneTex"));
    assert_eq!(bindings.get("SceneTex").map(|b| b.resource), Some(first.resource));
    // Initial unbind plus the one swap.
    assert_eq!(host.runtime.binding_updates().len(), 2);
    assert!(cmd.copies().is_empty());
}

#[test]
fn copy_binding_copies_and_tracks_source_extent() {
    let host = Host::new();
    let g = binding_group(TextureBindingConfig {
        copy: true,
        ..TextureBindingConfig::new("Copied")
    });
    host.matcher.insert(ShaderStage::Pixel, SHADER, g.clone());
    host.attach(&[g]);
    let owned = host
        .scheduler
        .device_state()
        .read_bindings()
        .get("Copied")
        .map(|b| b.resource)
        .unwrap();

    let full = host.swapchain_target();
    let mut state = CommandListState::new();
    let mut cmd = RecordingCommandList::new();
    host.bind_shader(&mut state, &mut cmd, ShaderStage::Pixel, SHADER);
    host.scheduler.on_bind_render_targets(&mut state, &[Some(full.rtv)]);
    host.scheduler.on_draw(&mut state, &mut cmd);
    assert_eq!(cmd.copies(), vec![(full.resource, owned)]);

    host.scheduler.on_present(&mut RecordingCommandList::new());

    // Next frame the source is a half-resolution HDR target: the binding texture is replaced.
    let hdr = host.texture(960, 540, Format::R16G16B16A16Float);
    let mut state = CommandListState::new();
    let mut cmd = RecordingCommandList::new();
    host.bind_shader(&mut state, &mut cmd, ShaderStage::Pixel, SHADER);
    host.scheduler.on_bind_render_targets(&mut state, &[Some(hdr.rtv)]);
    host.scheduler.on_draw(&mut state, &mut cmd);

    let bindings = host.scheduler.device_state().read_bindings();
    let binding = bindings.get("Copied").unwrap();
    assert_ne!(binding.resource, owned);
    assert_eq!((binding.width, binding.height), (960, 540));
    assert_eq!(binding.format, Format::R16G16B16A16Float);
    assert_eq!(cmd.copies(), vec![(hdr.resource, binding.resource)]);
    assert_eq!(
        host.runtime.texture_binding("Copied"),
        Some((binding.srv, binding.srv))
    );
    assert!(!host.device.is_live(owned));
}

#[test]
fn copy_binding_waits_for_its_call_site() {
    let host = Host::new();
    let g = binding_group(TextureBindingConfig {
        copy: true,
        invocation_location: CallSite::BindPipeline,
        ..TextureBindingConfig::new("AfterPass")
    });
    host.matcher.insert(ShaderStage::Pixel, SHADER, g.clone());
    host.attach(&[g]);

    let target = host.swapchain_target();
    let mut state = CommandListState::new();
    let mut cmd = RecordingCommandList::new();
    host.bind_shader(&mut state, &mut cmd, ShaderStage::Pixel, SHADER);
    host.scheduler.on_bind_render_targets(&mut state, &[Some(target.rtv)]);
    host.scheduler.on_draw(&mut state, &mut cmd);
    assert!(cmd.copies().is_empty());

    host.bind_shader(&mut state, &mut cmd, ShaderStage::Pixel, NEXT_SHADER);
    assert_eq!(cmd.copies().len(), 1);
    assert_eq!(cmd.copies()[0].0, target.resource);
    assert!(host
        .scheduler
        .device_state()
        .read_bindings()
        .is_updated("AfterPass"));
}

#[test]
fn extracted_binding_uses_bound_shader_resource() {
    let host = Host::new();
    let g = binding_group(TextureBindingConfig {
        extract_resource_views: true,
        srv_slot_index: 1,
        ..TextureBindingConfig::new("Input")
    });
    host.matcher.insert(ShaderStage::Pixel, SHADER, g.clone());
    host.attach(&[g.clone()]);

    let input = host.texture(512, 512, Format::R8G8B8A8Unorm);
    let mut state = CommandListState::new();
    let mut cmd = RecordingCommandList::new();
    host.bind_shader(&mut state, &mut cmd, ShaderStage::Pixel, SHADER);
    host.scheduler.on_push_shader_resource_views(
        &mut state,
        ShaderStage::Pixel,
        1,
        0,
        &[Some(input.srv)],
    );
    host.scheduler.on_draw(&mut state, &mut cmd);

    assert_eq!(
        host.runtime.texture_binding("Input"),
        Some((input.srv, input.srv_srgb))
    );
    assert!(host.scheduler.device_state().srv_updated().contains(&g.id));
}

#[test]
fn unmatched_binding_is_reset_once_at_present() {
    let host = Host::new();
    let g = binding_group(TextureBindingConfig {
        clear_on_miss: true,
        ..TextureBindingConfig::new("Scene")
    });
    host.matcher.insert(ShaderStage::Pixel, SHADER, g.clone());
    host.attach(&[g]);
    let empty = host
        .scheduler
        .device_state()
        .read_bindings()
        .empty_texture()
        .unwrap();

    // Frame 1 matches: nothing to reset.
    let target = host.swapchain_target();
    let mut state = CommandListState::new();
    let mut cmd = RecordingCommandList::new();
    host.bind_shader(&mut state, &mut cmd, ShaderStage::Pixel, SHADER);
    host.scheduler.on_bind_render_targets(&mut state, &[Some(target.rtv)]);
    host.scheduler.on_draw(&mut state, &mut cmd);
    host.scheduler.on_present(&mut RecordingCommandList::new());
    assert_eq!(
        host.runtime.texture_binding("Scene"),
        Some((target.srv, target.srv_srgb))
    );

    // Frame 2 never draws with the shader: the binding falls back to the empty texture.
    host.scheduler.on_present(&mut RecordingCommandList::new());
    assert_eq!(
        host.runtime.texture_binding("Scene"),
        Some((empty.srv, empty.srv))
    );
    let updates = host.runtime.binding_updates().len();

    // Frame 3 misses again, but it was already reset.
    host.scheduler.on_present(&mut RecordingCommandList::new());
    assert_eq!(host.runtime.binding_updates().len(), updates);
    assert_eq!(
        host.scheduler
            .device_state()
            .read_bindings()
            .get("Scene")
            .map(|b| b.resource),
        Some(Resource::NULL)
    );
}

#[test]
fn binding_creation_failure_is_not_fatal() {
    let host = Host::new();
    host.device.set_fail_creation(true);
    let g = binding_group(TextureBindingConfig {
        copy: true,
        ..TextureBindingConfig::new("Copied")
    });
    host.matcher.insert(ShaderStage::Pixel, SHADER, g.clone());
    host.attach(&[g]);
    assert!(!host.scheduler.device_state().read_bindings().contains("Copied"));

    let target = host.swapchain_target();
    let mut state = CommandListState::new();
    let mut cmd = RecordingCommandList::new();
    host.bind_shader(&mut state, &mut cmd, ShaderStage::Pixel, SHADER);
    host.scheduler.on_bind_render_targets(&mut state, &[Some(target.rtv)]);
    host.scheduler.on_draw(&mut state, &mut cmd);

    assert!(cmd.copies().is_empty());
    assert_eq!(host.runtime.texture_binding("Copied"), None);
}
