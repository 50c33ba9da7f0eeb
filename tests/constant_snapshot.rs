mod common;

use std::sync::Arc;

use common::{group, Host};
use fxtoggle::api::test_utils::{RecordingCommandList, UniformValue};
use fxtoggle::api::{
    BufferRange, ConstantOffset, Device, Format, GroupId, MapAccess, Resource, ShaderStage,
    ToggleGroup, UniformTypeInfo, UniformVariable,
};
use fxtoggle::constants::{CopyMethod, TrackerConfig};
use fxtoggle::render::CommandListState;
use pretty_assertions::assert_eq;

const SHADER: u32 = 0x5EED_0001;
const GROUP: GroupId = GroupId(9);

const FLOAT: UniformTypeInfo = UniformTypeInfo {
    format: Format::R32Float,
    rows: 1,
    columns: 1,
    array_length: 0,
};

fn constants_group() -> Arc<ToggleGroup> {
    let mut g = group(GROUP.0, &[]);
    g.extract_constants = true;
    g.constant_offsets.insert(
        "fog".into(),
        ConstantOffset {
            offset: 4,
            use_previous: false,
        },
    );
    g.constant_offsets.insert(
        "fog_prev".into(),
        ConstantOffset {
            offset: 4,
            use_previous: true,
        },
    );
    Arc::new(g)
}

struct Fixture {
    host: Host,
    fog: UniformVariable,
    fog_prev: UniformVariable,
    cb: Resource,
}

impl Fixture {
    fn new(host: Host) -> Self {
        let fog = host.runtime.add_uniform(Some("fog"), FLOAT);
        let fog_prev = host.runtime.add_uniform(Some("fog_prev"), FLOAT);
        let g = constants_group();
        host.matcher.insert(ShaderStage::Pixel, SHADER, g.clone());
        host.attach(&[g]);

        let cb = host.device.add_constant_buffer(64);
        let desc = host.device.resource_desc(cb).unwrap();
        host.constants.on_init_resource(cb, &desc, None);
        Self {
            host,
            fog,
            fog_prev,
            cb,
        }
    }

    /// Map, fill and unmap the constant buffer the way an application updates it each frame.
    fn write(&self, fog: f32) -> Vec<u8> {
        let mut values = [0.0f32; 16];
        values[1] = fog;
        let bytes = bytemuck::cast_slice::<f32, u8>(&values).to_vec();

        let addr = 0x1000_0000;
        self.host.constants.on_map_buffer_region(
            &*self.host.device,
            self.cb,
            0,
            64,
            MapAccess::WriteDiscard,
            addr,
        );
        assert_eq!(self.host.constants.on_memcpy(addr, &bytes), 64);
        self.host.constants.on_unmap_buffer_region(self.cb);
        bytes
    }

    fn draw(&self, bind_buffer: bool) {
        let mut state = CommandListState::new();
        let mut cmd = RecordingCommandList::new();
        self.host
            .bind_shader(&mut state, &mut cmd, ShaderStage::Pixel, SHADER);
        if bind_buffer {
            self.host.scheduler.on_push_constant_buffers(
                &mut state,
                ShaderStage::Pixel,
                0,
                0,
                &[Some(BufferRange {
                    buffer: self.cb,
                    offset: 0,
                    size: 64,
                })],
            );
        }
        self.host.scheduler.on_draw(&mut state, &mut cmd);
    }

    fn present(&self) {
        self.host
            .scheduler
            .on_present(&mut RecordingCommandList::new());
    }

    fn scratchpad(&self) -> Option<(Vec<u8>, Vec<u8>)> {
        self.host.constants.with_scratchpad(GROUP, |p| {
            (p.current().to_vec(), p.previous().to_vec())
        })
    }
}

#[test]
fn draw_snapshots_mapped_writes_and_feeds_uniforms() {
    let fx = Fixture::new(Host::new());

    let bytes = fx.write(1.5);
    fx.draw(true);

    let (current, _) = fx.scratchpad().unwrap();
    assert_eq!(current, bytes);
    assert_eq!(
        fx.host.runtime.last_uniform_value(fx.fog),
        Some(UniformValue::Float(vec![1.5]))
    );
    assert!(fx
        .host
        .scheduler
        .device_state()
        .constants_updated()
        .contains(&GROUP));
}

#[test]
fn snapshot_is_taken_once_per_frame() {
    let fx = Fixture::new(Host::new());

    let first = fx.write(1.5);
    fx.draw(true);
    fx.write(9.0);
    fx.draw(true);

    assert_eq!(fx.scratchpad().unwrap().0, first);
    assert_eq!(
        fx.host.runtime.last_uniform_value(fx.fog),
        Some(UniformValue::Float(vec![1.5]))
    );
}

#[test]
fn previous_snapshot_lags_one_frame() {
    let fx = Fixture::new(Host::new());

    let first = fx.write(1.5);
    fx.draw(true);
    fx.present();

    let second = fx.write(2.5);
    fx.draw(true);

    let (current, previous) = fx.scratchpad().unwrap();
    assert_eq!(current, second);
    assert_eq!(previous, first);
    assert_eq!(
        fx.host.runtime.last_uniform_value(fx.fog),
        Some(UniformValue::Float(vec![2.5]))
    );
    assert_eq!(
        fx.host.runtime.last_uniform_value(fx.fog_prev),
        Some(UniformValue::Float(vec![1.5]))
    );
}

#[test]
fn draw_without_bound_buffer_retries_on_next_draw() {
    let fx = Fixture::new(Host::new());
    let bytes = fx.write(3.0);

    fx.draw(false);
    assert_eq!(fx.scratchpad(), None);
    assert!(!fx
        .host
        .scheduler
        .device_state()
        .constants_updated()
        .contains(&GROUP));

    fx.draw(true);
    assert_eq!(fx.scratchpad().unwrap().0, bytes);
}

#[test]
fn read_mappings_are_not_mirrored() {
    let fx = Fixture::new(Host::new());
    let addr = 0x2000_0000;
    fx.host.constants.on_map_buffer_region(
        &*fx.host.device,
        fx.cb,
        0,
        64,
        MapAccess::ReadWrite,
        addr,
    );
    assert_eq!(fx.host.constants.on_memcpy(addr, &[1, 2, 3, 4]), 0);
}

#[test]
fn nested_mappings_route_copies_by_address() {
    let nested = Fixture::new(Host::with_tracker(TrackerConfig {
        copy_method: CopyMethod::Nested,
    }));
    let constants = &nested.host.constants;
    let other = nested.host.device.add_constant_buffer(32);
    let desc = nested.host.device.resource_desc(other).unwrap();
    constants.on_init_resource(other, &desc, None);

    let (cb_addr, other_addr) = (0x1000_0000, 0x3000_0000);
    let device = &*nested.host.device;
    constants.on_map_buffer_region(device, nested.cb, 0, 64, MapAccess::WriteDiscard, cb_addr);
    constants.on_map_buffer_region(device, other, 16, 16, MapAccess::WriteDiscard, other_addr);

    // The first mapping is still live while the second one is open.
    let fog = 4.25f32.to_le_bytes();
    assert_eq!(constants.on_memcpy(cb_addr + 4, &fog), 4);
    // Copies into a region mapped at an offset land at that offset in the shadow.
    assert_eq!(constants.on_memcpy(other_addr, &[7; 4]), 4);
    constants.on_unmap_buffer_region(other);
    constants.on_unmap_buffer_region(nested.cb);

    assert_eq!(&constants.shadow().snapshot(other).unwrap()[16..20], &[7; 4]);

    nested.draw(true);
    assert_eq!(&nested.scratchpad().unwrap().0[4..8], &fog);
    assert_eq!(
        nested.host.runtime.last_uniform_value(nested.fog),
        Some(UniformValue::Float(vec![4.25]))
    );
}

#[test]
fn singular_mapping_tracks_only_the_latest_map() {
    let fx = Fixture::new(Host::new());
    let constants = &fx.host.constants;
    let other = fx.host.device.add_constant_buffer(32);
    let desc = fx.host.device.resource_desc(other).unwrap();
    constants.on_init_resource(other, &desc, None);

    let device = &*fx.host.device;
    constants.on_map_buffer_region(device, fx.cb, 0, 64, MapAccess::WriteDiscard, 0x1000_0000);
    constants.on_map_buffer_region(device, other, 0, 32, MapAccess::WriteDiscard, 0x3000_0000);

    assert_eq!(constants.on_memcpy(0x1000_0004, &[1; 4]), 0);
    assert_eq!(constants.on_memcpy(0x3000_0004, &[1; 4]), 4);
}
