use fxtoggle_api::{BufferRange, CommandList, ResourceView, ShaderStage};

/// Push-descriptor tables bound to one shader stage, indexed by `[slot][descriptor]`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StageDescriptors {
    shader_resources: Vec<Vec<Option<ResourceView>>>,
    constant_buffers: Vec<Vec<Option<BufferRange>>>,
}

fn write_table<T: Copy>(tables: &mut Vec<Vec<Option<T>>>, slot: u32, first: u32, values: &[Option<T>]) {
    let slot = slot as usize;
    if tables.len() <= slot {
        tables.resize_with(slot + 1, Vec::new);
    }
    let table = &mut tables[slot];
    let first = first as usize;
    let end = first + values.len();
    if table.len() < end {
        table.resize(end, None);
    }
    table[first..end].copy_from_slice(values);
}

/// `tables[min(slot, n-1)][min(index, m-1)]`; empty levels yield `None`.
fn clamped<T: Copy>(tables: &[Vec<Option<T>>], slot: u32, index: u32) -> Option<T> {
    let table = clamped_table(tables, slot)?;
    let last = table.len().checked_sub(1)?;
    table[(index as usize).min(last)]
}

fn clamped_table<T>(tables: &[Vec<Option<T>>], slot: u32) -> Option<&[Option<T>]> {
    let last = tables.len().checked_sub(1)?;
    Some(tables[(slot as usize).min(last)].as_slice())
}

impl StageDescriptors {
    pub fn push_shader_resource_views(&mut self, slot: u32, first: u32, views: &[Option<ResourceView>]) {
        write_table(&mut self.shader_resources, slot, first, views);
    }

    pub fn push_constant_buffers(&mut self, slot: u32, first: u32, ranges: &[Option<BufferRange>]) {
        write_table(&mut self.constant_buffers, slot, first, ranges);
    }

    /// Shader-resource view at the clamped `(slot, index)`.
    pub fn shader_resource(&self, slot: u32, index: u32) -> Option<ResourceView> {
        clamped(&self.shader_resources, slot, index).and_then(ResourceView::non_null)
    }

    /// The whole descriptor table at the clamped `slot`.
    pub fn shader_resource_table(&self, slot: u32) -> Option<&[Option<ResourceView>]> {
        clamped_table(&self.shader_resources, slot).filter(|t| !t.is_empty())
    }

    /// Constant buffer range at the clamped `(slot, index)`.
    pub fn constant_buffer(&self, slot: u32, index: u32) -> Option<BufferRange> {
        clamped(&self.constant_buffers, slot, index).filter(|r| !r.buffer.is_null())
    }

    pub fn is_empty(&self) -> bool {
        self.shader_resources.is_empty() && self.constant_buffers.is_empty()
    }

    fn reapply(&self, stage: ShaderStage, cmd: &mut dyn CommandList) {
        for (slot, table) in self.shader_resources.iter().enumerate() {
            if !table.is_empty() {
                cmd.push_shader_resource_views(stage, slot as u32, table);
            }
        }
        for (slot, table) in self.constant_buffers.iter().enumerate() {
            if !table.is_empty() {
                cmd.push_constant_buffers(stage, slot as u32, table);
            }
        }
    }
}

/// State the application bound on a command list, as far as effect rendering can disturb it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BoundState {
    render_targets: Vec<Option<ResourceView>>,
    stages: [StageDescriptors; ShaderStage::COUNT],
}

impl BoundState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_render_targets(&mut self, views: &[Option<ResourceView>]) {
        self.render_targets.clear();
        self.render_targets.extend_from_slice(views);
    }

    pub fn render_targets(&self) -> &[Option<ResourceView>] {
        &self.render_targets
    }

    /// Render target at `min(index, count-1)`, if non-null.
    pub fn render_target(&self, index: usize) -> Option<ResourceView> {
        let last = self.render_targets.len().checked_sub(1)?;
        self.render_targets[index.min(last)].and_then(ResourceView::non_null)
    }

    pub fn stage(&self, stage: ShaderStage) -> &StageDescriptors {
        &self.stages[stage.index()]
    }

    pub fn stage_mut(&mut self, stage: ShaderStage) -> &mut StageDescriptors {
        &mut self.stages[stage.index()]
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Re-issue everything tracked here on `cmd`.
    pub fn reapply(&self, cmd: &mut dyn CommandList) {
        if !self.render_targets.is_empty() {
            cmd.bind_render_targets(&self.render_targets);
        }
        for stage in ShaderStage::ALL {
            self.stage(stage).reapply(stage, cmd);
        }
    }
}

#[cfg(test)]
mod tests {
    use fxtoggle_api::test_utils::{Command, RecordingCommandList};
    use fxtoggle_api::Resource;
    use pretty_assertions::assert_eq;

    use super::*;

    fn view(v: u64) -> Option<ResourceView> {
        Some(ResourceView(v))
    }

    #[test]
    fn lookups_clamp_to_last_entry() {
        let mut stage = StageDescriptors::default();
        assert_eq!(stage.shader_resource(0, 0), None);

        stage.push_shader_resource_views(1, 0, &[view(10), view(11)]);
        // Slot 0 exists but is empty.
        assert_eq!(stage.shader_resource(0, 0), None);
        assert_eq!(stage.shader_resource(1, 0), view(10));
        assert_eq!(stage.shader_resource(7, 9), view(11));
    }

    #[test]
    fn partial_pushes_extend_the_table() {
        let mut stage = StageDescriptors::default();
        stage.push_shader_resource_views(0, 2, &[view(5)]);
        assert_eq!(stage.shader_resource_table(0), Some(&[None, None, view(5)][..]));
        stage.push_shader_resource_views(0, 0, &[view(3)]);
        assert_eq!(stage.shader_resource_table(0), Some(&[view(3), None, view(5)][..]));
    }

    #[test]
    fn null_constant_buffers_are_not_found() {
        let mut stage = StageDescriptors::default();
        let range = BufferRange {
            buffer: Resource(4),
            offset: 0,
            size: 64,
        };
        stage.push_constant_buffers(
            0,
            0,
            &[
                Some(range),
                Some(BufferRange {
                    buffer: Resource::NULL,
                    offset: 0,
                    size: 0,
                }),
            ],
        );
        assert_eq!(stage.constant_buffer(0, 0), Some(range));
        assert_eq!(stage.constant_buffer(0, 1), None);
    }

    #[test]
    fn reapply_reissues_tracked_state() {
        let mut bound = BoundState::new();
        bound.bind_render_targets(&[view(1), None]);
        bound
            .stage_mut(ShaderStage::Vertex)
            .push_shader_resource_views(0, 0, &[view(2)]);

        let mut cmd = RecordingCommandList::new();
        bound.reapply(&mut cmd);
        assert_eq!(
            cmd.commands,
            vec![
                Command::BindRenderTargets(vec![view(1), None]),
                Command::PushShaderResourceViews {
                    stage: ShaderStage::Vertex,
                    slot: 0,
                    views: vec![view(2)],
                },
            ]
        );
        assert_eq!(bound.render_target(0), view(1));
        // Out-of-range indices clamp to the last (null) target.
        assert_eq!(bound.render_target(5), None);
    }
}
