use bitflags::bitflags;

use crate::{Format, Resource};

/// Memory heap a resource was allocated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum MemoryHeap {
    #[default]
    Unknown,
    GpuOnly,
    /// Upload heap: CPU writes, GPU reads.
    CpuToGpu,
    GpuToCpu,
    CpuOnly,
}

bitflags! {
    /// How a resource may be used by the pipeline.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ResourceUsage: u32 {
        const INDEX_BUFFER = 1 << 0;
        const VERTEX_BUFFER = 1 << 1;
        const CONSTANT_BUFFER = 1 << 2;
        const SHADER_RESOURCE = 1 << 3;
        const UNORDERED_ACCESS = 1 << 4;
        const RENDER_TARGET = 1 << 5;
        const DEPTH_STENCIL = 1 << 6;
        const COPY_DEST = 1 << 7;
        const COPY_SOURCE = 1 << 8;
    }
}

/// CPU access requested when mapping a buffer region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MapAccess {
    ReadOnly,
    WriteOnly,
    ReadWrite,
    WriteDiscard,
}

impl MapAccess {
    /// Mappings that only write: every byte the application cares about passes through the
    /// intercepted copy.
    pub const fn is_write_only(self) -> bool {
        matches!(self, Self::WriteOnly | Self::WriteDiscard)
    }
}

/// Kind of view requested from [`crate::Device::create_resource_view`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViewUsage {
    ShaderResource,
    RenderTarget,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Buffer {
        size: u64,
    },
    Texture2d {
        width: u32,
        height: u32,
        levels: u16,
        format: Format,
    },
}

/// Size and format of a 2D texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct TextureExtent {
    pub width: u32,
    pub height: u32,
    pub format: Format,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResourceDesc {
    pub kind: ResourceKind,
    pub heap: MemoryHeap,
    pub usage: ResourceUsage,
}

impl ResourceDesc {
    pub const fn buffer(size: u64, heap: MemoryHeap, usage: ResourceUsage) -> Self {
        Self {
            kind: ResourceKind::Buffer { size },
            heap,
            usage,
        }
    }

    pub const fn texture_2d(
        width: u32,
        height: u32,
        format: Format,
        heap: MemoryHeap,
        usage: ResourceUsage,
    ) -> Self {
        Self {
            kind: ResourceKind::Texture2d {
                width,
                height,
                levels: 1,
                format,
            },
            heap,
            usage,
        }
    }

    pub const fn buffer_size(&self) -> Option<u64> {
        match self.kind {
            ResourceKind::Buffer { size } => Some(size),
            ResourceKind::Texture2d { .. } => None,
        }
    }

    pub const fn texture_extent(&self) -> Option<TextureExtent> {
        match self.kind {
            ResourceKind::Texture2d {
                width,
                height,
                format,
                ..
            } => Some(TextureExtent {
                width,
                height,
                format,
            }),
            ResourceKind::Buffer { .. } => None,
        }
    }

    /// Constant buffers living in the upload heap are the only resources mirrored on the CPU.
    pub fn is_host_constant_buffer(&self) -> bool {
        matches!(self.kind, ResourceKind::Buffer { .. })
            && self.heap == MemoryHeap::CpuToGpu
            && self.usage.contains(ResourceUsage::CONSTANT_BUFFER)
    }
}

/// A constant buffer binding as pushed through a descriptor table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferRange {
    pub buffer: Resource,
    pub offset: u64,
    pub size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_upload_heap_constant_buffers_are_mirrored() {
        let cb = ResourceDesc::buffer(64, MemoryHeap::CpuToGpu, ResourceUsage::CONSTANT_BUFFER);
        assert!(cb.is_host_constant_buffer());

        let gpu_cb = ResourceDesc::buffer(64, MemoryHeap::GpuOnly, ResourceUsage::CONSTANT_BUFFER);
        assert!(!gpu_cb.is_host_constant_buffer());

        let vb = ResourceDesc::buffer(64, MemoryHeap::CpuToGpu, ResourceUsage::VERTEX_BUFFER);
        assert!(!vb.is_host_constant_buffer());

        let tex = ResourceDesc::texture_2d(
            4,
            4,
            Format::R8G8B8A8Unorm,
            MemoryHeap::CpuToGpu,
            ResourceUsage::CONSTANT_BUFFER,
        );
        assert!(!tex.is_host_constant_buffer());
    }
}
